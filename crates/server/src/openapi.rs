use utoipa::OpenApi;

use crate::api::{
    assets, auth, datasync, documents, health, invoices, lendings, logs, maintenances, people,
    terms, verifications,
};
use crate::error::FieldError;
use crate::models::{
    Asset, AssetDisposal, AssetShort, AssetType, CatalogItem, Document, Employee, Group, Invoice,
    ItemSize, Lending, LoginResponse, Maintenance, MessageResponse, Permission, SyncRecord, Term,
    TermItem, Upgrade, User, Verification, VerificationAnswer, Witness,
};
use crate::services::JobStatus;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Agile API",
        version = "1.0.0",
        description = "IT asset lending: employees, assets, lendings, maintenances and invoices"
    ),
    paths(
        auth::login,
        auth::refresh_token,
        auth::logout,
        auth::create_user,
        auth::list_users,
        auth::get_user,
        auth::update_user,
        auth::change_password,
        auth::send_new_password,
        auth::create_group,
        auth::list_groups,
        auth::get_group,
        auth::update_group,
        auth::list_permissions,
        people::create_employee,
        people::list_employees,
        people::get_employee,
        people::update_employee,
        people::employees_select,
        people::employee_lending_history,
        people::list_nationalities,
        people::list_marital_statuses,
        people::list_genders,
        people::list_educational_levels,
        people::list_cost_centers,
        people::list_roles,
        assets::create_asset,
        assets::list_assets,
        assets::get_asset,
        assets::update_asset,
        assets::inactivate_asset,
        assets::dispose_asset,
        assets::get_asset_history,
        assets::list_asset_types,
        assets::list_asset_statuses,
        assets::disposal_reasons,
        assets::bulk_create_assets,
        assets::export_assets,
        assets::fix_status,
        lendings::create_lending,
        lendings::list_lendings,
        lendings::get_lending,
        lendings::update_lending,
        lendings::delete_lending,
        lendings::list_workloads,
        lendings::list_lending_statuses,
        lendings::create_witness,
        lendings::list_witnesses,
        maintenances::create_maintenance,
        maintenances::list_maintenances,
        maintenances::get_maintenance,
        maintenances::update_maintenance,
        maintenances::list_maintenance_actions,
        maintenances::list_maintenance_statuses,
        maintenances::create_upgrade,
        maintenances::list_upgrades,
        maintenances::get_upgrade,
        maintenances::update_upgrade,
        invoices::create_invoice,
        invoices::list_invoices,
        invoices::get_invoice,
        invoices::update_invoice,
        invoices::delete_invoice,
        terms::create_term,
        terms::list_terms,
        terms::get_term,
        terms::update_term,
        terms::list_term_statuses,
        terms::list_term_types,
        documents::create_contract,
        documents::upload_contract,
        documents::create_revoke_contract,
        documents::upload_revoke_contract,
        documents::create_term_document,
        documents::upload_term,
        documents::create_revoke_term,
        documents::upload_revoke_term,
        documents::create_verification_document,
        documents::list_documents,
        documents::download_document,
        verifications::create_verification,
        verifications::list_verifications,
        verifications::create_answers,
        verifications::list_answers,
        logs::list_logs,
        datasync::fetch_totvs,
        datasync::list_sync_records,
        datasync::list_jobs,
        health::health,
        health::sqlserver_check
    ),
    tags(
        (name = "auth", description = "Login, users, groups and permissions"),
        (name = "people", description = "Employees and their reference tables"),
        (name = "assets", description = "Assets, import and export"),
        (name = "lendings", description = "Lending contracts and witnesses"),
        (name = "maintenances", description = "Maintenances and upgrades"),
        (name = "invoice", description = "Invoices"),
        (name = "terms", description = "Responsibility terms for tool kits, uniforms and chips"),
        (name = "documents", description = "Generated contracts and terms, signed uploads"),
        (name = "verifications", description = "Asset checklists and their answers"),
        (name = "logs", description = "Audit trail"),
        (name = "datasync", description = "ERP synchronisation"),
        (name = "health", description = "Connectivity checks")
    ),
    components(schemas(
        FieldError,
        MessageResponse,
        CatalogItem,
        LoginResponse,
        User,
        Group,
        Permission,
        Employee,
        Asset,
        AssetShort,
        AssetType,
        AssetDisposal,
        Lending,
        Witness,
        Maintenance,
        Upgrade,
        Invoice,
        Term,
        TermItem,
        ItemSize,
        Document,
        Verification,
        VerificationAnswer,
        SyncRecord,
        JobStatus,
        health::ErpHealth,
        health::DatabaseHealth
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_versioned_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/auth/login/"));
        assert!(doc.paths.paths.contains_key("/api/v1/invoice/invoices/{id}/"));
        assert!(doc.paths.paths.contains_key("/health/"));
        assert!(doc.paths.paths.contains_key("/api/v1/documents/download/{id}/"));
        assert!(doc.paths.paths.contains_key("/api/v1/verifications/answer/{lending_id}/"));
    }
}
