use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::{field_bytes, field_text, multipart_error};
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::{
    Action, ContractUploadForm, Document, DocumentFilter, NewContractDocument,
    NewRevokeContractDocument, NewTermDocument, Page, PageParams, Perm, SignedUpload,
    TermUploadForm,
};
use crate::state::AppState;

const fn document_perm(action: Action) -> Perm {
    Perm::new("lending", "document", action)
}

const fn term_perm(action: Action) -> Perm {
    Perm::new("lending", "term", action)
}

/// Read the owner id (first matching name in `id_fields`) and the signed file.
async fn read_upload(mut multipart: Multipart, id_fields: &[&str]) -> AppResult<SignedUpload> {
    let mut owner_id = None;
    let mut bytes = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some(name) if id_fields.contains(&name) => {
                let text = field_text(field).await?;
                let id = text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::field(id_fields[0], "Id inválido"))?;
                owner_id = Some(id);
            }
            Some("file") => {
                let data = field_bytes(field).await?;
                if !data.is_empty() {
                    bytes = Some(data);
                }
            }
            _ => {}
        }
    }

    let owner_id = owner_id.ok_or_else(|| AppError::field(id_fields[0], "Campo obrigatório"))?;
    let bytes = bytes.ok_or_else(|| AppError::field("file", "Arquivo é obrigatório"))?;
    Ok(SignedUpload { owner_id, bytes })
}

fn content_type(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "pdf" => "application/pdf",
        Some(ext) if ext == "html" => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/contracts/create/",
    tag = "documents",
    request_body = NewContractDocument,
    responses(
        (status = 201, description = "Contract generated", body = Document),
        (status = 404, description = "Lending not found")
    )
)]
pub async fn create_contract(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewContractDocument>,
) -> AppResult<(StatusCode, Json<Document>)> {
    user.require(&[document_perm(Action::Add)])?;
    let document = state.documents.create_contract(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/contracts/upload/",
    tag = "documents",
    request_body(content = ContractUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Signed contract stored, lending active", body = Document),
        (status = 400, description = "Contract was never generated")
    )
)]
pub async fn upload_contract(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Document>)> {
    user.require(&[document_perm(Action::Add)])?;
    let upload = read_upload(multipart, &["lendingId", "documentId"]).await?;
    let document = state.documents.upload_contract(&user, upload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/contracts/revoke/create/",
    tag = "documents",
    request_body = NewRevokeContractDocument,
    responses(
        (status = 201, description = "Termination generated", body = Document),
        (status = 400, description = "Lending is not active or witnesses are invalid")
    )
)]
pub async fn create_revoke_contract(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewRevokeContractDocument>,
) -> AppResult<(StatusCode, Json<Document>)> {
    user.require(&[document_perm(Action::Add)])?;
    let document = state.documents.create_revoke_contract(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/contracts/revoke/upload/",
    tag = "documents",
    request_body(content = ContractUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Signed termination stored, asset released", body = Document),
        (status = 400, description = "Termination was never generated")
    )
)]
pub async fn upload_revoke_contract(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Document>)> {
    user.require(&[document_perm(Action::Add)])?;
    let upload = read_upload(multipart, &["lendingId", "documentId"]).await?;
    let document = state.documents.upload_revoke_contract(&user, upload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/terms/create/",
    tag = "documents",
    request_body = NewTermDocument,
    responses(
        (status = 201, description = "Term generated", body = Document),
        (status = 404, description = "Term not found")
    )
)]
pub async fn create_term_document(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewTermDocument>,
) -> AppResult<(StatusCode, Json<Document>)> {
    user.require(&[term_perm(Action::Add)])?;
    let document = state.documents.create_term_document(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/terms/upload/",
    tag = "documents",
    request_body(content = TermUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Signed term stored, term active", body = Document),
        (status = 400, description = "Term was never generated")
    )
)]
pub async fn upload_term(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Document>)> {
    user.require(&[term_perm(Action::Add)])?;
    let upload = read_upload(multipart, &["termId", "documentId"]).await?;
    let document = state.documents.upload_term(&user, upload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/terms/revoke/create/",
    tag = "documents",
    request_body = NewTermDocument,
    responses(
        (status = 201, description = "Term termination generated", body = Document),
        (status = 400, description = "Term is not active")
    )
)]
pub async fn create_revoke_term(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewTermDocument>,
) -> AppResult<(StatusCode, Json<Document>)> {
    user.require(&[term_perm(Action::Add)])?;
    let document = state.documents.create_revoke_term(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/terms/revoke/upload/",
    tag = "documents",
    request_body(content = TermUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Signed term termination stored", body = Document),
        (status = 400, description = "Termination was never generated")
    )
)]
pub async fn upload_revoke_term(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Document>)> {
    user.require(&[term_perm(Action::Add)])?;
    let upload = read_upload(multipart, &["termId", "documentId"]).await?;
    let document = state.documents.upload_revoke_term(&user, upload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/verification/{lending_id}/",
    tag = "documents",
    params(("lending_id" = i64, Path, description = "Lending id")),
    responses(
        (status = 201, description = "Checklist generated", body = Document),
        (status = 400, description = "Lending has no answers")
    )
)]
pub async fn create_verification_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(lending_id): Path<i64>,
) -> AppResult<(StatusCode, Json<Document>)> {
    user.require(&[document_perm(Action::Add)])?;
    let document = state
        .documents
        .create_verification_document(&user, lending_id)
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/list/",
    tag = "documents",
    params(DocumentFilter, PageParams),
    responses((status = 200, description = "Documents", body = inline(Page<Document>)))
)]
pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<DocumentFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<Document>>> {
    user.require(&[document_perm(Action::View)])?;
    Ok(Json(state.documents.list_documents(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/download/{id}/",
    tag = "documents",
    params(("id" = i64, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document file", content_type = "application/octet-stream"),
        (status = 404, description = "Document or file not found")
    )
)]
pub async fn download_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    user.require(&[document_perm(Action::View)])?;
    let (document, bytes) = state.documents.read_document(id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        document.file_name.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, content_type(&document.file_name).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
