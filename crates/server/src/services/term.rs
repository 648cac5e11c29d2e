use std::sync::Arc;

use sqlx::SqlitePool;

use super::AuditService;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult, FieldError};
use crate::models::{
    CatalogItem, NewTerm, Operation, Page, PageParams, Term, TermFilter, TermItem, TermItemTypeId,
    UpdateTerm,
};
use crate::repositories::{
    Catalog, EmployeeRepository, ReferenceRepository, TermData, TermRepository,
};

const MODULE: &str = "lending";

/// Responsibility terms for items that are not assets: tool kits, uniforms, chips
pub struct TermService {
    db: SqlitePool,
    audit: Arc<AuditService>,
}

impl TermService {
    pub fn new(db: SqlitePool, audit: Arc<AuditService>) -> Self {
        Self { db, audit }
    }

    pub async fn create_term(&self, actor: &AuthUser, data: NewTerm) -> AppResult<Term> {
        let mut errors = Vec::new();

        if !EmployeeRepository::exists(&self.db, data.employee_id).await? {
            errors.push(FieldError::new(
                "employeeId",
                format!("Colaborador não existe. {}", data.employee_id),
            ));
        }
        if let Some(workload_id) = data.workload_id {
            if !ReferenceRepository::catalog_exists(&self.db, Catalog::Workload, workload_id).await? {
                errors.push(FieldError::new(
                    "workloadId",
                    format!("Lotação não existe. {}", workload_id),
                ));
            }
        }
        if !ReferenceRepository::cost_center_exists(&self.db, data.cost_center_id).await? {
            errors.push(FieldError::new(
                "costCenterId",
                format!("Centro de Custo não existe. {}", data.cost_center_id),
            ));
        }
        let item = match TermItemTypeId::from_id(data.type_id) {
            Some(item_type) => term_item(item_type, &data, &mut errors),
            None => {
                errors.push(FieldError::new(
                    "typeId",
                    format!("Tipo de Termo não existe. {}", data.type_id),
                ));
                TermItem::default()
            }
        };
        AppError::check(errors)?;

        let mut tx = self.db.begin().await?;
        let id = TermRepository::create_with_executor(
            &mut *tx,
            &TermData {
                employee_id: data.employee_id,
                type_id: data.type_id,
                workload_id: data.workload_id,
                cost_center_id: data.cost_center_id,
                manager: data.manager,
                business_executive: data.business_executive,
                project: data.project,
                location: data.location,
                observations: data.observations,
                glpi_number: data.glpi_number,
            },
        )
        .await?;
        TermRepository::create_item(&mut *tx, id, &item).await?;
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, "term", Operation::Create, Some(id))
            .await;
        tracing::info!("Created term {} for employee {}", id, data.employee_id);

        self.get_term(id).await
    }

    /// Only observations and the GLPI ticket change after creation.
    pub async fn update_term(&self, actor: &AuthUser, id: i64, data: UpdateTerm) -> AppResult<Term> {
        self.get_term(id).await?;
        TermRepository::update(
            &self.db,
            id,
            data.observations.as_deref(),
            data.glpi_number.as_deref(),
        )
        .await?;

        self.audit
            .record(Some(actor.id()), MODULE, "term", Operation::Update, Some(id))
            .await;
        self.get_term(id).await
    }

    pub async fn get_term(&self, id: i64) -> AppResult<Term> {
        TermRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("termId", "Termo de Responsabilidade não encontrado"))
    }

    pub async fn list_terms(&self, filter: &TermFilter, page: PageParams) -> AppResult<Page<Term>> {
        page.validate()?;
        let (items, total) = TermRepository::list(&self.db, filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn list_statuses(&self, search: Option<&str>) -> AppResult<Vec<CatalogItem>> {
        Ok(ReferenceRepository::list_catalog(&self.db, Catalog::TermStatus, search).await?)
    }

    pub async fn list_item_types(&self, search: Option<&str>) -> AppResult<Vec<CatalogItem>> {
        Ok(ReferenceRepository::list_catalog(&self.db, Catalog::TermItemType, search).await?)
    }
}

/// The item row for a term type, pushing an error per missing field
fn term_item(item_type: TermItemTypeId, data: &NewTerm, errors: &mut Vec<FieldError>) -> TermItem {
    let description = data
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    if description.is_none() {
        errors.push(FieldError::new("description", "Descrição é obrigatória"));
    }

    match item_type {
        TermItemTypeId::ToolKit => TermItem {
            description,
            ..Default::default()
        },
        TermItemTypeId::Uniform => {
            if data.size.is_none() {
                errors.push(FieldError::new("size", "Tamanho é obrigatório"));
            }
            match data.quantity {
                Some(quantity) if quantity > 0 => {}
                _ => errors.push(FieldError::new("quantity", "Quantidade deve ser maior que zero")),
            }
            if data.value.is_some_and(|value| value < 0.0) {
                errors.push(FieldError::new("value", "Valor não pode ser negativo"));
            }
            TermItem {
                description,
                size: data.size.map(|size| size.as_str().to_string()),
                quantity: data.quantity,
                value: data.value,
                ..Default::default()
            }
        }
        TermItemTypeId::Chip => {
            let line_number = data
                .line_number
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string);
            if line_number.is_none() {
                errors.push(FieldError::new("lineNumber", "Linha é obrigatória"));
            }
            TermItem {
                description,
                line_number,
                operator: data.operator.clone(),
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemSize;
    use crate::testing::{test_pool, Fixtures};

    async fn setup() -> (TermService, SqlitePool, AuthUser) {
        let pool = test_pool().await;
        let audit = Arc::new(AuditService::new(pool.clone()));
        let actor = Fixtures::staff(&pool).await;
        (TermService::new(pool.clone(), audit), pool, actor)
    }

    #[tokio::test]
    async fn test_create_uniform_term() {
        let (service, pool, actor) = setup().await;
        let employee = Fixtures::employee(&pool, "000600", "Joana Alves").await;
        let cost_center = Fixtures::cost_center(&pool, "6.00").await;

        let term = service
            .create_term(
                &actor,
                NewTerm {
                    employee_id: employee,
                    type_id: 2,
                    workload_id: Some(2),
                    cost_center_id: cost_center,
                    description: Some("Camisa polo".into()),
                    size: Some(ItemSize::G),
                    quantity: Some(2),
                    value: Some(59.9),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(term.item_type.name, "Fardamento");
        assert!(term.status.is_none());
        assert_eq!(term.item.size.as_deref(), Some("G"));
        assert_eq!(term.item.quantity, Some(2));
        assert_eq!(term.employee.full_name, "Joana Alves");

        let updated = service
            .update_term(
                &actor,
                term.id,
                UpdateTerm {
                    glpi_number: Some("GLPI-77".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.glpi_number.as_deref(), Some("GLPI-77"));

        let page = service
            .list_terms(
                &TermFilter {
                    search: Some("polo".into()),
                    ..Default::default()
                },
                PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_item_fields_follow_type() {
        let (service, pool, actor) = setup().await;
        let employee = Fixtures::employee(&pool, "000610", "Caio Nunes").await;
        let cost_center = Fixtures::cost_center(&pool, "6.10").await;

        let err = service
            .create_term(
                &actor,
                NewTerm {
                    employee_id: employee,
                    type_id: 2,
                    cost_center_id: cost_center,
                    description: Some("Calça".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        match err {
            AppError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["size", "quantity"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = service
            .create_term(
                &actor,
                NewTerm {
                    employee_id: 999,
                    type_id: 9,
                    cost_center_id: 999,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        match err {
            AppError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["employeeId", "costCenterId", "typeId"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_catalogues() {
        let (service, _pool, _actor) = setup().await;
        assert_eq!(service.list_statuses(None).await.unwrap().len(), 4);
        let types = service.list_item_types(Some("chip")).await.unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].id, 3);
    }
}
