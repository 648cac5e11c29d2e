use std::sync::Arc;

use rand::seq::SliceRandom;
use sqlx::SqlitePool;

use super::AuditService;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult, FieldError};
use crate::models::{
    padded_sequence, parse_ids, CostCenter, Employee, EmployeeFilter, EmployeeSelect,
    EmployeeSelectParams, LendingHistory, NewEmployee, Operation, Page, PageParams, Reference,
    ReferenceTable, Role, UpdateEmployee,
};
use crate::repositories::{EmployeeData, EmployeeRepository, LendingRepository, ReferenceRepository};

const ACTIVE_STATUS: &str = "Ativo";

/// Employees and the people reference tables
pub struct PeopleService {
    db: SqlitePool,
    audit: Arc<AuditService>,
}

impl PeopleService {
    pub fn new(db: SqlitePool, audit: Arc<AuditService>) -> Self {
        Self { db, audit }
    }

    pub async fn create_employee(&self, actor: &AuthUser, data: NewEmployee) -> AppResult<Employee> {
        let mut errors = Vec::new();
        if data.code.trim().is_empty() {
            errors.push(FieldError::new("code", "Código é obrigatório"));
        }
        if data.full_name.trim().is_empty() {
            errors.push(FieldError::new("fullName", "Nome é obrigatório"));
        }
        if let Some(existing) = EmployeeRepository::get_by_code_or_taxpayer(
            &self.db,
            &data.code,
            &data.taxpayer_identification,
        )
        .await?
        {
            if existing.code == data.code {
                errors.push(FieldError::new("code", "Colaborador já existe"));
            }
            if existing.taxpayer_identification == data.taxpayer_identification {
                errors.push(FieldError::new("taxpayerIdentification", "Colaborador já existe"));
            }
        }
        AppError::check(errors)?;

        self.check_references(
            data.role_id,
            data.nationality_id,
            data.marital_status_id,
            data.gender_id,
            data.educational_level_id,
        )
        .await?;

        let registration = generate_registration(
            &data.full_name,
            EmployeeRepository::next_id(&self.db).await?,
        );

        let id = EmployeeRepository::create_with_executor(
            &self.db,
            &EmployeeData {
                code: data.code,
                full_name: data.full_name,
                taxpayer_identification: data.taxpayer_identification,
                national_identification: data.national_identification,
                job_position: data.job_position,
                status: ACTIVE_STATUS.to_string(),
                address: data.address,
                cell_phone: data.cell_phone,
                email: data.email,
                birthday: data.birthday,
                manager: data.manager,
                admission_date: data.admission_date,
                registration: Some(registration),
                legal_person: true,
                role_id: data.role_id,
                nationality_id: data.nationality_id,
                marital_status_id: data.marital_status_id,
                gender_id: data.gender_id,
                educational_level_id: data.educational_level_id,
                employer_name: data.employer_name,
                employer_address: data.employer_address,
                employer_number: data.employer_number,
                employer_contract_object: data.employer_contract_object,
                employer_contract_date: data.employer_contract_date,
                employer_end_contract_date: data.employer_end_contract_date,
            },
        )
        .await?;

        self.audit
            .record(Some(actor.id()), "people", "employee", Operation::Create, Some(id))
            .await;
        tracing::info!("Created employee {}", id);

        self.get_employee(id).await
    }

    /// Only locally created (legal person) employees are editable.
    pub async fn update_employee(
        &self,
        actor: &AuthUser,
        id: i64,
        data: UpdateEmployee,
    ) -> AppResult<Employee> {
        let employee = self.get_employee(id).await?;
        if !employee.legal_person {
            return Err(AppError::bad_request("Este colaborador não pode ser editado."));
        }

        self.check_references(
            data.role_id,
            data.nationality_id,
            data.marital_status_id,
            data.gender_id,
            data.educational_level_id,
        )
        .await?;

        let mut stored = EmployeeData::from(&employee);
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if data.$field.is_some() { stored.$field = data.$field; })*
            };
        }
        apply!(
            national_identification,
            job_position,
            address,
            cell_phone,
            email,
            birthday,
            manager,
            admission_date,
            role_id,
            nationality_id,
            marital_status_id,
            gender_id,
            educational_level_id,
            employer_name,
            employer_address,
            employer_number,
            employer_contract_object,
            employer_contract_date,
            employer_end_contract_date,
        );
        if let Some(full_name) = data.full_name {
            stored.full_name = full_name;
        }
        if let Some(status) = data.status {
            stored.status = status;
        }

        EmployeeRepository::update_with_executor(&self.db, id, &stored).await?;
        self.audit
            .record(Some(actor.id()), "people", "employee", Operation::Update, Some(id))
            .await;

        self.get_employee(id).await
    }

    pub async fn get_employee(&self, id: i64) -> AppResult<Employee> {
        EmployeeRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("employeeId", "Colaborador não encontrado"))
    }

    pub async fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: PageParams,
    ) -> AppResult<Page<Employee>> {
        page.validate()?;
        let (items, total) = EmployeeRepository::list(&self.db, filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn employees_select(&self, params: &EmployeeSelectParams) -> AppResult<Vec<EmployeeSelect>> {
        let ids = parse_ids(params.ids.as_deref());
        Ok(EmployeeRepository::select(&self.db, &ids, params.search.as_deref()).await?)
    }

    pub async fn lending_history(&self, id: i64) -> AppResult<Vec<LendingHistory>> {
        self.get_employee(id).await?;
        Ok(LendingRepository::history(&self.db, None, Some(id)).await?)
    }

    pub async fn list_references(
        &self,
        table: ReferenceTable,
        search: Option<&str>,
    ) -> AppResult<Vec<Reference>> {
        Ok(ReferenceRepository::list(&self.db, table, search).await?)
    }

    pub async fn list_cost_centers(&self, search: Option<&str>) -> AppResult<Vec<CostCenter>> {
        Ok(ReferenceRepository::list_cost_centers(&self.db, search).await?)
    }

    pub async fn list_roles(&self, search: Option<&str>) -> AppResult<Vec<Role>> {
        Ok(ReferenceRepository::list_roles(&self.db, search).await?)
    }

    async fn check_references(
        &self,
        role_id: Option<i64>,
        nationality_id: Option<i64>,
        marital_status_id: Option<i64>,
        gender_id: Option<i64>,
        educational_level_id: Option<i64>,
    ) -> AppResult<()> {
        let mut errors = Vec::new();

        if let Some(id) = role_id {
            if !ReferenceRepository::role_exists(&self.db, id).await? {
                errors.push(FieldError::new("roleId", "Cargo não encontrado"));
            }
        }

        let references = [
            (nationality_id, ReferenceTable::Nationality, "nationalityId", "Nacionalidade não encontrada"),
            (marital_status_id, ReferenceTable::MaritalStatus, "maritalStatusId", "Estado civil não encontrado"),
            (gender_id, ReferenceTable::Gender, "genderId", "Gênero não encontrado"),
            (educational_level_id, ReferenceTable::EducationalLevel, "educationalLevelId", "Nível educacional não encontrado"),
        ];
        for (id, table, field, message) in references {
            if let Some(id) = id {
                if !ReferenceRepository::exists(&self.db, table, id).await? {
                    errors.push(FieldError::new(field, message));
                }
            }
        }

        AppError::check(errors)
    }
}

/// Three random letters of the name followed by the padded next id.
fn generate_registration(full_name: &str, next_id: i64) -> String {
    let letters: Vec<char> = full_name.chars().filter(|c| !c.is_whitespace()).collect();
    let mut rng = rand::thread_rng();
    let prefix: String = (0..3)
        .filter_map(|_| letters.choose(&mut rng))
        .collect();
    format!("{}{}", prefix, padded_sequence(next_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_pool, Fixtures};

    async fn service() -> (PeopleService, SqlitePool, AuthUser) {
        let pool = test_pool().await;
        let audit = Arc::new(AuditService::new(pool.clone()));
        let actor = Fixtures::staff(&pool).await;
        (PeopleService::new(pool.clone(), audit), pool, actor)
    }

    fn new_employee(code: &str, taxpayer: &str) -> NewEmployee {
        NewEmployee {
            code: code.into(),
            full_name: "Bruna Costa".into(),
            taxpayer_identification: taxpayer.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_registration() {
        let registration = generate_registration("Ana Lu", 12);
        assert_eq!(registration.len(), 3 + 14);
        assert!(registration[..3].chars().all(|c| "AnaLu".contains(c)));
        assert!(registration.ends_with("00000000000012"));
    }

    #[tokio::test]
    async fn test_create_employee() {
        let (service, _pool, actor) = service().await;
        let employee = service
            .create_employee(&actor, new_employee("C001", "111.111.111-11"))
            .await
            .unwrap();

        assert!(employee.legal_person);
        assert_eq!(employee.status, "Ativo");
        assert!(employee.registration.is_some());

        let duplicate = service
            .create_employee(&actor, new_employee("C001", "111.111.111-11"))
            .await;
        match duplicate {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().all(|e| e.error == "Colaborador já existe"));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let mut bad_refs = new_employee("C002", "222");
        bad_refs.gender_id = Some(42);
        assert!(matches!(
            service.create_employee(&actor, bad_refs).await,
            Err(AppError::Validation(errors)) if errors[0].field == "genderId"
        ));
    }

    #[tokio::test]
    async fn test_update_only_legal_person() {
        let (service, pool, actor) = service().await;
        let erp_employee = Fixtures::employee(&pool, "000400", "Erp Person").await;

        let err = service
            .update_employee(&actor, erp_employee, UpdateEmployee::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let local = service
            .create_employee(&actor, new_employee("C010", "333"))
            .await
            .unwrap();
        let updated = service
            .update_employee(
                &actor,
                local.id,
                UpdateEmployee {
                    job_position: Some("Analista".into()),
                    status: Some("Desligado".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.job_position.as_deref(), Some("Analista"));
        assert_eq!(updated.status, "Desligado");
        assert_eq!(updated.full_name, "Bruna Costa");
    }

    #[tokio::test]
    async fn test_get_missing_employee() {
        let (service, _pool, _actor) = service().await;
        match service.get_employee(404).await {
            Err(AppError::NotFound(e)) => {
                assert_eq!(e.field, "employeeId");
                assert_eq!(e.error, "Colaborador não encontrado");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
