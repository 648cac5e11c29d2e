use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::{Document, DocumentTypeId, PageParams};

const SELECT_DOCUMENT: &str = r#"
    SELECT d.id, t.name AS doc_type, d.path, d.file_name, d.created_at
    FROM documents d
    JOIN document_types t ON t.id = d.doc_type_id
"#;

/// Everything printed on a lending contract or its termination
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct ContractContext {
    pub lending_id: i64,
    pub asset_id: i64,
    pub status_id: i64,
    pub number: Option<String>,
    pub document_id: Option<i64>,
    pub document_revoke_id: Option<i64>,
    pub glpi_number: Option<String>,
    pub manager: Option<String>,
    pub business_executive: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub bu: Option<String>,
    pub ms_office: bool,
    pub workload: Option<String>,
    pub cost_center: String,
    #[sqlx(flatten)]
    pub employee: SignerContext,
    pub asset_type: Option<String>,
    pub asset_acronym: Option<String>,
    pub register_number: Option<String>,
    pub serial_number: Option<String>,
    pub description: Option<String>,
    pub accessories: Option<String>,
    pub pattern: Option<String>,
    pub operational_system: Option<String>,
    pub line_number: Option<String>,
    pub operator: Option<String>,
    pub imei: Option<String>,
}

/// Personal data of the employee signing a document
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct SignerContext {
    pub full_name: String,
    pub taxpayer_identification: String,
    pub national_identification: Option<String>,
    pub address: Option<String>,
    pub nationality: Option<String>,
    pub role: Option<String>,
    pub marital_status: Option<String>,
    pub employer_name: Option<String>,
    pub employer_address: Option<String>,
    pub employer_number: Option<String>,
    pub employer_contract_object: Option<String>,
    pub employer_contract_date: Option<NaiveDate>,
}

/// Name and CPF of a witness
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WitnessSigner {
    pub full_name: String,
    pub taxpayer_identification: String,
}

pub struct DocumentRepository;

impl DocumentRepository {
    /// Sequence printed on the next generated document
    pub async fn next_sequence<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM documents")
            .fetch_one(executor)
            .await
    }

    pub async fn create<'e, E>(
        executor: E,
        doc_type: DocumentTypeId,
        path: &str,
        file_name: &str,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO documents (doc_type_id, path, file_name, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(doc_type.id())
        .bind(path)
        .bind(file_name)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    /// Hide a replaced document from listings. The file is kept.
    pub async fn mark_deleted<'e, E>(executor: E, id: i64) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE documents SET deleted = 1 WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Document>, sqlx::Error> {
        let query = format!("{} WHERE d.id = $1", SELECT_DOCUMENT);
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Live documents, newest first
    pub async fn list(
        pool: &SqlitePool,
        doc_type: Option<&str>,
        page: PageParams,
    ) -> Result<(Vec<Document>, i64), sqlx::Error> {
        let query = format!(
            "{} WHERE d.deleted = 0 AND ($1 IS NULL OR t.name = $1) ORDER BY d.id DESC LIMIT $2 OFFSET $3",
            SELECT_DOCUMENT
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(doc_type)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let total = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM documents d
            JOIN document_types t ON t.id = d.doc_type_id
            WHERE d.deleted = 0 AND ($1 IS NULL OR t.name = $1)"#,
        )
        .bind(doc_type)
        .fetch_one(pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    pub async fn contract_context(
        pool: &SqlitePool,
        lending_id: i64,
    ) -> Result<Option<ContractContext>, sqlx::Error> {
        sqlx::query_as::<_, ContractContext>(
            r#"
            SELECT
                l.id AS lending_id, l.asset_id, l.status_id, l.number, l.document_id,
                l.document_revoke_id, l.glpi_number, l.manager, l.business_executive,
                l.project, l.location, l.bu, l.ms_office,
                w.name AS workload, c.code AS cost_center,
                e.full_name, e.taxpayer_identification, e.national_identification, e.address,
                n.description AS nationality, r.name AS role,
                m.description AS marital_status, e.employer_name, e.employer_address,
                e.employer_number, e.employer_contract_object, e.employer_contract_date,
                t.name AS asset_type, t.acronym AS asset_acronym,
                a.register_number, a.serial_number, a.description, a.accessories, a.pattern,
                a.operational_system, a.line_number, a.operator, a.imei
            FROM lendings l
            JOIN employees e ON e.id = l.employee_id
            JOIN assets a ON a.id = l.asset_id
            JOIN cost_centers c ON c.id = l.cost_center_id
            LEFT JOIN workloads w ON w.id = l.workload_id
            LEFT JOIN asset_types t ON t.id = a.type_id
            LEFT JOIN nationalities n ON n.id = e.nationality_id
            LEFT JOIN roles r ON r.id = e.role_id
            LEFT JOIN marital_statuses m ON m.id = e.marital_status_id
            WHERE l.id = $1 AND l.deleted = 0
            "#,
        )
        .bind(lending_id)
        .fetch_optional(pool)
        .await
    }

    /// Witnesses attached to a lending, oldest first
    pub async fn witness_signers(
        pool: &SqlitePool,
        lending_id: i64,
    ) -> Result<Vec<WitnessSigner>, sqlx::Error> {
        sqlx::query_as::<_, WitnessSigner>(
            r#"
            SELECT e.full_name, e.taxpayer_identification
            FROM witnesses wt
            JOIN employees e ON e.id = wt.employee_id
            WHERE wt.lending_id = $1
            ORDER BY wt.id
            "#,
        )
        .bind(lending_id)
        .fetch_all(pool)
        .await
    }

    pub async fn employee_signers(
        pool: &SqlitePool,
        employee_ids: &[i64],
    ) -> Result<Vec<(i64, WitnessSigner)>, sqlx::Error> {
        let mut found = Vec::with_capacity(employee_ids.len());
        for id in employee_ids {
            let signer = sqlx::query_as::<_, WitnessSigner>(
                "SELECT full_name, taxpayer_identification FROM employees WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(pool)
            .await?;
            if let Some(signer) = signer {
                found.push((*id, signer));
            }
        }
        Ok(found)
    }

    /// Link a generated contract and move the lending to `status_id`.
    pub async fn set_lending_contract<'e, E>(
        executor: E,
        lending_id: i64,
        document_id: i64,
        number: &str,
        status_id: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE lendings SET document_id = $1, number = $2, status_id = $3, updated_at = $4
            WHERE id = $5"#,
        )
        .bind(document_id)
        .bind(number)
        .bind(status_id)
        .bind(Utc::now())
        .bind(lending_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Link the signed contract, stamping the signature date.
    pub async fn sign_lending<'e, E>(
        executor: E,
        lending_id: i64,
        document_id: i64,
        status_id: i64,
        signed_date: NaiveDate,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE lendings SET document_id = $1, status_id = $2, signed_date = $3, updated_at = $4
            WHERE id = $5"#,
        )
        .bind(document_id)
        .bind(status_id)
        .bind(signed_date)
        .bind(Utc::now())
        .bind(lending_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Link a termination document. `signed_date` is set once it comes back signed.
    pub async fn set_lending_revoke<'e, E>(
        executor: E,
        lending_id: i64,
        document_id: i64,
        status_id: i64,
        signed_date: Option<NaiveDate>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE lendings SET
                document_revoke_id = $1, status_id = $2,
                revoke_signed_date = COALESCE($3, revoke_signed_date), updated_at = $4
            WHERE id = $5"#,
        )
        .bind(document_id)
        .bind(status_id)
        .bind(signed_date)
        .bind(Utc::now())
        .bind(lending_id)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: i64,
    doc_type: String,
    path: Option<String>,
    file_name: String,
    created_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            doc_type: row.doc_type,
            path: row.path,
            file_name: row.file_name,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_pool;

    #[tokio::test]
    async fn test_list_hides_deleted_and_filters_type() {
        let pool = test_pool().await;
        assert_eq!(DocumentRepository::next_sequence(&pool).await.unwrap(), 1);

        let contract =
            DocumentRepository::create(&pool, DocumentTypeId::Contract, "/tmp/a", "NTB00001.pdf")
                .await
                .unwrap();
        DocumentRepository::create(&pool, DocumentTypeId::Term, "/tmp/b", "00002.pdf")
            .await
            .unwrap();
        assert_eq!(DocumentRepository::next_sequence(&pool).await.unwrap(), 3);

        let (all, total) = DocumentRepository::list(&pool, None, PageParams::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all[0].file_name, "00002.pdf");

        let (contracts, _) =
            DocumentRepository::list(&pool, Some("Contrato de Comodato"), PageParams::default())
                .await
                .unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].doc_type, "Contrato de Comodato");

        DocumentRepository::mark_deleted(&pool, contract).await.unwrap();
        let (_, total) = DocumentRepository::list(&pool, None, PageParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert!(DocumentRepository::get_by_id(&pool, contract)
            .await
            .unwrap()
            .is_some());
    }
}
