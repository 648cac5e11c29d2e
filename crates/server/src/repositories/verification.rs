use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::{CatalogItem, NewAnswer, Verification, VerificationAnswer};

const SELECT_VERIFICATION: &str = r#"
    SELECT v.id, v.question, v.step, c.name AS category, t.name AS asset_type
    FROM verifications v
    JOIN asset_types t ON t.id = v.asset_type_id
    LEFT JOIN verification_categories c ON c.id = v.category_id
"#;

pub struct VerificationRepository;

impl VerificationRepository {
    /// Id of the category named `name`, created when missing
    pub async fn category_id<'e, E>(executor: E, name: &str) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO verification_categories (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = excluded.name
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_one(executor)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        asset_type_id: i64,
        category_id: i64,
        question: &str,
        step: &str,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO verifications (asset_type_id, category_id, question, step)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(asset_type_id)
        .bind(category_id)
        .bind(question)
        .bind(step)
        .fetch_one(executor)
        .await
    }

    pub async fn add_option<'e, E>(executor: E, verification_id: i64, name: &str) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT INTO verification_options (verification_id, name) VALUES ($1, $2)")
            .bind(verification_id)
            .bind(name)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Verification>, sqlx::Error> {
        let query = format!("{} WHERE v.id = $1", SELECT_VERIFICATION);
        let row = sqlx::query_as::<_, VerificationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        match row {
            Some(row) => {
                let options = Self::options(pool, row.id).await?;
                Ok(Some(row.into_verification(options)))
            }
            None => Ok(None),
        }
    }

    pub async fn exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM verifications WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    /// Questions of one asset type, newest first
    pub async fn list_by_asset_type(
        pool: &SqlitePool,
        asset_type_id: i64,
    ) -> Result<Vec<Verification>, sqlx::Error> {
        let query = format!(
            "{} WHERE v.asset_type_id = $1 ORDER BY v.id DESC",
            SELECT_VERIFICATION
        );
        let rows = sqlx::query_as::<_, VerificationRow>(&query)
            .bind(asset_type_id)
            .fetch_all(pool)
            .await?;

        let mut verifications = Vec::with_capacity(rows.len());
        for row in rows {
            let options = Self::options(pool, row.id).await?;
            verifications.push(row.into_verification(options));
        }
        Ok(verifications)
    }

    async fn options(pool: &SqlitePool, verification_id: i64) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT name FROM verification_options WHERE verification_id = $1 ORDER BY id")
            .bind(verification_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create_answer<'e, E>(
        executor: E,
        lending_id: i64,
        type_id: i64,
        answer: &NewAnswer,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO verification_answers
                (lending_id, verification_id, type_id, answer, observations, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(lending_id)
        .bind(answer.verification_id)
        .bind(type_id)
        .bind(&answer.answer)
        .bind(&answer.observations)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    /// Answers given for a lending, newest first
    pub async fn answers(
        pool: &SqlitePool,
        lending_id: i64,
    ) -> Result<Vec<VerificationAnswer>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT
                va.id, va.lending_id, va.verification_id, va.answer, va.observations,
                va.created_at, vt.id AS type_id, vt.name AS type_name
            FROM verification_answers va
            JOIN verification_types vt ON vt.id = va.type_id
            WHERE va.lending_id = $1
            ORDER BY va.id DESC
            "#,
        )
        .bind(lending_id)
        .fetch_all(pool)
        .await?;

        let mut answers = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(verification) = Self::get_by_id(pool, row.verification_id).await? else {
                continue;
            };
            answers.push(VerificationAnswer {
                id: row.id,
                lending_id: row.lending_id,
                verification,
                answer_type: CatalogItem {
                    id: row.type_id,
                    name: row.type_name,
                },
                answer: row.answer,
                observations: row.observations,
                created_at: row.created_at,
            });
        }
        Ok(answers)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VerificationRow {
    id: i64,
    question: String,
    step: String,
    category: Option<String>,
    asset_type: String,
}

impl VerificationRow {
    fn into_verification(self, options: Vec<String>) -> Verification {
        Verification {
            id: self.id,
            question: self.question,
            step: self.step,
            category: self.category,
            asset_type: self.asset_type,
            options,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnswerRow {
    id: i64,
    lending_id: i64,
    verification_id: i64,
    answer: String,
    observations: Option<String>,
    created_at: DateTime<Utc>,
    type_id: i64,
    type_name: String,
}
