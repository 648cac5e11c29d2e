use std::sync::Arc;

use sqlx::SqlitePool;

use super::AuditService;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult, FieldError};
use crate::models::{
    NewVerification, NewVerificationAnswers, Operation, Verification, VerificationAnswer,
};
use crate::repositories::{
    Catalog, LendingRepository, ReferenceRepository, VerificationRepository,
};

const MODULE: &str = "asset";

/// Checklists answered when an asset is handed over and returned
pub struct VerificationService {
    db: SqlitePool,
    audit: Arc<AuditService>,
}

impl VerificationService {
    pub fn new(db: SqlitePool, audit: Arc<AuditService>) -> Self {
        Self { db, audit }
    }

    pub async fn create_verification(
        &self,
        actor: &AuthUser,
        data: NewVerification,
    ) -> AppResult<Verification> {
        if !ReferenceRepository::asset_type_exists(&self.db, data.asset_type_id).await? {
            return Err(AppError::not_found("assetTypeId", "Tipo do Ativo não encontrado."));
        }
        let mut errors = Vec::new();
        if data.question.trim().is_empty() {
            errors.push(FieldError::new("question", "Pergunta é obrigatória"));
        }
        if data.category.trim().is_empty() {
            errors.push(FieldError::new("category", "Categoria é obrigatória"));
        }
        AppError::check(errors)?;

        let mut tx = self.db.begin().await?;
        let category_id = VerificationRepository::category_id(&mut *tx, data.category.trim()).await?;
        let id = VerificationRepository::create(
            &mut *tx,
            data.asset_type_id,
            category_id,
            data.question.trim(),
            data.step.trim(),
        )
        .await?;
        for option in data.options.iter().map(|o| o.trim()).filter(|o| !o.is_empty()) {
            VerificationRepository::add_option(&mut *tx, id, option).await?;
        }
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, "verification", Operation::Create, Some(id))
            .await;

        VerificationRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(verification_not_found)
    }

    pub async fn list_by_asset_type(&self, asset_type_id: i64) -> AppResult<Vec<Verification>> {
        if !ReferenceRepository::asset_type_exists(&self.db, asset_type_id).await? {
            return Err(AppError::not_found("assetTypeId", "Tipo do Ativo não encontrado."));
        }
        Ok(VerificationRepository::list_by_asset_type(&self.db, asset_type_id).await?)
    }

    /// Record a whole checklist at once. Nothing is stored when one answer is invalid.
    pub async fn create_answers(
        &self,
        actor: &AuthUser,
        data: NewVerificationAnswers,
    ) -> AppResult<Vec<VerificationAnswer>> {
        if LendingRepository::get_data(&self.db, data.lending_id).await?.is_none() {
            return Err(AppError::not_found("lendingId", "Comodato não encontrado"));
        }
        if !ReferenceRepository::catalog_exists(&self.db, Catalog::VerificationType, data.type_id)
            .await?
        {
            return Err(AppError::not_found(
                "verificationTypeId",
                "Tipo do Verificação não encontrado.",
            ));
        }
        for answer in &data.answered {
            if !VerificationRepository::exists(&self.db, answer.verification_id).await? {
                return Err(verification_not_found());
            }
        }

        let mut tx = self.db.begin().await?;
        for answer in &data.answered {
            VerificationRepository::create_answer(&mut *tx, data.lending_id, data.type_id, answer)
                .await?;
        }
        tx.commit().await?;

        self.audit
            .record(
                Some(actor.id()),
                MODULE,
                "verification",
                Operation::Create,
                Some(data.lending_id),
            )
            .await;
        tracing::info!(
            "Recorded {} checklist answers for lending {}",
            data.answered.len(),
            data.lending_id
        );

        self.list_answers(data.lending_id).await
    }

    pub async fn list_answers(&self, lending_id: i64) -> AppResult<Vec<VerificationAnswer>> {
        Ok(VerificationRepository::answers(&self.db, lending_id).await?)
    }
}

fn verification_not_found() -> AppError {
    AppError::not_found("verificationId", "Pergunta de Verificação não encontrada.")
}
