use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;

use super::storage::{discard_file, store_file};
use super::AuditService;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult, FieldError};
use crate::models::{
    Invoice, InvoiceFile, InvoiceFilter, NewInvoice, Operation, Page, PageParams, UpdateInvoice,
};
use crate::repositories::{AssetRepository, InvoiceRepository};

const MODULE: &str = "invoice";

/// Invoices, their uploaded documents and the assets they cover
pub struct InvoiceService {
    db: SqlitePool,
    audit: Arc<AuditService>,
    storage_dir: PathBuf,
}

impl InvoiceService {
    /// `storage_dir` is the directory invoice documents are written to.
    pub fn new(db: SqlitePool, audit: Arc<AuditService>, storage_dir: PathBuf) -> Self {
        Self {
            db,
            audit,
            storage_dir,
        }
    }

    pub async fn create_invoice(&self, actor: &AuthUser, data: NewInvoice) -> AppResult<Invoice> {
        let number = data.number.trim().to_string();
        let mut errors = Vec::new();
        if number.is_empty() {
            errors.push(FieldError::new("number", "Número é obrigatório"));
        } else if InvoiceRepository::number_taken(&self.db, &number, None).await? {
            errors.push(FieldError::new("number", "Nota Fiscal já existe"));
        }
        self.check_assets(&data.assets, &mut errors).await?;
        AppError::check(errors)?;

        let mut tx = self.db.begin().await?;
        let id = InvoiceRepository::create_with_executor(&mut *tx, &number, None, None).await?;
        InvoiceRepository::set_assets(&mut *tx, id, &data.assets).await?;

        // The document is written only once the row exists, and removed
        // again if the row is never committed.
        let stored = match &data.file {
            Some(file) => {
                let path = store_file(&self.storage_dir, &file.file_name, &file.bytes).await?;
                let saved = InvoiceRepository::set_file(
                    &mut *tx,
                    id,
                    &file.file_name,
                    &path.to_string_lossy(),
                )
                .await;
                if let Err(e) = saved {
                    discard_file(&path).await;
                    return Err(e.into());
                }
                Some(path)
            }
            None => None,
        };
        if let Err(e) = tx.commit().await {
            if let Some(path) = &stored {
                discard_file(path).await;
            }
            return Err(e.into());
        }

        self.audit
            .record(Some(actor.id()), MODULE, "invoice", Operation::Create, Some(id))
            .await;
        tracing::info!("Created invoice {} ({})", id, number);

        self.get_invoice(id).await
    }

    pub async fn update_invoice(
        &self,
        actor: &AuthUser,
        id: i64,
        data: UpdateInvoice,
    ) -> AppResult<Invoice> {
        self.get_invoice(id).await?;

        let number = data.number.as_deref().map(str::trim);
        let mut errors = Vec::new();
        match number {
            Some("") => errors.push(FieldError::new("number", "Número é obrigatório")),
            Some(number) => {
                if InvoiceRepository::number_taken(&self.db, number, Some(id)).await? {
                    errors.push(FieldError::new("number", "Nota Fiscal já existe"));
                }
            }
            None => {}
        }
        if let Some(assets) = &data.assets {
            self.check_assets(assets, &mut errors).await?;
        }
        AppError::check(errors)?;

        let mut tx = self.db.begin().await?;
        if let Some(number) = number {
            InvoiceRepository::set_number(&mut *tx, id, number).await?;
        }
        if let Some(assets) = &data.assets {
            InvoiceRepository::set_assets(&mut *tx, id, assets).await?;
        }
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, "invoice", Operation::Update, Some(id))
            .await;

        self.get_invoice(id).await
    }

    pub async fn delete_invoice(&self, actor: &AuthUser, id: i64) -> AppResult<()> {
        self.get_invoice(id).await?;

        let mut tx = self.db.begin().await?;
        InvoiceRepository::unlink_assets(&mut *tx, id).await?;
        InvoiceRepository::soft_delete(&mut *tx, id).await?;
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, "invoice", Operation::Delete, Some(id))
            .await;
        tracing::info!("Deleted invoice {}", id);
        Ok(())
    }

    pub async fn get_invoice(&self, id: i64) -> AppResult<Invoice> {
        InvoiceRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("invoiceId", "Nota Fiscal não encontrada"))
    }

    pub async fn list_invoices(
        &self,
        filter: &InvoiceFilter,
        page: PageParams,
    ) -> AppResult<Page<Invoice>> {
        page.validate()?;
        let (items, total) =
            InvoiceRepository::list(&self.db, filter.search.as_deref(), page).await?;
        Ok(Page::new(items, total, page))
    }

    async fn check_assets(&self, ids: &[i64], errors: &mut Vec<FieldError>) -> AppResult<()> {
        for id in ids {
            if AssetRepository::get_short(&self.db, *id).await?.is_none() {
                errors.push(FieldError::new("assets", format!("Ativo não existe. {}", id)));
            }
        }
        Ok(())
    }
}
