mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono_tz::Tz;
use sqlx::SqlitePool;

use super::storage::{discard_file, store_file};
use super::AuditService;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::{
    document_code, today, AssetStatusId, Document, DocumentFilter, DocumentTypeId,
    LendingStatusId, NewContractDocument, NewRevokeContractDocument, NewTermDocument, Operation,
    Page, PageParams, SignedUpload, TermStatusId, DEFAULT_DATE_FORMAT,
};
use crate::repositories::{
    AssetRepository, ContractContext, DocumentRepository, TermContext, TermRepository,
    VerificationRepository, WitnessRepository,
};

const MODULE: &str = "lending";

/// Generated contracts, terms and checklists, and the signed scans that
/// move lendings and terms through their statuses.
pub struct DocumentService {
    db: SqlitePool,
    audit: Arc<AuditService>,
    timezone: Tz,
    contracts_dir: PathBuf,
    terms_dir: PathBuf,
}

impl DocumentService {
    pub fn new(
        db: SqlitePool,
        audit: Arc<AuditService>,
        timezone: Tz,
        contracts_dir: PathBuf,
        terms_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            audit,
            timezone,
            contracts_dir,
            terms_dir,
        }
    }

    /// Generate the contract of a lending. The lending waits for the signed
    /// scan afterwards.
    pub async fn create_contract(
        &self,
        actor: &AuthUser,
        data: NewContractDocument,
    ) -> AppResult<Document> {
        let ctx = self.contract_context(data.lending_id).await?;
        let witnesses = DocumentRepository::witness_signers(&self.db, ctx.lending_id).await?;
        if witnesses.len() < 2 {
            return Err(AppError::field(
                "lendingId",
                "Comodato precisa de duas testemunhas",
            ));
        }

        let sequence = DocumentRepository::next_sequence(&self.db).await?;
        let code = document_code(&contract_prefix(&ctx), sequence);
        let html = render::contract(&ctx, &witnesses, &code, &self.today(), data.legal_person, false);
        let file_name = format!("{}.html", code);

        let stored = store_file(&self.contracts_dir, &file_name, html.as_bytes()).await?;
        let result = async {
            let mut tx = self.db.begin().await?;
            let id = DocumentRepository::create(
                &mut *tx,
                DocumentTypeId::Contract,
                &stored.to_string_lossy(),
                &file_name,
            )
            .await?;
            DocumentRepository::set_lending_contract(
                &mut *tx,
                ctx.lending_id,
                id,
                &code,
                LendingStatusId::PendingFile.id(),
            )
            .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;
        let id = kept_or_discarded(result, &stored).await?;

        self.audit
            .record(Some(actor.id()), MODULE, "document", Operation::Create, Some(id))
            .await;
        tracing::info!("Generated contract {} for lending {}", code, ctx.lending_id);
        self.get_document(id).await
    }

    /// Store the signed contract and activate the lending.
    pub async fn upload_contract(&self, actor: &AuthUser, upload: SignedUpload) -> AppResult<Document> {
        let ctx = self.contract_context(upload.owner_id).await?;
        let Some(number) = ctx.number.clone() else {
            return Err(AppError::bad_request("Comodato sem número"));
        };
        if ctx.status_id == LendingStatusId::PendingRevokeFile.id()
            || ctx.status_id == LendingStatusId::Inactive.id()
        {
            return Err(AppError::bad_request("Comodato já foi distratado"));
        }

        let file_name = format!("{}.pdf", number);
        let signed_date = today(self.timezone);
        let stored = store_file(&self.contracts_dir, &file_name, &upload.bytes).await?;
        let result = async {
            let mut tx = self.db.begin().await?;
            if let Some(previous) = ctx.document_id {
                DocumentRepository::mark_deleted(&mut *tx, previous).await?;
            }
            let id = DocumentRepository::create(
                &mut *tx,
                DocumentTypeId::Contract,
                &stored.to_string_lossy(),
                &file_name,
            )
            .await?;
            DocumentRepository::sign_lending(
                &mut *tx,
                ctx.lending_id,
                id,
                LendingStatusId::Active.id(),
                signed_date,
            )
            .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;
        let id = kept_or_discarded(result, &stored).await?;

        self.audit
            .record(Some(actor.id()), MODULE, "document", Operation::Upload, Some(id))
            .await;
        tracing::info!("Signed contract {} uploaded for lending {}", number, ctx.lending_id);
        self.get_document(id).await
    }

    /// Generate the termination of an active lending, signed by two new witnesses.
    pub async fn create_revoke_contract(
        &self,
        actor: &AuthUser,
        data: NewRevokeContractDocument,
    ) -> AppResult<Document> {
        let ctx = self.contract_context(data.lending_id).await?;
        let Some(number) = ctx.number.clone() else {
            return Err(AppError::bad_request("Comodato sem número"));
        };
        if ctx.status_id != LendingStatusId::Active.id()
            && ctx.status_id != LendingStatusId::PendingRevokeFile.id()
        {
            return Err(AppError::bad_request("Comodato não está ativo"));
        }

        let mut ids = data.witnesses_id.clone();
        ids.dedup();
        let signers = DocumentRepository::employee_signers(&self.db, &ids).await?;
        if ids.len() != 2 || signers.len() != 2 {
            return Err(AppError::field(
                "witnessesId",
                "Informe duas testemunhas válidas",
            ));
        }

        let witnesses: Vec<_> = signers.iter().map(|(_, signer)| signer.clone()).collect();
        let html = render::contract(&ctx, &witnesses, &number, &self.today(), data.legal_person, true);
        let file_name = format!("{} - distrato.html", number);

        let stored = store_file(&self.contracts_dir, &file_name, html.as_bytes()).await?;
        let result = async {
            let mut tx = self.db.begin().await?;
            for (employee_id, _) in &signers {
                WitnessRepository::create_for_lending(&mut *tx, *employee_id, ctx.lending_id).await?;
            }
            if let Some(previous) = ctx.document_revoke_id {
                DocumentRepository::mark_deleted(&mut *tx, previous).await?;
            }
            let id = DocumentRepository::create(
                &mut *tx,
                DocumentTypeId::RevokeContract,
                &stored.to_string_lossy(),
                &file_name,
            )
            .await?;
            DocumentRepository::set_lending_revoke(
                &mut *tx,
                ctx.lending_id,
                id,
                LendingStatusId::PendingRevokeFile.id(),
                None,
            )
            .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;
        let id = kept_or_discarded(result, &stored).await?;

        self.audit
            .record(Some(actor.id()), MODULE, "document", Operation::Create, Some(id))
            .await;
        tracing::info!("Generated termination of contract {}", number);
        self.get_document(id).await
    }

    /// Store the signed termination. The lending ends and its asset is free again.
    pub async fn upload_revoke_contract(
        &self,
        actor: &AuthUser,
        upload: SignedUpload,
    ) -> AppResult<Document> {
        let ctx = self.contract_context(upload.owner_id).await?;
        let (Some(number), Some(previous)) = (ctx.number.clone(), ctx.document_revoke_id) else {
            return Err(AppError::bad_request("Distrato de Comodato não foi gerado"));
        };

        let file_name = format!("{} - distrato.pdf", number);
        let signed_date = today(self.timezone);
        let available = AssetStatusId::Available.id();
        let stored = store_file(&self.contracts_dir, &file_name, &upload.bytes).await?;
        let result = async {
            let mut tx = self.db.begin().await?;
            DocumentRepository::mark_deleted(&mut *tx, previous).await?;
            let id = DocumentRepository::create(
                &mut *tx,
                DocumentTypeId::RevokeContract,
                &stored.to_string_lossy(),
                &file_name,
            )
            .await?;
            DocumentRepository::set_lending_revoke(
                &mut *tx,
                ctx.lending_id,
                id,
                LendingStatusId::Inactive.id(),
                Some(signed_date),
            )
            .await?;
            if ctx.status_id != LendingStatusId::Inactive.id() {
                AssetRepository::set_status(&mut *tx, ctx.asset_id, available).await?;
                AssetRepository::record_status(&mut *tx, ctx.asset_id, available, None).await?;
            }
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;
        let id = kept_or_discarded(result, &stored).await?;

        self.audit
            .record(Some(actor.id()), MODULE, "document", Operation::Upload, Some(id))
            .await;
        tracing::info!("Contract {} terminated, asset {} released", number, ctx.asset_id);
        self.get_document(id).await
    }

    pub async fn create_term_document(
        &self,
        actor: &AuthUser,
        data: NewTermDocument,
    ) -> AppResult<Document> {
        let ctx = self.term_context(data.term_id).await?;
        let sequence = DocumentRepository::next_sequence(&self.db).await?;
        let code = document_code("", sequence);
        let html = render::term(&ctx, &code, &self.today(), false);
        let file_name = format!("{}.html", code);

        let stored = store_file(&self.terms_dir, &file_name, html.as_bytes()).await?;
        let result = async {
            let mut tx = self.db.begin().await?;
            let id = DocumentRepository::create(
                &mut *tx,
                DocumentTypeId::Term,
                &stored.to_string_lossy(),
                &file_name,
            )
            .await?;
            TermRepository::set_document(
                &mut *tx,
                ctx.term_id,
                id,
                &code,
                TermStatusId::PendingFile.id(),
            )
            .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;
        let id = kept_or_discarded(result, &stored).await?;

        self.audit
            .record(Some(actor.id()), MODULE, "term", Operation::Create, Some(id))
            .await;
        tracing::info!("Generated term {} for term {}", code, ctx.term_id);
        self.get_document(id).await
    }

    pub async fn upload_term(&self, actor: &AuthUser, upload: SignedUpload) -> AppResult<Document> {
        let ctx = self.term_context(upload.owner_id).await?;
        let Some(number) = ctx.number.clone() else {
            return Err(AppError::bad_request("Termo sem número"));
        };
        if ctx.status_id == Some(TermStatusId::PendingRevokeFile.id())
            || ctx.status_id == Some(TermStatusId::Revoked.id())
        {
            return Err(AppError::bad_request("Termo já foi distratado"));
        }

        let file_name = format!("{}.pdf", number);
        let signed_date = today(self.timezone);
        let stored = store_file(&self.terms_dir, &file_name, &upload.bytes).await?;
        let result = async {
            let mut tx = self.db.begin().await?;
            if let Some(previous) = ctx.document_id {
                DocumentRepository::mark_deleted(&mut *tx, previous).await?;
            }
            let id = DocumentRepository::create(
                &mut *tx,
                DocumentTypeId::Term,
                &stored.to_string_lossy(),
                &file_name,
            )
            .await?;
            TermRepository::sign(&mut *tx, ctx.term_id, id, TermStatusId::Active.id(), signed_date)
                .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;
        let id = kept_or_discarded(result, &stored).await?;

        self.audit
            .record(Some(actor.id()), MODULE, "term", Operation::Upload, Some(id))
            .await;
        tracing::info!("Signed term {} uploaded", number);
        self.get_document(id).await
    }

    pub async fn create_revoke_term(
        &self,
        actor: &AuthUser,
        data: NewTermDocument,
    ) -> AppResult<Document> {
        let ctx = self.term_context(data.term_id).await?;
        let Some(number) = ctx.number.clone() else {
            return Err(AppError::bad_request("Termo sem número"));
        };
        if ctx.status_id != Some(TermStatusId::Active.id())
            && ctx.status_id != Some(TermStatusId::PendingRevokeFile.id())
        {
            return Err(AppError::bad_request("Termo não está ativo"));
        }

        let html = render::term(&ctx, &number, &self.today(), true);
        let file_name = format!("{} - distrato.html", number);

        let stored = store_file(&self.terms_dir, &file_name, html.as_bytes()).await?;
        let result = async {
            let mut tx = self.db.begin().await?;
            if let Some(previous) = ctx.document_revoke_id {
                DocumentRepository::mark_deleted(&mut *tx, previous).await?;
            }
            let id = DocumentRepository::create(
                &mut *tx,
                DocumentTypeId::RevokeTerm,
                &stored.to_string_lossy(),
                &file_name,
            )
            .await?;
            TermRepository::set_revoke(
                &mut *tx,
                ctx.term_id,
                id,
                TermStatusId::PendingRevokeFile.id(),
                None,
            )
            .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;
        let id = kept_or_discarded(result, &stored).await?;

        self.audit
            .record(Some(actor.id()), MODULE, "term", Operation::Create, Some(id))
            .await;
        tracing::info!("Generated termination of term {}", number);
        self.get_document(id).await
    }

    pub async fn upload_revoke_term(
        &self,
        actor: &AuthUser,
        upload: SignedUpload,
    ) -> AppResult<Document> {
        let ctx = self.term_context(upload.owner_id).await?;
        let (Some(number), Some(previous)) = (ctx.number.clone(), ctx.document_revoke_id) else {
            return Err(AppError::bad_request("Distrato de Termo não foi gerado"));
        };

        let file_name = format!("{} - distrato.pdf", number);
        let signed_date = today(self.timezone);
        let stored = store_file(&self.terms_dir, &file_name, &upload.bytes).await?;
        let result = async {
            let mut tx = self.db.begin().await?;
            DocumentRepository::mark_deleted(&mut *tx, previous).await?;
            let id = DocumentRepository::create(
                &mut *tx,
                DocumentTypeId::RevokeTerm,
                &stored.to_string_lossy(),
                &file_name,
            )
            .await?;
            TermRepository::set_revoke(
                &mut *tx,
                ctx.term_id,
                id,
                TermStatusId::Revoked.id(),
                Some(signed_date),
            )
            .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;
        let id = kept_or_discarded(result, &stored).await?;

        self.audit
            .record(Some(actor.id()), MODULE, "term", Operation::Upload, Some(id))
            .await;
        tracing::info!("Term {} terminated", number);
        self.get_document(id).await
    }

    /// Printable checklist with every answer given for a lending
    pub async fn create_verification_document(
        &self,
        actor: &AuthUser,
        lending_id: i64,
    ) -> AppResult<Document> {
        let ctx = self.contract_context(lending_id).await?;
        let answers = VerificationRepository::answers(&self.db, lending_id).await?;
        if answers.is_empty() {
            return Err(AppError::bad_request("Comodato sem verificações respondidas"));
        }

        let sequence = DocumentRepository::next_sequence(&self.db).await?;
        let code = document_code(&contract_prefix(&ctx), sequence);
        let html = render::verification(&ctx, &answers, &code, &self.today());
        let file_name = format!("{} - verificação.html", code);

        let stored = store_file(&self.contracts_dir, &file_name, html.as_bytes()).await?;
        let result = DocumentRepository::create(
            &self.db,
            DocumentTypeId::Verification,
            &stored.to_string_lossy(),
            &file_name,
        )
        .await;
        let id = kept_or_discarded(result, &stored).await?;

        self.audit
            .record(Some(actor.id()), MODULE, "document", Operation::Create, Some(id))
            .await;
        tracing::info!("Generated checklist {} for lending {}", code, lending_id);
        self.get_document(id).await
    }

    pub async fn get_document(&self, id: i64) -> AppResult<Document> {
        DocumentRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("documentId", "Contrato não encontrado"))
    }

    pub async fn list_documents(
        &self,
        filter: &DocumentFilter,
        page: PageParams,
    ) -> AppResult<Page<Document>> {
        page.validate()?;
        let doc_type = filter.doc_type.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let (items, total) = DocumentRepository::list(&self.db, doc_type, page).await?;
        Ok(Page::new(items, total, page))
    }

    /// The document row and the bytes of its file
    pub async fn read_document(&self, id: i64) -> AppResult<(Document, Vec<u8>)> {
        let document = self.get_document(id).await?;
        let Some(path) = document.path.as_deref() else {
            return Err(file_missing());
        };
        match tokio::fs::read(Path::new(path)).await {
            Ok(bytes) => Ok((document, bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Document {} points at missing file {}", id, path);
                Err(file_missing())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn contract_context(&self, lending_id: i64) -> AppResult<ContractContext> {
        DocumentRepository::contract_context(&self.db, lending_id)
            .await?
            .ok_or_else(|| AppError::not_found("lendingId", "Contrato de Comodato não encontrado"))
    }

    async fn term_context(&self, term_id: i64) -> AppResult<TermContext> {
        TermRepository::context(&self.db, term_id)
            .await?
            .ok_or_else(|| AppError::not_found("termId", "Termo de Responsabilidade não encontrado"))
    }

    fn today(&self) -> String {
        today(self.timezone).format(DEFAULT_DATE_FORMAT).to_string()
    }
}

/// Asset acronym, or the first letters of the asset description
fn contract_prefix(ctx: &ContractContext) -> String {
    match ctx.asset_acronym.as_deref().filter(|a| !a.is_empty()) {
        Some(acronym) => acronym.to_uppercase(),
        None => ctx
            .description
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(3)
            .collect::<String>()
            .to_uppercase(),
    }
}

/// Keep the stored file when its rows were committed, remove it otherwise.
async fn kept_or_discarded<T>(result: Result<T, sqlx::Error>, stored: &Path) -> AppResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            discard_file(stored).await;
            Err(e.into())
        }
    }
}

fn file_missing() -> AppError {
    AppError::not_found("documentId", "Arquivo não encontrado")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        NewAnswer, NewLending, NewTerm, NewVerification, NewVerificationAnswers, NewWitness,
    };
    use crate::services::{LendingService, TermService, VerificationService};
    use crate::testing::{test_pool, Fixtures};

    struct Setup {
        service: DocumentService,
        lendings: LendingService,
        pool: SqlitePool,
        actor: AuthUser,
        dir: tempfile::TempDir,
    }

    async fn setup() -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool().await;
        let audit = Arc::new(AuditService::new(pool.clone()));
        let actor = Fixtures::staff(&pool).await;
        Setup {
            service: DocumentService::new(
                pool.clone(),
                Arc::clone(&audit),
                chrono_tz::America::Sao_Paulo,
                dir.path().join("contracts"),
                dir.path().join("terms"),
            ),
            lendings: LendingService::new(pool.clone(), audit),
            pool,
            actor,
            dir,
        }
    }

    /// Lending of a fresh notebook with two witnesses
    async fn lending(s: &Setup, code: &str) -> (i64, i64) {
        let employee = Fixtures::employee(&s.pool, code, "Marcos Prado").await;
        let asset = Fixtures::asset(&s.pool, &format!("NB-{}", code)).await;
        let cost_center = Fixtures::cost_center(&s.pool, &format!("9.{}", code)).await;
        let mut witnesses = Vec::new();
        for name in ["Ana Dias", "Rui Melo"] {
            let witness_employee =
                Fixtures::employee(&s.pool, &format!("{}-{}", code, name), name).await;
            let witness = s
                .lendings
                .create_witness(&s.actor, NewWitness { employee_id: witness_employee })
                .await
                .unwrap();
            witnesses.push(witness.id);
        }
        let lending = s
            .lendings
            .create_lending(
                &s.actor,
                NewLending {
                    employee_id: employee,
                    asset_id: asset,
                    workload_id: 2,
                    cost_center_id: cost_center,
                    witnesses,
                    bu: None,
                    number: None,
                    manager: Some("Carla".into()),
                    business_executive: None,
                    project: None,
                    location: Some("Recife".into()),
                    observations: None,
                    glpi_number: None,
                    ms_office: true,
                },
            )
            .await
            .unwrap();
        (lending.id, asset)
    }

    fn upload(owner_id: i64) -> SignedUpload {
        SignedUpload {
            owner_id,
            bytes: b"%PDF-1.4 signed".to_vec(),
        }
    }

    async fn lending_status(pool: &SqlitePool, id: i64) -> i64 {
        sqlx::query_scalar("SELECT status_id FROM lendings WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_contract_lifecycle() {
        let s = setup().await;
        let (lending_id, asset) = lending(&s, "000500").await;

        let contract = s
            .service
            .create_contract(&s.actor, NewContractDocument { lending_id, legal_person: false })
            .await
            .unwrap();
        assert_eq!(contract.doc_type, "Contrato de Comodato");
        assert_eq!(contract.file_name, "NTB00001.html");
        let (_, html) = s.service.read_document(contract.id).await.unwrap();
        let html = String::from_utf8(html).unwrap();
        assert!(html.contains("Marcos Prado"));
        assert!(html.contains("Pacote Office"));

        let lending = s.lendings.get_lending(lending_id).await.unwrap();
        assert_eq!(lending.status.id, 1);
        assert_eq!(lending.number.as_deref(), Some("NTB00001"));
        assert_eq!(lending.document, Some(contract.id));

        let signed = s.service.upload_contract(&s.actor, upload(lending_id)).await.unwrap();
        assert_eq!(signed.file_name, "NTB00001.pdf");
        let lending = s.lendings.get_lending(lending_id).await.unwrap();
        assert_eq!(lending.status.id, 2);
        assert!(lending.signed_date.is_some());
        assert_eq!(lending.document, Some(signed.id));

        // The unsigned contract is replaced in listings
        let page = s
            .service
            .list_documents(&DocumentFilter::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        // Two valid witnesses are required
        let err = s
            .service
            .create_revoke_contract(
                &s.actor,
                NewRevokeContractDocument {
                    lending_id,
                    legal_person: false,
                    witnesses_id: vec![9999],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let first = Fixtures::employee(&s.pool, "000510", "Lia Rocha").await;
        let second = Fixtures::employee(&s.pool, "000511", "Davi Reis").await;
        let revoke = s
            .service
            .create_revoke_contract(
                &s.actor,
                NewRevokeContractDocument {
                    lending_id,
                    legal_person: true,
                    witnesses_id: vec![first, second],
                },
            )
            .await
            .unwrap();
        assert_eq!(revoke.file_name, "NTB00001 - distrato.html");
        assert_eq!(lending_status(&s.pool, lending_id).await, 3);
        // Still lent until the signed termination comes back
        let status = AssetRepository::get_data(&s.pool, asset).await.unwrap().unwrap().data.status_id;
        assert_eq!(status, 2);

        s.service
            .upload_revoke_contract(&s.actor, upload(lending_id))
            .await
            .unwrap();
        let lending = s.lendings.get_lending(lending_id).await.unwrap();
        assert_eq!(lending.status.id, 4);
        assert!(lending.revoke_signed_date.is_some());
        assert_eq!(lending.witnesses.len(), 4);
        let status = AssetRepository::get_data(&s.pool, asset).await.unwrap().unwrap().data.status_id;
        assert_eq!(status, 1);
    }

    #[tokio::test]
    async fn test_contract_requires_witnesses_and_number() {
        let s = setup().await;
        let employee = Fixtures::employee(&s.pool, "000520", "Beto Luz").await;
        let asset = Fixtures::asset(&s.pool, "NB-520").await;
        let cost_center = Fixtures::cost_center(&s.pool, "5.20").await;
        let lending = s
            .lendings
            .create_lending(
                &s.actor,
                NewLending {
                    employee_id: employee,
                    asset_id: asset,
                    workload_id: 2,
                    cost_center_id: cost_center,
                    witnesses: vec![],
                    bu: None,
                    number: None,
                    manager: None,
                    business_executive: None,
                    project: None,
                    location: None,
                    observations: None,
                    glpi_number: None,
                    ms_office: false,
                },
            )
            .await
            .unwrap();

        let err = s
            .service
            .create_contract(&s.actor, NewContractDocument { lending_id: lending.id, legal_person: false })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = s.service.upload_contract(&s.actor, upload(lending.id)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = s.service.upload_contract(&s.actor, upload(404)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_term_lifecycle() {
        let s = setup().await;
        let terms = TermService::new(s.pool.clone(), Arc::new(AuditService::new(s.pool.clone())));
        let employee = Fixtures::employee(&s.pool, "000530", "Iara Souza").await;
        let cost_center = Fixtures::cost_center(&s.pool, "5.30").await;
        let term = terms
            .create_term(
                &s.actor,
                NewTerm {
                    employee_id: employee,
                    type_id: 3,
                    cost_center_id: cost_center,
                    description: Some("Chip corporativo".into()),
                    line_number: Some("81 98888-0000".into()),
                    operator: Some("Vivo".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let document = s
            .service
            .create_term_document(&s.actor, NewTermDocument { term_id: term.id })
            .await
            .unwrap();
        assert_eq!(document.file_name, "00001.html");
        let stored = PathBuf::from(document.path.clone().unwrap());
        assert!(stored.starts_with(s.dir.path().join("terms")));
        let html = std::fs::read_to_string(stored).unwrap();
        assert!(html.contains("81 98888-0000"));

        let term = terms.get_term(term.id).await.unwrap();
        assert_eq!(term.status.as_ref().map(|s| s.id), Some(1));
        assert_eq!(term.number.as_deref(), Some("00001"));

        // No termination before the signed term
        let err = s
            .service
            .create_revoke_term(&s.actor, NewTermDocument { term_id: term.id })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        s.service.upload_term(&s.actor, upload(term.id)).await.unwrap();
        let term = terms.get_term(term.id).await.unwrap();
        assert_eq!(term.status.as_ref().map(|s| s.id), Some(2));
        assert!(term.signed_date.is_some());

        s.service
            .create_revoke_term(&s.actor, NewTermDocument { term_id: term.id })
            .await
            .unwrap();
        assert_eq!(
            terms.get_term(term.id).await.unwrap().status.map(|s| s.id),
            Some(3)
        );

        s.service.upload_revoke_term(&s.actor, upload(term.id)).await.unwrap();
        let term = terms.get_term(term.id).await.unwrap();
        assert_eq!(term.status.map(|s| s.id), Some(4));
        assert!(term.revoke_signed_date.is_some());
    }

    #[tokio::test]
    async fn test_failed_link_leaves_no_file() {
        let s = setup().await;
        let (lending_id, _) = lending(&s, "000540").await;
        sqlx::query(
            r#"
            CREATE TRIGGER reject_document BEFORE INSERT ON documents
            BEGIN SELECT RAISE(ABORT, 'rejected'); END
            "#,
        )
        .execute(&s.pool)
        .await
        .unwrap();

        let result = s
            .service
            .create_contract(&s.actor, NewContractDocument { lending_id, legal_person: false })
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));

        let leftovers = match std::fs::read_dir(s.dir.path().join("contracts")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        };
        assert_eq!(leftovers, 0);
        assert_eq!(lending_status(&s.pool, lending_id).await, 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let s = setup().await;
        let (lending_id, _) = lending(&s, "000550").await;
        let contract = s
            .service
            .create_contract(&s.actor, NewContractDocument { lending_id, legal_person: false })
            .await
            .unwrap();
        std::fs::remove_file(contract.path.unwrap()).unwrap();

        let err = s.service.read_document(contract.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_verification_document_lists_answers() {
        let s = setup().await;
        let (lending_id, _) = lending(&s, "000560").await;

        let err = s
            .service
            .create_verification_document(&s.actor, lending_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let verifications =
            VerificationService::new(s.pool.clone(), Arc::new(AuditService::new(s.pool.clone())));
        let question = verifications
            .create_verification(
                &s.actor,
                NewVerification {
                    question: "Tela <ok>?".into(),
                    step: "Entrega".into(),
                    category: "Tela".into(),
                    asset_type_id: 1,
                    options: vec![],
                },
            )
            .await
            .unwrap();
        verifications
            .create_answers(
                &s.actor,
                NewVerificationAnswers {
                    lending_id,
                    type_id: 1,
                    answered: vec![NewAnswer {
                        verification_id: question.id,
                        answer: "Sim".into(),
                        observations: None,
                    }],
                },
            )
            .await
            .unwrap();

        let document = s
            .service
            .create_verification_document(&s.actor, lending_id)
            .await
            .unwrap();
        assert_eq!(document.doc_type, "Verificação");
        let (_, html) = s.service.read_document(document.id).await.unwrap();
        let html = String::from_utf8(html).unwrap();
        assert!(html.contains("Tela &lt;ok&gt;?"));
        assert!(html.contains("Sim (Envio)"));
    }

    #[test]
    fn test_contract_prefix() {
        let ctx = ContractContext {
            description: Some("monitor dell".into()),
            ..Default::default()
        };
        assert_eq!(contract_prefix(&ctx), "MON");
        let ctx = ContractContext {
            asset_acronym: Some("ntb".into()),
            ..Default::default()
        };
        assert_eq!(contract_prefix(&ctx), "NTB");
    }
}
