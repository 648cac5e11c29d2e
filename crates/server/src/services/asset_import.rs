use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqlitePool;
use thiserror::Error;

use super::AuditService;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::{padded_sequence, Asset, AssetFilter, AssetStatusId, Operation};
use crate::repositories::{AssetData, AssetRepository, Catalog, InvoiceRepository, ReferenceRepository};

/// Spreadsheet columns, in export order
pub const COLUMNS: [&str; 22] = [
    "Patrimônio",
    "Descrição",
    "Fornecedor",
    "Garantia",
    "Observações",
    "Padrão",
    "Sistema Operacional",
    "N° Serial",
    "IMEI",
    "Data de Aquisição",
    "Valor",
    "Pacote Office",
    "Linha Telefônica",
    "Operadora",
    "Modelo",
    "Acessórios",
    "Configuração",
    "Quantidade",
    "Unidade",
    "Nota Fiscal",
    "Tipo de Ativo",
    "Status do Ativo",
];

pub const IMPORT_SUCCESS: &str = "Arquivo enviado com sucesso.";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Colunas não existentes: {0}")]
    UnknownColumns(String),

    #[error("Arquivo inválido: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arquivo sem linhas de ativos")]
    Empty,

    #[error("Linha {row}: IMEI já cadastrado: {value}")]
    DuplicateImei { row: usize, value: String },

    #[error("Linha {row}: N° de Patrimônio já cadastrado: {value}")]
    DuplicateRegisterNumber { row: usize, value: String },

    #[error("Linha {row}: Tipo de Ativo não existe: {value}")]
    UnknownType { row: usize, value: String },

    #[error("Linha {row}: Situação de Ativo não existe: {value}")]
    UnknownStatus { row: usize, value: String },

    #[error("Linha {row}: valor inválido em {column}: {value}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One parsed spreadsheet row, before it is written
#[derive(Debug, Default)]
struct ImportRow {
    data: AssetData,
    invoice_number: Option<String>,
}

/// CSV bulk import and export of assets
pub struct AssetImportService {
    db: SqlitePool,
    audit: Arc<AuditService>,
}

impl AssetImportService {
    pub fn new(db: SqlitePool, audit: Arc<AuditService>) -> Self {
        Self { db, audit }
    }

    /// Validate every row, then create all assets in one transaction.
    /// Any invalid row rejects the whole file.
    pub async fn bulk_import(&self, actor: &AuthUser, bytes: &[u8]) -> Result<usize, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let unknown: Vec<&str> = headers
            .iter()
            .map(String::as_str)
            .filter(|h| !COLUMNS.contains(h))
            .collect();
        if !unknown.is_empty() {
            return Err(ImportError::UnknownColumns(unknown.join(", ")));
        }

        let mut next_id = AssetRepository::next_id(&self.db).await?;
        let mut types: HashMap<String, i64> = HashMap::new();
        let mut statuses: HashMap<String, i64> = HashMap::new();
        let mut seen_imei = HashSet::new();
        let mut seen_register = HashSet::new();
        let mut rows = Vec::new();

        for (index, record) in reader.records().enumerate() {
            let record = record?;
            // Header is line 1
            let row = index + 2;
            let mut parsed = ImportRow::default();
            parsed.data.quantity = 1;
            parsed.data.active = true;
            parsed.data.by_agile = true;
            parsed.data.status_id = AssetStatusId::Available.id();

            for (header, raw) in headers.iter().zip(record.iter()) {
                if raw.is_empty() {
                    continue;
                }
                let value = raw.to_string();
                match header.as_str() {
                    "Patrimônio" => {
                        if !seen_register.insert(value.clone())
                            || AssetRepository::register_number_taken(&self.db, &value, None).await?
                        {
                            return Err(ImportError::DuplicateRegisterNumber { row, value });
                        }
                        parsed.data.register_number = Some(value);
                    }
                    "IMEI" => {
                        if !seen_imei.insert(value.clone())
                            || AssetRepository::imei_taken(&self.db, &value, None).await?
                        {
                            return Err(ImportError::DuplicateImei { row, value });
                        }
                        parsed.data.imei = Some(value);
                    }
                    "Tipo de Ativo" => {
                        let key = value.to_lowercase();
                        let id = match types.get(&key) {
                            Some(id) => *id,
                            None => ReferenceRepository::find_asset_type_by_name(&self.db, &value)
                                .await?
                                .ok_or(ImportError::UnknownType { row, value })?,
                        };
                        types.insert(key, id);
                        parsed.data.type_id = Some(id);
                    }
                    "Status do Ativo" => {
                        let key = value.to_lowercase();
                        let id = match statuses.get(&key) {
                            Some(id) => *id,
                            None => ReferenceRepository::find_catalog_by_name(
                                &self.db,
                                Catalog::AssetStatus,
                                &value,
                            )
                            .await?
                            .ok_or(ImportError::UnknownStatus { row, value })?,
                        };
                        statuses.insert(key, id);
                        parsed.data.status_id = id;
                    }
                    "Nota Fiscal" => parsed.invoice_number = Some(value),
                    column => apply_column(&mut parsed.data, column, value, row)?,
                }
            }

            if parsed.data.register_number.is_none() {
                let mut generated = padded_sequence(next_id);
                while seen_register.contains(&generated)
                    || AssetRepository::register_number_taken(&self.db, &generated, None).await?
                {
                    next_id += 1;
                    generated = padded_sequence(next_id);
                }
                seen_register.insert(generated.clone());
                parsed.data.register_number = Some(generated);
            }
            next_id += 1;
            rows.push(parsed);
        }

        if rows.is_empty() {
            return Err(ImportError::Empty);
        }
        let count = rows.len();
        let mut tx = self.db.begin().await?;
        for mut row in rows {
            if let Some(number) = row.invoice_number.as_deref() {
                row.data.invoice_id =
                    Some(InvoiceRepository::get_or_create_by_number(&mut *tx, number).await?);
            }
            let id = AssetRepository::create_with_executor(&mut *tx, &row.data).await?;
            AssetRepository::record_status(&mut *tx, id, row.data.status_id, None).await?;
        }
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), "asset", "asset", Operation::Import, None)
            .await;
        tracing::info!("Imported {} assets from file", count);

        Ok(count)
    }

    /// Every asset matching `filter` as CSV with the import headers
    pub async fn export_assets(&self, filter: &AssetFilter) -> AppResult<Vec<u8>> {
        let (assets, _) = AssetRepository::list(&self.db, filter, None).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(COLUMNS)?;
        for asset in &assets {
            writer.write_record(export_row(asset))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::internal(e.error().to_string()))?;

        tracing::debug!("Exported {} assets", assets.len());
        Ok(bytes)
    }
}

fn apply_column(
    data: &mut AssetData,
    column: &str,
    value: String,
    row: usize,
) -> Result<(), ImportError> {
    match column {
        "Descrição" => data.description = Some(value),
        "Fornecedor" => data.supplier = Some(value),
        "Garantia" => data.assurance_date = Some(parse_date(&value, "Garantia", row)?),
        "Observações" => data.observations = Some(value),
        "Padrão" => data.pattern = Some(value),
        "Sistema Operacional" => data.operational_system = Some(value),
        "N° Serial" => data.serial_number = Some(value),
        "Data de Aquisição" => {
            data.acquisition_date = Some(parse_date(&value, "Data de Aquisição", row)?)
        }
        "Valor" => data.value = Some(parse_decimal(&value, row)?),
        "Pacote Office" => data.ms_office = parse_bool(&value, row)?,
        "Linha Telefônica" => data.line_number = Some(value),
        "Operadora" => data.operator = Some(value),
        "Modelo" => data.model = Some(value),
        "Acessórios" => data.accessories = Some(value),
        "Configuração" => data.configuration = Some(value),
        "Quantidade" => {
            data.quantity = value.parse().map_err(|_| ImportError::InvalidValue {
                row,
                column: "Quantidade",
                value,
            })?
        }
        "Unidade" => data.unit = Some(value),
        _ => {}
    }
    Ok(())
}

fn parse_date(value: &str, column: &'static str, row: usize) -> Result<NaiveDate, ImportError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, crate::models::DEFAULT_DATE_FORMAT))
        .map_err(|_| ImportError::InvalidValue {
            row,
            column,
            value: value.to_string(),
        })
}

/// Accepts `1234.5` and `1.234,50`
fn parse_decimal(value: &str, row: usize) -> Result<f64, ImportError> {
    let normalized = if value.contains(',') {
        value.replace('.', "").replace(',', ".")
    } else {
        value.to_string()
    };
    normalized.parse().map_err(|_| ImportError::InvalidValue {
        row,
        column: "Valor",
        value: value.to_string(),
    })
}

fn parse_bool(value: &str, row: usize) -> Result<bool, ImportError> {
    match value.to_lowercase().as_str() {
        "sim" | "s" | "true" | "1" => Ok(true),
        "não" | "nao" | "n" | "false" | "0" => Ok(false),
        _ => Err(ImportError::InvalidValue {
            row,
            column: "Pacote Office",
            value: value.to_string(),
        }),
    }
}

fn export_row(asset: &Asset) -> Vec<String> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let date = |v: &Option<NaiveDate>| v.map(|d| d.to_string()).unwrap_or_default();
    vec![
        text(&asset.register_number),
        text(&asset.description),
        text(&asset.supplier),
        date(&asset.assurance_date),
        text(&asset.observations),
        text(&asset.pattern),
        text(&asset.operational_system),
        text(&asset.serial_number),
        text(&asset.imei),
        date(&asset.acquisition_date),
        asset.value.map(|v| v.to_string()).unwrap_or_default(),
        if asset.ms_office { "Sim" } else { "Não" }.to_string(),
        text(&asset.line_number),
        text(&asset.operator),
        text(&asset.model),
        text(&asset.accessories),
        text(&asset.configuration),
        asset.quantity.to_string(),
        text(&asset.unit),
        text(&asset.invoice_number),
        asset
            .asset_type
            .as_ref()
            .map(|t| t.name.clone())
            .unwrap_or_default(),
        asset
            .status
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_pool, Fixtures};

    async fn service() -> (AssetImportService, SqlitePool, AuthUser) {
        let pool = test_pool().await;
        let audit = Arc::new(AuditService::new(pool.clone()));
        let actor = Fixtures::staff(&pool).await;
        (AssetImportService::new(pool.clone(), audit), pool, actor)
    }

    #[tokio::test]
    async fn test_import_creates_assets_and_invoice() {
        let (service, pool, actor) = service().await;
        let csv = "Patrimônio,Descrição,IMEI,Valor,Pacote Office,Nota Fiscal,Tipo de Ativo,Status do Ativo\n\
                   PAT-1,Notebook,111,\"3.500,00\",Sim,NF-9,notebook,Estoque SP\n\
                   ,Celular,222,900,Não,NF-9,TELEFONIA,\n";

        let created = service.bulk_import(&actor, csv.as_bytes()).await.unwrap();
        assert_eq!(created, 2);

        let (assets, total) = AssetRepository::list(&pool, &AssetFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(total, 2);
        let phone = &assets[0];
        let notebook = &assets[1];
        assert_eq!(notebook.register_number.as_deref(), Some("PAT-1"));
        assert_eq!(notebook.value, Some(3500.0));
        assert!(notebook.ms_office);
        assert!(notebook.by_agile);
        assert_eq!(notebook.status.as_ref().unwrap().id, 3);
        assert_eq!(notebook.invoice_number.as_deref(), Some("NF-9"));
        assert_eq!(phone.invoice_number.as_deref(), Some("NF-9"));
        assert_eq!(phone.status.as_ref().unwrap().id, 1);
        assert_eq!(phone.register_number.as_deref(), Some("000000000000002"));
    }

    #[tokio::test]
    async fn test_import_rejects_whole_file() {
        let (service, pool, actor) = service().await;

        let csv = "IMEI,Tipo de Ativo\n333,NOTEBOOK\n333,NOTEBOOK\n";
        let err = service.bulk_import(&actor, csv.as_bytes()).await.unwrap_err();
        assert_eq!(err.to_string(), "Linha 3: IMEI já cadastrado: 333");

        let csv = "Descrição,Tipo de Ativo\nok,NOTEBOOK\nbad,FOGUETE\n";
        let err = service.bulk_import(&actor, csv.as_bytes()).await.unwrap_err();
        assert_eq!(err.to_string(), "Linha 3: Tipo de Ativo não existe: FOGUETE");

        let csv = "Descrição,Cor,Peso\nx,azul,1\n";
        let err = service.bulk_import(&actor, csv.as_bytes()).await.unwrap_err();
        assert_eq!(err.to_string(), "Colunas não existentes: Cor, Peso");

        let (_, total) = AssetRepository::list(&pool, &AssetFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_import_rejects_existing_register_number() {
        let (service, pool, actor) = service().await;
        Fixtures::asset(&pool, "NB-1").await;
        let existing = AssetRepository::get_data(&pool, 1)
            .await
            .unwrap()
            .unwrap()
            .data
            .register_number
            .unwrap();

        let csv = format!("Patrimônio\n{}\n", existing);
        let err = service.bulk_import(&actor, csv.as_bytes()).await.unwrap_err();
        assert!(matches!(err, ImportError::DuplicateRegisterNumber { row: 2, .. }));
    }

    #[tokio::test]
    async fn test_generated_register_number_is_reserved() {
        let (service, pool, actor) = service().await;

        // The first row is numbered 000000000000001, which the second row repeats
        let csv = "Patrimônio,Descrição\n,sem número\n000000000000001,repetido\n";
        let err = service.bulk_import(&actor, csv.as_bytes()).await.unwrap_err();
        assert!(matches!(err, ImportError::DuplicateRegisterNumber { row: 3, .. }));

        // A generated number skips one already written explicitly
        let csv = "Patrimônio,Descrição\n000000000000002,explícito\n,gerado\n";
        assert_eq!(service.bulk_import(&actor, csv.as_bytes()).await.unwrap(), 2);
        let (assets, _) = AssetRepository::list(&pool, &AssetFilter::default(), None)
            .await
            .unwrap();
        let mut numbers: Vec<String> = assets
            .into_iter()
            .filter_map(|a| a.register_number)
            .collect();
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 2);
    }

    #[tokio::test]
    async fn test_import_rejects_file_without_rows() {
        let (service, pool, actor) = service().await;

        let err = service
            .bulk_import(&actor, "Patrimônio,Descrição\n".as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Empty));

        let (_, total) = AssetRepository::list(&pool, &AssetFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_export_uses_import_headers() {
        let (service, pool, _actor) = service().await;
        Fixtures::asset(&pool, "NB-7").await;

        let bytes = service.export_assets(&AssetFilter::default()).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), COLUMNS.join(","));
        assert!(lines.next().unwrap().contains("NOTEBOOK"));
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1.234,50", 2).unwrap(), 1234.5);
        assert_eq!(parse_decimal("99.9", 2).unwrap(), 99.9);
        assert!(parse_decimal("abc", 2).is_err());
    }
}
