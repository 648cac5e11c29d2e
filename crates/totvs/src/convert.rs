use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{
    AssetGroupRecord, AssetRecord, CodeDescriptionRecord, CostCenterRecord, EmployeeRecord,
    RoleRecord,
};

/// A raw ERP row: upper-case column name to its textual value.
#[derive(Debug, Clone, Default)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<String>) {
        self.0.insert(column.to_string(), value.into());
    }

    /// Trimmed value of a column; empty strings read as missing.
    pub fn text(&self, column: &str) -> Option<String> {
        self.0
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn text_or_empty(&self, column: &str) -> String {
        self.text(column).unwrap_or_default()
    }

    fn date(&self, column: &str) -> Option<NaiveDate> {
        self.text(column).as_deref().and_then(parse_erp_date)
    }

    fn decimal(&self, column: &str) -> Option<f64> {
        self.text(column).as_deref().and_then(parse_decimal)
    }

    fn flag(&self, column: &str) -> bool {
        matches!(
            self.text(column).as_deref(),
            Some("1") | Some("true") | Some("TRUE")
        )
    }
}

/// Parse an ERP number that may use a comma as decimal separator.
///
/// `"1234,56"` and `"1.234,56"` both read as `1234.56`; `"1234.56"` is
/// accepted as is.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let value = value.trim();
    let normalized = if value.contains(',') {
        value.replace('.', "").replace(',', ".")
    } else {
        value.to_string()
    };
    normalized.parse().ok()
}

/// Parse `YYYY-MM-DD`, ignoring any trailing time part.
pub fn parse_erp_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

pub(crate) fn cost_center(record: &Record) -> Option<CostCenterRecord> {
    Some(CostCenterRecord {
        code: record.text("CODREDUZIDO")?,
        name: record.text_or_empty("NOME"),
        classification: record.text("DESCRICAO"),
    })
}

pub(crate) fn asset_group(record: &Record) -> Option<AssetGroupRecord> {
    Some(AssetGroupRecord {
        code: record.text("IDGRUPOPATRIMONIO")?,
        group_code: record.text("CODGRUPOPATRIMONIO"),
        name: record.text_or_empty("DESCRICAO"),
    })
}

pub(crate) fn code_description(record: &Record) -> Option<CodeDescriptionRecord> {
    Some(CodeDescriptionRecord {
        code: record.text("CODINTERNO")?,
        description: record.text_or_empty("DESCRICAO"),
    })
}

pub(crate) fn role(record: &Record) -> Option<RoleRecord> {
    Some(RoleRecord {
        code: record.text("CODIGO")?,
        name: record.text_or_empty("NOME"),
    })
}

pub(crate) fn asset(record: &Record) -> Option<AssetRecord> {
    Some(AssetRecord {
        code: record.text("IDPATRIMONIO")?,
        group: record.text("TIPO"),
        cost_center: record.text("CENTROCUSTO"),
        register_number: record.text("PATRIMONIO"),
        description: record.text_or_empty("DESCRICAO"),
        supplier: record.text("FORNECEDOR"),
        invoice_number: record.text("NOTA"),
        assurance_date: record.date("GARANTIA"),
        acquisition_date: record.date("DATAAQUISICAO"),
        observations: record.text("OBSERVACOES"),
        pattern: record.text("PADRAOEQUIP"),
        operational_system: record.text("SISTEMAOPERACIONAL"),
        serial_number: record.text("SERIE"),
        imei: record.text("IMEI"),
        value: record.decimal("VALORBASE"),
        depreciation: record.decimal("DEPRECIACAO"),
        ms_office: record.text("PACOTEOFFICE").as_deref() == Some("SIM"),
        active: record.flag("ATIVO"),
        quantity: record.decimal("QUANTIDADE").map(|q| q.round() as i64),
        unit: record.text("UNIDADE"),
        line_number: record.text("LINHA"),
        operator: record.text("OPERADORA"),
        accessories: record.text("ACESSORIOS"),
    })
}

pub(crate) fn employee(record: &Record) -> Option<EmployeeRecord> {
    let country = record
        .text_or_empty("PAIS")
        .replace([':', '.'], "");
    let address = [
        record.text_or_empty("RUA"),
        record.text_or_empty("NUMERO"),
        record.text_or_empty("COMPLEMENTO"),
        record.text_or_empty("BAIRRO"),
        record.text_or_empty("CIDADE"),
        record.text_or_empty("ESTADO"),
        country,
        record.text_or_empty("CEP"),
    ]
    .join(";");

    Some(EmployeeRecord {
        code: record.text("CODIGO")?,
        full_name: record.text_or_empty("NOME"),
        birthday: record.date("DTNASCIMENTO"),
        taxpayer_identification: record.text_or_empty("CPF"),
        national_identification: record.text("CARTIDENTIDADE"),
        marital_status: record.text("CIVIL"),
        nationality: record.text("NACIONALIDADE"),
        gender: record.text("SEXO"),
        role: record.text("CARGO"),
        status: record.text("SITUACAO"),
        address,
        cell_phone: record.text("TELEFONE1"),
        email: record.text("EMAIL"),
        admission_date: record.date("ADMISSAO"),
        registration: record.text("MATRICULA"),
        educational_level: record.text("ESCOLARIDADE"),
    })
}
