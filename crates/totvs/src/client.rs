use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Row};

use crate::convert::{self, Record};
use crate::error::TotvsError;
use crate::models::{
    AssetGroupRecord, AssetRecord, CodeDescriptionRecord, CostCenterRecord, EmployeeRecord,
    RoleRecord,
};
use crate::source::TotvsSource;
use crate::Result;

// Every column is cast to text so rows decode the same way on any backend.

const SQL_PCODESTCIVIL: &str = r#"
    SELECT CAST(CODINTERNO AS CHAR) AS CODINTERNO, CAST(DESCRICAO AS CHAR) AS DESCRICAO
    FROM PCODESTCIVIL
"#;

const SQL_PCODSEXO: &str = r#"
    SELECT CAST(CODINTERNO AS CHAR) AS CODINTERNO, CAST(DESCRICAO AS CHAR) AS DESCRICAO
    FROM PCODSEXO
"#;

const SQL_PCODNACAO: &str = r#"
    SELECT CAST(CODINTERNO AS CHAR) AS CODINTERNO, CAST(DESCRICAO AS CHAR) AS DESCRICAO
    FROM PCODNACAO
"#;

const SQL_PCODINSTRUCAO: &str = r#"
    SELECT CAST(CODINTERNO AS CHAR) AS CODINTERNO, CAST(DESCRICAO AS CHAR) AS DESCRICAO
    FROM PCODINSTRUCAO
"#;

const SQL_GCCUSTO: &str = r#"
    SELECT
        CAST(cc.CODREDUZIDO AS CHAR) AS CODREDUZIDO,
        CAST(cc.NOME AS CHAR) AS NOME,
        CAST(cls.DESCRICAO AS CHAR) AS DESCRICAO
    FROM GCCUSTO cc
    LEFT JOIN CCLASSIFICACC cls ON cls.CODCLASSIFICA = cc.CODCLASSIFICA
    WHERE cc.CODCOLIGADA = 1
"#;

const SQL_IGRUPOPATRIMONIO: &str = r#"
    SELECT
        CAST(IDGRUPOPATRIMONIO AS CHAR) AS IDGRUPOPATRIMONIO,
        CAST(CODGRUPOPATRIMONIO AS CHAR) AS CODGRUPOPATRIMONIO,
        CAST(DESCRICAO AS CHAR) AS DESCRICAO
    FROM IGRUPOPATRIMONIO
    WHERE CODCOLIGADA = 1
"#;

const SQL_PFUNCAO: &str = r#"
    SELECT CAST(CODIGO AS CHAR) AS CODIGO, CAST(NOME AS CHAR) AS NOME
    FROM PFUNCAO
    WHERE CODCOLIGADA = 1
"#;

const SQL_IPATRIMONIO: &str = r#"
    SELECT
        CAST(p.IDPATRIMONIO AS CHAR) AS IDPATRIMONIO,
        CAST(p.DESCRICAO AS CHAR) AS DESCRICAO,
        CAST(g.DESCRICAO AS CHAR) AS TIPO,
        CAST(p.ATIVO AS CHAR) AS ATIVO,
        CAST(p.DATAAQUISICAO AS CHAR) AS DATAAQUISICAO,
        CAST(p.PATRIMONIO AS CHAR) AS PATRIMONIO,
        CAST(p.QUANTIDADE AS CHAR) AS QUANTIDADE,
        CAST(p.UNIDADE AS CHAR) AS UNIDADE,
        CAST(p.OBSERVACOES AS CHAR) AS OBSERVACOES,
        CAST(c.NOME AS CHAR) AS CENTROCUSTO,
        CAST(p.VALORBASE AS CHAR) AS VALORBASE,
        CAST(pc.SERIE AS CHAR) AS SERIE,
        CAST(pc.IMEI AS CHAR) AS IMEI,
        CAST(pc.ACESSORIOS AS CHAR) AS ACESSORIOS,
        CAST(pc.OPERADORA AS CHAR) AS OPERADORA,
        CAST(pc.SISTEMAOPERACIONAL AS CHAR) AS SISTEMAOPERACIONAL,
        CAST(pc.PACOTEOFFICE AS CHAR) AS PACOTEOFFICE,
        CAST(pc.PADRAOEQUIP AS CHAR) AS PADRAOEQUIP,
        CAST(pc.MANUT5 AS CHAR) AS LINHA,
        CAST(ga.DATAEXPIRACAO AS CHAR) AS GARANTIA,
        CAST(f.NOMEFANTASIA AS CHAR) AS FORNECEDOR,
        CAST(p.NUMERODOCUMENTO AS CHAR) AS NOTA,
        CAST(d.SALDORESIDUAL AS CHAR) AS DEPRECIACAO
    FROM IPATRIMONIO p
    LEFT JOIN IGRUPOPATRIMONIO g ON g.IDGRUPOPATRIMONIO = p.IDGRUPOPATRIMONIO
    LEFT JOIN GCCUSTO c ON c.CODCCUSTO = p.CODCENTROCUSTO
    LEFT JOIN IPATRIMONIOCOMPL pc ON pc.IDPATRIMONIO = p.IDPATRIMONIO
    LEFT JOIN IGARANTIA ga ON ga.IDPATRIMONIO = p.IDPATRIMONIO
    LEFT JOIN FCFO f ON f.CODCFO = p.CODFORNECEDOR
    LEFT JOIN (
        SELECT IDPATRIMONIO, SALDORESIDUAL
        FROM ISALDOCALCULOPATRIMONIOMOEDA
        WHERE RECMODIFIEDON = (SELECT MAX(RECMODIFIEDON) FROM ISALDOCALCULOPATRIMONIOMOEDA)
    ) d ON d.IDPATRIMONIO = p.IDPATRIMONIO
    WHERE p.CODCOLIGADA = 1
"#;

const SQL_PPESSOA: &str = r#"
    SELECT
        CAST(p.CODIGO AS CHAR) AS CODIGO,
        CAST(p.NOME AS CHAR) AS NOME,
        CAST(p.DTNASCIMENTO AS CHAR) AS DTNASCIMENTO,
        CAST(c.DESCRICAO AS CHAR) AS CIVIL,
        CAST(s.DESCRICAO AS CHAR) AS SEXO,
        CAST(n.DESCRICAO AS CHAR) AS NACIONALIDADE,
        CAST(p.RUA AS CHAR) AS RUA,
        CAST(p.NUMERO AS CHAR) AS NUMERO,
        CAST(p.COMPLEMENTO AS CHAR) AS COMPLEMENTO,
        CAST(p.BAIRRO AS CHAR) AS BAIRRO,
        CAST(p.ESTADO AS CHAR) AS ESTADO,
        CAST(p.CIDADE AS CHAR) AS CIDADE,
        CAST(p.CEP AS CHAR) AS CEP,
        CAST(p.PAIS AS CHAR) AS PAIS,
        CAST(p.CPF AS CHAR) AS CPF,
        CAST(p.TELEFONE1 AS CHAR) AS TELEFONE1,
        CAST(p.CARTIDENTIDADE AS CHAR) AS CARTIDENTIDADE,
        CAST(p.EMAIL AS CHAR) AS EMAIL,
        CAST(pf.NOME AS CHAR) AS CARGO,
        CAST(cs.DESCRICAO AS CHAR) AS SITUACAO,
        CAST(f.DATAADMISSAO AS CHAR) AS ADMISSAO,
        CAST(f.CHAPA AS CHAR) AS MATRICULA,
        CAST(i.DESCRICAO AS CHAR) AS ESCOLARIDADE
    FROM PPESSOA p
    LEFT JOIN PCODESTCIVIL c ON c.CODINTERNO = p.ESTADOCIVIL
    LEFT JOIN PCODSEXO s ON s.CODINTERNO = p.SEXO
    LEFT JOIN PCODNACAO n ON n.CODINTERNO = p.NACIONALIDADE
    LEFT JOIN PFUNC f ON f.CODPESSOA = p.CODIGO
    LEFT JOIN PFUNCAO pf ON pf.CODIGO = f.CODFUNCAO
    LEFT JOIN PCODSITUACAO cs ON cs.CODCLIENTE = f.CODSITUACAO
    LEFT JOIN PCODINSTRUCAO i ON i.CODINTERNO = p.GRAUINSTRUCAO
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    MySql,
    Sqlite,
}

impl Backend {
    fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Ok(Self::MySql)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            Err(TotvsError::UnsupportedUrl(
                url.split(':').next().unwrap_or_default().to_string(),
            ))
        }
    }

    fn version_query(self) -> &'static str {
        match self {
            Self::MySql => "SELECT VERSION()",
            Self::Sqlite => "SELECT sqlite_version()",
        }
    }

    fn max_connections(self) -> u32 {
        match self {
            Self::MySql => 4,
            // An in-memory mirror only exists on its own connection.
            Self::Sqlite => 1,
        }
    }
}

/// ERP client over a MySQL (or SQLite) mirror of the TOTVS tables.
pub struct TotvsClient {
    pool: AnyPool,
    backend: Backend,
}

impl TotvsClient {
    /// Connect to the ERP database.
    pub async fn connect(url: &str) -> Result<Self> {
        let backend = Backend::from_url(url)?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(backend.max_connections())
            .connect(url)
            .await?;

        tracing::debug!("Connected to ERP database ({:?})", backend);

        Ok(Self { pool, backend })
    }

    /// Underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<Record>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(to_record).collect()
    }

    async fn fetch_as<T>(&self, sql: &str, convert: fn(&Record) -> Option<T>) -> Result<Vec<T>> {
        let records = self.fetch(sql).await?;
        let total = records.len();
        let converted: Vec<T> = records.iter().filter_map(convert).collect();

        if converted.len() < total {
            tracing::warn!(
                "Skipped {} ERP rows without a code",
                total - converted.len()
            );
        }

        Ok(converted)
    }
}

fn to_record(row: &AnyRow) -> Result<Record> {
    let mut record = Record::new();
    for column in row.columns() {
        let value: Option<String> = row.try_get(column.ordinal())?;
        if let Some(value) = value {
            record.insert(column.name(), value);
        }
    }
    Ok(record)
}

#[async_trait]
impl TotvsSource for TotvsClient {
    async fn version(&self) -> Result<String> {
        let version: String = sqlx::query_scalar(self.backend.version_query())
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    async fn asset_groups(&self) -> Result<Vec<AssetGroupRecord>> {
        self.fetch_as(SQL_IGRUPOPATRIMONIO, convert::asset_group).await
    }

    async fn marital_statuses(&self) -> Result<Vec<CodeDescriptionRecord>> {
        self.fetch_as(SQL_PCODESTCIVIL, convert::code_description).await
    }

    async fn genders(&self) -> Result<Vec<CodeDescriptionRecord>> {
        self.fetch_as(SQL_PCODSEXO, convert::code_description).await
    }

    async fn nationalities(&self) -> Result<Vec<CodeDescriptionRecord>> {
        self.fetch_as(SQL_PCODNACAO, convert::code_description).await
    }

    async fn cost_centers(&self) -> Result<Vec<CostCenterRecord>> {
        self.fetch_as(SQL_GCCUSTO, convert::cost_center).await
    }

    async fn roles(&self) -> Result<Vec<RoleRecord>> {
        self.fetch_as(SQL_PFUNCAO, convert::role).await
    }

    async fn educational_levels(&self) -> Result<Vec<CodeDescriptionRecord>> {
        self.fetch_as(SQL_PCODINSTRUCAO, convert::code_description)
            .await
    }

    async fn assets(&self) -> Result<Vec<AssetRecord>> {
        self.fetch_as(SQL_IPATRIMONIO, convert::asset).await
    }

    async fn employees(&self) -> Result<Vec<EmployeeRecord>> {
        self.fetch_as(SQL_PPESSOA, convert::employee).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_client() -> TotvsClient {
        TotvsClient::connect("sqlite::memory:").await.unwrap()
    }

    #[test]
    fn test_backend_from_url() {
        assert_eq!(
            Backend::from_url("mysql://u:p@host/db").unwrap(),
            Backend::MySql
        );
        assert_eq!(Backend::from_url("sqlite::memory:").unwrap(), Backend::Sqlite);
        assert!(matches!(
            Backend::from_url("mssql://host/db"),
            Err(TotvsError::UnsupportedUrl(scheme)) if scheme == "mssql"
        ));
    }

    #[tokio::test]
    async fn test_version() {
        let client = memory_client().await;
        let version = client.version().await.unwrap();
        assert!(version.starts_with('3'));
    }

    #[tokio::test]
    async fn test_genders_from_mirror() {
        let client = memory_client().await;
        sqlx::query("CREATE TABLE PCODSEXO (CODINTERNO TEXT, DESCRICAO TEXT)")
            .execute(client.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO PCODSEXO VALUES ('M', 'Masculino'), ('F', ' Feminino '), (NULL, 'Sem código')",
        )
        .execute(client.pool())
        .await
        .unwrap();

        let genders = client.genders().await.unwrap();
        assert_eq!(genders.len(), 2);
        assert!(genders
            .iter()
            .any(|g| g.code == "F" && g.description == "Feminino"));
    }

    #[tokio::test]
    async fn test_cost_centers_numeric_codes() {
        let client = memory_client().await;
        for sql in [
            "CREATE TABLE GCCUSTO (CODREDUZIDO INTEGER, NOME TEXT, CODCLASSIFICA TEXT, CODCOLIGADA INTEGER)",
            "CREATE TABLE CCLASSIFICACC (CODCLASSIFICA TEXT, DESCRICAO TEXT)",
            "INSERT INTO CCLASSIFICACC VALUES ('A', 'Administrativo')",
            "INSERT INTO GCCUSTO VALUES (101, 'TI', 'A', 1), (102, 'RH', NULL, 1), (900, 'Outra', NULL, 2)",
        ] {
            sqlx::query(sql).execute(client.pool()).await.unwrap();
        }

        let mut centers = client.cost_centers().await.unwrap();
        centers.sort_by(|a, b| a.code.cmp(&b.code));

        assert_eq!(centers.len(), 2);
        assert_eq!(centers[0].code, "101");
        assert_eq!(centers[0].classification.as_deref(), Some("Administrativo"));
        assert_eq!(centers[1].classification, None);
    }
}
