//! HTML sheets for contracts, terms and checklists.

use crate::models::{TermItemTypeId, VerificationAnswer, DEFAULT_DATE_FORMAT};
use crate::repositories::{ContractContext, SignerContext, TermContext, WitnessSigner};

const NOT_PROVIDED: &str = "Não informado";

/// Asset types printed with the computer block (OS, Office, pattern)
const COMPUTER_ACRONYMS: &[&str] = &["NTB", "DSK", "TAB"];

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn or_not_provided(value: &Option<String>) -> String {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => NOT_PROVIDED.to_string(),
    }
}

/// A printable page built section by section
struct Sheet {
    body: String,
}

impl Sheet {
    fn new(title: &str, code: &str) -> Self {
        let mut body = String::new();
        body.push_str("<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head><meta charset=\"utf-8\">");
        body.push_str(&format!("<title>{} {}</title>", escape(title), escape(code)));
        body.push_str("</head>\n<body>\n");
        body.push_str(&format!("<h1>{}</h1>\n<p>N° {}</p>\n", escape(title), escape(code)));
        Self { body }
    }

    fn paragraph(&mut self, text: &str) -> &mut Self {
        self.body.push_str(&format!("<p>{}</p>\n", escape(text)));
        self
    }

    fn fields(&mut self, heading: &str, rows: &[(&str, String)]) -> &mut Self {
        self.body
            .push_str(&format!("<h2>{}</h2>\n<table>\n", escape(heading)));
        for (key, value) in rows {
            self.body.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                escape(key),
                escape(value)
            ));
        }
        self.body.push_str("</table>\n");
        self
    }

    fn signatures(&mut self, signers: &[(&str, &str)]) -> &mut Self {
        self.body.push_str("<div class=\"signatures\">\n");
        for (name, document) in signers {
            self.body.push_str(&format!(
                "<p>______________________________<br>{}<br>CPF: {}</p>\n",
                escape(name),
                escape(document)
            ));
        }
        self.body.push_str("</div>\n");
        self
    }

    fn finish(mut self) -> String {
        self.body.push_str("</body>\n</html>\n");
        self.body
    }
}

fn signer_rows(signer: &SignerContext) -> Vec<(&'static str, String)> {
    vec![
        ("Nome", signer.full_name.clone()),
        ("CPF", signer.taxpayer_identification.clone()),
        ("RG", or_not_provided(&signer.national_identification)),
        ("Nacionalidade", or_not_provided(&signer.nationality)),
        ("Estado civil", or_not_provided(&signer.marital_status)),
        ("Cargo", or_not_provided(&signer.role)),
        ("Endereço", or_not_provided(&signer.address)),
    ]
}

fn employer_rows(signer: &SignerContext) -> Vec<(&'static str, String)> {
    let address = signer.employer_address.clone().or(signer.address.clone());
    vec![
        ("Empresa", or_not_provided(&signer.employer_name)),
        ("CNPJ", or_not_provided(&signer.employer_number)),
        ("Endereço da empresa", or_not_provided(&address)),
        ("Objeto do contrato", or_not_provided(&signer.employer_contract_object)),
        (
            "Data do contrato",
            signer
                .employer_contract_date
                .map(|d| d.format(DEFAULT_DATE_FORMAT).to_string())
                .unwrap_or_else(|| NOT_PROVIDED.to_string()),
        ),
    ]
}

/// Asset lines printed on a contract. Empty when the asset has no type.
pub fn contract_detail(ctx: &ContractContext) -> Vec<(&'static str, String)> {
    if ctx.asset_type.is_none() {
        return Vec::new();
    }

    let mut detail = vec![
        ("N° Patrimônio", or_not_provided(&ctx.register_number)),
        ("Número de Série", or_not_provided(&ctx.serial_number)),
        ("Descrição", or_not_provided(&ctx.description)),
        ("Acessórios", or_not_provided(&ctx.accessories)),
    ];
    let computer = ctx
        .asset_acronym
        .as_deref()
        .is_some_and(|acronym| COMPUTER_ACRONYMS.contains(&acronym));
    if computer {
        detail.push(("Pacote Office", if ctx.ms_office { "SIM" } else { "NÃO" }.to_string()));
        detail.push(("Padrão Equipamento", or_not_provided(&ctx.pattern)));
        detail.push(("Sistema Operacional", or_not_provided(&ctx.operational_system)));
    }
    if ctx.line_number.is_some() {
        detail.push(("Número Linha", or_not_provided(&ctx.line_number)));
        detail.push(("Operadora", or_not_provided(&ctx.operator)));
    }
    if ctx.imei.is_some() {
        detail.push(("IMEI", or_not_provided(&ctx.imei)));
    }
    detail
}

/// Contract or termination of a lending
pub fn contract(
    ctx: &ContractContext,
    witnesses: &[WitnessSigner],
    code: &str,
    date: &str,
    legal_person: bool,
    revoke: bool,
) -> String {
    let title = if revoke {
        "Distrato de Contrato de Comodato"
    } else {
        "Contrato de Comodato"
    };
    let mut sheet = Sheet::new(title, code);

    if let Some(glpi) = ctx.glpi_number.as_deref().filter(|g| !g.is_empty()) {
        sheet.paragraph(&format!("Chamado GLPI: {}", glpi));
    }
    sheet.fields("Comodatário", &signer_rows(&ctx.employee));
    if legal_person {
        sheet.fields("Contratada", &employer_rows(&ctx.employee));
    }
    sheet.fields(
        "Alocação",
        &[
            ("Centro de custo", ctx.cost_center.clone()),
            ("Gestor", or_not_provided(&ctx.manager)),
            ("Executivo", or_not_provided(&ctx.business_executive)),
            ("Projeto", or_not_provided(&ctx.project)),
            ("Lotação", or_not_provided(&ctx.workload)),
            ("Local", or_not_provided(&ctx.location)),
            ("BU", or_not_provided(&ctx.bu)),
        ],
    );
    sheet.fields("Objeto", &contract_detail(ctx));
    if revoke {
        sheet.paragraph("As partes declaram a devolução do bem descrito acima e encerram o comodato.");
    } else {
        sheet.paragraph(
            "O comodatário recebe o bem descrito acima e se compromete a zelar por ele e devolvê-lo ao término do contrato.",
        );
    }
    sheet.paragraph(&format!("{}, {}", or_not_provided(&ctx.location), date));

    let mut signers = vec![(
        ctx.employee.full_name.as_str(),
        ctx.employee.taxpayer_identification.as_str(),
    )];
    signers.extend(
        witnesses
            .iter()
            .map(|w| (w.full_name.as_str(), w.taxpayer_identification.as_str())),
    );
    sheet.signatures(&signers);
    sheet.finish()
}

/// Item lines printed on a term, by item type
pub fn term_detail(ctx: &TermContext) -> Vec<(&'static str, String)> {
    let item = &ctx.item;
    match TermItemTypeId::from_id(ctx.type_id) {
        Some(TermItemTypeId::ToolKit) => {
            vec![("Descrição Kit Ferramentas", or_not_provided(&item.description))]
        }
        Some(TermItemTypeId::Uniform) => vec![
            ("Descrição", or_not_provided(&item.description)),
            ("Tamanho", or_not_provided(&item.size)),
            (
                "Quantidade",
                item.quantity.map(|q| q.to_string()).unwrap_or_default(),
            ),
            (
                "Valor",
                item.value.map(|v| format!("{:.2}", v)).unwrap_or_default(),
            ),
        ],
        Some(TermItemTypeId::Chip) => vec![
            ("Descrição", or_not_provided(&item.description)),
            ("Linha telefônica", or_not_provided(&item.line_number)),
            ("Operadora", or_not_provided(&item.operator)),
        ],
        None => Vec::new(),
    }
}

pub fn term(ctx: &TermContext, code: &str, date: &str, revoke: bool) -> String {
    let title = if revoke {
        "Distrato de Termo de Responsabilidade"
    } else {
        "Termo de Responsabilidade"
    };
    let mut sheet = Sheet::new(title, code);
    sheet
        .fields("Colaborador", &signer_rows(&ctx.employee))
        .fields(
            "Alocação",
            &[
                ("Centro de custo", ctx.cost_center.clone()),
                ("Gestor", or_not_provided(&ctx.manager)),
                ("Executivo", or_not_provided(&ctx.business_executive)),
                ("Projeto", or_not_provided(&ctx.project)),
                ("Lotação", or_not_provided(&ctx.workload)),
                ("Local", or_not_provided(&ctx.location)),
            ],
        )
        .fields("Itens", &term_detail(ctx))
        .paragraph(&format!("{}, {}", or_not_provided(&ctx.location), date))
        .signatures(&[(
            ctx.employee.full_name.as_str(),
            ctx.employee.taxpayer_identification.as_str(),
        )]);
    sheet.finish()
}

/// Checklist answers of a lending
pub fn verification(ctx: &ContractContext, answers: &[VerificationAnswer], code: &str, date: &str) -> String {
    let mut sheet = Sheet::new("Verificação de Equipamento", code);
    sheet.fields("Colaborador", &signer_rows(&ctx.employee));
    sheet.fields("Equipamento", &contract_detail(ctx));

    let rows: Vec<(&str, String)> = answers
        .iter()
        .map(|a| {
            let answer = match a.observations.as_deref() {
                Some(obs) if !obs.is_empty() => format!("{} ({}) - {}", a.answer, a.answer_type.name, obs),
                _ => format!("{} ({})", a.answer, a.answer_type.name),
            };
            (a.verification.question.as_str(), answer)
        })
        .collect();
    sheet.fields("Respostas", &rows);
    sheet.paragraph(date);
    sheet.signatures(&[(
        ctx.employee.full_name.as_str(),
        ctx.employee.taxpayer_identification.as_str(),
    )]);
    sheet.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TermItem;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<b>Ana & \"Bia\"</b>"),
            "&lt;b&gt;Ana &amp; &quot;Bia&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_contract_detail_by_type() {
        let mut ctx = ContractContext {
            asset_type: Some("NOTEBOOK".into()),
            asset_acronym: Some("NTB".into()),
            register_number: Some("P-1".into()),
            ms_office: true,
            ..Default::default()
        };
        let keys: Vec<&str> = contract_detail(&ctx).iter().map(|(k, _)| *k).collect();
        assert!(keys.contains(&"Pacote Office"));
        assert!(!keys.contains(&"Número Linha"));

        ctx.asset_acronym = Some("TEL".into());
        ctx.line_number = Some("11 99999-0000".into());
        let detail = contract_detail(&ctx);
        assert!(detail.iter().any(|(k, v)| *k == "Número Linha" && v == "11 99999-0000"));
        assert!(!detail.iter().any(|(k, _)| *k == "Pacote Office"));

        ctx.asset_type = None;
        assert!(contract_detail(&ctx).is_empty());
    }

    #[test]
    fn test_contract_escapes_employee_data() {
        let ctx = ContractContext {
            employee: SignerContext {
                full_name: "Ana <script>".into(),
                taxpayer_identification: "123".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let html = contract(&ctx, &[], "NTB00001", "01/02/2024", false, false);
        assert!(html.contains("Ana &lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Contrato de Comodato"));
    }

    #[test]
    fn test_uniform_term_detail() {
        let ctx = TermContext {
            type_id: 2,
            item: TermItem {
                description: Some("Camisa".into()),
                size: Some("M".into()),
                quantity: Some(3),
                value: Some(45.5),
                ..Default::default()
            },
            ..Default::default()
        };
        let detail = term_detail(&ctx);
        assert_eq!(detail[1], ("Tamanho", "M".to_string()));
        assert_eq!(detail[3], ("Valor", "45.50".to_string()));
    }
}
