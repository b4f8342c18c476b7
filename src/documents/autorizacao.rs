//! Generator for the autorização de venda.
//!
//! The same payload fills either the broker or the agency template, picked
//! by `tipo_template`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::docx::{DocxDocument, Substitutions};

use super::common::{format_brl, format_date_extenso, today};
use super::extenso::number_words;
use super::templates::TemplateKey;
use super::traits::{FillOutcome, Generator, Validator};
use super::GeneratorError;

const CLAUSE_PREFIX: &str = "O CONTRATANTE declara que o imóvel se encontra livre e desembaraçado \
de todos e quaisquer ônus judicial, extrajudicial, hipoteca legal ou convencional, foro ou pensão \
e está quite com todos os impostos, taxas, inclusive contribuições condominiais, se houver, até a \
presente data,";

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AutorizacaoVendaRequest {
    pub vendedor: String,
    pub cpf_mask: String,
    pub razao_corretor: String,
    pub cnpj_mask_corretor: String,
    pub creci_corretor: String,
    pub cartorio_number: String,
    pub mat_number: String,
    /// Asking price in reais
    pub valor: f64,
    /// Commission percentage, whole number
    pub corretagem_number: u32,
    pub pendencia: bool,
    #[serde(default)]
    pub pendencia_texto: String,
    /// `autorizacao_corretor` or `autorizacao_imobiliaria`
    pub tipo_template: String,
}

impl Validator for AutorizacaoVendaRequest {
    fn validate(&self) -> Result<(), String> {
        use super::validation::*;

        let mut errors = ValidationErrors::new();

        validate_required(&self.vendedor, "vendedor", "Vendedor", &mut errors);
        validate_required(&self.cpf_mask, "cpf_mask", "CPF", &mut errors);
        validate_required(&self.razao_corretor, "razao_corretor", "Razão social do corretor", &mut errors);
        validate_required(&self.cnpj_mask_corretor, "cnpj_mask_corretor", "CPF/CNPJ", &mut errors);
        validate_required(&self.creci_corretor, "creci_corretor", "CRECI", &mut errors);
        validate_required(&self.cartorio_number, "cartorio_number", "Cartório", &mut errors);
        validate_required(&self.mat_number, "mat_number", "Matrícula", &mut errors);
        validate_positive(self.valor, "valor", "Valor", &mut errors);
        validate_percentage(
            f64::from(self.corretagem_number),
            "corretagem_number",
            "Corretagem",
            &mut errors,
        );
        if self.pendencia {
            validate_required(&self.pendencia_texto, "pendencia_texto", "Descrição da pendência", &mut errors);
        }

        errors.into_result()
    }
}

/// The encumbrance clause: names the exception when one is declared.
pub fn pending_clause(pendencia: bool, texto: &str) -> String {
    if pendencia && !texto.trim().is_empty() {
        format!("{} à exceção de {}.", CLAUSE_PREFIX, texto.trim())
    } else {
        format!("{} sem exceção.", CLAUSE_PREFIX)
    }
}

pub struct AutorizacaoGenerator {
    date: NaiveDate,
}

impl AutorizacaoGenerator {
    pub fn new() -> Self {
        Self { date: today() }
    }

    pub fn with_date(date: NaiveDate) -> Self {
        Self { date }
    }

    fn substitutions(&self, request: &AutorizacaoVendaRequest) -> Substitutions {
        Substitutions::new()
            .with("{vendedor}", request.vendedor.trim())
            .with("{cpf_mask}", request.cpf_mask.trim())
            .with("{razao_corretor}", request.razao_corretor.trim())
            .with("{cnpj_mask_corretor}", request.cnpj_mask_corretor.trim())
            .with("{creci_corretor}", request.creci_corretor.trim())
            .with("{cartorio_number}", request.cartorio_number.trim())
            .with("{mat_number}", request.mat_number.trim())
            .with("{valor_mask_brl}", format_brl(request.valor))
            .with("{corretagem_number}", request.corretagem_number.to_string())
            .with("{corretagem_text}", number_words(u64::from(request.corretagem_number)))
            .with("{data_completa}", format_date_extenso(self.date, false))
            .with("{text_4}", pending_clause(request.pendencia, &request.pendencia_texto))
    }
}

impl Default for AutorizacaoGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator<AutorizacaoVendaRequest> for AutorizacaoGenerator {
    fn kind(&self) -> &'static str {
        "autorizacao-de-venda"
    }

    fn template_for(&self, request: &AutorizacaoVendaRequest) -> Result<String, GeneratorError> {
        match TemplateKey::from_key(&request.tipo_template) {
            Some(key @ (TemplateKey::AutorizacaoCorretor | TemplateKey::AutorizacaoImobiliaria)) => {
                Ok(key.file_name().to_string())
            }
            _ => Err(GeneratorError::InvalidTemplateType(request.tipo_template.clone())),
        }
    }

    fn fill(
        &self,
        document: &mut DocxDocument,
        request: &AutorizacaoVendaRequest,
    ) -> Result<FillOutcome, GeneratorError> {
        document.replace_all(&self.substitutions(request));
        Ok(FillOutcome::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AutorizacaoVendaRequest {
        serde_json::from_str(
            r#"{
                "vendedor": "Maria Souza",
                "cpf_mask": "529.982.247-25",
                "razao_corretor": "Imobiliária Central",
                "cnpj_mask_corretor": "11.222.333/0001-81",
                "creci_corretor": "12345-J",
                "cartorio_number": "2º",
                "mat_number": "98765",
                "valor": 350000.0,
                "corretagem_number": 6,
                "pendencia": false,
                "tipo_template": "autorizacao_imobiliaria"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn picks_template_by_type() {
        let generator = AutorizacaoGenerator::new();
        let mut req = request();
        assert_eq!(generator.template_for(&req).unwrap(), "autorizacao-de-venda-imob.docx");

        req.tipo_template = "contrato_corretagem".into();
        assert!(matches!(
            generator.template_for(&req),
            Err(GeneratorError::InvalidTemplateType(_))
        ));
    }

    #[test]
    fn validates_request() {
        assert!(request().validate().is_ok());

        let mut req = request();
        req.vendedor = " ".into();
        req.cpf_mask = String::new();
        req.pendencia = true;
        let message = req.validate().unwrap_err();
        assert!(message.contains("3 erro(s)"));
        assert!(message.contains("cpf_mask"));
        assert!(message.contains("pendencia_texto"));
    }

    #[test]
    fn accepts_document_numbers_without_check_digits() {
        let mut req = request();
        req.cpf_mask = "123.456.789-00".into();
        req.cnpj_mask_corretor = "CRECI-DF 0000".into();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn clause_mentions_exception_only_when_declared() {
        assert!(pending_clause(false, "hipoteca").ends_with("sem exceção."));
        assert!(pending_clause(true, "  ").ends_with("sem exceção."));
        assert!(pending_clause(true, "hipoteca com o Banco X").ends_with("à exceção de hipoteca com o Banco X."));
    }

    #[test]
    fn fills_every_token() {
        let body = [
            "Vendedor: {vendedor}, CPF {cpf_mask}",
            "Valor R$ {valor_mask_brl}, comissão de {corretagem_number}% ({corretagem_text} por cento)",
            "{text_4}",
            "Brasília, {data_completa}",
        ]
        .iter()
        .map(|t| format!("<w:p><w:r><w:t>{t}</w:t></w:r></w:p>"))
        .collect::<String>();
        let mut doc = DocxDocument::from_document_xml(&body).unwrap();

        let generator = AutorizacaoGenerator::with_date(NaiveDate::from_ymd_opt(2025, 3, 5).unwrap());
        generator.fill(&mut doc, &request()).unwrap();

        let text = doc.text();
        assert!(text.contains("Vendedor: Maria Souza, CPF 529.982.247-25"));
        assert!(text.contains("Valor R$ 350.000,00, comissão de 6% (seis por cento)"));
        assert!(text.contains("sem exceção."));
        assert!(text.contains("Brasília, 5 de março de 2025"));
        assert!(!text.contains('{'));
    }
}
