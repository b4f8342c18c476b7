//! Generator for the declaração de visita, with the optional NPS survey.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::docx::{DocxDocument, Substitutions};

use super::common::{format_date_extenso, today};
use super::templates::TemplateKey;
use super::traits::{FillOutcome, Generator, Validator};
use super::GeneratorError;

/// Survey rows, top to bottom, below the header row.
pub const NPS_CRITERIA: [&str; 7] = [
    "Localização",
    "Tamanho",
    "Planta (disposição dos cômodos)",
    "Qualidade / Acabamentos",
    "Estado de Conservação",
    "Áreas comuns",
    "Preço",
];

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Visitante {
    pub nome: String,
    pub cpf: String,
    pub email: String,
    pub tel: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DeclaracaoVisitaRequest {
    pub endereco_imovel: String,
    pub visitantes: Vec<Visitante>,
    pub nome_corretor: String,
    pub creci_corretor: String,
    #[serde(rename = "isImob", default)]
    pub is_imob: bool,
    #[serde(default)]
    pub name_imob: Option<String>,
    #[serde(default)]
    pub number_creci: Option<String>,
    /// Score from 1 to 5 per criterion
    #[serde(default)]
    pub avaliacao_nps: Option<HashMap<String, i64>>,
}

impl Validator for DeclaracaoVisitaRequest {
    fn validate(&self) -> Result<(), String> {
        use super::validation::*;

        let mut errors = ValidationErrors::new();

        validate_required(&self.endereco_imovel, "endereco_imovel", "Endereço do imóvel", &mut errors);
        validate_non_empty(&self.visitantes, "visitantes", "visitante", &mut errors);
        for (i, v) in self.visitantes.iter().enumerate() {
            validate_required(&v.nome, &format!("visitantes[{i}].nome"), "Nome do visitante", &mut errors);
            validate_required(&v.cpf, &format!("visitantes[{i}].cpf"), "CPF", &mut errors);
        }
        validate_required(&self.nome_corretor, "nome_corretor", "Nome do corretor", &mut errors);
        validate_required(&self.creci_corretor, "creci_corretor", "CRECI do corretor", &mut errors);

        if self.is_imob {
            validate_required(
                self.name_imob.as_deref().unwrap_or_default(),
                "name_imob",
                "Nome da imobiliária",
                &mut errors,
            );
            validate_required(
                self.number_creci.as_deref().unwrap_or_default(),
                "number_creci",
                "CRECI da imobiliária",
                &mut errors,
            );
        }

        errors.into_result()
    }
}

impl DeclaracaoVisitaRequest {
    /// Agency clause appended after the broker's name.
    pub fn imob_clause(&self) -> String {
        if !self.is_imob {
            return String::new();
        }
        format!(
            ", (parceiro/associado) da imobiliária {}, inscrita no CRECI/DF sob o nº {}",
            self.name_imob.as_deref().unwrap_or_default().trim(),
            self.number_creci.as_deref().unwrap_or_default().trim()
        )
    }

    /// `(row, column)` cells to mark. Unknown criteria and scores outside
    /// 1 to 5 are skipped.
    pub fn nps_marks(&self) -> Vec<(usize, usize)> {
        let Some(scores) = &self.avaliacao_nps else {
            return Vec::new();
        };
        NPS_CRITERIA
            .iter()
            .enumerate()
            .filter_map(|(i, criterion)| {
                let score = *scores.get(*criterion)?;
                (1..=5).contains(&score).then_some((i + 1, score as usize))
            })
            .collect()
    }
}

pub struct DeclaracaoVisitaGenerator {
    date: NaiveDate,
}

impl DeclaracaoVisitaGenerator {
    pub fn new() -> Self {
        Self { date: today() }
    }

    pub fn with_date(date: NaiveDate) -> Self {
        Self { date }
    }
}

impl Default for DeclaracaoVisitaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator<DeclaracaoVisitaRequest> for DeclaracaoVisitaGenerator {
    fn kind(&self) -> &'static str {
        "declaracao-de-visita"
    }

    fn template_for(&self, _request: &DeclaracaoVisitaRequest) -> Result<String, GeneratorError> {
        Ok(TemplateKey::DeclaracaoVisita.file_name().to_string())
    }

    fn fill(
        &self,
        document: &mut DocxDocument,
        request: &DeclaracaoVisitaRequest,
    ) -> Result<FillOutcome, GeneratorError> {
        document.replace_all(
            &Substitutions::new()
                .with("endereco_imovel", request.endereco_imovel.trim())
                .with("{{data_full}}", format_date_extenso(self.date, true)),
        );

        let visitantes: Vec<Substitutions> = request
            .visitantes
            .iter()
            .map(|v| {
                Substitutions::new()
                    .with("nome_visitante", v.nome.trim())
                    .with("cpf_visitante", v.cpf.trim())
                    .with("email_visitante", v.email.trim())
                    .with("tel", v.tel.trim())
            })
            .collect();
        document.repeat_table("{visitante_teble}", &visitantes);

        document.replace_all(&Substitutions::new().with("{imob}", request.imob_clause()));

        let signers: Vec<Vec<String>> = request
            .visitantes
            .iter()
            .map(|v| vec![format!("Nome: {}", v.nome.trim()), format!("CPF: {}", v.cpf.trim())])
            .collect();
        document.signature_block("{assinatura_visitante}", &signers);

        document.replace_all(
            &Substitutions::new()
                .with("NOME DO CORRETOR", request.nome_corretor.trim())
                .with("CRECI DO CORRETOR(A)", request.creci_corretor.trim()),
        );

        if request.avaliacao_nps.is_some() {
            document.mark_cells("{avaliacao_nps}", &request.nps_marks());
        }

        Ok(FillOutcome::default())
    }
}
