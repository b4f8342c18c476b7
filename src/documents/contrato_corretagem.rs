//! Generator for the contrato de corretagem.
//!
//! Contratantes and corretores each repeat a model table, commissions go
//! into one row per corretor, and every party gets a signature cell.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::docx::{DocxDocument, Substitutions};

use super::common::{format_brl_prefixed, format_date_extenso, format_percent, today};
use super::extenso::currency_words;
use super::templates::TemplateKey;
use super::traits::{FillOutcome, Generator, Validator};
use super::GeneratorError;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Contratante {
    pub nome: String,
    pub email: String,
    pub endereco: String,
    pub cpf: String,
    pub telefone: String,
    pub cidade: String,
    pub cep: String,
    pub uf: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Corretor {
    pub nome: String,
    pub cnpj: String,
    pub endereco: String,
    pub telefone: String,
    pub creci: String,
    /// Share of the total commission, in percent
    pub participacao: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Testemunha {
    pub nome: String,
    #[serde(default)]
    pub rg: String,
    pub cpf: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ContratoCorretagemRequest {
    pub endereco_imovel: String,
    pub valor_venda: f64,
    pub porcentagem_corretagem: f64,
    pub contratantes: Vec<Contratante>,
    pub corretores: Vec<Corretor>,
    #[serde(default)]
    pub testemunhas: Vec<Testemunha>,
}

impl ContratoCorretagemRequest {
    pub fn valor_comissao(&self) -> f64 {
        self.valor_venda * (self.porcentagem_corretagem / 100.0)
    }
}

impl Validator for ContratoCorretagemRequest {
    fn validate(&self) -> Result<(), String> {
        use super::validation::*;

        let mut errors = ValidationErrors::new();

        validate_required(&self.endereco_imovel, "endereco_imovel", "Endereço do imóvel", &mut errors);
        validate_positive(self.valor_venda, "valor_venda", "Valor de venda", &mut errors);
        validate_percentage(
            self.porcentagem_corretagem,
            "porcentagem_corretagem",
            "Porcentagem de corretagem",
            &mut errors,
        );

        validate_non_empty(&self.contratantes, "contratantes", "contratante", &mut errors);
        for (i, c) in self.contratantes.iter().enumerate() {
            validate_required(&c.nome, &format!("contratantes[{i}].nome"), "Nome do contratante", &mut errors);
            validate_required(&c.cpf, &format!("contratantes[{i}].cpf"), "CPF", &mut errors);
            if !c.email.trim().is_empty() {
                validate_email(&c.email, &format!("contratantes[{i}].email"), &mut errors);
            }
        }

        validate_non_empty(&self.corretores, "corretores", "corretor", &mut errors);
        for (i, c) in self.corretores.iter().enumerate() {
            validate_required(&c.nome, &format!("corretores[{i}].nome"), "Nome do corretor", &mut errors);
            validate_required(&c.cnpj, &format!("corretores[{i}].cnpj"), "CPF/CNPJ", &mut errors);
            validate_required(&c.creci, &format!("corretores[{i}].creci"), "CRECI", &mut errors);
            validate_percentage(
                c.participacao,
                &format!("corretores[{i}].participacao"),
                "Participação",
                &mut errors,
            );
        }

        errors.into_result()
    }
}

fn contratante_tokens(c: &Contratante) -> Substitutions {
    Substitutions::new()
        .with("nome_prop", c.nome.trim())
        .with("email_prop", c.email.trim())
        .with("endereco_prop", c.endereco.trim())
        .with("cpf_prop", c.cpf.trim())
        .with("tel_prop", c.telefone.trim())
        .with("cidade_prop", c.cidade.trim())
        .with("cep_prop", c.cep.trim())
        .with("uf_prop", c.uf.trim())
}

fn corretor_tokens(c: &Corretor) -> Substitutions {
    Substitutions::new()
        .with("nome_corretor", c.nome.trim())
        .with("cnpj_corretor", c.cnpj.trim())
        .with("endereco_corretor", c.endereco.trim())
        .with("tel_corretor", c.telefone.trim())
        .with("creci_corretor", c.creci.trim())
}

/// `testemunha_N`, `rg_N_testemunha` and `cpf_N_testemunha` for the first
/// two witnesses. `None` unless both are present.
pub fn witness_tokens(testemunhas: &[Testemunha]) -> Option<Substitutions> {
    if testemunhas.len() < 2 {
        return None;
    }
    let mut subs = Substitutions::new();
    for (i, t) in testemunhas.iter().take(2).enumerate() {
        let n = i + 1;
        subs.insert(format!("testemunha_{n}"), t.nome.trim());
        subs.insert(format!("rg_{n}_testemunha"), t.rg.trim());
        subs.insert(format!("cpf_{n}_testemunha"), t.cpf.trim());
    }
    Some(subs)
}

pub struct ContratoCorretagemGenerator {
    date: NaiveDate,
}

impl ContratoCorretagemGenerator {
    pub fn new() -> Self {
        Self { date: today() }
    }

    pub fn with_date(date: NaiveDate) -> Self {
        Self { date }
    }
}

impl Default for ContratoCorretagemGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator<ContratoCorretagemRequest> for ContratoCorretagemGenerator {
    fn kind(&self) -> &'static str {
        "contrato-de-corretagem"
    }

    fn template_for(&self, _request: &ContratoCorretagemRequest) -> Result<String, GeneratorError> {
        Ok(TemplateKey::ContratoCorretagem.file_name().to_string())
    }

    fn fill(
        &self,
        document: &mut DocxDocument,
        request: &ContratoCorretagemRequest,
    ) -> Result<FillOutcome, GeneratorError> {
        let (Some(first_contratante), Some(first_corretor)) =
            (request.contratantes.first(), request.corretores.first())
        else {
            return Err(GeneratorError::Validation(
                "Informe pelo menos um contratante e um corretor".to_string(),
            ));
        };

        document.replace_all(&Substitutions::new().with("{endereco_imovel}", request.endereco_imovel.trim()));

        let contratantes: Vec<Substitutions> = request.contratantes.iter().map(contratante_tokens).collect();
        document.repeat_table("{contratante_table}", &contratantes);

        let corretores: Vec<Substitutions> = request.corretores.iter().map(corretor_tokens).collect();
        document.repeat_table("{contratado_table}", &corretores);

        // Tokens outside the model tables refer to the first party of each side.
        let mut leftovers = contratante_tokens(first_contratante);
        for (token, value) in [
            ("nome_corretor", &first_corretor.nome),
            ("cnpj_corretor", &first_corretor.cnpj),
            ("endereco_corretor", &first_corretor.endereco),
            ("tel_corretor", &first_corretor.telefone),
            ("creci_corretor", &first_corretor.creci),
        ] {
            leftovers.insert(token, value.trim());
        }
        document.replace_all(&leftovers);

        let valor_comissao = request.valor_comissao();
        document.replace_all(
            &Substitutions::new()
                .with("{valor_comissao}", format_brl_prefixed(valor_comissao))
                .with("{valor_comissao_texto}", currency_words(valor_comissao))
                .with("{data}", format_date_extenso(self.date, true)),
        );

        let rows: Vec<Substitutions> = request
            .corretores
            .iter()
            .map(|c| {
                Substitutions::new()
                    .with("name_corretor", c.nome.trim())
                    .with("cnpj_number_comissao", c.cnpj.trim())
                    .with("corretagem_percentual", format_percent(c.participacao))
                    .with("valor_corretagem", format_brl_prefixed(valor_comissao * (c.participacao / 100.0)))
            })
            .collect();
        document.expand_rows("{comissao_table}", &rows, None);

        let proprietarios: Vec<Vec<String>> = request
            .contratantes
            .iter()
            .map(|c| vec![format!("Nome: {}", c.nome.trim()), format!("CPF: {}", c.cpf.trim())])
            .collect();
        document.signature_block("{assinatura_prop}", &proprietarios);

        let corretores: Vec<Vec<String>> = request
            .corretores
            .iter()
            .map(|c| vec![format!("Nome: {}", c.nome.trim()), format!("CNPJ: {}", c.cnpj.trim())])
            .collect();
        document.signature_block("{assinatura_corretor}", &corretores);

        if let Some(witnesses) = witness_tokens(&request.testemunhas) {
            document.replace_all(&witnesses);
        }

        Ok(FillOutcome::default())
    }
}
