//! Generator for the promessa de compra e venda.
//!
//! Parties are written as qualification paragraphs with bold names, the
//! lien, FGTS and agency clauses are composed as rich text, and payments
//! expand the first table of the template.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::docx::{DocxDocument, RichText, Substitutions};

use super::common::{format_brl, format_brl_prefixed, format_date_extenso, today};
use super::contrato_corretagem::{witness_tokens, Testemunha};
use super::extenso::whole_currency_words;
use super::templates::TemplateKey;
use super::traits::{FillOutcome, Generator, Validator};
use super::GeneratorError;

const PAYMENT_FONT_PT: u32 = 9;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Pessoa {
    pub nome: String,
    pub nacionalidade: String,
    pub rg_number: String,
    pub ssp_rg: String,
    pub cpf: String,
    pub estado_civil: String,
    pub endereco: String,
    pub telefone: String,
    #[serde(default)]
    pub nome_conjuge: Option<String>,
    #[serde(default)]
    pub nacionalidade_conjuge: Option<String>,
    #[serde(default)]
    pub rg_conjuge: Option<String>,
    #[serde(default)]
    pub ssp_rg_conjuge: Option<String>,
    #[serde(default)]
    pub cpf_conjuge: Option<String>,
}

/// Spouse data, present only when every field is filled in.
struct Conjuge<'a> {
    nome: &'a str,
    nacionalidade: &'a str,
    rg: &'a str,
    ssp_rg: &'a str,
    cpf: &'a str,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Pessoa {
    fn is_married(&self) -> bool {
        self.estado_civil.trim().to_lowercase().starts_with("casad")
    }

    fn conjuge(&self) -> Option<Conjuge<'_>> {
        if !self.is_married() {
            return None;
        }
        Some(Conjuge {
            nome: filled(&self.nome_conjuge)?,
            nacionalidade: filled(&self.nacionalidade_conjuge)?,
            rg: filled(&self.rg_conjuge)?,
            ssp_rg: filled(&self.ssp_rg_conjuge)?,
            cpf: filled(&self.cpf_conjuge)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DadosImovel {
    pub endereco_imovel: String,
    pub matricula_imovel: String,
    pub numero_cartorio: String,
    #[serde(default)]
    pub forma_de_pagamento_sinal: String,
    pub valor_imovel: f64,
    #[serde(default)]
    pub valor_sinal: Option<f64>,
    #[serde(default)]
    pub valor_comissao: Option<f64>,
    #[serde(default)]
    pub gravame: bool,
    #[serde(default)]
    pub tipo_gravame: String,
    #[serde(default)]
    pub beneficiario_gravame: String,
    #[serde(default)]
    pub beneficiario_cnpj_gravame: String,
    #[serde(default)]
    pub registro_gravame: String,
    #[serde(default)]
    pub fgts: bool,
    #[serde(default)]
    pub relacao_movies: Option<String>,
    #[serde(rename = "isImob", default)]
    pub is_imob: bool,
    #[serde(rename = "nomeImob", default)]
    pub nome_imob: Option<String>,
}

fn default_juros() -> String {
    "0%".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Pagamento {
    pub tipo: String,
    pub vencimento: String,
    pub valor: f64,
    pub forma_pagamento: String,
    #[serde(default = "default_juros")]
    pub juros: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PromessaCompraVendaRequest {
    pub vendedores: Vec<Pessoa>,
    pub compradores: Vec<Pessoa>,
    pub imovel: DadosImovel,
    #[serde(default)]
    pub pagamentos: Vec<Pagamento>,
    #[serde(default)]
    pub testemunhas: Vec<Testemunha>,
}

impl Validator for PromessaCompraVendaRequest {
    fn validate(&self) -> Result<(), String> {
        use super::validation::*;

        let mut errors = ValidationErrors::new();

        for (list, field, label) in [
            (&self.vendedores, "vendedores", "vendedor"),
            (&self.compradores, "compradores", "comprador"),
        ] {
            validate_non_empty(list, field, label, &mut errors);
            for (i, pessoa) in list.iter().enumerate() {
                validate_required(&pessoa.nome, &format!("{field}[{i}].nome"), "Nome", &mut errors);
                validate_required(&pessoa.cpf, &format!("{field}[{i}].cpf"), "CPF", &mut errors);
            }
        }

        let imovel = &self.imovel;
        validate_required(&imovel.endereco_imovel, "imovel.endereco_imovel", "Endereço do imóvel", &mut errors);
        validate_required(&imovel.matricula_imovel, "imovel.matricula_imovel", "Matrícula", &mut errors);
        validate_positive(imovel.valor_imovel, "imovel.valor_imovel", "Valor do imóvel", &mut errors);
        if imovel.gravame {
            validate_required(&imovel.tipo_gravame, "imovel.tipo_gravame", "Tipo do gravame", &mut errors);
            validate_required(
                &imovel.beneficiario_gravame,
                "imovel.beneficiario_gravame",
                "Beneficiário do gravame",
                &mut errors,
            );
        }

        for (i, pagamento) in self.pagamentos.iter().enumerate() {
            validate_required(&pagamento.tipo, &format!("pagamentos[{i}].tipo"), "Tipo de pagamento", &mut errors);
            validate_positive(pagamento.valor, &format!("pagamentos[{i}].valor"), "Valor", &mut errors);
        }

        errors.into_result()
    }
}

/// Which side of the deal a qualification paragraph describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parte {
    Vendedores,
    Compradores,
}

/// Qualification paragraph for one side of the contract.
pub fn qualification(pessoas: &[Pessoa], parte: Parte) -> RichText {
    let mut rich = RichText::new();
    let total = pessoas.len();

    for (idx, p) in pessoas.iter().enumerate() {
        if idx > 0 {
            rich.push_plain(if idx == total - 1 { " e " } else { ", " });
        }
        rich.push_bold(p.nome.trim());
        rich.push_plain(format!(
            ", {}, portador(a) da carteira de identidade nº {}, expedido pela {}, inscrito(a) no CPF sob o nº {}, {}, ",
            p.nacionalidade.trim(),
            p.rg_number.trim(),
            p.ssp_rg.trim(),
            p.cpf.trim(),
            p.estado_civil.trim()
        ));

        if let Some(c) = p.conjuge() {
            rich.push_plain("com ");
            rich.push_bold(c.nome);
            rich.push_plain(format!(
                ", {}, portador(a) da carteira de identidade nº {}, expedido pela {}, inscrito(a) no CPF sob o nº {}, ",
                c.nacionalidade, c.rg, c.ssp_rg, c.cpf
            ));
        }

        rich.push_plain(format!(
            "residente(s) e domiciliado(a)(s) no endereço {}, telefone {}",
            p.endereco.trim(),
            p.telefone.trim()
        ));
    }

    rich.push_plain(", doravante denominado(a)(s) simplesmente, ");
    rich.push_bold(match parte {
        Parte::Vendedores => "PROMITENTE(S) VENDEDOR(A)(ES).",
        Parte::Compradores => "PROMISSÁRIO(A)(S) COMPRADOR(A)(ES).",
    });
    rich
}

/// Lien exception, inline after the "livre e desembaraçado" sentence.
pub fn gravame_clause(imovel: &DadosImovel) -> RichText {
    let rich = RichText::new().trimming_before();
    if !imovel.gravame {
        return rich;
    }
    rich.plain(format!(
        ", com exceção da {} em favor da(o) {}, inscrito no CNPJ/MF nº {}, registrada no R-{} da matrícula do \
         imóvel no Cartório de Registro de Imóveis, cujo saldo devedor será quitado pelo banco financiador \
         dessa transação (abatendo do valor a ser repassado ao(s) ",
        imovel.tipo_gravame.trim(),
        imovel.beneficiario_gravame.trim(),
        imovel.beneficiario_cnpj_gravame.trim(),
        imovel.registro_gravame.trim()
    ))
    .bold("PROMITENTE(S) VENDEDOR(ES)")
    .plain(" pelo sistema de ")
    .bold("Interveniente Quitante")
    .plain(", e a consequente averbação da baixa da referida Alienação Fiduciária ocorrerá junto com o registro da presente Compra e Venda.")
}

pub fn fgts_clause(active: bool) -> RichText {
    if !active {
        return RichText::new();
    }
    RichText::new()
        .plain("2.7. ")
        .bold("O(s) PROMISSÁRIO(S) COMPRADOR(ES) ")
        .plain(
            "se responsabiliza(m) plenamente pela concessão do financiamento e/ou saque do FGTS, que poderá \
             ser obtido junto ao Agente Financiador que escolher(em), obrigando-se o(s) PROMISSÁRIO(S) \
             COMPRADOR(ES) a prover(em) o pagamento da referida parcela, ou de parte dela, caso não \
             financie(m) o valor total, com recursos próprios.\n\n",
        )
        .bold("Parágrafo Primeiro: ")
        .plain(
            "o pagamento de eventuais tarifas e despesas decorrentes do processo de financiamento serão de \
             inteira responsabilidade do(s) PROMISSÁRIO(S) COMPRADOR(ES).",
        )
}

/// Who takes part on the brokerage side.
pub fn intermediacao_clause(imovel: &DadosImovel) -> RichText {
    match imovel.nome_imob.as_deref().map(str::trim) {
        Some(nome) if imovel.is_imob && !nome.is_empty() => RichText::new()
            .plain("da ")
            .bold(nome)
            .plain(", e do(s) corretor(es) de imóveis parceiros/associados"),
        _ => RichText::new().plain("do(s) corretor(es) de imóveis"),
    }
}

fn amount(value: Option<f64>) -> String {
    value.map(format_brl).unwrap_or_default()
}

fn amount_words(value: Option<f64>) -> String {
    value.map(whole_currency_words).unwrap_or_default()
}

pub struct PromessaCompraVendaGenerator {
    date: NaiveDate,
}

impl PromessaCompraVendaGenerator {
    pub fn new() -> Self {
        Self { date: today() }
    }

    pub fn with_date(date: NaiveDate) -> Self {
        Self { date }
    }

    fn substitutions(&self, imovel: &DadosImovel) -> Substitutions {
        Substitutions::new()
            .with("{endereco_imovel}", imovel.endereco_imovel.trim())
            .with("{matricula_imovel}", imovel.matricula_imovel.trim())
            .with("{numero_cartorio}", imovel.numero_cartorio.trim())
            .with("{forma_de_pagamento_sinal}", imovel.forma_de_pagamento_sinal.trim())
            .with("{valor_imovel}", format_brl(imovel.valor_imovel))
            .with("{valor_imovel_texto}", whole_currency_words(imovel.valor_imovel))
            .with("{valor_sinal}", amount(imovel.valor_sinal))
            .with("{valor_sinal_texto}", amount_words(imovel.valor_sinal))
            .with("{valor_comissao}", amount(imovel.valor_comissao))
            .with("{valor_comissao_texto}", amount_words(imovel.valor_comissao))
            .with("{data_full}", format_date_extenso(self.date, true))
    }
}

impl Default for PromessaCompraVendaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator<PromessaCompraVendaRequest> for PromessaCompraVendaGenerator {
    fn kind(&self) -> &'static str {
        "promessa-compra-e-venda"
    }

    fn template_for(&self, _request: &PromessaCompraVendaRequest) -> Result<String, GeneratorError> {
        Ok(TemplateKey::PromessaCompraVenda.file_name().to_string())
    }

    fn fill(
        &self,
        document: &mut DocxDocument,
        request: &PromessaCompraVendaRequest,
    ) -> Result<FillOutcome, GeneratorError> {
        let imovel = &request.imovel;

        document.replace_paragraph_with("{vendedores}", &qualification(&request.vendedores, Parte::Vendedores));
        document.replace_paragraph_with("{compradores}", &qualification(&request.compradores, Parte::Compradores));

        document.replace_with_rich("{gravame}", &gravame_clause(imovel));
        document.replace_all(&self.substitutions(imovel));

        document.replace_paragraph_with("{fgts}", &fgts_clause(imovel.fgts));

        let movies = match imovel.relacao_movies.as_deref().map(str::trim) {
            Some(texto) if !texto.is_empty() => RichText::new().plain(format!("\"{texto}\"")),
            _ => RichText::new(),
        };
        document.replace_paragraph_with("{relacao_movies}", &movies);

        document.replace_with_rich("{{isImob}}", &intermediacao_clause(imovel));

        let pagamentos: Vec<Substitutions> = request
            .pagamentos
            .iter()
            .map(|p| {
                Substitutions::new()
                    .with("tipo", p.tipo.trim())
                    .with("vencimento", p.vencimento.trim())
                    .with("valor", format_brl_prefixed(p.valor))
                    .with("forma", p.forma_pagamento.trim())
                    .with("juros", p.juros.trim())
            })
            .collect();
        document.expand_rows_or_first("{pagamento_table}", &pagamentos, Some(PAYMENT_FONT_PT));

        for (placeholder, pessoas) in [
            ("{assinatura_vendedor}", &request.vendedores),
            ("{assinatura_comprador}", &request.compradores),
        ] {
            let signers: Vec<Vec<String>> = pessoas
                .iter()
                .map(|p| vec![format!("Nome: {}", p.nome.trim()), format!("CPF: {}", p.cpf.trim())])
                .collect();
            document.signature_block(placeholder, &signers);
        }

        if let Some(witnesses) = witness_tokens(&request.testemunhas) {
            document.replace_all(&witnesses);
        }

        Ok(FillOutcome::default())
    }
}
