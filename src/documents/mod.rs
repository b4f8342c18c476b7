//! Generators module - business logic that fills `.docx` templates.
//!
//! This module contains one generator per document type:
//! - `AutorizacaoGenerator` - autorização de venda (corretor or imobiliária)
//! - `ContratoCorretagemGenerator` - contrato de corretagem
//! - `DeclaracaoVisitaGenerator` - declaração de visita with optional NPS
//! - `PromessaCompraVendaGenerator` - promessa de compra e venda
//! - `ModeloLivreGenerator` - any template filled from a key/value map

pub mod autorizacao;
pub mod common;
pub mod contrato_corretagem;
pub mod declaracao_visita;
pub mod extenso;
pub mod modelo_livre;
pub mod promessa_compra_venda;
pub mod templates;
pub mod traits;
pub mod validation;

pub use autorizacao::{AutorizacaoGenerator, AutorizacaoVendaRequest};
pub use contrato_corretagem::{ContratoCorretagemGenerator, ContratoCorretagemRequest};
pub use declaracao_visita::{DeclaracaoVisitaGenerator, DeclaracaoVisitaRequest};
pub use modelo_livre::{ModeloLivreGenerator, ModeloLivreRequest};
pub use promessa_compra_venda::{PromessaCompraVendaGenerator, PromessaCompraVendaRequest};
pub use templates::{TemplateError, TemplateKey, TemplateStore};
pub use traits::{FillOutcome, Generator, Validator};

use thiserror::Error;

use crate::docx::DocxError;

/// Errors that can occur while filling a template.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Tipo de template inválido.")]
    InvalidTemplateType(String),
    #[error("Nome de modelo inválido: {0}")]
    InvalidTemplateName(String),
    #[error("{0}")]
    Validation(String),
    #[error("failed to process docx: {0}")]
    Docx(#[from] DocxError),
}
