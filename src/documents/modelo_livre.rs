//! Free-form generator: any template from the templates directory filled
//! from a plain key/value map of `{{ key }}` placeholders.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::docx::DocxDocument;

use super::templates::is_valid_template_name;
use super::traits::{FillOutcome, Generator, Validator};
use super::GeneratorError;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ModeloLivreRequest {
    /// Template file name, e.g. `recibo.docx`
    pub modelo: String,
    /// Values for the `{{ key }}` placeholders
    #[serde(default)]
    pub dados: HashMap<String, String>,
}

impl Validator for ModeloLivreRequest {
    fn validate(&self) -> Result<(), String> {
        use super::validation::*;

        let mut errors = ValidationErrors::new();
        validate_required(&self.modelo, "modelo", "Modelo", &mut errors);
        if !self.modelo.trim().is_empty() && !is_valid_template_name(self.modelo.trim()) {
            errors.add(
                ValidationError::new("modelo", "Nome de modelo inválido")
                    .with_suggestion("Informe apenas o nome de um arquivo .docx da pasta de modelos"),
            );
        }
        errors.into_result()
    }
}

#[derive(Default)]
pub struct ModeloLivreGenerator;

impl ModeloLivreGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator<ModeloLivreRequest> for ModeloLivreGenerator {
    fn kind(&self) -> &'static str {
        "modelo-livre"
    }

    fn template_for(&self, request: &ModeloLivreRequest) -> Result<String, GeneratorError> {
        let name = request.modelo.trim();
        if !is_valid_template_name(name) {
            return Err(GeneratorError::InvalidTemplateName(name.to_string()));
        }
        Ok(name.to_string())
    }

    fn fill(&self, document: &mut DocxDocument, request: &ModeloLivreRequest) -> Result<FillOutcome, GeneratorError> {
        let unresolved = document.fill_braced(&request.dados);
        Ok(FillOutcome { unresolved })
    }
}
