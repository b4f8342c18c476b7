//! Traits shared by every generator.

use crate::docx::DocxDocument;

use super::GeneratorError;

/// Trait for validating request objects.
pub trait Validator {
    /// Validate the state of the object.
    fn validate(&self) -> Result<(), String>;
}

/// What a fill pass left behind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FillOutcome {
    /// Placeholders still present in the document.
    pub unresolved: Vec<String>,
}

/// Trait for document generators.
pub trait Generator<Req> {
    /// Short document kind, reported back as `tipo`.
    fn kind(&self) -> &'static str;

    /// File name of the template to load for this request.
    fn template_for(&self, request: &Req) -> Result<String, GeneratorError>;

    /// Fill the parsed template in place.
    fn fill(&self, document: &mut DocxDocument, request: &Req) -> Result<FillOutcome, GeneratorError>;
}
