//! Request checks shared by the generators.
//!
//! Problems are collected rather than returned one by one, and reported
//! to the client as a single numbered message in Portuguese.

use std::fmt;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    /// How to fix it, shown after the message.
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn empty_field(field: &str, label: &str) -> Self {
        Self::new(field, format!("{} não pode ficar vazio", label))
            .with_suggestion(format!("Preencha {}", label.to_lowercase()))
    }

    pub fn invalid_email(field: &str) -> Self {
        Self::new(field, "E-mail inválido").with_suggestion("Use o formato nome@dominio.com")
    }

    pub fn empty_list(field: &str, label: &str) -> Self {
        Self::new(field, format!("Informe pelo menos um(a) {}", label))
    }

    pub fn not_positive(field: &str, label: &str) -> Self {
        Self::new(field, format!("{} deve ser maior que zero", label))
    }

    pub fn out_of_range(field: &str, label: &str, min: f64, max: f64) -> Self {
        Self::new(field, format!("{} deve estar entre {} e {}", label, min, max))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        match &self.suggestion {
            Some(suggestion) => write!(f, ". {}", suggestion),
            None => Ok(()),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// "Validação falhou: N erro(s)" followed by one numbered line per problem.
    pub fn to_message(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }

        let mut message = format!(
            "Validação falhou: {} erro(s) encontrado(s)\n",
            self.errors.len()
        );
        for (i, error) in self.errors.iter().enumerate() {
            message.push_str(&format!("\n{}. {}", i + 1, error));
        }
        message.push_str("\n\nCorrija os dados acima e tente novamente.");
        message
    }

    pub fn into_result(self) -> Result<(), String> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.to_message())
        }
    }
}

/// Blank after trimming counts as missing. Document numbers (CPF, CNPJ,
/// CRECI) only go through this check; their format is the client's concern.
pub fn validate_required(value: &str, field: &str, label: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, label));
    }
}

/// `local@domain.tld`, nothing stricter.
pub fn validate_email(value: &str, field: &str, errors: &mut ValidationErrors) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(ValidationError::empty_field(field, "E-mail"));
        return;
    }
    let valid = trimmed.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });
    if !valid {
        errors.add(ValidationError::invalid_email(field));
    }
}

pub fn validate_positive(value: f64, field: &str, label: &str, errors: &mut ValidationErrors) {
    if !value.is_finite() || value <= 0.0 {
        errors.add(ValidationError::not_positive(field, label));
    }
}

/// Percentages live in (0, 100].
pub fn validate_percentage(value: f64, field: &str, label: &str, errors: &mut ValidationErrors) {
    if !value.is_finite() || value <= 0.0 || value > 100.0 {
        errors.add(ValidationError::out_of_range(field, label, 0.0, 100.0));
    }
}

pub fn validate_non_empty<T>(items: &[T], field: &str, label: &str, errors: &mut ValidationErrors) {
    if items.is_empty() {
        errors.add(ValidationError::empty_list(field, label));
    }
}
