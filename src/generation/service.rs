//! The fill → save → convert pipeline behind every endpoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use actix_web::web;
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::converter::{expected_output, ConvertError, DocumentConverter, ExportFilter};
use crate::documents::{Generator, GeneratorError, TemplateError, TemplateStore, Validator};
use crate::docx::{DocxDocument, DocxError};
use crate::metrics;

/// `tipo` reported for direct conversions.
pub const CONVERSION_KIND: &str = "conversao";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("invalid template file: {0}")]
    Docx(#[from] DocxError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("background task failed: {0}")]
    Blocking(String),
    #[error("conversion queue is closed")]
    Unavailable,
}

impl ServiceError {
    /// Label used for the outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            ServiceError::Generator(GeneratorError::Docx(_)) => "erro_preenchimento",
            ServiceError::Generator(_) => "erro_validacao",
            ServiceError::Template(TemplateError::NotFound(_)) => "modelo_ausente",
            ServiceError::Template(_) => "erro_validacao",
            ServiceError::Convert(ConvertError::Timeout(_)) => "timeout",
            ServiceError::Convert(ConvertError::UnsupportedFormat(_)) => "erro_validacao",
            ServiceError::Convert(_) => "erro_conversao",
            ServiceError::Docx(_)
            | ServiceError::Io(_)
            | ServiceError::Blocking(_)
            | ServiceError::Unavailable => "erro_interno",
        }
    }
}

/// Files produced for one request, both inside the output dir.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub id: Uuid,
    pub kind: &'static str,
    /// The filled `.docx`, or the uploaded source for direct conversions
    pub docx_name: String,
    pub pdf_name: String,
    pub unresolved: Vec<String>,
}

#[derive(Clone)]
pub struct DocumentService {
    templates: TemplateStore,
    converter: Arc<dyn DocumentConverter>,
    permits: Arc<Semaphore>,
    output_dir: PathBuf,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl DocumentService {
    pub fn new(
        templates: TemplateStore,
        converter: Arc<dyn DocumentConverter>,
        output_dir: PathBuf,
        max_concurrent_conversions: usize,
    ) -> Self {
        Self {
            templates,
            converter,
            permits: Arc::new(Semaphore::new(max_concurrent_conversions.max(1))),
            output_dir,
        }
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn describe_converter(&self) -> String {
        self.converter.describe()
    }

    /// Validate, fill the generator's template and convert the result.
    pub async fn generate<G, Req>(&self, generator: G, request: Req) -> Result<GeneratedDocument, ServiceError>
    where
        G: Generator<Req> + Send + 'static,
        Req: Validator + Send + 'static,
    {
        let kind = generator.kind();
        let result = self.generate_inner(generator, request).await;
        match &result {
            Ok(_) => metrics::record_outcome(kind, "sucesso"),
            Err(e) => {
                warn!("Generation of {} failed: {}", kind, e);
                metrics::record_outcome(kind, e.outcome());
            }
        }
        result
    }

    async fn generate_inner<G, Req>(&self, generator: G, request: Req) -> Result<GeneratedDocument, ServiceError>
    where
        G: Generator<Req> + Send + 'static,
        Req: Validator + Send + 'static,
    {
        let kind = generator.kind();
        request.validate().map_err(GeneratorError::Validation)?;
        let template_name = generator.template_for(&request)?;
        let template = self.templates.load(&template_name).await?;

        let id = Uuid::new_v4();
        let docx_path = self.output_dir.join(format!("{id}.docx"));
        debug!("Filling {} for {} into {}", template_name, kind, docx_path.display());

        let target = docx_path.clone();
        let unresolved = web::block(move || -> Result<Vec<String>, ServiceError> {
            let mut document = DocxDocument::from_bytes(&template)?;
            let outcome = generator.fill(&mut document, &request)?;
            document.save(&target)?;
            Ok(outcome.unresolved)
        })
        .await
        .map_err(|e| ServiceError::Blocking(e.to_string()))??;

        if !unresolved.is_empty() {
            info!("{} left {} placeholder(s) unresolved", kind, unresolved.len());
        }

        let pdf = self.convert(kind, &docx_path).await?;
        Ok(GeneratedDocument {
            id,
            kind,
            docx_name: file_name(&docx_path),
            pdf_name: file_name(&pdf),
            unresolved,
        })
    }

    /// Store an uploaded office file under a fresh name and convert it as is.
    pub async fn convert_upload(&self, original_name: &str, bytes: &[u8]) -> Result<GeneratedDocument, ServiceError> {
        let result = self.convert_upload_inner(original_name, bytes).await;
        match &result {
            Ok(_) => metrics::record_outcome(CONVERSION_KIND, "sucesso"),
            Err(e) => {
                warn!("Conversion of upload {} failed: {}", original_name, e);
                metrics::record_outcome(CONVERSION_KIND, e.outcome());
            }
        }
        result
    }

    async fn convert_upload_inner(&self, original_name: &str, bytes: &[u8]) -> Result<GeneratedDocument, ServiceError> {
        let extension = Path::new(original_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if ExportFilter::for_extension(&extension).is_none() {
            return Err(ConvertError::UnsupportedFormat(extension).into());
        }

        let id = Uuid::new_v4();
        let input = self.output_dir.join(format!("{id}.{extension}"));
        tokio::fs::write(&input, bytes).await?;
        debug!("Stored upload {} as {}", original_name, input.display());

        let pdf = self.convert(CONVERSION_KIND, &input).await?;
        Ok(GeneratedDocument {
            id,
            kind: CONVERSION_KIND,
            docx_name: file_name(&input),
            pdf_name: file_name(&pdf),
            unresolved: Vec::new(),
        })
    }

    /// Convert `input` into the output dir once a permit is free.
    async fn convert(&self, kind: &str, input: &Path) -> Result<PathBuf, ServiceError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ServiceError::Unavailable)?;

        let started = Instant::now();
        let result = self.converter.convert(input, &self.output_dir).await;
        metrics::observe_conversion(kind, started.elapsed());

        match result {
            Ok(pdf) if pdf.is_file() => Ok(pdf),
            Ok(pdf) => {
                error!("Converter reported {} but the file is missing", pdf.display());
                Err(ConvertError::MissingOutput(pdf).into())
            }
            Err(e) => {
                let partial = expected_output(input, &self.output_dir);
                if partial.exists() {
                    if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                        warn!("Failed to remove {}: {}", partial.display(), remove_err);
                    }
                }
                Err(e.into())
            }
        }
    }
}
