//! Shared application state, handed to every handler as `web::Data<AppState>`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::converter::fonts::prepare_fonts;
use crate::converter::{DocumentConverter, LibreOfficeConverter};
use crate::documents::TemplateStore;
use crate::generation::DocumentService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub documents: DocumentService,
    /// fontconfig file written for the bundled fonts, if there were any
    pub fonts_conf: Option<PathBuf>,
}

impl AppState {
    /// Prepare the output dir and fonts, then locate LibreOffice.
    pub async fn new(config: AppConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .with_context(|| format!("cannot create output dir {}", config.output_dir.display()))?;

        let fonts_conf = match prepare_fonts(&config.fonts_dir, &config.output_dir).await {
            Ok(conf) => conf,
            Err(e) => {
                log::warn!("Bundled fonts could not be prepared: {}", e);
                None
            }
        };

        let converter = LibreOfficeConverter::locate(
            config.converter_bin.as_deref(),
            config.conversion_timeout,
        )
        .context("LibreOffice is required to convert documents")?
        .with_fonts_conf(fonts_conf.clone());

        let mut state = Self::with_converter(config, Arc::new(converter));
        state.fonts_conf = fonts_conf;
        Ok(state)
    }

    /// State around an already built converter; no filesystem setup.
    pub fn with_converter(config: AppConfig, converter: Arc<dyn DocumentConverter>) -> Self {
        let documents = DocumentService::new(
            TemplateStore::new(&config.templates_dir),
            converter,
            config.output_dir.clone(),
            config.max_concurrent_conversions,
        );

        Self {
            config: Arc::new(config),
            documents,
            fonts_conf: None,
        }
    }
}
