//! Template lookup and the in-memory template cache.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use moka::future::Cache;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{0}' not found")]
    NotFound(String),
    #[error("invalid template name '{0}'")]
    InvalidName(String),
    #[error("failed to read template '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// The fixed templates behind the real-estate endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    AutorizacaoCorretor,
    AutorizacaoImobiliaria,
    ContratoCorretagem,
    DeclaracaoVisita,
    PromessaCompraVenda,
}

impl TemplateKey {
    pub const ALL: [TemplateKey; 5] = [
        TemplateKey::AutorizacaoCorretor,
        TemplateKey::AutorizacaoImobiliaria,
        TemplateKey::ContratoCorretagem,
        TemplateKey::DeclaracaoVisita,
        TemplateKey::PromessaCompraVenda,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    pub fn key(self) -> &'static str {
        match self {
            TemplateKey::AutorizacaoCorretor => "autorizacao_corretor",
            TemplateKey::AutorizacaoImobiliaria => "autorizacao_imobiliaria",
            TemplateKey::ContratoCorretagem => "contrato_corretagem",
            TemplateKey::DeclaracaoVisita => "declaracao_visita",
            TemplateKey::PromessaCompraVenda => "promessa_compra_venda",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            TemplateKey::AutorizacaoCorretor => "autorizacao-de-venda-corretor.docx",
            TemplateKey::AutorizacaoImobiliaria => "autorizacao-de-venda-imob.docx",
            TemplateKey::ContratoCorretagem => "contrato-de-corretagem.docx",
            TemplateKey::DeclaracaoVisita => "declaracao-de-visita.docx",
            TemplateKey::PromessaCompraVenda => "promessa-compra-e-venda.docx",
        }
    }
}

/// A bare `.docx` file name: no separators, no parent references.
pub fn is_valid_template_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && !name.contains("..")
        && !name.starts_with('.')
        && name.to_ascii_lowercase().ends_with(".docx")
}

/// Reads templates from disk and keeps their bytes for ten minutes.
#[derive(Clone)]
pub struct TemplateStore {
    dir: PathBuf,
    cache: Cache<String, Arc<Vec<u8>>>,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(10 * 60))
            .max_capacity(32)
            .build();

        Self {
            dir: dir.into(),
            cache,
        }
    }

    pub async fn load(&self, name: &str) -> Result<Arc<Vec<u8>>, TemplateError> {
        if !is_valid_template_name(name) {
            return Err(TemplateError::InvalidName(name.to_string()));
        }

        if let Some(bytes) = self.cache.get(name).await {
            debug!("Template cache hit: {}", name);
            return Ok(bytes);
        }

        let path = self.dir.join(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => Arc::new(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TemplateError::NotFound(name.to_string()));
            }
            Err(source) => {
                return Err(TemplateError::Io {
                    name: name.to_string(),
                    source,
                })
            }
        };

        debug!("Loaded template {} ({} bytes)", path.display(), bytes.len());
        self.cache.insert(name.to_string(), bytes.clone()).await;
        Ok(bytes)
    }

    /// `.docx` files available in the templates directory, sorted.
    pub async fn list(&self) -> Result<Vec<String>, TemplateError> {
        let io_error = |source| TemplateError::Io {
            name: self.dir.display().to_string(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_error)?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_valid_template_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_files() {
        assert_eq!(
            TemplateKey::from_key("autorizacao_imobiliaria").map(TemplateKey::file_name),
            Some("autorizacao-de-venda-imob.docx")
        );
        assert_eq!(TemplateKey::from_key("autorizacao_outra"), None);
        for key in TemplateKey::ALL {
            assert_eq!(TemplateKey::from_key(key.key()), Some(key));
        }
    }

    #[test]
    fn rejects_paths_and_other_extensions() {
        assert!(is_valid_template_name("contrato.docx"));
        assert!(!is_valid_template_name("../contrato.docx"));
        assert!(!is_valid_template_name("sub/contrato.docx"));
        assert!(!is_valid_template_name("contrato.pdf"));
        assert!(!is_valid_template_name(".docx"));
    }

    #[tokio::test]
    async fn loads_and_caches_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("modelo.docx"), b"bytes").unwrap();
        let store = TemplateStore::new(dir.path());

        assert_eq!(store.load("modelo.docx").await.unwrap().as_slice(), b"bytes");

        // Served from cache after the file is gone.
        std::fs::remove_file(dir.path().join("modelo.docx")).unwrap();
        assert!(store.load("modelo.docx").await.is_ok());

        assert!(matches!(
            store.load("outro.docx").await,
            Err(TemplateError::NotFound(_))
        ));
        assert!(matches!(
            store.load("../x.docx").await,
            Err(TemplateError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn lists_docx_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.docx"), b"").unwrap();
        std::fs::write(dir.path().join("a.docx"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        let store = TemplateStore::new(dir.path());
        assert_eq!(store.list().await.unwrap(), vec!["a.docx", "b.docx"]);
    }

    #[tokio::test]
    async fn listing_an_unreadable_dir_is_an_error() {
        let store = TemplateStore::new("/nonexistent/templates");
        assert!(matches!(store.list().await, Err(TemplateError::Io { .. })));
    }
}
