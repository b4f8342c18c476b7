//! Background worker that deletes old generated files.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use uuid::Uuid;

use crate::converter::SUPPORTED_EXTENSIONS;

/// Files this service wrote: a UUID stem with `.pdf` or a convertible extension.
pub fn is_generated_file(path: &Path) -> bool {
    let stem_is_uuid = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| Uuid::parse_str(s).is_ok())
        .unwrap_or(false);
    let known_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            e == "pdf" || SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false);
    stem_is_uuid && known_extension
}

/// Delete generated files under `dir` last modified more than `ttl` ago.
/// Returns how many were removed.
pub async fn sweep_outputs(dir: &Path, ttl: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut expired: Vec<PathBuf> = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !is_generated_file(&path) {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age > ttl {
            expired.push(path);
        }
    }

    let mut removed = 0;
    for path in expired {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => log::warn!("Failed to delete {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

/// Runs forever, sweeping `dir` every `interval`. Returns at once when
/// `ttl` is zero.
pub async fn start_cleanup_worker(dir: PathBuf, ttl: Duration, interval: Duration) {
    if ttl.is_zero() {
        log::info!("Output cleanup disabled");
        return;
    }
    log::info!(
        "Output cleanup worker started ({}: ttl {}s, every {}s)",
        dir.display(),
        ttl.as_secs(),
        interval.as_secs()
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match sweep_outputs(&dir, ttl).await {
            Ok(0) => log::debug!("Output cleanup found nothing to delete"),
            Ok(n) => log::info!("Output cleanup deleted {} file(s)", n),
            Err(e) => log::error!("Output cleanup failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_uuid_named_outputs_are_generated() {
        let id = Uuid::new_v4();
        assert!(is_generated_file(Path::new(&format!("/tmp/{id}.pdf"))));
        assert!(is_generated_file(Path::new(&format!("/tmp/{id}.docx"))));
        assert!(is_generated_file(Path::new(&format!("/tmp/{id}.PPTX"))));
        assert!(!is_generated_file(Path::new(&format!("/tmp/{id}.txt"))));
        assert!(!is_generated_file(Path::new("/tmp/relatorio.pdf")));
    }

    #[tokio::test]
    async fn sweeps_only_expired_generated_files() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let pdf = dir.path().join(format!("{id}.pdf"));
        let docx = dir.path().join(format!("{id}.docx"));
        let other = dir.path().join("notes.pdf");
        for path in [&pdf, &docx, &other] {
            std::fs::write(path, b"x").unwrap();
        }

        assert_eq!(sweep_outputs(dir.path(), Duration::from_secs(3600)).await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sweep_outputs(dir.path(), Duration::from_millis(1)).await.unwrap(), 2);
        assert!(!pdf.exists());
        assert!(!docx.exists());
        assert!(other.exists());
    }

    #[tokio::test]
    async fn zero_ttl_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        tokio::time::timeout(
            Duration::from_secs(1),
            start_cleanup_worker(dir.path().to_path_buf(), Duration::ZERO, Duration::from_secs(1)),
        )
        .await
        .unwrap();
    }
}
