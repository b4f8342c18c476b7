//! Headless LibreOffice converter.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::{expected_output, ConvertError, DocumentConverter, ExportFilter};

/// Binaries tried in order when none is configured.
pub const CANDIDATE_BINARIES: [&str; 3] = ["libreoffice", "soffice", "loffice"];

/// First executable named `name` on `PATH`, or `name` itself when it
/// already is a path to an existing file.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

pub struct LibreOfficeConverter {
    binary: PathBuf,
    timeout: Duration,
    fonts_conf: Option<PathBuf>,
}

impl LibreOfficeConverter {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            fonts_conf: None,
        }
    }

    /// Use `configured` if given, else the first of libreoffice, soffice
    /// and loffice found on `PATH`.
    pub fn locate(configured: Option<&str>, timeout: Duration) -> Result<Self, ConvertError> {
        let binary = match configured {
            Some(name) => find_executable(name).ok_or_else(|| ConvertError::BinaryNotFound(name.to_string()))?,
            None => CANDIDATE_BINARIES
                .iter()
                .find_map(|name| find_executable(name))
                .ok_or_else(|| ConvertError::BinaryNotFound(CANDIDATE_BINARIES.join(", ")))?,
        };
        info!("Using converter binary {}", binary.display());
        Ok(Self::new(binary, timeout))
    }

    pub fn with_fonts_conf(mut self, fonts_conf: Option<PathBuf>) -> Self {
        self.fonts_conf = fonts_conf;
        self
    }

    fn command(&self, input: &Path, out_dir: &Path, profile: &Path, filter: ExportFilter) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args([
                "--headless",
                "--invisible",
                "--nologo",
                "--nolockcheck",
                "--norestore",
                "--nodefault",
            ])
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .arg("--convert-to")
            .arg(filter.convert_to())
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .env("SAL_USE_VCLPLUGIN", "gen")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        if env::var_os("HOME").is_none() {
            command.env("HOME", "/tmp");
        }
        if env::var_os("XDG_CACHE_HOME").is_none() {
            command.env("XDG_CACHE_HOME", "/tmp/.cache");
        }
        if let Some(conf) = &self.fonts_conf {
            command.env("FONTCONFIG_FILE", conf);
        }
        command
    }
}

/// Process group of a running converter. The `libreoffice` launcher forks
/// `soffice.bin`, so the whole group is killed, not only the direct child.
/// Dropping an armed guard kills the group too.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: kill(2) only sends a signal; the group was created by us with
    // process_group(0), so its id is the leader's pid.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        debug!(
            "Could not kill process group {}: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!("Failed to read converter output: {}", e);
        }
    }
    buf
}

fn remove_partial(pdf: &Path) {
    if pdf.exists() {
        if let Err(e) = std::fs::remove_file(pdf) {
            warn!("Failed to remove partial output {}: {}", pdf.display(), e);
        }
    }
}

#[async_trait]
impl DocumentConverter for LibreOfficeConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let filter = ExportFilter::for_path(input).ok_or_else(|| {
            ConvertError::UnsupportedFormat(
                input
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;

        let input = std::path::absolute(input)?;
        let out_dir = std::path::absolute(out_dir)?;
        tokio::fs::create_dir_all(&out_dir).await?;
        let pdf = expected_output(&input, &out_dir);

        // A private profile per run; concurrent instances must not share one.
        let profile = tempfile::Builder::new().prefix("lo-profile-").tempdir()?;

        let started = Instant::now();
        debug!(
            "Converting {} with {} ({})",
            input.display(),
            self.binary.display(),
            filter.convert_to()
        );

        let mut child = match self.command(&input, &out_dir, profile.path(), filter).spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to spawn {}: {}", self.binary.display(), e);
                return Err(ConvertError::Spawn(e));
            }
        };
        let mut group = ProcessGroup::new(child.id());
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = tokio::time::timeout(self.timeout, async {
            let (status, _, stderr) = tokio::join!(child.wait(), drain(stdout), drain(stderr));
            status.map(|status| (status, stderr))
        })
        .await;

        let (status, stderr) = match finished {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                group.kill();
                remove_partial(&pdf);
                return Err(ConvertError::Io(e));
            }
            Err(_) => {
                error!(
                    "Conversion of {} timed out after {}s",
                    input.display(),
                    self.timeout.as_secs()
                );
                group.kill();
                if let Err(e) = child.wait().await {
                    warn!("Failed to reap converter: {}", e);
                }
                remove_partial(&pdf);
                return Err(ConvertError::Timeout(self.timeout));
            }
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            let code = status
                .code()
                .map(|c| format!("status {c}"))
                .unwrap_or_else(|| "a signal".to_string());
            error!("Converter exited with {} for {}: {}", code, input.display(), stderr);
            group.kill();
            remove_partial(&pdf);
            return Err(ConvertError::Failed { code, stderr });
        }
        group.disarm();

        if !pdf.is_file() {
            let stderr = String::from_utf8_lossy(&stderr);
            error!("Converter produced no output for {}: {}", input.display(), stderr.trim());
            return Err(ConvertError::MissingOutput(pdf));
        }

        info!(
            "Converted {} in {} ms",
            input.display(),
            started.elapsed().as_millis()
        );
        Ok(pdf)
    }

    fn describe(&self) -> String {
        format!("libreoffice ({})", self.binary.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locating_a_missing_binary_fails() {
        let result = LibreOfficeConverter::locate(Some("/nonexistent/soffice"), Duration::from_secs(1));
        assert!(matches!(result, Err(ConvertError::BinaryNotFound(_))));
    }

    #[test]
    fn builds_headless_command() {
        let converter = LibreOfficeConverter::new("/usr/bin/soffice", Duration::from_secs(5))
            .with_fonts_conf(Some(PathBuf::from("/out/.fontconfig/fonts.conf")));
        let command = converter.command(
            Path::new("/in/a.docx"),
            Path::new("/out"),
            Path::new("/tmp/profile"),
            ExportFilter::Writer,
        );
        let std_command = command.as_std();
        let args: Vec<String> = std_command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "--headless");
        assert!(args.contains(&"-env:UserInstallation=file:///tmp/profile".to_string()));
        let convert_to = args.iter().position(|a| a == "--convert-to").unwrap();
        assert_eq!(args[convert_to + 1], "pdf:writer_pdf_Export");
        assert_eq!(&args[args.len() - 3..], ["--outdir", "/out", "/in/a.docx"]);

        let envs: Vec<(String, String)> = std_command
            .get_envs()
            .filter_map(|(k, v)| Some((k.to_string_lossy().into_owned(), v?.to_string_lossy().into_owned())))
            .collect();
        assert!(envs.contains(&("SAL_USE_VCLPLUGIN".to_string(), "gen".to_string())));
        assert!(envs.contains(&(
            "FONTCONFIG_FILE".to_string(),
            "/out/.fontconfig/fonts.conf".to_string()
        )));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_binary_reports_error_and_leaves_no_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.docx");
        std::fs::write(&input, b"not really a docx").unwrap();

        let converter = LibreOfficeConverter::new("false", Duration::from_secs(5));
        let result = converter.convert(&input, dir.path()).await;

        assert!(matches!(result, Err(ConvertError::Failed { .. })));
        assert!(!dir.path().join("doc.pdf").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn succeeding_binary_without_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.docx");
        std::fs::write(&input, b"x").unwrap();

        let converter = LibreOfficeConverter::new("true", Duration::from_secs(5));
        let result = converter.convert(&input, dir.path()).await;
        assert!(matches!(result, Err(ConvertError::MissingOutput(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_forked_workers_before_they_write() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-soffice");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             while [ $# -gt 1 ]; do\n\
               if [ \"$1\" = \"--outdir\" ]; then out=\"$2\"; fi\n\
               shift\n\
             done\n\
             (sleep 1; echo pdf > \"$out/doc.pdf\") &\n\
             sleep 30\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let out = dir.path().join("out");
        let input = dir.path().join("doc.docx");
        std::fs::write(&input, b"x").unwrap();

        let converter = LibreOfficeConverter::new(&script, Duration::from_millis(300));
        let started = Instant::now();
        let result = converter.convert(&input, &out).await;

        assert!(matches!(result, Err(ConvertError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!out.join("doc.pdf").exists());
    }

    #[tokio::test]
    async fn rejects_unsupported_input() {
        let converter = LibreOfficeConverter::new("soffice", Duration::from_secs(1));
        let result = converter
            .convert(Path::new("/tmp/picture.png"), Path::new("/tmp"))
            .await;
        assert!(matches!(result, Err(ConvertError::UnsupportedFormat(ext)) if ext == "png"));
    }
}
