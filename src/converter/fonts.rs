//! Fontconfig setup so bundled fonts are visible to the converter.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info, warn};
use quick_xml::escape::escape;
use tokio::process::Command;

const FC_CACHE_TIMEOUT: Duration = Duration::from_secs(30);
const FC_LIST_TIMEOUT: Duration = Duration::from_secs(10);

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf"))
        .unwrap_or(false)
}

/// Every directory under `root` (itself included) holding `.ttf` or `.otf`
/// files, sorted.
pub fn discover_font_dirs(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut has_fonts = false;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_font_file(&path) {
                has_fonts = true;
            }
        }
        if has_fonts {
            found.push(dir);
        }
    }

    found.sort();
    found
}

/// Write `<out_dir>/.fontconfig/fonts.conf` listing `font_dirs` on top of
/// the system configuration.
pub fn write_fonts_conf(out_dir: &Path, font_dirs: &[PathBuf]) -> io::Result<PathBuf> {
    let conf_dir = out_dir.join(".fontconfig");
    std::fs::create_dir_all(&conf_dir)?;
    let conf_path = conf_dir.join("fonts.conf");

    let mut dirs_xml = String::new();
    for dir in font_dirs {
        let dir = std::path::absolute(dir)?;
        dirs_xml.push_str(&format!("  <dir>{}</dir>\n", escape(&*dir.to_string_lossy())));
    }

    let conf = format!(
        "<?xml version=\"1.0\"?>\n<!DOCTYPE fontconfig SYSTEM \"fonts.dtd\">\n<fontconfig>\n  \
         <include ignore_missing=\"yes\">/etc/fonts/fonts.conf</include>\n{dirs_xml}  \
         <cachedir>{}</cachedir>\n</fontconfig>\n",
        escape(&*conf_dir.join("cache").to_string_lossy())
    );
    std::fs::write(&conf_path, conf)?;
    Ok(conf_path)
}

/// Discover bundled fonts, write the fonts.conf and refresh the cache.
/// Returns `None` when there are no bundled fonts.
pub async fn prepare_fonts(fonts_dir: &Path, out_dir: &Path) -> io::Result<Option<PathBuf>> {
    let dirs = discover_font_dirs(fonts_dir);
    if dirs.is_empty() {
        info!("No bundled fonts under {}", fonts_dir.display());
        return Ok(None);
    }

    let conf = write_fonts_conf(out_dir, &dirs)?;
    info!(
        "Wrote {} with {} font director{}",
        conf.display(),
        dirs.len(),
        if dirs.len() == 1 { "y" } else { "ies" }
    );

    refresh_font_cache(&conf).await;
    Ok(Some(conf))
}

/// Best effort `fc-cache -f`; failures are only logged.
pub async fn refresh_font_cache(conf: &Path) {
    let mut command = Command::new("fc-cache");
    command
        .arg("-f")
        .env("FONTCONFIG_FILE", conf)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match tokio::time::timeout(FC_CACHE_TIMEOUT, command.output()).await {
        Ok(Ok(output)) if output.status.success() => debug!("fc-cache finished"),
        Ok(Ok(output)) => warn!(
            "fc-cache failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Ok(Err(e)) => warn!("fc-cache could not be started: {}", e),
        Err(_) => warn!("fc-cache timed out after {}s", FC_CACHE_TIMEOUT.as_secs()),
    }
}

/// Unique family names from `fc-list : family` output, sorted.
pub fn parse_font_families(output: &str) -> Vec<String> {
    let mut families: Vec<String> = output
        .lines()
        .filter_map(|line| line.split(',').next())
        .map(|family| family.trim().to_string())
        .filter(|family| !family.is_empty())
        .collect();
    families.sort();
    families.dedup();
    families
}

/// Installed font families as seen by fontconfig, empty on any failure.
pub async fn list_font_families(conf: Option<&Path>) -> Vec<String> {
    let mut command = Command::new("fc-list");
    command
        .args([":", "family"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    if let Some(conf) = conf {
        command.env("FONTCONFIG_FILE", conf);
    }

    match tokio::time::timeout(FC_LIST_TIMEOUT, command.output()).await {
        Ok(Ok(output)) if output.status.success() => {
            parse_font_families(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(Ok(_)) | Ok(Err(_)) | Err(_) => {
            debug!("fc-list unavailable");
            Vec::new()
        }
    }
}
