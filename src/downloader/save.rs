// Filesystem save target

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::errors::DownloadError;
use super::models::{DownloadOptions, SavedFile, DEFAULT_FILENAME};
use super::traits::SaveFile;

/// Upper bound on `name (n).ext` candidates
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Saves downloads into a directory, never overwriting existing files
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_options(options: &DownloadOptions) -> Self {
        Self::new(&options.output_path)
    }
}

#[async_trait]
impl SaveFile for DirectorySaver {
    async fn save(&self, bytes: Vec<u8>, filename: &str) -> Result<SavedFile, DownloadError> {
        let dir = self.dir.clone();
        let name = sanitize_filename(filename);
        debug!("[Save] Writing {} bytes as '{}' into {}", bytes.len(), name, dir.display());

        let saved = tokio::task::spawn_blocking(move || write_unique(&dir, &name, &bytes))
            .await
            .map_err(|e| DownloadError::Save(format!("save task failed: {}", e)))??;

        info!("[Save] Saved {}", saved.filename);
        Ok(saved)
    }
}

/// Write through a temporary file, then move it to the first free name.
/// The temporary file is deleted on every path that does not persist it.
fn write_unique(dir: &Path, name: &str, bytes: &[u8]) -> Result<SavedFile, DownloadError> {
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".download-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = numbered_name(name, attempt);
        let path = dir.join(&candidate);
        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                return Ok(SavedFile {
                    filename: candidate,
                    path: Some(path),
                    size_bytes: bytes.len() as u64,
                })
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => return Err(e.error.into()),
        }
    }

    Err(DownloadError::Save(format!(
        "no free file name for '{}' in {}",
        name,
        dir.display()
    )))
}

/// `name`, `name (1)`, `name (2)`, ... with the number before the extension
fn numbered_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({}){}", &name[..dot], attempt, &name[dot..]),
        _ => format!("{} ({})", name, attempt),
    }
}

/// Strip characters that would escape the target directory or break on common filesystems
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();

    if cleaned.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}
