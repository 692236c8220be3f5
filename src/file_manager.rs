//! # File Management Module
//!
//! Questo modulo gestisce le operazioni di basso livello sui file.
//!
//! ## Responsabilità:
//! - Metadata dei file (dimensione e modification time)
//! - Scrittura atomica senza sovrascrittura (`write_new_file`)
//! - Riconoscimento file nascosti
//! - Utilità per dimensioni human-readable e percentuali di riduzione
//!
//! ## Sicurezza operazioni:
//! - I bytes vengono scritti in un file temporaneo nella stessa directory
//!   e poi collegati al nome finale con una primitiva "no clobber":
//!   nessun file parziale è mai visibile al path di destinazione e un
//!   file esistente non viene mai sovrascritto, anche con upload concorrenti
//! - `AlreadyExists` è un esito normale della scrittura, non un check separato
//!
//! ## Esempio:
//! ```rust
//! use icon_host::file_manager::FileManager;
//!
//! assert_eq!(FileManager::format_size(1536), "1.50 KB");
//! ```

use std::fs::Metadata;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tokio::fs;

/// Manages file operations
pub struct FileManager;

impl FileManager {
    /// Get information about a file (size and modification time as Unix seconds)
    pub async fn get_file_info(path: &Path) -> std::io::Result<(u64, u64)> {
        let metadata = fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a file", path.display()),
            ));
        }
        Ok((metadata.len(), Self::modified_secs(&metadata)))
    }

    /// Modification time as Unix seconds, 0 when the platform cannot tell
    pub fn modified_secs(metadata: &Metadata) -> u64 {
        metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Dot-prefixed entries (markers, temp files, editor droppings)
    pub fn is_hidden(name: &str) -> bool {
        name.starts_with('.')
    }

    /// Atomically create `target` holding `bytes`, failing with
    /// `ErrorKind::AlreadyExists` when something is already there.
    ///
    /// The temp file lives in the target's directory so the final link is a
    /// same-filesystem operation; it is hidden (dot-prefixed) while it exists.
    pub async fn write_new_file(target: &Path, bytes: Vec<u8>) -> std::io::Result<()> {
        let target = target.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let dir = target
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));

            let mut temp = tempfile::Builder::new()
                .prefix(".upload-")
                .suffix(".tmp")
                .tempfile_in(dir)?;
            temp.write_all(&bytes)?;
            temp.as_file().sync_all()?;
            persist_noclobber(temp, &target)
        })
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

fn persist_noclobber(temp: NamedTempFile, target: &Path) -> std::io::Result<()> {
    // On failure the temp file is handed back and removed when dropped
    temp.persist_noclobber(target).map(|_| ()).map_err(|e| e.error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(0), "0 B");
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(1536), "1.50 KB");
        assert_eq!(FileManager::format_size(50 * 1024 * 1024), "50.00 MB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(FileManager::calculate_reduction(0, 10), 0.0);
        assert_eq!(FileManager::calculate_reduction(200, 100), 50.0);
    }

    #[tokio::test]
    async fn test_write_new_file_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("icon.svg");

        FileManager::write_new_file(&target, b"first".to_vec()).await.unwrap();
        let err = FileManager::write_new_file(&target, b"second".to_vec())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&target).unwrap(), b"first");

        // No temp leftovers
        let names: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["icon.svg".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_have_one_winner() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("race.png");

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let target = target.clone();
            handles.push(tokio::spawn(async move {
                FileManager::write_new_file(&target, vec![i; 16]).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(std::fs::read(&target).unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_get_file_info() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.ico");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let (size, modified) = FileManager::get_file_info(&path).await.unwrap();
        assert_eq!(size, 3);
        assert!(modified > 0);
    }

    #[test]
    fn test_is_hidden() {
        assert!(FileManager::is_hidden(".gitkeep"));
        assert!(FileManager::is_hidden(".upload-abc.tmp"));
        assert!(!FileManager::is_hidden("icon.svg"));
    }
}
