//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche degli upload batch da CLI.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - Tracking statistiche di upload (file caricati, compressi, errori)
//! - Calcolo percentuali di riduzione e byte risparmiati dalla compressione
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce la progress bar principale
//! - `UploadStats`: Traccia statistiche cumulative
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:03] [========================================] 12/12 (100%) ✅ github.svg
//! ```
//!
//! ## Esempio:
//! ```rust
//! use icon_host::progress::UploadStats;
//!
//! let mut stats = UploadStats::new();
//! stats.add_uploaded(2048, 1024);
//! stats.add_error();
//! assert_eq!(stats.files_processed, 2);
//! assert_eq!(stats.total_bytes_saved, 1024);
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for batch uploads
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing (used with `--json`)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics tracker for upload batches
#[derive(Debug, Default)]
pub struct UploadStats {
    pub files_processed: usize,
    pub files_uploaded: usize,
    pub files_compressed: usize,
    pub total_bytes_saved: u64,
    pub total_original_size: u64,
    pub errors: usize,
}

impl UploadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_uploaded(&mut self, original_size: u64, stored_size: u64) {
        self.files_processed += 1;
        self.files_uploaded += 1;
        self.total_original_size += original_size;
        if stored_size < original_size {
            self.files_compressed += 1;
            self.total_bytes_saved += original_size - stored_size;
        }
    }

    pub fn add_error(&mut self) {
        self.files_processed += 1;
        self.errors += 1;
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(
            self.total_original_size,
            self.total_original_size - self.total_bytes_saved,
        )
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Uploaded: {} | Compressed: {} | Errors: {} | Total saved: {} ({:.2}%)",
            self.files_processed,
            self.files_uploaded,
            self.files_compressed,
            self.errors,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let mut stats = UploadStats::new();
        stats.add_uploaded(1000, 600);
        stats.add_uploaded(500, 500);
        stats.add_error();

        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.files_uploaded, 2);
        assert_eq!(stats.files_compressed, 1);
        assert_eq!(stats.total_bytes_saved, 400);
        assert!((stats.overall_reduction_percent() - 26.666).abs() < 0.01);
        assert!(stats.format_summary().contains("Errors: 1"));
    }

    #[test]
    fn test_empty_stats() {
        let stats = UploadStats::new();
        assert_eq!(stats.overall_reduction_percent(), 0.0);
    }
}
