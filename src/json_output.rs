//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON, condiviso da CLI e API HTTP.
//!
//! ## Responsabilità:
//! - Emette messaggi JSON (uno per riga) per gli upload batch con `--json`
//! - Costruisce gli envelope `{ "success": ..., ... }` usati dall'API e dai
//!   comandi CLI di listing
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio di un batch di upload
//! - `file_complete`: Fine elaborazione di un file (risultato o errore)
//! - `complete`: Fine batch con statistiche finali
//! - `error`: Errore generale

use crate::progress::UploadStats;
use crate::types::UploadResult;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio di un batch di upload
    #[serde(rename = "start")]
    Start { total_files: usize, category: String },

    /// Fine elaborazione di un file specifico
    #[serde(rename = "file_complete")]
    FileComplete {
        path: PathBuf,
        index: usize,
        total: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<UploadResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Batch completato
    #[serde(rename = "complete")]
    Complete {
        files_processed: usize,
        files_uploaded: usize,
        files_compressed: usize,
        errors: usize,
        total_bytes_saved: u64,
        duration_seconds: f64,
    },

    /// Errore generale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(total_files: usize, category: impl Into<String>) -> Self {
        Self::Start {
            total_files,
            category: category.into(),
        }
    }

    pub fn file_complete(
        path: PathBuf,
        index: usize,
        total: usize,
        outcome: Result<&UploadResult, String>,
    ) -> Self {
        let (result, error) = match outcome {
            Ok(result) => (Some(result.clone()), None),
            Err(error) => (None, Some(error)),
        };
        Self::FileComplete {
            path,
            index,
            total,
            result,
            error,
        }
    }

    pub fn complete(stats: &UploadStats, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            files_uploaded: stats.files_uploaded,
            files_compressed: stats.files_compressed,
            errors: stats.errors,
            total_bytes_saved: stats.total_bytes_saved,
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

/// `{ "success": true, "<key>": value }`
pub fn success_envelope<T: Serialize>(key: &str, value: T) -> Value {
    let mut body = json!({ "success": true });
    body[key] = serde_json::to_value(value).unwrap_or(Value::Null);
    body
}

/// `{ "success": false, "error": message }`
pub fn error_envelope(message: impl Into<String>) -> Value {
    json!({ "success": false, "error": message.into() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes() {
        let ok = success_envelope("categories", vec!["social", "ui"]);
        assert_eq!(ok["success"], true);
        assert_eq!(ok["categories"][1], "ui");

        let err = error_envelope("File a.svg not found in ui");
        assert_eq!(err, json!({ "success": false, "error": "File a.svg not found in ui" }));
    }

    #[test]
    fn test_message_tags() {
        let start = serde_json::to_value(JsonMessage::start(3, "social")).unwrap();
        assert_eq!(start["type"], "start");
        assert_eq!(start["total_files"], 3);

        let failed = JsonMessage::file_complete(
            PathBuf::from("a.gif"),
            1,
            3,
            Err("Unsupported file format".to_string()),
        );
        let failed = serde_json::to_value(failed).unwrap();
        assert_eq!(failed["type"], "file_complete");
        assert!(failed.get("result").is_none());
        assert_eq!(failed["error"], "Unsupported file format");
    }
}
