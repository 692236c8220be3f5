//! # Data Model
//!
//! Tipi condivisi tra store, pipeline di upload, API HTTP e CLI.
//!
//! - `IconEntry`: un'icona salvata su disco (prodotta da listing e info)
//! - `UploadRequest`: input di un singolo upload, consumato una volta
//! - `UploadResult` / `DeleteResult`: descrittori restituiti al chiamante
//!
//! I nomi dei campi JSON sono in camelCase per compatibilità con la UI web.

use crate::error::{IconError, IconResult};
use crate::multipart::{self, MultipartPart};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A stored icon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconEntry {
    /// Sanitized file name including extension
    pub name: String,
    /// `social`, `ui`, ... or `custom/<slug>`
    pub category: String,
    pub size_bytes: u64,
    /// Human-readable size, e.g. `1.50 KB`
    pub size: String,
    /// Only known right after an upload that compressed the file
    pub original_size_bytes: Option<u64>,
    /// Unix seconds
    pub last_modified: u64,
    pub url: String,
}

/// A single upload, created per request and consumed by `UploadPipeline::upload`
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_bytes: Vec<u8>,
    pub original_filename: String,
    pub category: String,
    pub custom_folder: Option<String>,
    pub description: String,
    pub compress: bool,
    pub custom_name: Option<String>,
}

impl UploadRequest {
    /// Plain upload of `bytes` named `original_filename` into `category`
    pub fn new(
        file_bytes: Vec<u8>,
        original_filename: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            file_bytes,
            original_filename: original_filename.into(),
            category: category.into(),
            custom_folder: None,
            description: String::new(),
            compress: true,
            custom_name: None,
        }
    }

    /// Build a request from the parts of an upload form.
    ///
    /// Fields: `file` (file part), `category`, `customFolder`, `description`,
    /// `customName`, `compress` (anything but the literal `false` enables it).
    pub fn from_parts(parts: Vec<MultipartPart>) -> IconResult<Self> {
        let category = non_empty(multipart::field(&parts, "category"));
        let custom_folder = non_empty(multipart::field(&parts, "customFolder"));
        let custom_name = non_empty(multipart::field(&parts, "customName"));
        let description = multipart::field(&parts, "description")
            .unwrap_or_default()
            .to_string();
        let compress = multipart::field(&parts, "compress") != Some("false");

        let (Some(file), Some(category)) = (
            parts.into_iter().find(|p| p.name == "file" && p.is_file()),
            category,
        ) else {
            return Err(IconError::validation("Missing required fields"));
        };

        Ok(Self {
            original_filename: file.filename.unwrap_or_default(),
            file_bytes: file.data,
            category,
            custom_folder,
            description,
            compress,
            custom_name,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub success: bool,
    pub file_name: String,
    pub category: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub compressed: bool,
    pub reduction_percent: f64,
    pub url: String,
    #[serde(skip)]
    pub file_path: PathBuf,
}

/// Outcome of a successful delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub success: bool,
    pub file_name: String,
    pub category: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, value: &str) -> MultipartPart {
        MultipartPart {
            name: name.to_string(),
            filename: None,
            value: Some(value.to_string()),
            data: value.as_bytes().to_vec(),
        }
    }

    fn file(name: &str, filename: &str, data: &[u8]) -> MultipartPart {
        MultipartPart {
            name: name.to_string(),
            filename: Some(filename.to_string()),
            value: None,
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_from_parts() {
        let req = UploadRequest::from_parts(vec![
            file("file", "Logo.PNG", b"png"),
            field("category", "custom"),
            field("customFolder", "Tech Stuff"),
            field("customName", ""),
            field("description", "company logo"),
        ])
        .unwrap();

        assert_eq!(req.original_filename, "Logo.PNG");
        assert_eq!(req.file_bytes, b"png");
        assert_eq!(req.category, "custom");
        assert_eq!(req.custom_folder.as_deref(), Some("Tech Stuff"));
        assert_eq!(req.custom_name, None);
        assert_eq!(req.description, "company logo");
        assert!(req.compress);
    }

    #[test]
    fn test_compress_flag() {
        let parts = |flag: &str| {
            vec![file("file", "a.png", b"x"), field("category", "ui"), field("compress", flag)]
        };
        assert!(!UploadRequest::from_parts(parts("false")).unwrap().compress);
        assert!(UploadRequest::from_parts(parts("true")).unwrap().compress);
        assert!(UploadRequest::from_parts(parts("no")).unwrap().compress);
    }

    #[test]
    fn test_missing_required_fields() {
        let no_file = UploadRequest::from_parts(vec![field("category", "ui")]);
        assert!(matches!(no_file, Err(IconError::Validation(_))));

        let no_category = UploadRequest::from_parts(vec![file("file", "a.svg", b"<svg/>")]);
        assert!(matches!(no_category, Err(IconError::Validation(_))));

        // A text field called `file` is not a file part
        let text_file = UploadRequest::from_parts(vec![field("file", "a.svg"), field("category", "ui")]);
        assert!(matches!(text_file, Err(IconError::Validation(_))));
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = IconEntry {
            name: "github.svg".to_string(),
            category: "social".to_string(),
            size_bytes: 10,
            size: "10 B".to_string(),
            original_size_bytes: None,
            last_modified: 1,
            url: "/icons/social/github.svg".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sizeBytes"], 10);
        assert!(json["originalSizeBytes"].is_null());
        assert_eq!(json["lastModified"], 1);
    }
}
