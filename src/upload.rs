//! # Upload Pipeline Module
//!
//! Questo modulo orchestra il ciclo di vita di upload e delete di un'icona.
//!
//! ## Responsabilità:
//! - Validazione di estensione e dimensione
//! - Calcolo della categoria finale (`custom` → `custom/<cartella>`)
//! - Sanitizzazione del nome file (nome custom o nome originale)
//! - Compressione opzionale dei formati raster
//! - Persistenza tramite `CategoryStore` e generazione URL
//!
//! ## Flusso upload:
//! 1. `validate_file`: estensione supportata, dimensione ≤ `max_file_size`
//! 2. Categoria finale e nome finale sanitizzati
//! 3. Directory di destinazione creata se mancante
//! 4. Compressione (se richiesta e formato compressibile)
//! 5. `place_file`: scrittura atomica, errore se il file esiste già
//!
//! Un upload o viene persistito interamente e restituisce un `UploadResult`,
//! o non lascia nulla su disco.

use crate::config::Config;
use crate::error::{IconError, IconResult};
use crate::file_manager::FileManager;
use crate::image_processor::ImageCompressor;
use crate::sanitize::{base_file_name, sanitize, split_file_name};
use crate::store::{CategoryStore, CUSTOM_CATEGORY};
use crate::types::{DeleteResult, UploadRequest, UploadResult};
use tracing::{debug, info};

/// Validates, names, compresses and stores uploads
#[derive(Debug, Clone)]
pub struct UploadPipeline {
    store: CategoryStore,
    compressor: ImageCompressor,
    max_file_size: u64,
    supported_formats: Vec<String>,
}

impl UploadPipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            store: CategoryStore::from_config(config),
            compressor: ImageCompressor::new(config.compression.clone()),
            max_file_size: config.max_file_size,
            supported_formats: config.supported_formats.clone(),
        }
    }

    pub fn store(&self) -> &CategoryStore {
        &self.store
    }

    /// Check a file name and size against the accepted formats and size ceiling.
    ///
    /// Returns the lower-cased extension on success.
    pub fn validate_file(&self, file_name: &str, size: u64) -> IconResult<String> {
        let extension = split_file_name(base_file_name(file_name))
            .1
            .filter(|ext| self.supported_formats.iter().any(|f| f == ext))
            .ok_or_else(|| {
                IconError::validation(format!(
                    "Unsupported file format. Supported: {}",
                    self.supported_formats
                        .iter()
                        .map(|f| format!(".{}", f))
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;

        if size > self.max_file_size {
            return Err(IconError::validation(format!(
                "File too large: {} (max {})",
                FileManager::format_size(size),
                FileManager::format_size(self.max_file_size)
            )));
        }

        Ok(extension)
    }

    /// Run a single upload to completion
    pub async fn upload(&self, request: UploadRequest) -> IconResult<UploadResult> {
        let UploadRequest {
            file_bytes,
            original_filename,
            category,
            custom_folder,
            description,
            compress,
            custom_name,
        } = request;

        if category.trim().is_empty() {
            return Err(IconError::validation("Category is required"));
        }

        let extension = self.validate_file(&original_filename, file_bytes.len() as u64)?;
        let final_category = final_category(&category, custom_folder.as_deref())?;
        let file_name = final_file_name(&original_filename, custom_name.as_deref(), &extension)?;

        let dir = self.store.resolve_category_path(&final_category)?;
        self.store.ensure_directory(&dir).await?;

        if !description.is_empty() {
            debug!("Upload {}: {}", file_name, description);
        }

        let original_size = file_bytes.len() as u64;
        let bytes = if compress && ImageCompressor::is_compressible(&extension) {
            self.compressor.compress(file_bytes, &extension).await
        } else {
            file_bytes
        };
        let compressed_size = bytes.len() as u64;

        let file_path = self.store.place_file(&final_category, &file_name, bytes).await?;

        let reduction_percent = FileManager::calculate_reduction(original_size, compressed_size);
        if compressed_size < original_size {
            info!(
                "✅ Uploaded {}/{} ({} -> {}, {:.1}% saved)",
                final_category,
                file_name,
                FileManager::format_size(original_size),
                FileManager::format_size(compressed_size),
                reduction_percent
            );
        } else {
            info!(
                "✅ Uploaded {}/{} ({})",
                final_category,
                file_name,
                FileManager::format_size(original_size)
            );
        }

        Ok(UploadResult {
            success: true,
            url: self.store.urls().icon_url(&final_category, &file_name),
            file_name,
            category: final_category,
            original_size,
            compressed_size,
            compressed: compressed_size < original_size,
            reduction_percent,
            file_path,
        })
    }

    /// Remove a stored icon
    pub async fn delete(&self, file_name: &str, category: &str) -> IconResult<DeleteResult> {
        self.store.remove_file(category, file_name).await?;
        info!("🗑️  Deleted {}/{}", category, file_name);

        Ok(DeleteResult {
            success: true,
            file_name: file_name.to_string(),
            category: category.to_string(),
            message: format!("File {} deleted successfully", file_name),
        })
    }
}

/// `custom` needs a folder and becomes `custom/<slug>`; anything else is kept verbatim
fn final_category(category: &str, custom_folder: Option<&str>) -> IconResult<String> {
    if category != CUSTOM_CATEGORY {
        return Ok(category.to_string());
    }

    let slug = custom_folder.map(sanitize).unwrap_or_default();
    if slug.is_empty() {
        return Err(IconError::validation(
            "Custom folder name is required for the custom category",
        ));
    }
    Ok(format!("{}/{}", CUSTOM_CATEGORY, slug))
}

fn final_file_name(
    original_filename: &str,
    custom_name: Option<&str>,
    extension: &str,
) -> IconResult<String> {
    let raw = match custom_name {
        Some(name) if !name.trim().is_empty() => name,
        _ => split_file_name(base_file_name(original_filename)).0,
    };

    let base = sanitize(raw);
    if base.is_empty() {
        return Err(IconError::validation(format!(
            "File name {:?} has no usable characters",
            raw
        )));
    }
    Ok(format!("{}.{}", base, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UrlMode;
    use crate::store::MARKER_FILE;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn pipeline(temp_dir: &TempDir) -> UploadPipeline {
        let mut config = Config::default();
        config.icons_root = temp_dir.path().join("icons");
        config.urls.mode = UrlMode::Local;
        config.compression.use_external_tools = false;
        UploadPipeline::new(&config)
    }

    fn sample_png() -> Vec<u8> {
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_upload_then_list() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);

        let result = pipeline
            .upload(UploadRequest::new(b"<svg/>".to_vec(), "My Icon!!.SVG", "ui"))
            .await
            .unwrap();

        assert_eq!(result.file_name, "my-icon.svg");
        assert_eq!(result.category, "ui");
        assert_eq!(result.original_size, 6);
        assert_eq!(result.compressed_size, 6);
        assert!(!result.compressed);
        assert_eq!(result.url, "/icons/ui/my-icon.svg");

        let icons = pipeline.store().list_all().unwrap();
        assert_eq!(icons.len(), 1);
        assert_eq!(icons[0].name, result.file_name);
        assert_eq!(icons[0].category, result.category);
        assert_eq!(icons[0].size_bytes, result.compressed_size);
    }

    #[tokio::test]
    async fn test_duplicate_upload_keeps_original() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);

        let first = pipeline
            .upload(UploadRequest::new(b"<svg>1</svg>".to_vec(), "logo.svg", "brands"))
            .await
            .unwrap();
        let second = pipeline
            .upload(UploadRequest::new(b"<svg>2</svg>".to_vec(), "LOGO.svg", "brands"))
            .await;

        assert!(matches!(second, Err(IconError::DuplicateFile { .. })));
        assert_eq!(std::fs::read(first.file_path).unwrap(), b"<svg>1</svg>");
    }

    #[tokio::test]
    async fn test_custom_folder_and_name() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);

        let mut request = UploadRequest::new(b"ico".to_vec(), "C:\\tmp\\whatever.ICO", "custom");
        request.custom_folder = Some("Tech Stuff".to_string());
        request.custom_name = Some("Rust Crab".to_string());

        let result = pipeline.upload(request).await.unwrap();
        assert_eq!(result.category, "custom/tech-stuff");
        assert_eq!(result.file_name, "rust-crab.ico");
        assert!(temp_dir
            .path()
            .join("icons/custom/tech-stuff/rust-crab.ico")
            .exists());

        assert_eq!(
            pipeline.store().list_categories().unwrap(),
            vec!["custom/tech-stuff"]
        );
    }

    #[tokio::test]
    async fn test_custom_without_folder() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);

        let mut request = UploadRequest::new(b"<svg/>".to_vec(), "a.svg", "custom");
        request.custom_folder = Some("!!!".to_string());

        let err = pipeline.upload(request).await.unwrap_err();
        assert!(matches!(err, IconError::Validation(_)));
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.icons_root = temp_dir.path().join("icons");
        config.max_file_size = 8;
        let pipeline = UploadPipeline::new(&config);

        for request in [
            UploadRequest::new(b"GIF89a".to_vec(), "anim.gif", "ui"),
            UploadRequest::new(b"<svg></svg>".to_vec(), "big.svg", "ui"),
            UploadRequest::new(b"<svg/>".to_vec(), "noext", "ui"),
            UploadRequest::new(b"<svg/>".to_vec(), "a.svg", ""),
            UploadRequest::new(b"<svg/>".to_vec(), "___.svg", "ui"),
            UploadRequest::new(b"<svg/>".to_vec(), "a.svg", "../etc"),
        ] {
            let name = request.original_filename.clone();
            let err = pipeline.upload(request).await.unwrap_err();
            assert!(matches!(err, IconError::Validation(_)), "{name}: {err}");
        }

        // Nothing was written for rejected uploads
        assert!(pipeline.store().list_all().unwrap().is_empty());
    }

    #[test]
    fn test_validate_file() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);

        assert_eq!(pipeline.validate_file("Logo.WEBP", 10).unwrap(), "webp");
        assert!(pipeline.validate_file("photo.jpg", 10).is_err());
        assert!(pipeline
            .validate_file("huge.png", crate::config::DEFAULT_MAX_FILE_SIZE + 1)
            .is_err());
        assert!(pipeline
            .validate_file("limit.png", crate::config::DEFAULT_MAX_FILE_SIZE)
            .is_ok());
    }

    #[tokio::test]
    async fn test_png_compression_result_is_stored() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);
        let png = sample_png();

        let result = pipeline
            .upload(UploadRequest::new(png.clone(), "gradient.png", "ui"))
            .await
            .unwrap();

        assert_eq!(result.original_size, png.len() as u64);
        assert!(result.compressed_size <= result.original_size);

        let stored = std::fs::read(&result.file_path).unwrap();
        assert_eq!(stored.len() as u64, result.compressed_size);
        assert!(image::load_from_memory(&stored).is_ok());
    }

    #[tokio::test]
    async fn test_no_compress_keeps_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);
        let png = sample_png();

        let mut request = UploadRequest::new(png.clone(), "raw.png", "ui");
        request.compress = false;
        let result = pipeline.upload(request).await.unwrap();

        assert_eq!(std::fs::read(&result.file_path).unwrap(), png);
        assert_eq!(result.reduction_percent, 0.0);
    }

    #[tokio::test]
    async fn test_delete_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(&temp_dir);

        pipeline
            .upload(UploadRequest::new(b"<svg/>".to_vec(), "only.svg", "flags"))
            .await
            .unwrap();

        let deleted = pipeline.delete("only.svg", "flags").await.unwrap();
        assert!(deleted.success);
        assert_eq!(deleted.message, "File only.svg deleted successfully");
        assert!(temp_dir.path().join("icons/flags").join(MARKER_FILE).exists());

        let again = pipeline.delete("only.svg", "flags").await.unwrap_err();
        assert!(matches!(again, IconError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_uploads() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = std::sync::Arc::new(pipeline(&temp_dir));

        let mut handles = Vec::new();
        for i in 0..6u8 {
            let pipeline = pipeline.clone();
            handles.push(tokio::spawn(async move {
                pipeline
                    .upload(UploadRequest::new(vec![b'<', i, b'>'], "race.svg", "ui"))
                    .await
            }));
        }

        let mut ok = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(IconError::DuplicateFile { .. }) => duplicates += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((ok, duplicates), (1, 5));
    }
}
