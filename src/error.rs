//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `IconError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Validation`: Input rifiutato (estensione, dimensione, campi mancanti)
//! - `MalformedMultipart`: Body multipart senza boundary di apertura/chiusura
//! - `DuplicateFile`: Il file esiste già nella categoria (nessuna sovrascrittura)
//! - `NotFound`: File assente in delete/info
//! - `Compression`: Fallimento codec, recuperato localmente dal compressore
//! - `Io` / `Image`: Errori di filesystem e di decodifica immagini
//!
//! ## Esempio:
//! ```rust
//! use icon_host::IconError;
//!
//! let err = IconError::Validation("Unsupported format: .gif".to_string());
//! assert!(err.is_client_error());
//! ```

/// Custom error types for icon storage and uploads
#[derive(thiserror::Error, Debug)]
pub enum IconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid multipart data: {0}")]
    MalformedMultipart(String),

    #[error("File {file_name} already exists in {category}")]
    DuplicateFile { file_name: String, category: String },

    #[error("File {file_name} not found in {category}")]
    NotFound { file_name: String, category: String },

    #[error("Compression error: {0}")]
    Compression(String),
}

/// Result alias used across the core
pub type IconResult<T> = Result<T, IconError>;

impl IconError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the caller sent something we refuse, as opposed to a server fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::MalformedMultipart(_)
                | Self::DuplicateFile { .. }
                | Self::NotFound { .. }
        )
    }
}
