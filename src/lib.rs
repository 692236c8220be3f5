//! # Icon Host Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom
//! - `sanitize`: Sanitizzazione di nomi file e cartelle
//! - `multipart`: Parsing dei body multipart/form-data
//! - `image_processor`: Compressione immagini (PNG/JPEG/WebP)
//! - `tool_resolver`: Ricerca dei tool di compressione esterni
//! - `file_manager`: Operazioni di basso livello sui file
//! - `store`: Albero categorie → icone su disco
//! - `upload`: Pipeline di upload e delete
//! - `urls`: Generazione URL CDN/locali
//! - `api`: API HTTP (axum)
//! - `json_output` / `progress`: Output per la CLI
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use icon_host::{Config, UploadPipeline, UploadRequest};
//!
//! # async fn run() -> icon_host::IconResult<()> {
//! let pipeline = UploadPipeline::new(&Config::default());
//! let request = UploadRequest::new(b"<svg/>".to_vec(), "GitHub.svg", "social");
//! let result = pipeline.upload(request).await?;
//! println!("{}", result.url);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod multipart;
pub mod progress;
pub mod sanitize;
pub mod store;
pub mod tool_resolver;
pub mod types;
pub mod upload;
pub mod urls;

pub use config::Config;
pub use error::{IconError, IconResult};
pub use image_processor::ImageCompressor;
pub use multipart::MultipartPart;
pub use store::CategoryStore;
pub use types::{DeleteResult, IconEntry, UploadRequest, UploadResult};
pub use upload::UploadPipeline;
pub use urls::UrlBuilder;
