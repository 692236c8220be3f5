//! # Icon Host - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (file JSON + override da CLI)
//! - Dispatch dei sottocomandi verso store, pipeline di upload e API HTTP
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` vince)
//! 3. Carica la configurazione e applica `--icons-dir`
//! 4. Esegue il sottocomando
//!
//! ## Esempio di utilizzo:
//! ```bash
//! icon-host init
//! icon-host upload logo.png --category custom --custom-folder tech
//! icon-host list --category social
//! icon-host serve --bind 127.0.0.1:3001
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use icon_host::file_manager::FileManager;
use icon_host::json_output::{success_envelope, JsonMessage};
use icon_host::progress::{ProgressManager, UploadStats};
use icon_host::tool_resolver::ToolPathResolver;
use icon_host::{api, Config, IconEntry, UploadPipeline, UploadRequest};

#[derive(Parser)]
#[command(name = "icon-host")]
#[command(about = "Host icons in category folders with compression and CDN URLs")]
struct Args {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Icons root directory (overrides the configuration file)
    #[arg(long, global = true)]
    icons_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON on stdout instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the default category folders
    Init,

    /// List stored icons
    List {
        /// Only icons in this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List categories
    Categories,

    /// Show every category with its files
    Structure,

    /// Print the public URL of an icon
    Url { category: String, file: String },

    /// Print HTML/CSS usage snippets for an icon
    Examples { category: String, file: String },

    /// Check that a local file would be accepted for upload
    Validate { path: PathBuf },

    /// Upload one or more files
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target category (`custom` requires --custom-folder)
        #[arg(short, long)]
        category: String,

        /// Subfolder for the custom category
        #[arg(long)]
        custom_folder: Option<String>,

        /// Store under this name instead of the file's own (single file only)
        #[arg(short, long)]
        name: Option<String>,

        /// Store raster images as they are
        #[arg(long)]
        no_compress: bool,
    },

    /// Delete an icon
    Delete { category: String, file: String },

    /// Show details of an icon
    Info { category: String, file: String },

    /// Report which external compression tools are available
    Tools,

    /// Run the HTTP API
    Serve {
        /// Socket address (overrides the configuration file)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::from_file(&config_path).await?;
    if let Some(icons_dir) = args.icons_dir.clone() {
        config.icons_root = icons_dir;
    }
    config.validate()?;

    let pipeline = UploadPipeline::new(&config);
    let store = pipeline.store();

    match args.command {
        Command::Init => {
            let created = store
                .init_default_categories(&config.default_categories)
                .await?;
            if args.json {
                print_json(&success_envelope("categories", &config.default_categories))?;
            } else {
                println!("✅ Folder structure initialized ({} categories)", created.len());
            }
        }

        Command::List { category } => {
            let mut icons = store.list_all()?;
            if let Some(ref category) = category {
                icons.retain(|icon| &icon.category == category);
            }
            if args.json {
                print_json(&success_envelope("icons", &icons))?;
            } else {
                print_icons(&icons);
            }
        }

        Command::Categories => {
            let categories = store.list_categories()?;
            if args.json {
                print_json(&success_envelope("categories", &categories))?;
            } else {
                for category in categories {
                    println!("📁 {}", category);
                }
            }
        }

        Command::Structure => {
            let structure = store.get_structure()?;
            if args.json {
                print_json(&success_envelope("structure", &structure))?;
            } else {
                for (category, files) in structure {
                    println!("📁 {} ({} icons)", category, files.len());
                    for file in files {
                        println!("   - {}", file);
                    }
                }
            }
        }

        Command::Url { category, file } => {
            let url = store.urls().icon_url(&category, &file);
            if args.json {
                print_json(&success_envelope("url", url))?;
            } else {
                println!("{}", url);
            }
        }

        Command::Examples { category, file } => {
            println!("{}", store.urls().usage_examples(&category, &file));
        }

        Command::Validate { path } => {
            let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
                anyhow::anyhow!("Cannot read {}: {}", path.display(), e)
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let extension = pipeline.validate_file(&name, metadata.len())?;

            if args.json {
                print_json(&serde_json::json!({
                    "success": true,
                    "fileName": name,
                    "format": extension,
                    "sizeBytes": metadata.len(),
                }))?;
            } else {
                println!(
                    "✅ {} is a valid icon ({}, {})",
                    name,
                    extension,
                    FileManager::format_size(metadata.len())
                );
            }
        }

        Command::Upload {
            files,
            category,
            custom_folder,
            name,
            no_compress,
        } => {
            if name.is_some() && files.len() > 1 {
                return Err(anyhow::anyhow!("--name can only be used with a single file"));
            }
            upload_batch(
                &pipeline,
                files,
                &category,
                custom_folder,
                name,
                !no_compress,
                args.json,
            )
            .await?;
        }

        Command::Delete { category, file } => {
            let result = pipeline.delete(&file, &category).await?;
            if args.json {
                print_json(&serde_json::to_value(&result)?)?;
            } else {
                println!("✅ {}", result.message);
            }
        }

        Command::Info { category, file } => {
            let icon = store.file_info(&category, &file).await?;
            if args.json {
                print_json(&success_envelope("icon", &icon))?;
            } else {
                println!("📄 {}/{}", icon.category, icon.name);
                println!("   Size: {} ({} bytes)", icon.size, icon.size_bytes);
                println!("   Modified: {}", icon.last_modified);
                println!("   URL: {}", icon.url);
            }
        }

        Command::Tools => {
            print!("{}", ToolPathResolver::instance().get_tools_report());
        }

        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            api::serve(&config, &bind).await?;
        }
    }

    Ok(())
}

async fn upload_batch(
    pipeline: &UploadPipeline,
    files: Vec<PathBuf>,
    category: &str,
    custom_folder: Option<String>,
    custom_name: Option<String>,
    compress: bool,
    json: bool,
) -> Result<()> {
    let total = files.len();
    let started = Instant::now();
    let progress = if json {
        ProgressManager::hidden()
    } else {
        ProgressManager::new(total as u64)
    };
    let mut stats = UploadStats::new();

    if json {
        JsonMessage::start(total, category).emit();
    }
    info!("📤 Uploading {} file(s) to {}", total, category);

    for (index, path) in files.into_iter().enumerate() {
        let original_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        progress.set_message(&original_filename);

        let outcome = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let mut request = UploadRequest::new(bytes, original_filename.clone(), category);
                request.custom_folder = custom_folder.clone();
                request.custom_name = custom_name.clone();
                request.compress = compress;
                pipeline.upload(request).await.map_err(|e| e.to_string())
            }
            Err(e) => Err(format!("Cannot read {}: {}", path.display(), e)),
        };

        match &outcome {
            Ok(result) => {
                stats.add_uploaded(result.original_size, result.compressed_size);
                progress.update(&format!("✅ {}", result.file_name));
            }
            Err(message) => {
                stats.add_error();
                warn!("❌ {}: {}", original_filename, message);
                progress.update(&format!("❌ {}", original_filename));
            }
        }

        if json {
            JsonMessage::file_complete(path, index + 1, total, outcome.as_ref().map_err(|e| e.clone()))
                .emit();
        } else if let Ok(result) = &outcome {
            println!("🔗 {}", result.url);
        }
    }

    progress.finish(&stats.format_summary());
    if json {
        JsonMessage::complete(&stats, started.elapsed().as_secs_f64()).emit();
    } else {
        println!("{}", stats.format_summary());
    }

    if stats.errors > 0 {
        return Err(anyhow::anyhow!("{} of {} upload(s) failed", stats.errors, total));
    }
    Ok(())
}

fn print_icons(icons: &[IconEntry]) {
    if icons.is_empty() {
        println!("No icons found");
        return;
    }

    let mut current: Option<&str> = None;
    for icon in icons {
        if current != Some(icon.category.as_str()) {
            println!("📁 {}", icon.category);
            current = Some(icon.category.as_str());
        }
        println!("   - {} ({})", icon.name, icon.size);
    }
    println!("\nTotal: {} icons", icons.len());
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
