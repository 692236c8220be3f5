//! # Image Compression Module
//!
//! Questo modulo gestisce la ricompressione lossy opzionale dei formati raster
//! caricati (PNG, JPEG, WebP). SVG e ICO non vengono mai toccati.
//!
//! ## Strategia Tool Selection
//!
//! Si preferiscono i tool esterni specializzati e si scende lungo una
//! catena di fallback:
//!
//! | Formato | 1° scelta | 2° scelta | Fallback in-process |
//! |---------|-----------|-----------|---------------------|
//! | PNG     | pngquant (palette, quality 65-80) | oxipng (max, strip) | encoder `image` (Best + Adaptive) |
//! | JPEG    | mozjpeg (q 80, progressive) | jpegoptim (max 80, progressive) | encoder `image` (q 80) |
//! | WebP    | cwebp (q 80, -m 6) | - | nessuno: bytes originali |
//!
//! ## Error Handling
//!
//! La compressione non è mai fatale per l'upload: qualsiasi errore di codec,
//! tool mancante, output non decodificabile o output non più piccolo
//! dell'input fa restituire i bytes originali invariati (con un `warn!`).
//!
//! ## Concorrenza
//!
//! I tool esterni girano come processi figli (`tokio::process::Command`) in una
//! directory temporanea; gli encoder in-process e il controllo di decodifica
//! dell'output girano su `spawn_blocking`.
//!
//! ## Esempio:
//! ```rust,no_run
//! use icon_host::config::CompressionConfig;
//! use icon_host::image_processor::ImageCompressor;
//!
//! # async fn example(bytes: Vec<u8>) {
//! let compressor = ImageCompressor::new(CompressionConfig::default());
//! let smaller = compressor.compress(bytes, "png").await;
//! # }
//! ```

use crate::config::CompressionConfig;
use crate::error::{IconError, IconResult};
use crate::tool_resolver::ToolPathResolver;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat};
use std::path::Path;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Extensions that may be recompressed
pub const COMPRESSIBLE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Raster formats the compressor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
    WebP,
}

impl RasterFormat {
    /// Map a lower-case extension (no dot) to a compressible format
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

/// Lossy recompression of uploaded raster images
#[derive(Debug, Clone)]
pub struct ImageCompressor {
    config: CompressionConfig,
}

impl ImageCompressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Whether `extension` is one the compressor will attempt
    pub fn is_compressible(extension: &str) -> bool {
        RasterFormat::from_extension(extension).is_some()
    }

    /// Recompress `bytes`; on any failure the original bytes come back unchanged.
    ///
    /// Non-compressible extensions (svg, ico, ...) pass straight through.
    pub async fn compress(&self, bytes: Vec<u8>, extension: &str) -> Vec<u8> {
        let Some(format) = RasterFormat::from_extension(extension) else {
            return bytes;
        };

        match self.try_compress(&bytes, format).await {
            Ok(compressed) if compressed.len() < bytes.len() => {
                info!(
                    "🗜️  Compressed {} image: {} -> {} bytes",
                    format.extension(),
                    bytes.len(),
                    compressed.len()
                );
                compressed
            }
            Ok(compressed) => {
                debug!(
                    "Compression did not shrink {} image ({} -> {} bytes), keeping original",
                    format.extension(),
                    bytes.len(),
                    compressed.len()
                );
                bytes
            }
            Err(e) => {
                warn!("⚠️ Compression failed, storing original bytes: {}", e);
                bytes
            }
        }
    }

    async fn try_compress(&self, bytes: &[u8], format: RasterFormat) -> IconResult<Vec<u8>> {
        if self.config.use_external_tools {
            match self.compress_with_tools(bytes, format).await {
                Ok(Some(out)) => return verified(out, format).await,
                Ok(None) => debug!("No external {} tool succeeded", format.extension()),
                Err(e) => debug!("External {} compression failed: {}", format.extension(), e),
            }
        }

        let config = self.config.clone();
        let input = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            let out = encode_in_process(&input, format, &config)?;
            ensure_decodable(&out, format)?;
            Ok::<_, IconError>(out)
        })
        .await
        .map_err(|e| IconError::Compression(format!("encoder task failed: {}", e)))?
    }

    /// Run the external tool ladder for `format`; `Ok(None)` when no tool produced output.
    async fn compress_with_tools(
        &self,
        bytes: &[u8],
        format: RasterFormat,
    ) -> IconResult<Option<Vec<u8>>> {
        let resolver = ToolPathResolver::instance();
        let work_dir = TempDir::new()?;
        let input = work_dir.path().join(format!("input.{}", format.extension()));
        let output = work_dir.path().join(format!("output.{}", format.extension()));
        tokio::fs::write(&input, bytes).await?;

        for tool in tool_ladder(format) {
            let Some(tool_path) = resolver.resolve_tool(tool) else {
                continue;
            };
            let _ = tokio::fs::remove_file(&output).await;

            let result = match *tool {
                "jpegoptim" => self.run_to_stdout(&tool_path, &input, &output).await,
                _ => {
                    let args = self.tool_args(tool, &input, &output);
                    debug!("Running {} {:?}", tool, args);
                    Command::new(&tool_path)
                        .args(&args)
                        .output()
                        .await
                        .map(|out| out.status.success())
                        .map_err(IconError::from)
                }
            };

            match result {
                Ok(true) if output.exists() => {
                    debug!("{} compression succeeded with {}", format.extension(), tool);
                    return Ok(Some(tokio::fs::read(&output).await?));
                }
                Ok(_) => warn!("{} did not produce output, trying next tool", tool),
                Err(e) => warn!("{} failed: {}, trying next tool", tool, e),
            }
        }

        Ok(None)
    }

    fn tool_args(&self, tool: &str, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy().to_string();
        let output = output.to_string_lossy().to_string();
        let c = &self.config;
        match tool {
            "pngquant" => vec![
                format!("--quality={}-{}", c.png_quality_min, c.png_quality),
                "--speed".into(),
                "1".into(),
                "--strip".into(),
                "--force".into(),
                "--output".into(),
                output,
                "--".into(),
                input,
            ],
            "oxipng" => vec![
                "-o".into(),
                "max".into(),
                "--strip".into(),
                "safe".into(),
                "--out".into(),
                output,
                input,
            ],
            "mozjpeg" => vec![
                "-quality".into(),
                c.jpeg_quality.to_string(),
                "-optimize".into(),
                "-progressive".into(),
                "-outfile".into(),
                output,
                input,
            ],
            "cwebp" => vec![
                "-q".into(),
                c.webp_quality.to_string(),
                "-m".into(),
                c.webp_method.to_string(),
                "-quiet".into(),
                input,
                "-o".into(),
                output,
            ],
            _ => Vec::new(),
        }
    }

    /// jpegoptim writes the recompressed image to stdout
    async fn run_to_stdout(&self, tool_path: &Path, input: &Path, output: &Path) -> IconResult<bool> {
        let out = Command::new(tool_path)
            .arg(format!("--max={}", self.config.jpeg_quality))
            .arg("--all-progressive")
            .arg("--strip-all")
            .arg("--stdout")
            .arg(input)
            .output()
            .await?;

        if out.status.success() && !out.stdout.is_empty() {
            tokio::fs::write(output, out.stdout).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

fn tool_ladder(format: RasterFormat) -> &'static [&'static str] {
    match format {
        RasterFormat::Png => &["pngquant", "oxipng"],
        RasterFormat::Jpeg => &["mozjpeg", "jpegoptim"],
        RasterFormat::WebP => &["cwebp"],
    }
}

fn encode_in_process(
    bytes: &[u8],
    format: RasterFormat,
    config: &CompressionConfig,
) -> IconResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, format.image_format())?;
    let (width, height) = (img.width(), img.height());
    let mut buffer = Vec::new();

    match format {
        RasterFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut buffer,
                CompressionType::Best,
                FilterType::Adaptive,
            );
            let img = normalize_for_png(img);
            encoder.write_image(img.as_bytes(), width, height, img.color())?;
        }
        RasterFormat::Jpeg => {
            let rgb = img.to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut buffer, config.jpeg_quality);
            encoder.write_image(rgb.as_raw(), width, height, ColorType::Rgb8)?;
        }
        RasterFormat::WebP => {
            return Err(IconError::Compression(
                "no built-in lossy WebP encoder; install cwebp".to_string(),
            ));
        }
    }

    Ok(buffer)
}

/// The PNG encoder only takes 8/16-bit gray and RGB(A)
fn normalize_for_png(img: DynamicImage) -> DynamicImage {
    match img.color() {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => img,
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => img,
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    }
}

/// Decode check on the blocking pool; hands `out` back when it is a valid image
async fn verified(out: Vec<u8>, format: RasterFormat) -> IconResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || ensure_decodable(&out, format).map(|_| out))
        .await
        .map_err(|e| IconError::Compression(format!("decode check task failed: {}", e)))?
}

fn ensure_decodable(bytes: &[u8], format: RasterFormat) -> IconResult<()> {
    image::load_from_memory_with_format(bytes, format.image_format())
        .map(|_| ())
        .map_err(|e| IconError::Compression(format!("compressed output is not a valid image: {}", e)))
}
