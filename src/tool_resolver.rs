//! # Tool Path Resolver
//!
//! Individua i tool esterni di compressione (pngquant, oxipng, mozjpeg,
//! jpegoptim, cwebp) cercandoli in:
//! - Una directory esplicita (`ICON_HOST_TOOLS_DIR`)
//! - Il `PATH` di sistema
//!
//! Il resolver è un singleton: la risoluzione viene fatta una volta per tool
//! e poi cachata, così ogni upload non rifà la scansione del `PATH`.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing::debug;

/// Environment variable pointing at a directory of bundled codec binaries
pub const TOOLS_DIR_ENV: &str = "ICON_HOST_TOOLS_DIR";

/// Every external tool the compressor knows how to drive, with what it is for
pub const KNOWN_TOOLS: &[(&str, &str)] = &[
    ("pngquant", "PNG lossy palette quantization"),
    ("oxipng", "PNG lossless recompression"),
    ("mozjpeg", "JPEG re-encoding (progressive)"),
    ("jpegoptim", "JPEG re-encoding (alternative)"),
    ("cwebp", "WebP re-encoding"),
];

/// Resolves external tool names to executable paths
pub struct ToolPathResolver {
    tools_dir: Option<PathBuf>,
    cache: Mutex<HashMap<String, Option<PathBuf>>>,
}

impl ToolPathResolver {
    /// Process-wide resolver
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<ToolPathResolver> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    /// Create a resolver reading `ICON_HOST_TOOLS_DIR`
    pub fn new() -> Self {
        let tools_dir = env::var_os(TOOLS_DIR_ENV)
            .map(PathBuf::from)
            .filter(|p| p.is_dir());
        Self::with_tools_dir(tools_dir)
    }

    /// Create a resolver with an explicit tools directory
    pub fn with_tools_dir(tools_dir: Option<PathBuf>) -> Self {
        if let Some(ref dir) = tools_dir {
            debug!("Using tools directory: {}", dir.display());
        }
        Self {
            tools_dir,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(hit) = cache.get(tool_name) {
                return hit.clone();
            }
        }

        let resolved = self
            .tools_dir
            .as_deref()
            .map(|dir| dir.join(executable_name(tool_name)))
            .filter(|p| p.is_file())
            .or_else(|| find_in_system_path(tool_name));

        debug!("Resolved tool {} -> {:?}", tool_name, resolved);

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(tool_name.to_string(), resolved.clone());
        }
        resolved
    }

    /// Get a report of tool availability
    pub fn get_tools_report(&self) -> String {
        let mut report = String::from("External compression tools:\n");
        if let Some(ref dir) = self.tools_dir {
            report.push_str(&format!("Tools dir: {}\n", dir.display()));
        }
        for (tool, purpose) in KNOWN_TOOLS {
            match self.resolve_tool(tool) {
                Some(path) => {
                    report.push_str(&format!("  ✅ {} -> {} ({})\n", tool, path.display(), purpose));
                }
                None => {
                    report.push_str(&format!(
                        "  ❌ {} ({}; install with: {})\n",
                        tool,
                        purpose,
                        install_hint(tool)
                    ));
                }
            }
        }
        report.push_str("\nMissing tools fall back to the built-in encoders (PNG/JPEG) or keep the original bytes (WebP).\n");
        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn executable_name(tool_name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", tool_name)
    } else {
        tool_name.to_string()
    }
}

fn find_in_system_path(tool_name: &str) -> Option<PathBuf> {
    let file_name = executable_name(tool_name);
    env::split_paths(&env::var_os("PATH")?)
        .map(|dir| dir.join(&file_name))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn install_hint(tool_name: &str) -> &'static str {
    match tool_name {
        "pngquant" => "sudo apt-get install pngquant",
        "oxipng" => "cargo install oxipng",
        "mozjpeg" => "build from https://github.com/mozilla/mozjpeg",
        "jpegoptim" => "sudo apt-get install jpegoptim",
        "cwebp" => "sudo apt-get install webp",
        _ => "your package manager",
    }
}
