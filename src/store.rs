//! # Category Store Module
//!
//! Questo modulo gestisce l'albero di directory delle icone.
//!
//! ## Responsabilità:
//! - Risoluzione categoria → directory (`social` → `icons/social`,
//!   `custom/tech` → `icons/custom/tech`)
//! - Creazione idempotente delle directory con marker file `.gitkeep`
//! - Scrittura atomica dei file senza sovrascrittura
//! - Rimozione file con ripristino del marker se la directory si svuota
//! - Listing icone, categorie e struttura completa
//!
//! ## Layout su disco:
//! ```text
//! icons/
//! ├── social/github.svg
//! ├── ui/.gitkeep
//! └── custom/
//!     ├── tech/rust.png
//!     └── gaming/controller.svg
//! ```
//!
//! `custom` è l'unica eccezione al modello piatto: le sue sottocartelle
//! diventano categorie `custom/<nome>` e `custom` non viene mai elencata
//! da sola quando contiene sottocartelle.
//!
//! Le directory sono la sorgente di verità: nessun registro separato,
//! nessuna cache. Ogni listing riflette lo stato attuale del filesystem.

use crate::config::Config;
use crate::error::{IconError, IconResult};
use crate::file_manager::FileManager;
use crate::sanitize::extension_of;
use crate::types::IconEntry;
use crate::urls::UrlBuilder;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Placeholder keeping empty category directories tracked by git
pub const MARKER_FILE: &str = ".gitkeep";
pub const MARKER_CONTENT: &str = "# This file ensures the folder is tracked by git\n";

/// The container category whose subfolders are categories themselves
pub const CUSTOM_CATEGORY: &str = "custom";

/// Filesystem-backed tree of categories and icons
#[derive(Debug, Clone)]
pub struct CategoryStore {
    root: PathBuf,
    supported_formats: Vec<String>,
    urls: UrlBuilder,
}

impl CategoryStore {
    pub fn new(root: impl Into<PathBuf>, supported_formats: Vec<String>, urls: UrlBuilder) -> Self {
        Self {
            root: root.into(),
            supported_formats,
            urls,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.icons_root.clone(),
            config.supported_formats.clone(),
            UrlBuilder::new(config.urls.clone()),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    /// Map a category to its directory under the icons root.
    ///
    /// `custom/<slug>` is the only two-level form; absolute paths, `..`,
    /// backslashes and empty segments are rejected.
    pub fn resolve_category_path(&self, category: &str) -> IconResult<PathBuf> {
        let invalid = || IconError::validation(format!("Invalid category: {}", category));

        if category.is_empty() || category.starts_with('/') || category.contains('\\') {
            return Err(invalid());
        }

        let segments: Vec<&str> = category.split('/').collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains(':'))
        {
            return Err(invalid());
        }

        match segments.as_slice() {
            [single] => Ok(self.root.join(single)),
            [CUSTOM_CATEGORY, sub] => Ok(self.root.join(CUSTOM_CATEGORY).join(sub)),
            _ => Err(invalid()),
        }
    }

    /// Create `dir` (and parents) if needed; an empty directory gets a marker file.
    /// Calling it again is a no-op.
    pub async fn ensure_directory(&self, dir: &Path) -> IconResult<()> {
        tokio::fs::create_dir_all(dir).await?;

        if !has_visible_entries(dir).await? {
            write_marker(dir).await?;
        }
        Ok(())
    }

    /// Store `bytes` as `category/file_name`, never replacing an existing file.
    ///
    /// Returns the path of the new file. The marker file is removed once the
    /// directory holds a real icon.
    pub async fn place_file(
        &self,
        category: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> IconResult<PathBuf> {
        check_file_name(file_name)?;
        let dir = self.resolve_category_path(category)?;
        self.ensure_directory(&dir).await?;

        let target = dir.join(file_name);
        let written = FileManager::write_new_file(&target, bytes).await;

        // Either way the directory now holds an icon, so a marker left by a
        // concurrent `ensure_directory` goes too
        if written.is_ok() || matches!(&written, Err(e) if e.kind() == ErrorKind::AlreadyExists) {
            remove_marker(&dir).await?;
        }

        written.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => IconError::DuplicateFile {
                file_name: file_name.to_string(),
                category: category.to_string(),
            },
            _ => IconError::Io(e),
        })?;

        debug!("Stored {}", target.display());
        Ok(target)
    }

    /// Delete `category/file_name`; a directory left empty gets its marker back.
    pub async fn remove_file(&self, category: &str, file_name: &str) -> IconResult<()> {
        let not_found = || IconError::NotFound {
            file_name: file_name.to_string(),
            category: category.to_string(),
        };

        if check_file_name(file_name).is_err() || FileManager::is_hidden(file_name) {
            return Err(not_found());
        }
        let dir = self.resolve_category_path(category)?;
        let target = dir.join(file_name);

        match tokio::fs::remove_file(&target).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        }

        if !has_visible_entries(&dir).await? {
            write_marker(&dir).await?;
            debug!("Category {} is now empty, marker restored", category);
        }
        Ok(())
    }

    /// Every stored icon, sorted by category then name
    pub fn list_all(&self) -> IconResult<Vec<IconEntry>> {
        let mut icons = Vec::new();
        for (category, dir) in self.category_dirs()? {
            for (name, path) in self.icon_files(&dir)? {
                let metadata = std::fs::metadata(&path)?;
                let modified = FileManager::modified_secs(&metadata);
                icons.push(self.entry(&category, name, metadata.len(), modified));
            }
        }
        Ok(icons)
    }

    /// All categories, sorted; `custom` subfolders appear as `custom/<name>`
    pub fn list_categories(&self) -> IconResult<Vec<String>> {
        Ok(self
            .category_dirs()?
            .into_iter()
            .map(|(category, _)| category)
            .collect())
    }

    /// Category → file names, following the same traversal as `list_categories`
    pub fn get_structure(&self) -> IconResult<BTreeMap<String, Vec<String>>> {
        let mut structure = BTreeMap::new();
        for (category, dir) in self.category_dirs()? {
            let files = self
                .icon_files(&dir)?
                .into_iter()
                .map(|(name, _)| name)
                .collect();
            structure.insert(category, files);
        }
        Ok(structure)
    }

    /// Details of a single stored icon
    pub async fn file_info(&self, category: &str, file_name: &str) -> IconResult<IconEntry> {
        let not_found = || IconError::NotFound {
            file_name: file_name.to_string(),
            category: category.to_string(),
        };

        if check_file_name(file_name).is_err() || FileManager::is_hidden(file_name) {
            return Err(not_found());
        }
        let path = self.resolve_category_path(category)?.join(file_name);

        let (size_bytes, modified) = match FileManager::get_file_info(&path).await {
            Ok(info) => info,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };
        Ok(self.entry(category, file_name.to_string(), size_bytes, modified))
    }

    /// Create each default category directory with its marker file
    pub async fn init_default_categories(&self, categories: &[String]) -> IconResult<Vec<PathBuf>> {
        let mut created = Vec::with_capacity(categories.len());
        for category in categories {
            let dir = self.resolve_category_path(category)?;
            self.ensure_directory(&dir).await?;
            info!("📁 Category ready: {}", dir.display());
            created.push(dir);
        }
        Ok(created)
    }

    fn entry(&self, category: &str, name: String, size_bytes: u64, modified: u64) -> IconEntry {
        IconEntry {
            url: self.urls.icon_url(category, &name),
            name,
            category: category.to_string(),
            size_bytes,
            size: FileManager::format_size(size_bytes),
            original_size_bytes: None,
            last_modified: modified,
        }
    }

    /// Category names with their directories, sorted by name
    fn category_dirs(&self) -> IconResult<Vec<(String, PathBuf)>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut categories = Vec::new();
        for (name, path) in subdirectories(&self.root)? {
            if name == CUSTOM_CATEGORY {
                let subfolders = subdirectories(&path)?;
                if subfolders.is_empty() {
                    categories.push((name, path));
                }
                for (sub, sub_path) in subfolders {
                    categories.push((format!("{}/{}", CUSTOM_CATEGORY, sub), sub_path));
                }
            } else {
                categories.push((name, path));
            }
        }

        categories.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(categories)
    }

    /// Visible files with a supported extension directly inside `dir`
    fn icon_files(&self, dir: &Path) -> IconResult<Vec<(String, PathBuf)>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if FileManager::is_hidden(&name) {
                continue;
            }
            let supported = extension_of(&name)
                .map(|ext| self.supported_formats.iter().any(|f| *f == ext))
                .unwrap_or(false);
            if supported {
                files.push((name, entry.into_path()));
            }
        }
        Ok(files)
    }
}

/// Visible subdirectories directly inside `dir`, sorted by name
fn subdirectories(dir: &Path) -> IconResult<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type().is_dir() && !FileManager::is_hidden(&name) {
            dirs.push((name, entry.into_path()));
        }
    }
    Ok(dirs)
}

/// A bare file name: no separators, no `.`/`..`, not empty
fn check_file_name(file_name: &str) -> IconResult<()> {
    if file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains('/')
        || file_name.contains('\\')
    {
        return Err(IconError::validation(format!("Invalid file name: {}", file_name)));
    }
    Ok(())
}

async fn has_visible_entries(dir: &Path) -> std::io::Result<bool> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !FileManager::is_hidden(&entry.file_name().to_string_lossy()) {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn write_marker(dir: &Path) -> std::io::Result<()> {
    let marker = dir.join(MARKER_FILE);
    if tokio::fs::try_exists(&marker).await? {
        return Ok(());
    }
    tokio::fs::write(&marker, MARKER_CONTENT).await
}

async fn remove_marker(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(dir.join(MARKER_FILE)).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{UrlConfig, UrlMode};
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> CategoryStore {
        let urls = UrlBuilder::new(UrlConfig {
            mode: UrlMode::Local,
            ..UrlConfig::default()
        });
        CategoryStore::new(
            temp_dir.path().join("icons"),
            vec!["svg".into(), "png".into(), "ico".into(), "webp".into()],
            urls,
        )
    }

    fn visible_and_markers(dir: &Path) -> (usize, usize) {
        let names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        let markers = names.iter().filter(|n| *n == MARKER_FILE).count();
        let visible = names.iter().filter(|n| !n.starts_with('.')).count();
        (visible, markers)
    }

    #[test]
    fn test_resolve_category_path() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let root = temp_dir.path().join("icons");

        assert_eq!(store.resolve_category_path("social").unwrap(), root.join("social"));
        assert_eq!(
            store.resolve_category_path("custom/tech").unwrap(),
            root.join("custom").join("tech")
        );

        for bad in ["", "/etc", "../x", "custom/..", "a\\b", "custom//x", "social/sub", "custom/a/b"] {
            assert!(
                matches!(store.resolve_category_path(bad), Err(IconError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_ensure_directory_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let dir = store.resolve_category_path("custom/tech").unwrap();

        store.ensure_directory(&dir).await.unwrap();
        store.ensure_directory(&dir).await.unwrap();

        assert_eq!(visible_and_markers(&dir), (0, 1));
        assert_eq!(std::fs::read_to_string(dir.join(MARKER_FILE)).unwrap(), MARKER_CONTENT);
    }

    #[tokio::test]
    async fn test_place_file_rejects_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let path = store.place_file("ui", "menu.svg", b"<svg/>".to_vec()).await.unwrap();
        let err = store
            .place_file("ui", "menu.svg", b"<svg>other</svg>".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(err, IconError::DuplicateFile { .. }));
        assert_eq!(std::fs::read(path).unwrap(), b"<svg/>");
    }

    #[tokio::test]
    async fn test_stale_marker_cleared_on_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let dir = store.resolve_category_path("ui").unwrap();

        store.place_file("ui", "menu.svg", b"<svg/>".to_vec()).await.unwrap();
        // Marker written by an upload that raced with the one above
        std::fs::write(dir.join(MARKER_FILE), MARKER_CONTENT).unwrap();

        let err = store
            .place_file("ui", "menu.svg", b"<svg>again</svg>".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, IconError::DuplicateFile { .. }));
        assert_eq!(visible_and_markers(&dir), (1, 0));
    }

    #[tokio::test]
    async fn test_marker_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let dir = store.resolve_category_path("flags").unwrap();

        store.place_file("flags", "it.svg", b"<svg/>".to_vec()).await.unwrap();
        assert_eq!(visible_and_markers(&dir), (1, 0));

        store.remove_file("flags", "it.svg").await.unwrap();
        assert_eq!(visible_and_markers(&dir), (0, 1));

        store.place_file("flags", "fr.svg", b"<svg/>".to_vec()).await.unwrap();
        assert_eq!(visible_and_markers(&dir), (1, 0));
    }

    #[tokio::test]
    async fn test_remove_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.init_default_categories(&["ui".to_string()]).await.unwrap();

        for name in ["nope.svg", MARKER_FILE, "../ui"] {
            let err = store.remove_file("ui", name).await.unwrap_err();
            assert!(matches!(err, IconError::NotFound { .. }), "{name}");
        }
    }

    #[tokio::test]
    async fn test_category_discovery() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let root = temp_dir.path().join("icons");
        std::fs::create_dir_all(root.join("social")).unwrap();
        std::fs::create_dir_all(root.join("custom").join("tech")).unwrap();
        std::fs::create_dir_all(root.join("custom").join("gaming")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();

        let categories = store.list_categories().unwrap();
        assert_eq!(categories, vec!["custom/gaming", "custom/tech", "social"]);
    }

    #[tokio::test]
    async fn test_bare_custom_without_subfolders() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .init_default_categories(&["custom".to_string(), "ui".to_string()])
            .await
            .unwrap();

        assert_eq!(store.list_categories().unwrap(), vec!["custom", "ui"]);
    }

    #[tokio::test]
    async fn test_list_all_and_structure() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.place_file("social", "github.svg", b"<svg/>".to_vec()).await.unwrap();
        store.place_file("custom/tech", "rust.png", vec![0u8; 2048]).await.unwrap();

        let root = temp_dir.path().join("icons");
        std::fs::write(root.join("social").join("notes.txt"), "x").unwrap();
        std::fs::write(root.join("social").join(".hidden.svg"), "x").unwrap();

        let icons = store.list_all().unwrap();
        assert_eq!(icons.len(), 2);
        assert_eq!(icons[0].category, "custom/tech");
        assert_eq!(icons[0].name, "rust.png");
        assert_eq!(icons[0].size_bytes, 2048);
        assert_eq!(icons[0].size, "2.00 KB");
        assert_eq!(icons[0].url, "/icons/custom/tech/rust.png");
        assert_eq!(icons[1].name, "github.svg");

        let structure = store.get_structure().unwrap();
        assert_eq!(structure["social"], vec!["github.svg"]);
        assert_eq!(structure["custom/tech"], vec!["rust.png"]);
        assert!(!structure.contains_key("custom"));
    }

    #[tokio::test]
    async fn test_file_info() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.place_file("ui", "menu.svg", b"<svg/>".to_vec()).await.unwrap();

        let info = store.file_info("ui", "menu.svg").await.unwrap();
        assert_eq!(info.size_bytes, 6);
        assert!(info.last_modified > 0);

        let missing = store.file_info("ui", "gone.svg").await.unwrap_err();
        assert!(matches!(missing, IconError::NotFound { .. }));
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        assert!(store.list_all().unwrap().is_empty());
        assert!(store.list_categories().unwrap().is_empty());
    }
}
