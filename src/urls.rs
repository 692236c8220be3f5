//! # URL Generation
//!
//! Costruisce gli URL pubblici delle icone a partire da `UrlConfig`:
//! - CDN: `<cdn_base>/<owner>/<repo>@<branch>/icons/<category>/<file>`
//! - Locale: `<local_base>/<category>/<file>`
//!
//! Genera anche gli snippet di utilizzo (HTML, e CSS per gli SVG).

use crate::config::{UrlConfig, UrlMode};
use crate::sanitize::split_file_name;

/// Builds public URLs for stored icons
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    config: UrlConfig,
}

impl UrlBuilder {
    pub fn new(config: UrlConfig) -> Self {
        Self { config }
    }

    /// Public URL of `file_name` in `category`
    pub fn icon_url(&self, category: &str, file_name: &str) -> String {
        match self.config.mode {
            UrlMode::Cdn => format!(
                "{}/{}/{}@{}/icons/{}/{}",
                self.config.cdn_base.trim_end_matches('/'),
                self.config.repo_owner,
                self.config.repo_name,
                self.config.branch,
                category,
                file_name
            ),
            UrlMode::Local => format!(
                "{}/{}/{}",
                self.config.local_base.trim_end_matches('/'),
                category,
                file_name
            ),
        }
    }

    /// Markdown usage snippet for an icon
    pub fn usage_examples(&self, category: &str, file_name: &str) -> String {
        let url = self.icon_url(category, file_name);
        let (alt, extension) = split_file_name(file_name);

        let mut examples = format!("\n## Usage Examples for {}\n\n", file_name);
        examples.push_str(&format!("**URL:** `{}`\n\n", url));

        examples.push_str("### HTML\n```html\n");
        examples.push_str(&format!("<img src=\"{}\" alt=\"{}\">\n", url, alt));
        examples.push_str("```\n\n");

        if extension.as_deref() == Some("svg") {
            examples.push_str("### CSS\n```css\n");
            examples.push_str(".icon {\n");
            examples.push_str(&format!("    background-image: url('{}');\n", url));
            examples.push_str("    background-size: contain;\n");
            examples.push_str("    background-repeat: no-repeat;\n");
            examples.push_str("}\n```\n\n");
        }

        examples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdn_url() {
        let urls = UrlBuilder::new(UrlConfig::default());
        assert_eq!(
            urls.icon_url("custom/tech", "rust.svg"),
            "https://cdn.jsdelivr.net/gh/dwirx/my-icons@main/icons/custom/tech/rust.svg"
        );
    }

    #[test]
    fn test_local_url() {
        let urls = UrlBuilder::new(UrlConfig {
            mode: UrlMode::Local,
            local_base: "/icons/".to_string(),
            ..UrlConfig::default()
        });
        assert_eq!(urls.icon_url("ui", "menu.png"), "/icons/ui/menu.png");
    }

    #[test]
    fn test_usage_examples() {
        let urls = UrlBuilder::new(UrlConfig::default());

        let svg = urls.usage_examples("social", "github.svg");
        assert!(svg.contains("alt=\"github\""));
        assert!(svg.contains("background-image"));

        let png = urls.usage_examples("social", "github.png");
        assert!(png.contains("<img"));
        assert!(!png.contains("background-image"));
    }
}
