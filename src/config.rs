use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::session::User;

/// Address that is granted the administrator role
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@picsword.in";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Gallery paging configuration. Unset keys fall through to lower layers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GalleryConfig {
    /// Number of cards shown before the first "load more"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_page: Option<usize>,
    /// Number of cards appended per "load more"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

impl GalleryConfig {
    pub fn initial_page(&self) -> usize {
        self.initial_page.unwrap_or(12)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(8)
    }

    fn merge(&mut self, other: GalleryConfig) {
        if other.initial_page.is_some() {
            self.initial_page = other.initial_page;
        }
        if other.page_size.is_some() {
            self.page_size = other.page_size;
        }
    }
}

/// Identity handed out by the demo sign-in flow
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DemoUserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

pub fn default_avatar() -> String {
    "/placeholder.svg?height=40&width=40".to_string()
}

impl DemoUserConfig {
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("1")
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("Demo User")
    }

    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or("demo@example.com")
    }

    pub fn avatar_url(&self) -> String {
        self.avatar_url.clone().unwrap_or_else(default_avatar)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id().to_string(),
            name: self.name().to_string(),
            email: self.email().to_string(),
            avatar_url: self.avatar_url(),
        }
    }

    fn merge(&mut self, other: DemoUserConfig) {
        if other.id.is_some() {
            self.id = other.id;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.email.is_some() {
            self.email = other.email;
        }
        if other.avatar_url.is_some() {
            self.avatar_url = other.avatar_url;
        }
    }

    /// Every key filled in, for display
    fn resolved(&self) -> Self {
        Self {
            id: Some(self.id().to_string()),
            name: Some(self.name().to_string()),
            email: Some(self.email().to_string()),
            avatar_url: Some(self.avatar_url()),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub demo_user: DemoUserConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_email: None,
            base_url: None,
            state_dir: None,
            gallery: GalleryConfig::default(),
            demo_user: DemoUserConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.picsword/config.local.toml) > project (.picsword/config.toml)
    /// > user (~/.picsword/config.toml) > built-in defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".picsword").join("config.toml");
            if user_config.exists() {
                let user = Self::load_from(&user_config)?;
                config.merge(user);
            }
        }

        let project_config = Path::new(".picsword").join("config.toml");
        if project_config.exists() {
            let project = Self::load_from(&project_config)?;
            config.merge(project);
        }

        // Should be gitignored
        let local_config = Path::new(".picsword").join("config.local.toml");
        if local_config.exists() {
            let local = Self::load_from(&local_config)?;
            config.merge(local);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority).
    /// Only keys set in `other` override, including keys inside tables.
    pub fn merge(&mut self, other: Config) {
        if other.admin_email.is_some() {
            self.admin_email = other.admin_email;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.state_dir.is_some() {
            self.state_dir = other.state_dir;
        }
        self.gallery.merge(other.gallery);
        self.demo_user.merge(other.demo_user);
    }

    pub fn admin_email(&self) -> &str {
        self.admin_email.as_deref().unwrap_or(DEFAULT_ADMIN_EMAIL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or("http://localhost:3000")
            .trim_end_matches('/')
    }

    /// Directory holding the persisted session and the activity log
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        dirs::home_dir()
            .map(|home| home.join(".picsword"))
            .unwrap_or_else(|| PathBuf::from(".picsword"))
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !EMAIL_RE.is_match(self.admin_email()) {
            errors.push(ValidationError {
                field: "admin_email".to_string(),
                message: format!("Invalid email address '{}'", self.admin_email()),
            });
        }

        if !EMAIL_RE.is_match(self.demo_user.email()) {
            errors.push(ValidationError {
                field: "demo_user.email".to_string(),
                message: format!("Invalid email address '{}'", self.demo_user.email()),
            });
        }

        if self.demo_user.id().trim().is_empty() {
            errors.push(ValidationError {
                field: "demo_user.id".to_string(),
                message: "Must not be empty".to_string(),
            });
        }

        if self.gallery.initial_page() == 0 {
            errors.push(ValidationError {
                field: "gallery.initial_page".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.gallery.page_size() == 0 {
            errors.push(ValidationError {
                field: "gallery.page_size".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError {
                    field: "base_url".to_string(),
                    message: format!("Expected an http(s) URL, got '{}'", url),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Render the effective configuration as TOML for the settings tab
    pub fn to_toml(&self) -> Result<String> {
        let mut effective = self.clone();
        effective.admin_email = Some(self.admin_email().to_string());
        effective.base_url = Some(self.base_url().to_string());
        effective.state_dir = Some(self.state_dir());
        effective.gallery = GalleryConfig {
            initial_page: Some(self.gallery.initial_page()),
            page_size: Some(self.gallery.page_size()),
        };
        effective.demo_user = self.demo_user.resolved();
        Ok(toml::to_string_pretty(&effective)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.admin_email(), "admin@picsword.in");
        assert_eq!(config.gallery.initial_page(), 12);
        assert_eq!(config.gallery.page_size(), 8);
        assert_eq!(config.demo_user.email(), "demo@example.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
admin_email = "root@example.org"

[gallery]
page_size = 4
"#,
        )
        .unwrap();
        assert_eq!(config.admin_email(), "root@example.org");
        assert_eq!(config.gallery.initial_page(), 12);
        assert_eq!(config.gallery.page_size(), 4);
        assert_eq!(config.demo_user.name(), "Demo User");
    }

    #[test]
    fn test_merge_overrides_set_values_only() {
        let mut base = Config::default();
        base.admin_email = Some("first@example.com".to_string());
        base.base_url = Some("https://picsword.in".to_string());

        let mut other = Config::default();
        other.admin_email = Some("second@example.com".to_string());
        base.merge(other);

        assert_eq!(base.admin_email(), "second@example.com");
        assert_eq!(base.base_url(), "https://picsword.in");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let mut config = Config::default();
        config.base_url = Some("https://picsword.in/".to_string());
        assert_eq!(config.base_url(), "https://picsword.in");
    }

    #[test]
    fn test_validate_bad_email() {
        let mut config = Config::default();
        config.admin_email = Some("not-an-email".to_string());
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "admin_email");
    }

    #[test]
    fn test_validate_zero_page_size() {
        let mut config = Config::default();
        config.gallery.page_size = Some(0);
        config.gallery.initial_page = Some(0);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.message.contains("greater than 0")));
    }

    #[test]
    fn test_validate_base_url_scheme() {
        let mut config = Config::default();
        config.base_url = Some("ftp://picsword.in".to_string());
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("base_url"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "state_dir = \"/tmp/picsword-test\"\n[demo_user]\nname = \"Tester\"\n",
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.state_dir(), PathBuf::from("/tmp/picsword-test"));
        assert_eq!(config.demo_user.name(), "Tester");
        assert_eq!(config.demo_user.email(), "demo@example.com");
    }

    #[test]
    fn test_merge_keeps_tables_missing_from_upper_layer() {
        let mut config = Config::default();
        let user: Config =
            toml::from_str("[gallery]\npage_size = 4\n[demo_user]\nname = \"Ada\"\n").unwrap();
        config.merge(user);
        let project: Config = toml::from_str("admin_email = \"ops@example.com\"\n").unwrap();
        config.merge(project);

        assert_eq!(config.admin_email(), "ops@example.com");
        assert_eq!(config.gallery.page_size(), 4);
        assert_eq!(config.gallery.initial_page(), 12);
        assert_eq!(config.demo_user.name(), "Ada");
        assert_eq!(config.demo_user.email(), "demo@example.com");

        // A later layer overrides only the keys it sets
        let local: Config =
            toml::from_str("[gallery]\ninitial_page = 6\n[demo_user]\nemail = \"ada@example.com\"\n")
                .unwrap();
        config.merge(local);
        assert_eq!(config.gallery.page_size(), 4);
        assert_eq!(config.gallery.initial_page(), 6);
        assert_eq!(config.demo_user.to_user().name, "Ada");
        assert_eq!(config.demo_user.to_user().email, "ada@example.com");
    }

    #[test]
    fn test_to_toml_shows_resolved_tables() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("page_size = 8"));
        assert!(rendered.contains("name = \"Demo User\""));
    }
}
