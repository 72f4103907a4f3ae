use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scanner configuration.
///
/// Everything here can live in a TOML file; secrets and deployment-specific
/// values are resolved from the process environment (after loading
/// `.env.local` / `.env`), and the environment always wins over the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory where the scan state and review queue are stored
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Path to the Google OAuth client credentials JSON file
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    /// Path to store the OAuth token cache
    #[serde(default = "default_token_cache_path")]
    pub token_cache_path: PathBuf,

    /// Maximum messages to consider per scan
    #[serde(default = "default_max_scan_results")]
    pub max_scan_results: u32,

    /// Maximum messages to consider per unsubscribe sweep
    #[serde(default = "default_max_unsubscribe_results")]
    pub max_unsubscribe_results: u32,

    /// Public site root used for unsubscribe links
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Model used for classification
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,

    /// Gmail query terms excluded from the scan (each is prefixed with `-`)
    #[serde(default = "default_exclude_query_parts")]
    pub exclude_query_parts: Vec<String>,

    /// Who the business is, for the classifier prompt and the unsubscribe
    /// sweep's own-address filter
    #[serde(default)]
    pub business: BusinessProfile,

    /// Secrets resolved from the environment, never from the file
    #[serde(skip)]
    pub secrets: Secrets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessProfile {
    /// Display name used in prompts and page titles
    #[serde(default = "default_business_name")]
    pub name: String,

    /// Free-text description fed to the classifier as context
    #[serde(default)]
    pub description: String,

    /// Substrings identifying the business's own sending addresses; incoming
    /// mail from these is never treated as an unsubscribe request
    #[serde(default)]
    pub own_addresses: Vec<String>,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            name: default_business_name(),
            description: String::new(),
            own_addresses: Vec::new(),
        }
    }
}

/// Values that only ever come from the environment.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    unsubscribe_secret: Option<String>,
    anthropic_api_key: Option<String>,
    sheet_id: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            unsubscribe_secret: std::env::var("UNSUBSCRIBE_SECRET").ok(),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            sheet_id: std::env::var("GOOGLE_SHEETS_ID").ok(),
        }
    }

    pub fn unsubscribe_secret(&self) -> Result<&str> {
        self.unsubscribe_secret
            .as_deref()
            .context("UNSUBSCRIBE_SECRET environment variable must be set")
    }

    pub fn anthropic_api_key(&self) -> Result<&str> {
        self.anthropic_api_key
            .as_deref()
            .context("ANTHROPIC_API_KEY environment variable must be set")
    }

    pub fn sheet_id(&self) -> Result<&str> {
        self.sheet_id
            .as_deref()
            .context("GOOGLE_SHEETS_ID environment variable must be set")
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials/credentials.json")
}

fn default_token_cache_path() -> PathBuf {
    PathBuf::from("credentials/token.json")
}

fn default_max_scan_results() -> u32 {
    100
}

fn default_max_unsubscribe_results() -> u32 {
    50
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_classifier_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_business_name() -> String {
    "the business".to_string()
}

/// Noise the scan query always excludes: automated senders, bulk-mail
/// categories, and anything carrying mass-mail "unsubscribe" boilerplate.
/// These keep classifier calls limited to plausibly-human mail.
pub fn default_exclude_query_parts() -> Vec<String> {
    [
        "from:noreply",
        "from:no-reply",
        "from:notifications",
        "from:mailer-daemon",
        "category:promotions",
        "category:social",
        "category:updates",
        "category:forums",
        "unsubscribe",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl Config {
    /// Load configuration: `.env.local` and `.env` are read first (existing
    /// environment variables are never overwritten), then the TOML file if
    /// present, then environment overrides for deploy-specific values.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        dotenvy::from_filename(".env.local").ok();
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config file {}", p.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("failed to parse config file {}", p.display()))?
            }
            Some(p) => {
                anyhow::bail!("config file {} does not exist", p.display());
            }
            None => {
                let default_path = Path::new("scanner.toml");
                if default_path.exists() {
                    let content = std::fs::read_to_string(default_path)
                        .context("failed to read scanner.toml")?;
                    toml::from_str(&content).context("failed to parse scanner.toml")?
                } else {
                    Config::default()
                }
            }
        };

        if let Ok(url) = std::env::var("SITE_URL") {
            config.site_url = url;
        }
        if let Ok(model) = std::env::var("CLASSIFIER_MODEL") {
            config.classifier_model = model;
        }
        config.secrets = Secrets::from_env();

        Ok(config)
    }

    pub fn scan_state_path(&self) -> PathBuf {
        self.data_dir.join("last_scan.json")
    }

    pub fn review_queue_path(&self) -> PathBuf {
        self.data_dir.join("manual_review.json")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            credentials_path: default_credentials_path(),
            token_cache_path: default_token_cache_path(),
            max_scan_results: default_max_scan_results(),
            max_unsubscribe_results: default_max_unsubscribe_results(),
            site_url: default_site_url(),
            classifier_model: default_classifier_model(),
            exclude_query_parts: default_exclude_query_parts(),
            business: BusinessProfile::default(),
            secrets: Secrets::default(),
        }
    }
}
