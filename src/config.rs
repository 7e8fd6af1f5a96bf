use std::path::{Path, PathBuf};

use keyring::Entry;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// Default generative model, matching what the hosted app ships with.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
/// Default number of top artists/tracks to request.
pub const DEFAULT_TOP_LIMIT: u32 = 5;
/// Spotify scopes required to read top statistics and profile basics.
pub const DEFAULT_SCOPES: &str = "user-top-read user-read-private user-read-email";

const KEYCHAIN_SERVICE: &str = "vibecheck-gemini-api";
const KEYCHAIN_USER: &str = "vibecheck";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value for {0}: {1}")]
    Invalid(&'static str, String),

    #[error("Config file error: {0}")]
    File(String),
}

/// Optional values read from the TOML config file. Everything here can also
/// come from the environment, which takes precedence.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileSettings {
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    app_origin: Option<String>,
    gemini_api_key: Option<String>,
    gemini_model: Option<String>,
    top_limit: Option<u32>,
}

/// Resolved application settings.
///
/// A missing Supabase URL/anon key or Gemini API key is a startup
/// misconfiguration: `load` fails before any network call is made.
#[derive(Debug, Clone)]
pub struct Settings {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Post-login landing URI, `<origin>/result` by convention.
    pub redirect_uri: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub top_limit: u32,
}

impl Settings {
    /// Load settings with precedence: environment > keychain (API key only)
    /// > config file > built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match config_file_path() {
            Some(path) => read_config_file(&path)?,
            None => FileSettings::default(),
        };
        let keychain_key = match load_api_key() {
            Ok(key) => key,
            Err(e) => {
                warn!("Keychain lookup failed, ignoring: {}", e);
                None
            }
        };
        Self::resolve(file, |name| std::env::var(name).ok(), keychain_key)
    }

    fn resolve(
        file: FileSettings,
        env: impl Fn(&str) -> Option<String>,
        keychain_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        let supabase_url = env("VIBECHECK_SUPABASE_URL")
            .or(file.supabase_url)
            .ok_or(ConfigError::Missing("supabase_url"))?;
        // The session layer builds endpoint URLs from this without a fallible
        // path, so a malformed value has to be rejected here.
        url::Url::parse(&supabase_url)
            .map_err(|e| ConfigError::Invalid("supabase_url", e.to_string()))?;
        let supabase_anon_key = env("VIBECHECK_SUPABASE_ANON_KEY")
            .or(file.supabase_anon_key)
            .ok_or(ConfigError::Missing("supabase_anon_key"))?;

        let origin = env("VIBECHECK_APP_ORIGIN")
            .or(file.app_origin)
            .unwrap_or_else(|| "http://localhost:5173".to_string());
        let redirect_uri = format!("{}/result", origin.trim_end_matches('/'));

        let gemini_api_key = env("GEMINI_API_KEY")
            .or(keychain_key)
            .or(file.gemini_api_key)
            .ok_or(ConfigError::Missing("gemini_api_key"))?;
        let gemini_model = env("VIBECHECK_GEMINI_MODEL")
            .or(file.gemini_model)
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let top_limit = file.top_limit.unwrap_or(DEFAULT_TOP_LIMIT);

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            redirect_uri,
            gemini_api_key,
            gemini_model,
            top_limit,
        })
    }
}

/// Platform config file location, e.g. `~/.config/vibecheck/config.toml`.
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vibecheck").join("config.toml"))
}

/// Read and parse the config file. A missing file yields empty settings;
/// an unreadable or malformed file is an error the user should see.
fn read_config_file(path: &Path) -> Result<FileSettings, ConfigError> {
    if !path.exists() {
        return Ok(FileSettings::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::File(format!("could not read {:?}: {}", path, e)))?;
    toml::from_str(&content)
        .map_err(|e| ConfigError::File(format!("could not parse {:?}: {}", path, e)))
}

/// Store the Gemini API key in the system keychain.
pub fn store_api_key(key: &str) -> Result<(), String> {
    info!("Storing API key in keychain");
    let entry = Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_USER).map_err(|e| e.to_string())?;
    entry.set_password(key).map_err(|e| e.to_string())
}

/// Fetch the Gemini API key from the system keychain, `None` if absent.
pub fn load_api_key() -> Result<Option<String>, String> {
    let entry = Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_USER).map_err(|e| e.to_string())?;
    match entry.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}

/// Remove the Gemini API key from the system keychain.
pub fn delete_api_key() -> Result<(), String> {
    info!("Deleting API key from keychain");
    let entry = Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_USER).map_err(|e| e.to_string())?;
    entry.delete_credential().map_err(|e| e.to_string())
}
