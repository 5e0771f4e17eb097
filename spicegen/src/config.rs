//! Runtime configuration and environment checks.
//!
//! Configuration is resolved once per process and handed to the rest of the
//! system as plain values. Resolution reads through a lookup function so the
//! same code serves the real environment and tests.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROVIDER_VAR: &str = "SPICEGEN_PROVIDER";
pub const MODEL_VAR: &str = "SPICEGEN_MODEL";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const LTSPICE_PATH_VAR: &str = "LTSPICE_PATH";

const LTSPICE_BINARY: &str = "LTspice";
pub const DEFAULT_MACOS_LTSPICE: &str = "/Applications/LTspice.app/Contents/MacOS/LTspice";
const DEFAULT_WINDOWS_LTSPICE: &str = r"C:\Program Files\ADI\LTspice\LTspice.exe";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {var} environment variable. Set {var} in your shell or .env before running spicegen.")]
    MissingApiKey { var: &'static str },
    #[error("Unknown provider '{0}'. Expected 'openai' or 'claude'.")]
    UnknownProvider(String),
    #[error("LTSPICE_PATH is set but does not exist: {}. Fix LTSPICE_PATH or unset it to use auto-discovery.", .0.display())]
    SimulatorPathMissing(PathBuf),
    #[error("LTSPICE_PATH is set but is not executable: {}. Point LTSPICE_PATH to the LTspice executable binary.", .0.display())]
    SimulatorNotExecutable(PathBuf),
    #[error("LTspice executable could not be resolved. Set LTSPICE_PATH, add `LTspice` to PATH, or install LTspice at /Applications/LTspice.app/Contents/MacOS/LTspice.")]
    SimulatorNotFound,
}

/// Load variables from `.env` if present. Existing variables win.
pub fn load_environment() {
    let _ = dotenvy::dotenv();
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Text-generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    Claude,
}

impl Provider {
    /// `explicit` when given, else `SPICEGEN_PROVIDER`, else the default.
    pub fn from_lookup<F>(explicit: Option<Provider>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match explicit {
            Some(p) => Ok(p),
            None => match non_empty(lookup(PROVIDER_VAR)) {
                Some(raw) => raw.parse(),
                None => Ok(Provider::default()),
            },
        }
    }

    pub fn from_env(explicit: Option<Provider>) -> Result<Self, ConfigError> {
        Self::from_lookup(explicit, env_lookup)
    }

    /// Environment variable holding this provider's credential.
    pub fn key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => OPENAI_KEY_VAR,
            Provider::Claude => ANTHROPIC_KEY_VAR,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => f.write_str("openai"),
            Provider::Claude => f.write_str("claude"),
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "claude" | "anthropic" => Ok(Provider::Claude),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Resolved backend settings.
#[derive(Clone)]
pub struct BackendConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BackendConfig {
    /// Resolve from the process environment. `provider` overrides
    /// `SPICEGEN_PROVIDER` when given.
    pub fn from_env(provider: Option<Provider>) -> Result<Self, ConfigError> {
        Self::from_lookup(provider, env_lookup)
    }

    pub fn from_lookup<F>(provider: Option<Provider>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = Provider::from_lookup(provider, &lookup)?;

        let key_var = provider.key_var();
        let api_key =
            non_empty(lookup(key_var)).ok_or(ConfigError::MissingApiKey { var: key_var })?;

        let base_url = match provider {
            Provider::OpenAI => non_empty(lookup(OPENAI_BASE_URL_VAR)),
            Provider::Claude => None,
        };

        Ok(Self {
            provider,
            api_key,
            model: non_empty(lookup(MODEL_VAR)),
            base_url,
        })
    }
}

/// Finds the LTspice executable.
///
/// Priority: `LTSPICE_PATH`, then `LTspice` on `PATH`, then the platform
/// install locations.
#[derive(Debug, Clone, Default)]
pub struct SimulatorLocator {
    pub override_path: Option<PathBuf>,
    pub search_path: Option<OsString>,
    pub fallbacks: Vec<PathBuf>,
}

impl SimulatorLocator {
    pub fn from_env() -> Self {
        let mut locator = Self::from_lookup(env_lookup);
        locator.search_path = std::env::var_os("PATH");
        locator
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME");
        let override_path =
            non_empty(lookup(LTSPICE_PATH_VAR)).map(|raw| expand_home(&raw, home.as_deref()));

        Self {
            override_path,
            search_path: lookup("PATH").map(OsString::from),
            fallbacks: vec![
                PathBuf::from(DEFAULT_MACOS_LTSPICE),
                PathBuf::from(DEFAULT_WINDOWS_LTSPICE),
            ],
        }
    }

    pub fn resolve(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref candidate) = self.override_path {
            if !candidate.exists() {
                return Err(ConfigError::SimulatorPathMissing(candidate.clone()));
            }
            if !is_executable(candidate) {
                return Err(ConfigError::SimulatorNotExecutable(candidate.clone()));
            }
            return Ok(candidate.clone());
        }

        if let Some(found) = self.search_path.as_ref().and_then(|p| find_in_path(p)) {
            return Ok(found);
        }

        self.fallbacks
            .iter()
            .find(|p| p.exists() && is_executable(p))
            .cloned()
            .ok_or(ConfigError::SimulatorNotFound)
    }
}

fn expand_home(raw: &str, home: Option<&str>) -> PathBuf {
    match (raw.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => Path::new(home).join(rest),
        _ if raw == "~" => home.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(raw)),
        _ => PathBuf::from(raw),
    }
}

fn find_in_path(search_path: &OsString) -> Option<PathBuf> {
    let names: &[&str] = if cfg!(windows) {
        &["LTspice.exe", LTSPICE_BINARY]
    } else {
        &[LTSPICE_BINARY]
    };
    std::env::split_paths(search_path)
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file() && is_executable(candidate))
}

#[cfg(unix)]
pub(crate) fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub(crate) fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Everything needed for a full generate-and-simulate run.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub backend: BackendConfig,
    pub ltspice_executable: PathBuf,
}

impl RuntimeConfig {
    /// Load `.env`, then resolve backend and simulator. Fails fast on the
    /// first missing prerequisite.
    pub fn load(provider: Option<Provider>) -> Result<Self, ConfigError> {
        load_environment();
        let backend = BackendConfig::from_env(provider)?;
        let ltspice_executable = SimulatorLocator::from_env().resolve()?;
        Ok(Self {
            backend,
            ltspice_executable,
        })
    }
}
