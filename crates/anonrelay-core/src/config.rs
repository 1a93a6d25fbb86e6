use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{errors::Error, Result};

const DEFAULT_CONFIG_PATH: &str = "./config.toml";

/// Typed configuration for the relay, read once at startup from a TOML file.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Platform credential. `ANONRELAY_TOKEN` overrides the file.
    #[serde(default)]
    pub token: String,

    /// Root of the persistent store.
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    /// Message templates file.
    #[serde(default = "default_text_path")]
    pub text_path: PathBuf,

    #[serde(default = "default_setup_phrase")]
    pub setup_phrase: String,

    #[serde(default = "default_anon_role")]
    pub anon_role: String,

    /// Upper bound for any single platform call.
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
}

impl Config {
    /// Load from `ANONRELAY_CONFIG` (default `./config.toml`).
    pub fn load() -> Result<Self> {
        let path = env_path("ANONRELAY_CONFIG").unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "missing config file {}",
                path.display()
            )));
        }
        let txt = fs::read_to_string(path)?;
        let mut cfg = Self::parse(&txt)?;

        if let Some(token) = env_str("ANONRELAY_TOKEN").and_then(non_empty) {
            cfg.token = token;
        }
        if cfg.token.trim().is_empty() {
            return Err(Error::Config("token is not filled in".to_string()));
        }
        Ok(cfg)
    }

    /// Parse without the environment override or the token check.
    pub fn parse(txt: &str) -> Result<Self> {
        toml::from_str(txt).map_err(|e| Error::Config(format!("invalid config: {e}")))
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs.max(1))
    }
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_text_path() -> PathBuf {
    PathBuf::from("./texts.toml")
}

fn default_setup_phrase() -> String {
    "Please subscribe to here.".to_string()
}

fn default_anon_role() -> String {
    "anonymous".to_string()
}

fn default_io_timeout_secs() -> u64 {
    15
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let cfg = Config::parse("token = \"abc\"").unwrap();
        assert_eq!(cfg.token, "abc");
        assert_eq!(cfg.cache_root, PathBuf::from("./cache"));
        assert_eq!(cfg.text_path, PathBuf::from("./texts.toml"));
        assert_eq!(cfg.setup_phrase, "Please subscribe to here.");
        assert_eq!(cfg.io_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn explicit_fields_win() {
        let cfg = Config::parse(
            r#"
token = "t"
cache_root = "/var/lib/anonrelay"
text_path = "/etc/anonrelay/texts.toml"
setup_phrase = "relay here"
anon_role = "ghost"
io_timeout_secs = 3
"#,
        )
        .unwrap();
        assert_eq!(cfg.cache_root, PathBuf::from("/var/lib/anonrelay"));
        assert_eq!(cfg.setup_phrase, "relay here");
        assert_eq!(cfg.anon_role, "ghost");
        assert_eq!(cfg.io_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("missing config file")));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(
            Config::parse("token = ").unwrap_err(),
            Error::Config(_)
        ));
    }
}
