use std::{env, path::PathBuf, time::Duration};

use anyhow::Context;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_STATE_DIR: &str = ".humg";
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub state_dir: PathBuf,
    /// Read timeout for the streaming endpoints, `None` waits forever.
    pub stream_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            stream_timeout: Some(Duration::from_secs(DEFAULT_STREAM_TIMEOUT_SECS)),
        }
    }
}

impl Config {
    /// Reads `HUMG_*` variables, after loading `.env` if there is one.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let stream_timeout = match set("HUMG_STREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().context(format!(
                    "HUMG_STREAM_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    raw
                ))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => defaults.stream_timeout,
        };

        Ok(Self {
            api_url: set("HUMG_API_URL").unwrap_or(defaults.api_url),
            state_dir: set("HUMG_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            stream_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.stream_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HUMG_API_URL", "https://khaosat.humg.edu.vn/api"),
            ("HUMG_STATE_DIR", "/tmp/humg"),
            ("HUMG_STREAM_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://khaosat.humg.edu.vn/api");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/humg"));
        assert_eq!(config.stream_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = Config::from_lookup(lookup(&[("HUMG_STREAM_TIMEOUT_SECS", "0")])).unwrap();
        assert_eq!(config.stream_timeout, None);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[("HUMG_API_URL", "  ")])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = Config::from_lookup(lookup(&[("HUMG_STREAM_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("HUMG_STREAM_TIMEOUT_SECS"));
    }
}
