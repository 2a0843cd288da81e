use crate::utils::error::{Result, VoteError};
use crate::utils::validation::{validate_path, validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api";
pub const DEFAULT_SESSION_PATH: &str = ".boardgame-vote/session.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    pub backend: BackendConfig,
    pub leaderboard: LeaderboardConfig,
    pub session: SessionConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub poll_interval_seconds: u64,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SESSION_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

impl VoteConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(VoteError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Like `from_file`, but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| VoteError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_ENDPOINT})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| VoteError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.leaderboard.poll_interval_seconds)
    }
}

impl Validate for VoteConfig {
    fn validate(&self) -> Result<()> {
        validate_url("backend.endpoint", &self.backend.endpoint)?;
        validate_range("backend.timeout_seconds", self.backend.timeout_seconds, 1, 300)?;
        validate_range(
            "leaderboard.poll_interval_seconds",
            self.leaderboard.poll_interval_seconds,
            1,
            3600,
        )?;
        validate_path("session.path", &self.session.path)?;
        validate_range("search.page_size", self.search.page_size, 1, 100)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[backend]
endpoint = "https://vote.example.com/api"
timeout_seconds = 3

[leaderboard]
poll_interval_seconds = 10

[session]
path = "/tmp/session.json"

[search]
page_size = 20
"#;

        let config = VoteConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.backend.endpoint, "https://vote.example.com/api");
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.search.page_size, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = VoteConfig::from_toml_str("[backend]\nendpoint = \"http://h:1\"\n").unwrap();
        assert_eq!(config.leaderboard.poll_interval_seconds, 5);
        assert_eq!(config.backend.timeout_seconds, 8);
        assert_eq!(config.session.path, DEFAULT_SESSION_PATH);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("BOARDGAME_VOTE_TEST_ENDPOINT", "https://test.api.com");

        let config = VoteConfig::from_toml_str(
            "[backend]\nendpoint = \"${BOARDGAME_VOTE_TEST_ENDPOINT}\"\n",
        )
        .unwrap();
        assert_eq!(config.backend.endpoint, "https://test.api.com");

        std::env::remove_var("BOARDGAME_VOTE_TEST_ENDPOINT");
    }

    #[test]
    fn test_config_validation() {
        let config = VoteConfig::from_toml_str(
            "[backend]\nendpoint = \"invalid-url\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = VoteConfig::from_toml_str("[leaderboard]\npoll_interval_seconds = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[search]\npage_size = 5\n")
            .unwrap();

        let config = VoteConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.search.page_size, 5);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = VoteConfig::load_or_default("/definitely/not/here.toml").unwrap();
        assert_eq!(config, VoteConfig::default());
    }
}
