use crate::core::lookup::DEFAULT_FALLBACK_ORGANIZATIONS;
use crate::core::ConfigProvider;
use crate::utils::error::{ReconError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CT_LOG_ENDPOINT: &str = "https://crt.sh/";
pub const DEFAULT_RDAP_ENDPOINT: &str = "https://rdap.org/domain/";
pub const DEFAULT_STAGE_TIMEOUT_SECONDS: u64 = 30;
const MAX_STAGE_TIMEOUT_SECONDS: u64 = 600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub sources: SourcesConfig,
    pub pipeline: PipelineConfig,
    pub fallback: FallbackConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub ct_log_endpoint: String,
    pub rdap_endpoint: String,
    pub user_agent: String,
    /// 不連網，每個階段直接使用備援資料
    pub offline: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ct_log_endpoint: DEFAULT_CT_LOG_ENDPOINT.to_string(),
            rdap_endpoint: DEFAULT_RDAP_ENDPOINT.to_string(),
            user_agent: concat!("keyword-recon/", env!("CARGO_PKG_VERSION")).to_string(),
            offline: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 0 表示不設時限
    pub stage_timeout_seconds: u64,
    pub concurrent_lookups: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_seconds: DEFAULT_STAGE_TIMEOUT_SECONDS,
            concurrent_lookups: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub organizations: Vec<String>,
    pub seed: Option<u64>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            organizations: DEFAULT_FALLBACK_ORGANIZATIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReconError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ReconError::ConfigError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CT_LOG_ENDPOINT})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ReconError::ConfigError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("sources.ct_log_endpoint", &self.sources.ct_log_endpoint)?;
        validation::validate_url("sources.rdap_endpoint", &self.sources.rdap_endpoint)?;
        validation::validate_non_empty_string("sources.user_agent", &self.sources.user_agent)?;
        validation::validate_range(
            "pipeline.stage_timeout_seconds",
            self.pipeline.stage_timeout_seconds,
            0,
            MAX_STAGE_TIMEOUT_SECONDS,
        )?;

        for organization in &self.fallback.organizations {
            validation::validate_non_empty_string("fallback.organizations", organization)?;
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn ct_log_endpoint(&self) -> &str {
        &self.sources.ct_log_endpoint
    }

    fn rdap_endpoint(&self) -> &str {
        &self.sources.rdap_endpoint
    }

    fn user_agent(&self) -> &str {
        &self.sources.user_agent
    }

    fn stage_timeout(&self) -> Option<Duration> {
        match self.pipeline.stage_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    fn concurrent_lookups(&self) -> bool {
        self.pipeline.concurrent_lookups
    }

    fn fallback_organizations(&self) -> &[String] {
        &self.fallback.organizations
    }

    fn offline(&self) -> bool {
        self.sources.offline
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
