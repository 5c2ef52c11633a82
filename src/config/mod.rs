pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "keyword-recon")]
#[command(about = "Discover organization names and related domains from WHOIS and CT logs")]
pub struct CliConfig {
    /// Target domain, e.g. example.com
    pub domain: String,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// CT log search endpoint (crt.sh compatible)
    #[arg(long)]
    pub ct_log_endpoint: Option<String>,

    /// RDAP domain endpoint used for registrant lookups
    #[arg(long)]
    pub rdap_endpoint: Option<String>,

    /// Per-stage timeout in seconds (0 disables it)
    #[arg(long)]
    pub stage_timeout: Option<u64>,

    /// Run the WHOIS and CT-by-domain stages concurrently
    #[arg(long)]
    pub concurrent: bool,

    /// Skip all network lookups and use sample data
    #[arg(long)]
    pub offline: bool,

    /// Seed for the fallback organization picker
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入設定檔（若有）並套用命令列覆蓋
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };

        if let Some(endpoint) = &self.ct_log_endpoint {
            config.sources.ct_log_endpoint = endpoint.clone();
        }
        if let Some(endpoint) = &self.rdap_endpoint {
            config.sources.rdap_endpoint = endpoint.clone();
        }
        if let Some(timeout) = self.stage_timeout {
            config.pipeline.stage_timeout_seconds = timeout;
        }
        if self.concurrent {
            config.pipeline.concurrent_lookups = true;
        }
        if self.offline {
            config.sources.offline = true;
        }
        if self.seed.is_some() {
            config.fallback.seed = self.seed;
        }

        config.validate()?;
        Ok(config)
    }
}
