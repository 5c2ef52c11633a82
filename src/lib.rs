pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::toml_config::TomlConfig;
pub use core::{
    aggregator::KeywordAggregator,
    discovery::{DiscoveryPipeline, DiscoverySources, PipelinePhase, PipelineSettings},
    tracker::{StepTracker, TrackerSnapshot},
};
pub use domain::model::{DiscoveryOutcome, DiscoveryReport, DiscoveryRequest, Stage, StepState};
pub use utils::error::{LookupError, ReconError, Result};
