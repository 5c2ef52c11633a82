pub mod aggregator;
pub mod discovery;
pub mod lookup;
pub mod tracker;

pub use crate::domain::model::{
    DiscoveryOutcome, DiscoveryReport, DiscoveryRequest, Stage, StepState,
};
pub use crate::domain::ports::{
    ConfigProvider, CtLogSource, LookupStrategy, RandomSource, WhoisSource,
};
pub use crate::utils::error::Result;
