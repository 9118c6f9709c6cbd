pub mod schema;

pub use schema::{
    resolve_config_dir, CloudConfig, Config, ObservabilityConfig, OrchestratorConfig,
    ReliabilityConfig,
};
