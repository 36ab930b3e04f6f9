use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid genome name {name:?}: {reason}")]
    InvalidGenomeName { name: String, reason: String },

    #[error("strategy id {id} out of range (strategy space has {count} strategies)")]
    InvalidStrategyId { id: usize, count: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("the leave option cannot be toggled on a running simulation")]
    LeaveOptionChanged,

    #[error("csv output failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("json output failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
