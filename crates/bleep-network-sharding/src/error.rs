use thiserror::Error;

/// Errors raised while building a bounded cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache {name} must have a non-zero capacity")]
    ZeroCapacity { name: &'static str },
}

/// Reasons a topology oracle could not place a public key.
///
/// Both variants are treated as a miss by the mapper.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("public key {0} is not a known validator")]
    UnknownValidator(String),

    #[error("topology oracle unavailable: {0}")]
    Unavailable(String),
}

/// Construction errors for the network sharding components.
#[derive(Debug, Error)]
pub enum NetworkShardingError {
    #[error("missing shard topology oracle")]
    MissingOracle,

    #[error("missing cache: {0}")]
    MissingCache(&'static str),

    #[error("missing preferred peers holder")]
    MissingPreferredPeersHolder,

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
