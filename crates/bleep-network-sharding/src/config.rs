use crate::error::NetworkShardingError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_CAPACITY: usize = 30_000;

/// Sizing of the peer shard mapper caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerShardMapperConfig {
    /// Capacity of the pid -> pk cache; the reverse and subtype caches follow it
    pub peer_id_pk_cache_capacity: usize,
    pub fallback_pk_shard_cache_capacity: usize,
    pub fallback_pid_shard_cache_capacity: usize,
    pub start_epoch: u32,
}

impl Default for PeerShardMapperConfig {
    fn default() -> Self {
        PeerShardMapperConfig {
            peer_id_pk_cache_capacity: DEFAULT_CACHE_CAPACITY,
            fallback_pk_shard_cache_capacity: DEFAULT_CACHE_CAPACITY,
            fallback_pid_shard_cache_capacity: DEFAULT_CACHE_CAPACITY,
            start_epoch: 0,
        }
    }
}

impl PeerShardMapperConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, NetworkShardingError> {
        let config: PeerShardMapperConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NetworkShardingError> {
        let capacities = [
            ("peer_id_pk_cache_capacity", self.peer_id_pk_cache_capacity),
            ("fallback_pk_shard_cache_capacity", self.fallback_pk_shard_cache_capacity),
            ("fallback_pid_shard_cache_capacity", self.fallback_pid_shard_cache_capacity),
        ];
        for (name, capacity) in capacities {
            if capacity == 0 {
                return Err(NetworkShardingError::InvalidConfig(format!("{} must be greater than 0", name)));
            }
        }
        Ok(())
    }
}
