// BLEEP network sharding
//
// Tracks which shard every known peer belongs to. Peer ids are bound to public
// keys learned during handshakes, the topology oracle places public keys in
// shards, and self-reported claims cover the peers the oracle cannot place.

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback_shard_cache;
pub mod interfaces;
pub mod peer_identity_registry;
pub mod peer_shard_mapper;
pub mod peer_subtype_cache;
pub mod pid_queue;
pub mod types;

pub use cache::{Cacher, LruCacher};
pub use config::PeerShardMapperConfig;
pub use error::{CacheError, NetworkShardingError, OracleError};
pub use interfaces::{
    EpochStartHeader, EpochStartSubscriber, NetworkShardingCollector, PeerShardResolver,
    PreferredPeersHolder, ShardTopologyOracle, NETWORK_SHARDING_ORDER,
};
pub use peer_identity_registry::{PeerIdentityRegistry, MAX_NUM_PIDS_PER_PK};
pub use peer_shard_mapper::{PeerShardMapper, PeerShardMapperArgs};
pub use types::{PeerId, PeerInfo, PeerSubType, PeerType, PublicKey, ShardId};
