use crate::error::OracleError;
use crate::types::{PeerId, PeerInfo, PeerSubType, PublicKey, ShardId};

/// Notification order of the network sharding component among epoch-start subscribers.
pub const NETWORK_SHARDING_ORDER: u32 = 3;

/// Authoritative source of validator-to-shard assignments.
pub trait ShardTopologyOracle: Send + Sync {
    /// Returns the shard of a currently recognized validator.
    fn validator_shard(&self, public_key: &PublicKey) -> Result<ShardId, OracleError>;
}

/// Side channel notified of every shard-bearing identity update.
pub trait PreferredPeersHolder: Send + Sync {
    fn put(&self, public_key: &PublicKey, peer_id: &PeerId, shard_id: ShardId);
}

/// The part of an epoch-start header this crate reads.
pub trait EpochStartHeader {
    fn epoch(&self) -> u32;
}

/// Receiver of epoch-boundary notifications.
pub trait EpochStartSubscriber: Send + Sync {
    fn epoch_start_action(&self, header: Option<&dyn EpochStartHeader>);

    fn epoch_start_prepare(&self, header: Option<&dyn EpochStartHeader>);

    fn notify_order(&self) -> u32;
}

/// Read side: classifies a peer.
pub trait PeerShardResolver: Send + Sync {
    fn get_peer_info(&self, peer_id: &PeerId) -> PeerInfo;
}

/// Write side: records what the transport layer observed about a peer.
pub trait NetworkShardingCollector: Send + Sync {
    fn update_peer_id_info(&self, peer_id: &PeerId, public_key: &PublicKey, shard_id: ShardId);

    fn update_peer_id_sub_type(&self, peer_id: &PeerId, peer_sub_type: PeerSubType);
}
