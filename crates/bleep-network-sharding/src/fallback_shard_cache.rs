use crate::cache::Cacher;
use crate::types::{PeerId, PublicKey, ShardId};
use std::mem::size_of;
use std::sync::Arc;

const SHARD_ID_SIZE: usize = size_of::<u32>();

/// Last self-reported shard claims, by public key and by peer id.
///
/// Only consulted when the topology oracle cannot place a peer. The
/// `ShardId::ALL_SHARDS` sentinel is never stored.
pub struct FallbackShardCache {
    by_public_key: Arc<dyn Cacher<PublicKey, ShardId>>,
    by_peer_id: Arc<dyn Cacher<PeerId, ShardId>>,
}

impl FallbackShardCache {
    pub fn new(
        by_public_key: Arc<dyn Cacher<PublicKey, ShardId>>,
        by_peer_id: Arc<dyn Cacher<PeerId, ShardId>>,
    ) -> Self {
        Self {
            by_public_key,
            by_peer_id,
        }
    }

    /// Records `shard_id` as the latest claim of both `pk` and `pid`.
    pub fn record(&self, pk: &PublicKey, pid: &PeerId, shard_id: ShardId) {
        if shard_id.is_all_shards() {
            return;
        }
        self.by_public_key.put(pk.clone(), shard_id, SHARD_ID_SIZE);
        self.by_peer_id.put(pid.clone(), shard_id, SHARD_ID_SIZE);
    }

    pub fn shard_of_public_key(&self, pk: &PublicKey) -> Option<ShardId> {
        if pk.is_empty() {
            return None;
        }
        self.by_public_key.get(pk)
    }

    pub fn shard_of_peer_id(&self, pid: &PeerId) -> Option<ShardId> {
        self.by_peer_id.get(pid)
    }

    /// Drops the peer id claim of an identity evicted from the registry.
    pub fn forget_peer_id(&self, pid: &PeerId) {
        self.by_peer_id.remove(pid);
    }
}
