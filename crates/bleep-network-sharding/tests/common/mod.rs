// Shared collaborators for the integration tests.
#![allow(dead_code)]

use bleep_network_sharding::{
    Cacher, LruCacher, OracleError, PeerId, PeerShardMapper, PeerShardMapperArgs,
    PreferredPeersHolder, PublicKey, ShardId, ShardTopologyOracle,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Oracle whose validator set can be rotated during a test.
#[derive(Default)]
pub struct MockOracle {
    validators: RwLock<HashMap<PublicKey, ShardId>>,
}

impl MockOracle {
    pub fn set_validator(&self, pk: &str, shard_id: ShardId) {
        self.validators.write().insert(PublicKey::from(pk), shard_id);
    }

    pub fn remove_validator(&self, pk: &str) {
        self.validators.write().remove(&PublicKey::from(pk));
    }
}

impl ShardTopologyOracle for MockOracle {
    fn validator_shard(&self, public_key: &PublicKey) -> Result<ShardId, OracleError> {
        self.validators
            .read()
            .get(public_key)
            .copied()
            .ok_or_else(|| OracleError::UnknownValidator(public_key.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingHolder {
    pub puts: Mutex<Vec<(PublicKey, PeerId, ShardId)>>,
}

impl PreferredPeersHolder for RecordingHolder {
    fn put(&self, public_key: &PublicKey, peer_id: &PeerId, shard_id: ShardId) {
        self.puts.lock().push((public_key.clone(), peer_id.clone(), shard_id));
    }
}

/// Mapper plus handles on every collaborator it was built from.
pub struct Harness {
    pub mapper: PeerShardMapper,
    pub oracle: Arc<MockOracle>,
    pub holder: Arc<RecordingHolder>,
    pub peer_id_pk: Arc<LruCacher<PeerId, PublicKey>>,
    pub fallback_pk: Arc<LruCacher<PublicKey, ShardId>>,
    pub fallback_pid: Arc<LruCacher<PeerId, ShardId>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_capacity(1_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let oracle = Arc::new(MockOracle::default());
        let holder = Arc::new(RecordingHolder::default());
        let peer_id_pk = Arc::new(LruCacher::<PeerId, PublicKey>::new("peer_id_pk", capacity).unwrap());
        let fallback_pk = Arc::new(LruCacher::<PublicKey, ShardId>::new("fallback_pk_shard", capacity).unwrap());
        let fallback_pid = Arc::new(LruCacher::<PeerId, ShardId>::new("fallback_pid_shard", capacity).unwrap());

        let peer_id_pk_cache: Arc<dyn Cacher<PeerId, PublicKey>> = peer_id_pk.clone();
        let fallback_pk_shard_cache: Arc<dyn Cacher<PublicKey, ShardId>> = fallback_pk.clone();
        let fallback_pid_shard_cache: Arc<dyn Cacher<PeerId, ShardId>> = fallback_pid.clone();
        let oracle_handle: Arc<dyn ShardTopologyOracle> = oracle.clone();
        let holder_handle: Arc<dyn PreferredPeersHolder> = holder.clone();

        let mapper = PeerShardMapper::new(PeerShardMapperArgs {
            peer_id_pk_cache: Some(peer_id_pk_cache),
            fallback_pk_shard_cache: Some(fallback_pk_shard_cache),
            fallback_pid_shard_cache: Some(fallback_pid_shard_cache),
            oracle: Some(oracle_handle),
            preferred_peers_holder: Some(holder_handle),
            start_epoch: 0,
        })
        .unwrap();

        Harness {
            mapper,
            oracle,
            holder,
            peer_id_pk,
            fallback_pk,
            fallback_pid,
        }
    }

    pub fn update(&self, pid: &str, pk: &str, shard_id: ShardId) {
        self.mapper
            .update_peer_id_info(&PeerId::from(pid), &PublicKey::from(pk), shard_id);
    }
}
