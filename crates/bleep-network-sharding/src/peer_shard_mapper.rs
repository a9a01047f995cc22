// Peer shard mapper
//
// Maps peer ids to shards. The public key learned during the handshake is fed to
// the topology oracle; when the oracle cannot place the key (observers, or a
// lagging view of the validator set) the last claim seen for the key, then for
// the peer id, is used instead.
//
// SAFETY INVARIANTS:
// 1. A successful oracle resolution is never overridden by a fallback claim
// 2. The ALL_SHARDS sentinel never reaches the fallback caches
// 3. One public key never owns more than MAX_NUM_PIDS_PER_PK peer ids (eclipse bound)
// 4. The epoch lock and the identity bind lock are never held together

use crate::cache::{Cacher, LruCacher};
use crate::config::PeerShardMapperConfig;
use crate::error::NetworkShardingError;
use crate::fallback_shard_cache::FallbackShardCache;
use crate::interfaces::{
    EpochStartHeader, EpochStartSubscriber, NetworkShardingCollector, PeerShardResolver,
    PreferredPeersHolder, ShardTopologyOracle, NETWORK_SHARDING_ORDER,
};
use crate::peer_identity_registry::PeerIdentityRegistry;
use crate::peer_subtype_cache::PeerSubTypeCache;
use crate::types::{PeerId, PeerInfo, PeerSubType, PublicKey, ShardId};
use log::{debug, trace, warn};
use parking_lot::RwLock;
use std::sync::Arc;

/// Log target for identity mapping churn.
pub const PEER_LOG_TARGET: &str = "bleep_network_sharding::peerlog";

/// Collaborators of a [`PeerShardMapper`]. Every collaborator is required.
#[derive(Default)]
pub struct PeerShardMapperArgs {
    pub peer_id_pk_cache: Option<Arc<dyn Cacher<PeerId, PublicKey>>>,
    pub fallback_pk_shard_cache: Option<Arc<dyn Cacher<PublicKey, ShardId>>>,
    pub fallback_pid_shard_cache: Option<Arc<dyn Cacher<PeerId, ShardId>>>,
    pub oracle: Option<Arc<dyn ShardTopologyOracle>>,
    pub preferred_peers_holder: Option<Arc<dyn PreferredPeersHolder>>,
    pub start_epoch: u32,
}

/// Outcome of the primary, oracle-backed resolution stage.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OracleResolution {
    /// No public key is bound to the peer id
    Unbound,

    /// A key is bound but the oracle does not know it as a validator
    Unrecognized(PublicKey),

    Validator { shard_id: ShardId, public_key: PublicKey },
}

pub struct PeerShardMapper {
    registry: PeerIdentityRegistry,
    fallback: FallbackShardCache,
    sub_types: PeerSubTypeCache,
    oracle: Arc<dyn ShardTopologyOracle>,
    preferred_peers_holder: Arc<dyn PreferredPeersHolder>,
    epoch: RwLock<u32>,
}

impl PeerShardMapper {
    pub fn new(args: PeerShardMapperArgs) -> Result<Self, NetworkShardingError> {
        let oracle = args.oracle.ok_or(NetworkShardingError::MissingOracle)?;
        let peer_id_pk_cache = args
            .peer_id_pk_cache
            .ok_or(NetworkShardingError::MissingCache("peer_id_pk_cache"))?;
        let fallback_pk_shard_cache = args
            .fallback_pk_shard_cache
            .ok_or(NetworkShardingError::MissingCache("fallback_pk_shard_cache"))?;
        let fallback_pid_shard_cache = args
            .fallback_pid_shard_cache
            .ok_or(NetworkShardingError::MissingCache("fallback_pid_shard_cache"))?;
        let preferred_peers_holder = args
            .preferred_peers_holder
            .ok_or(NetworkShardingError::MissingPreferredPeersHolder)?;

        let sub_types = PeerSubTypeCache::new(peer_id_pk_cache.max_size())?;
        let registry = PeerIdentityRegistry::new(peer_id_pk_cache)?;

        debug!("peer shard mapper epoch: {}", args.start_epoch);

        Ok(Self {
            registry,
            fallback: FallbackShardCache::new(fallback_pk_shard_cache, fallback_pid_shard_cache),
            sub_types,
            oracle,
            preferred_peers_holder,
            epoch: RwLock::new(args.start_epoch),
        })
    }

    /// Builds the mapper with LRU caches sized from `config`.
    pub fn from_config(
        config: &PeerShardMapperConfig,
        oracle: Arc<dyn ShardTopologyOracle>,
        preferred_peers_holder: Arc<dyn PreferredPeersHolder>,
    ) -> Result<Self, NetworkShardingError> {
        config.validate()?;

        Self::new(PeerShardMapperArgs {
            peer_id_pk_cache: Some(Arc::new(LruCacher::<PeerId, PublicKey>::new(
                "peer_id_pk",
                config.peer_id_pk_cache_capacity,
            )?)),
            fallback_pk_shard_cache: Some(Arc::new(LruCacher::<PublicKey, ShardId>::new(
                "fallback_pk_shard",
                config.fallback_pk_shard_cache_capacity,
            )?)),
            fallback_pid_shard_cache: Some(Arc::new(LruCacher::<PeerId, ShardId>::new(
                "fallback_pid_shard",
                config.fallback_pid_shard_cache_capacity,
            )?)),
            oracle: Some(oracle),
            preferred_peers_holder: Some(preferred_peers_holder),
            start_epoch: config.start_epoch,
        })
    }

    /// Classifies `pid`: oracle first, then the claim cached for its public key,
    /// then the claim cached for the peer id itself.
    pub fn get_peer_info(&self, pid: &PeerId) -> PeerInfo {
        let info = self.resolve(pid);

        trace!(
            "PeerShardMapper.get_peer_info: peer type={} peer subtype={} pid={} pk={} shard={}",
            info.peer_type,
            info.peer_sub_type,
            pid.short_string(),
            info.public_key_hex(),
            info.shard_id
        );

        info
    }

    fn resolve(&self, pid: &PeerId) -> PeerInfo {
        let public_key = match self.resolve_via_oracle(pid) {
            OracleResolution::Validator { shard_id, public_key } => {
                return PeerInfo::validator(shard_id, public_key);
            }
            OracleResolution::Unrecognized(public_key) => Some(public_key),
            OracleResolution::Unbound => None,
        };

        if let Some(public_key) = public_key {
            if let Some(shard_id) = self.fallback.shard_of_public_key(&public_key) {
                return PeerInfo::observer(shard_id, self.sub_types.sub_type_of(pid), Some(public_key));
            }
        }

        // a peer id claim says nothing about the key, so none is reported
        match self.fallback.shard_of_peer_id(pid) {
            Some(shard_id) => PeerInfo::observer(shard_id, self.sub_types.sub_type_of(pid), None),
            None => PeerInfo::unknown(None),
        }
    }

    fn resolve_via_oracle(&self, pid: &PeerId) -> OracleResolution {
        let Some(public_key) = self.registry.public_key_of(pid) else {
            return OracleResolution::Unbound;
        };

        match self.oracle.validator_shard(&public_key) {
            Ok(shard_id) => OracleResolution::Validator { shard_id, public_key },
            Err(err) => {
                trace!("oracle could not place pid {}: {}", pid.short_string(), err);
                OracleResolution::Unrecognized(public_key)
            }
        }
    }

    /// Records an observed (pid, pk, shard) triple.
    ///
    /// With the `ALL_SHARDS` sentinel only the identity binding is refreshed.
    pub fn update_peer_id_info(&self, pid: &PeerId, pk: &PublicKey, shard_id: ShardId) {
        let fallback = &self.fallback;
        let is_new = self
            .registry
            .bind_identity(pid, pk, |evicted| fallback.forget_peer_id(evicted));
        if is_new {
            trace!(target: PEER_LOG_TARGET, "new peer mapping pid={} pk={}", pid.short_string(), pk);
        }

        if shard_id.is_all_shards() {
            return;
        }
        self.fallback.record(pk, pid, shard_id);
        self.preferred_peers_holder.put(pk, pid, shard_id);
    }

    pub fn update_peer_id_sub_type(&self, pid: &PeerId, peer_sub_type: PeerSubType) {
        self.sub_types.update(pid, peer_sub_type);
    }

    pub fn epoch_start_action(&self, header: Option<&dyn EpochStartHeader>) {
        let Some(header) = header else {
            warn!("nil header on PeerShardMapper.epoch_start_action");
            return;
        };
        trace!("PeerShardMapper.epoch_start_action event, epoch {}", header.epoch());

        let mut epoch = self.epoch.write();
        *epoch = header.epoch();
        debug!("peer shard mapper epoch: {}", *epoch);
    }

    pub fn epoch_start_prepare(&self, header: Option<&dyn EpochStartHeader>) {
        let Some(header) = header else {
            warn!("nil header on PeerShardMapper.epoch_start_prepare");
            return;
        };
        trace!("PeerShardMapper.epoch_start_prepare event, epoch {}", header.epoch());
    }

    pub fn current_epoch(&self) -> u32 {
        *self.epoch.read()
    }

    pub fn notify_order(&self) -> u32 {
        NETWORK_SHARDING_ORDER
    }

    /// Most recently seen peer id of `pk`.
    pub fn last_known_peer_id(&self, pk: &PublicKey) -> Option<PeerId> {
        self.registry.last_known_peer_id(pk)
    }

    /// Peer ids bound to `pk`, oldest first.
    pub fn peer_ids_of(&self, pk: &PublicKey) -> Vec<PeerId> {
        self.registry.peer_ids_of(pk)
    }
}

impl PeerShardResolver for PeerShardMapper {
    fn get_peer_info(&self, peer_id: &PeerId) -> PeerInfo {
        PeerShardMapper::get_peer_info(self, peer_id)
    }
}

impl NetworkShardingCollector for PeerShardMapper {
    fn update_peer_id_info(&self, peer_id: &PeerId, public_key: &PublicKey, shard_id: ShardId) {
        PeerShardMapper::update_peer_id_info(self, peer_id, public_key, shard_id)
    }

    fn update_peer_id_sub_type(&self, peer_id: &PeerId, peer_sub_type: PeerSubType) {
        PeerShardMapper::update_peer_id_sub_type(self, peer_id, peer_sub_type)
    }
}

impl EpochStartSubscriber for PeerShardMapper {
    fn epoch_start_action(&self, header: Option<&dyn EpochStartHeader>) {
        PeerShardMapper::epoch_start_action(self, header)
    }

    fn epoch_start_prepare(&self, header: Option<&dyn EpochStartHeader>) {
        PeerShardMapper::epoch_start_prepare(self, header)
    }

    fn notify_order(&self) -> u32 {
        PeerShardMapper::notify_order(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapOracle {
        validators: HashMap<PublicKey, ShardId>,
    }

    impl ShardTopologyOracle for MapOracle {
        fn validator_shard(&self, public_key: &PublicKey) -> Result<ShardId, OracleError> {
            self.validators
                .get(public_key)
                .copied()
                .ok_or_else(|| OracleError::UnknownValidator(public_key.to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingHolder {
        puts: Mutex<Vec<(PublicKey, PeerId, ShardId)>>,
    }

    impl PreferredPeersHolder for RecordingHolder {
        fn put(&self, public_key: &PublicKey, peer_id: &PeerId, shard_id: ShardId) {
            self.puts.lock().push((public_key.clone(), peer_id.clone(), shard_id));
        }
    }

    struct Header(u32);

    impl EpochStartHeader for Header {
        fn epoch(&self) -> u32 {
            self.0
        }
    }

    fn full_args(oracle: MapOracle) -> PeerShardMapperArgs {
        PeerShardMapperArgs {
            peer_id_pk_cache: Some(Arc::new(LruCacher::<PeerId, PublicKey>::new("peer_id_pk", 100).unwrap())),
            fallback_pk_shard_cache: Some(Arc::new(LruCacher::<PublicKey, ShardId>::new("fallback_pk_shard", 100).unwrap())),
            fallback_pid_shard_cache: Some(Arc::new(LruCacher::<PeerId, ShardId>::new("fallback_pid_shard", 100).unwrap())),
            oracle: Some(Arc::new(oracle)),
            preferred_peers_holder: Some(Arc::new(RecordingHolder::default())),
            start_epoch: 0,
        }
    }

    fn mapper(oracle: MapOracle) -> PeerShardMapper {
        PeerShardMapper::new(full_args(oracle)).unwrap()
    }

    #[test]
    fn test_missing_collaborators_fail_construction() {
        let mut args = full_args(MapOracle::default());
        args.oracle = None;
        assert!(matches!(PeerShardMapper::new(args), Err(NetworkShardingError::MissingOracle)));

        let mut args = full_args(MapOracle::default());
        args.peer_id_pk_cache = None;
        assert!(matches!(
            PeerShardMapper::new(args),
            Err(NetworkShardingError::MissingCache("peer_id_pk_cache"))
        ));

        let mut args = full_args(MapOracle::default());
        args.fallback_pk_shard_cache = None;
        assert!(matches!(
            PeerShardMapper::new(args),
            Err(NetworkShardingError::MissingCache("fallback_pk_shard_cache"))
        ));

        let mut args = full_args(MapOracle::default());
        args.fallback_pid_shard_cache = None;
        assert!(matches!(
            PeerShardMapper::new(args),
            Err(NetworkShardingError::MissingCache("fallback_pid_shard_cache"))
        ));

        let mut args = full_args(MapOracle::default());
        args.preferred_peers_holder = None;
        assert!(matches!(
            PeerShardMapper::new(args),
            Err(NetworkShardingError::MissingPreferredPeersHolder)
        ));
    }

    #[test]
    fn test_unbound_peer_is_unknown() {
        let psm = mapper(MapOracle::default());
        assert_eq!(psm.get_peer_info(&PeerId::from("nobody")), PeerInfo::unknown(None));
    }

    #[test]
    fn test_oracle_resolution_stages() {
        let mut oracle = MapOracle::default();
        oracle.validators.insert(PublicKey::from("validator"), ShardId(1));
        let psm = mapper(oracle);

        psm.update_peer_id_info(&PeerId::from("v"), &PublicKey::from("validator"), ShardId::ALL_SHARDS);
        psm.update_peer_id_info(&PeerId::from("o"), &PublicKey::from("observer"), ShardId::ALL_SHARDS);

        assert_eq!(psm.resolve_via_oracle(&PeerId::from("x")), OracleResolution::Unbound);
        assert_eq!(
            psm.resolve_via_oracle(&PeerId::from("o")),
            OracleResolution::Unrecognized(PublicKey::from("observer"))
        );
        assert_eq!(
            psm.resolve_via_oracle(&PeerId::from("v")),
            OracleResolution::Validator {
                shard_id: ShardId(1),
                public_key: PublicKey::from("validator"),
            }
        );
    }

    #[test]
    fn test_unrecognized_key_without_claims_is_anonymous_unknown() {
        let psm = mapper(MapOracle::default());
        psm.update_peer_id_info(&PeerId::from("pid"), &PublicKey::from("pk"), ShardId::ALL_SHARDS);

        let info = psm.get_peer_info(&PeerId::from("pid"));
        assert_eq!(info, PeerInfo::unknown(None));
    }

    #[test]
    fn test_observer_carries_subtype() {
        let psm = mapper(MapOracle::default());
        psm.update_peer_id_info(&PeerId::from("pid"), &PublicKey::from("pk"), ShardId(3));
        psm.update_peer_id_sub_type(&PeerId::from("pid"), PeerSubType::FullHistoryObserver);

        let info = psm.get_peer_info(&PeerId::from("pid"));
        assert_eq!(
            info,
            PeerInfo::observer(ShardId(3), PeerSubType::FullHistoryObserver, Some(PublicKey::from("pk")))
        );
    }

    #[test]
    fn test_validator_reports_regular_subtype() {
        let mut oracle = MapOracle::default();
        oracle.validators.insert(PublicKey::from("pk"), ShardId::METACHAIN);
        let psm = mapper(oracle);

        psm.update_peer_id_info(&PeerId::from("pid"), &PublicKey::from("pk"), ShardId(0));
        psm.update_peer_id_sub_type(&PeerId::from("pid"), PeerSubType::FullHistoryObserver);

        let info = psm.get_peer_info(&PeerId::from("pid"));
        assert_eq!(info, PeerInfo::validator(ShardId::METACHAIN, PublicKey::from("pk")));
    }

    #[test]
    fn test_preferred_peers_holder_skips_sentinel() {
        let holder = Arc::new(RecordingHolder::default());
        let mut args = full_args(MapOracle::default());
        args.preferred_peers_holder = Some(holder.clone());
        let psm = PeerShardMapper::new(args).unwrap();

        psm.update_peer_id_info(&PeerId::from("a"), &PublicKey::from("pk"), ShardId::ALL_SHARDS);
        psm.update_peer_id_info(&PeerId::from("b"), &PublicKey::from("pk"), ShardId(2));

        let puts = holder.puts.lock();
        assert_eq!(*puts, vec![(PublicKey::from("pk"), PeerId::from("b"), ShardId(2))]);
    }

    #[test]
    fn test_epoch_start_action_updates_epoch() {
        let mut args = full_args(MapOracle::default());
        args.start_epoch = 4;
        let psm = PeerShardMapper::new(args).unwrap();
        assert_eq!(psm.current_epoch(), 4);

        psm.epoch_start_action(Some(&Header(5)));
        assert_eq!(psm.current_epoch(), 5);

        psm.epoch_start_action(None);
        assert_eq!(psm.current_epoch(), 5);
    }

    #[test]
    fn test_epoch_start_prepare_does_not_move_epoch() {
        let psm = mapper(MapOracle::default());
        psm.epoch_start_prepare(Some(&Header(9)));
        psm.epoch_start_prepare(None);
        assert_eq!(psm.current_epoch(), 0);
    }

    #[test]
    fn test_subscriber_role() {
        let psm = mapper(MapOracle::default());
        let subscriber: &dyn EpochStartSubscriber = &psm;
        assert_eq!(subscriber.notify_order(), NETWORK_SHARDING_ORDER);

        subscriber.epoch_start_action(Some(&Header(2)));
        assert_eq!(psm.current_epoch(), 2);
    }

    #[test]
    fn test_from_config_rejects_zero_capacity() {
        let config = PeerShardMapperConfig {
            peer_id_pk_cache_capacity: 0,
            ..PeerShardMapperConfig::default()
        };
        let result = PeerShardMapper::from_config(
            &config,
            Arc::new(MapOracle::default()),
            Arc::new(RecordingHolder::default()),
        );
        assert!(matches!(result, Err(NetworkShardingError::InvalidConfig(_))));
    }
}
