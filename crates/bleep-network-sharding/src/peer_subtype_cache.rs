use crate::cache::{Cacher, LruCacher};
use crate::error::CacheError;
use crate::types::{PeerId, PeerSubType};
use std::mem::size_of;

pub struct PeerSubTypeCache {
    cache: LruCacher<PeerId, PeerSubType>,
}

impl PeerSubTypeCache {
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        Ok(Self {
            cache: LruCacher::new("peer_id_sub_type", capacity)?,
        })
    }

    /// Stores the subtype of `pid` unless one is already known.
    pub fn update(&self, pid: &PeerId, peer_sub_type: PeerSubType) {
        self.cache.has_or_add(pid.clone(), peer_sub_type, size_of::<u32>());
    }

    /// Subtype of `pid`, `Regular` when unknown.
    pub fn sub_type_of(&self, pid: &PeerId) -> PeerSubType {
        self.cache.get(pid).unwrap_or_default()
    }
}
