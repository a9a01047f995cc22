// Bidirectional peer id <-> public key bookkeeping.
//
// SAFETY INVARIANTS:
// 1. A public key owns at most MAX_NUM_PIDS_PER_PK peer ids at any instant
// 2. A peer id is bound to at most one public key; rebinding replaces the old binding
// 3. Both caches and the pid queue change together under `mut_bind`
// 4. Capacity eviction in either cache is mirrored in the other one

use crate::cache::{Cacher, LruCacher};
use crate::error::CacheError;
use crate::pid_queue::PidQueue;
use crate::types::{PeerId, PublicKey};
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;

/// Maximum number of connection identities one public key may own.
pub const MAX_NUM_PIDS_PER_PK: usize = 3;

pub struct PeerIdentityRegistry {
    peer_id_pk_cache: Arc<dyn Cacher<PeerId, PublicKey>>,
    pk_peer_id_cache: Arc<dyn Cacher<PublicKey, PidQueue>>,
    mut_bind: Mutex<()>,
}

impl PeerIdentityRegistry {
    /// Builds the registry around the provided pid -> pk cache. The reverse
    /// pk -> pids cache is created with the same capacity.
    pub fn new(peer_id_pk_cache: Arc<dyn Cacher<PeerId, PublicKey>>) -> Result<Self, CacheError> {
        let pk_peer_id_cache = LruCacher::<PublicKey, PidQueue>::new("pk_peer_id", peer_id_pk_cache.max_size())?;
        Ok(Self {
            peer_id_pk_cache,
            pk_peer_id_cache: Arc::new(pk_peer_id_cache),
            mut_bind: Mutex::new(()),
        })
    }

    /// Binds `pid` to `pk`, returning true when the pair was not already known.
    ///
    /// Peer ids that lose their binding, either pushed out of an overflowing
    /// queue or released with a queue the reverse cache evicted, are handed to
    /// `on_evict` while the bind lock is still held.
    pub fn bind_identity<F>(&self, pid: &PeerId, pk: &PublicKey, mut on_evict: F) -> bool
    where
        F: FnMut(&PeerId),
    {
        let _guard = self.mut_bind.lock();

        let old_pk = self.detach_identity(pid);
        let is_new = old_pk.as_ref() != Some(pk);

        let mut pq = match self.pk_peer_id_cache.get(pk) {
            Some(pq) => pq,
            None => {
                let mut pq = PidQueue::new();
                pq.push(pid.clone());
                self.store_queue(pk, &pq, &mut on_evict);
                self.store_binding(pid, pk);
                return is_new;
            }
        };

        // entries whose binding aged out or moved elsewhere must not hold a slot
        pq.retain(|queued| queued == pid || self.peer_id_pk_cache.get(queued).as_ref() == Some(pk));

        if let Some(idx) = pq.index_of(pid) {
            pq.promote(idx);
            self.store_queue(pk, &pq, &mut on_evict);
            self.store_binding(pid, pk);
            return is_new;
        }

        pq.push(pid.clone());
        while pq.len() > MAX_NUM_PIDS_PER_PK {
            let Some(evicted) = pq.pop() else { break };
            self.peer_id_pk_cache.remove(&evicted);
            on_evict(&evicted);
        }
        self.store_queue(pk, &pq, &mut on_evict);
        self.store_binding(pid, pk);

        is_new
    }

    /// Drops `pid` from the queue of its current public key and returns that key.
    ///
    /// Must only run while `mut_bind` is held.
    fn detach_identity(&self, pid: &PeerId) -> Option<PublicKey> {
        let old_pk = self.peer_id_pk_cache.get(pid)?;
        self.remove_from_queue(&old_pk, pid);
        Some(old_pk)
    }

    /// Stores the queue of `pk`. When the reverse cache evicts another key's
    /// queue to make room, the peer ids still bound to that key are unbound.
    fn store_queue<F>(&self, pk: &PublicKey, pq: &PidQueue, on_evict: &mut F)
    where
        F: FnMut(&PeerId),
    {
        let Some((evicted_pk, evicted_pq)) = self.pk_peer_id_cache.put(pk.clone(), pq.clone(), pq.size()) else {
            return;
        };

        for evicted in evicted_pq.iter() {
            if self.peer_id_pk_cache.get(evicted).as_ref() != Some(&evicted_pk) {
                continue;
            }
            self.peer_id_pk_cache.remove(evicted);
            on_evict(evicted);
        }
        debug!("identity queue of pk {} evicted, {} pids released", evicted_pk, evicted_pq.len());
    }

    /// Stores the `pid -> pk` binding. A binding evicted to make room leaves
    /// the queue of its key as well.
    fn store_binding(&self, pid: &PeerId, pk: &PublicKey) {
        if let Some((evicted_pid, evicted_pk)) = self.peer_id_pk_cache.put(pid.clone(), pk.clone(), pk.len()) {
            self.remove_from_queue(&evicted_pk, &evicted_pid);
        }
    }

    fn remove_from_queue(&self, pk: &PublicKey, pid: &PeerId) {
        let Some(mut pq) = self.pk_peer_id_cache.get(pk) else {
            return;
        };

        pq.remove(pid);
        if pq.is_empty() {
            self.pk_peer_id_cache.remove(pk);
        } else {
            // overwrites an existing key, so nothing else is evicted here
            self.pk_peer_id_cache.put(pk.clone(), pq.clone(), pq.size());
        }
    }

    pub fn public_key_of(&self, pid: &PeerId) -> Option<PublicKey> {
        self.peer_id_pk_cache.get(pid)
    }

    /// Peer ids currently bound to `pk`, least recently promoted first.
    pub fn peer_ids_of(&self, pk: &PublicKey) -> Vec<PeerId> {
        self.pk_peer_id_cache
            .get(pk)
            .map(|pq| pq.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn last_known_peer_id(&self, pk: &PublicKey) -> Option<PeerId> {
        self.pk_peer_id_cache.get(pk).and_then(|pq| pq.last().cloned())
    }
}
