use crate::types::PeerId;
use std::collections::VecDeque;

/// Recency-ordered, duplicate-free list of peer ids sharing one public key.
///
/// The front holds the least recently promoted id, the back the most recent one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PidQueue {
    data: VecDeque<PeerId>,
}

impl PidQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `pid` as the most recent entry unless it is already queued.
    pub fn push(&mut self, pid: PeerId) {
        if self.index_of(&pid).is_some() {
            return;
        }
        self.data.push_back(pid);
    }

    pub fn index_of(&self, pid: &PeerId) -> Option<usize> {
        self.data.iter().position(|queued| queued == pid)
    }

    /// Moves the entry at `idx` to the most recent end.
    pub fn promote(&mut self, idx: usize) {
        if idx >= self.data.len().saturating_sub(1) {
            return;
        }
        if let Some(pid) = self.data.remove(idx) {
            self.data.push_back(pid);
        }
    }

    /// Removes and returns the least recently promoted entry.
    pub fn pop(&mut self) -> Option<PeerId> {
        self.data.pop_front()
    }

    pub fn remove(&mut self, pid: &PeerId) {
        self.data.retain(|queued| queued != pid);
    }

    /// Keeps only the entries for which `keep` returns true, preserving order.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&PeerId) -> bool,
    {
        self.data.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Most recently promoted entry.
    pub fn last(&self) -> Option<&PeerId> {
        self.data.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerId> {
        self.data.iter()
    }

    /// Byte weight used as the cache size hint.
    pub fn size(&self) -> usize {
        self.data.iter().map(PeerId::len).sum()
    }
}
