use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one network connection / node instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub Vec<u8>);

impl PeerId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        PeerId(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shortened hex form used in log lines.
    pub fn short_string(&self) -> String {
        const SHOWN: usize = 6;
        let encoded = hex::encode(&self.0);
        if encoded.len() <= SHOWN * 2 {
            return encoded;
        }
        format!("{}..{}", &encoded[..SHOWN], &encoded[encoded.len() - SHOWN..])
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        PeerId(value.as_bytes().to_vec())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Cryptographic identity that validators are assigned to shards by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(pub Vec<u8>);

impl PublicKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        PublicKey(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PublicKey {
    fn from(value: &str) -> Self {
        PublicKey(value.as_bytes().to_vec())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Network shard identifier, including the metachain and "all shards" sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId(pub u32);

impl ShardId {
    /// Sentinel meaning "all shards" / "not known yet". Never persisted as a claim.
    pub const ALL_SHARDS: ShardId = ShardId(0xFFFF_FFF0);
    pub const METACHAIN: ShardId = ShardId(0xFFFF_FFFF);
    /// Reported whenever a peer cannot be classified.
    pub const DEFAULT: ShardId = ShardId(0);

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn is_all_shards(&self) -> bool {
        *self == ShardId::ALL_SHARDS
    }

    pub fn is_metachain(&self) -> bool {
        *self == ShardId::METACHAIN
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ShardId::METACHAIN => f.write_str("metachain"),
            ShardId::ALL_SHARDS => f.write_str("all"),
            ShardId(id) => write!(f, "{}", id),
        }
    }
}

/// How a peer was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerType {
    /// Nothing is known about the peer
    Unknown,

    /// The topology oracle recognizes the peer's public key
    Validator,

    /// Classified from a previously observed shard claim
    Observer,
}

impl PeerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerType::Unknown => "unknown peer",
            PeerType::Validator => "validator",
            PeerType::Observer => "observer",
        }
    }
}

impl fmt::Display for PeerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PeerSubType {
    #[default]
    Regular,
    FullHistoryObserver,
}

impl PeerSubType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerSubType::Regular => "regular",
            PeerSubType::FullHistoryObserver => "full history observer",
        }
    }
}

impl fmt::Display for PeerSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a peer returned by [`crate::PeerShardMapper::get_peer_info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub peer_type: PeerType,
    pub peer_sub_type: PeerSubType,
    pub shard_id: ShardId,

    /// Public key bound to the peer, when one was found
    pub public_key: Option<PublicKey>,
}

impl PeerInfo {
    pub fn unknown(public_key: Option<PublicKey>) -> Self {
        PeerInfo {
            peer_type: PeerType::Unknown,
            peer_sub_type: PeerSubType::Regular,
            shard_id: ShardId::DEFAULT,
            public_key,
        }
    }

    pub fn validator(shard_id: ShardId, public_key: PublicKey) -> Self {
        PeerInfo {
            peer_type: PeerType::Validator,
            peer_sub_type: PeerSubType::Regular,
            shard_id,
            public_key: Some(public_key),
        }
    }

    pub fn observer(shard_id: ShardId, peer_sub_type: PeerSubType, public_key: Option<PublicKey>) -> Self {
        PeerInfo {
            peer_type: PeerType::Observer,
            peer_sub_type,
            shard_id,
            public_key,
        }
    }

    pub fn public_key_hex(&self) -> String {
        self.public_key
            .as_ref()
            .map(|pk| hex::encode(pk.as_bytes()))
            .unwrap_or_default()
    }
}
