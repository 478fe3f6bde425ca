use crate::{
    Result,
    constants::{MAX_EPC_LENGTH, MIN_EPC_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds on the transport's clock.
///
/// Only differences between timestamps are meaningful. The clock may jump
/// backwards; the engine treats negative elapsed time as zero.
pub type Timestamp = u64;

/// Electronic Product Code identifying one physical tag.
///
/// Serialized as an upper-case hex string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Epc(Box<[u8]>);

impl Epc {
    /// Create an EPC from raw bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidEpc` if the length is outside 4-62 bytes.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let len = bytes.len();
        if !(MIN_EPC_LENGTH..=MAX_EPC_LENGTH).contains(&len) {
            return Err(Error::invalid_epc(format!(
                "EPC length must be {MIN_EPC_LENGTH}-{MAX_EPC_LENGTH} bytes, got {len}"
            )));
        }
        Ok(Epc(bytes.into()))
    }

    /// Parse an EPC from a hex string (case-insensitive, whitespace trimmed).
    ///
    /// # Errors
    /// Returns `Error::InvalidEpc` if the string is not valid hex or decodes
    /// to a length outside 4-62 bytes.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| Error::invalid_epc(format!("Invalid EPC hex '{s}': {e}")))?;
        Epc::new(&bytes)
    }

    /// Get the raw EPC bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; an EPC holds at least `MIN_EPC_LENGTH` bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Upper-case hex representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }
}

impl fmt::Display for Epc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Epc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Epc({})", self.to_hex())
    }
}

impl std::str::FromStr for Epc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Epc::from_hex(s)
    }
}

impl TryFrom<String> for Epc {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Epc::from_hex(&s)
    }
}

impl TryFrom<&[u8]> for Epc {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Epc::new(bytes)
    }
}

impl From<Epc> for String {
    fn from(epc: Epc) -> Self {
        epc.to_hex()
    }
}

/// Read state reported for a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagReadState {
    /// First time seen in this session, or seen again after being lost.
    Found,

    /// Seen again while still visible.
    Updated,

    /// Not seen for the whole history window.
    Lost,
}

impl TagReadState {
    /// Returns `true` for `Found` and `Updated`.
    #[inline]
    #[must_use]
    pub fn is_visible(self) -> bool {
        matches!(self, TagReadState::Found | TagReadState::Updated)
    }
}

impl fmt::Display for TagReadState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TagReadState::Found => write!(f, "FOUND"),
            TagReadState::Updated => write!(f, "UPDATED"),
            TagReadState::Lost => write!(f, "LOST"),
        }
    }
}

/// Signal strength of a read, I and Q channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rssi {
    pub i: i32,
    pub q: i32,
}

/// One raw tag observation delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRead {
    /// Tag identifier.
    pub epc: Epc,

    /// When the read happened.
    pub timestamp: Timestamp,

    /// Signal strength, if the reader reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<Rssi>,
}

impl TagRead {
    /// Create a read without RSSI.
    pub fn new(epc: Epc, timestamp: Timestamp) -> Self {
        Self {
            epc,
            timestamp,
            rssi: None,
        }
    }

    /// Attach RSSI data.
    pub fn with_rssi(mut self, i: i32, q: i32) -> Self {
        self.rssi = Some(Rssi { i, q });
        self
    }
}

/// State of the connection to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Nothing connected to the audio port.
    #[default]
    NotConnected,

    /// Something connected, handshake in progress.
    Connecting,

    /// Connected to a reader with incompatible firmware.
    IncompatibleReader,

    /// Connected to a reader.
    Connected,
}

impl ConnectionState {
    /// Returns `true` if a compatible reader is connected.
    #[inline]
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectionState::NotConnected => write!(f, "NotConnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::IncompatibleReader => write!(f, "IncompatibleReader"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}
