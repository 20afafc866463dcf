//! In-memory representation of a CANIOT frame and the deterministic query,
//! response, and error builders.
//!
//! The 8-byte payload buffer has three mutually exclusive interpretations
//! selected by the frame type: raw command/telemetry bytes, an attribute
//! view (LE u16 key, LE u32 value), or an error view (LE i32 code plus an
//! optional LE u32 argument).
use crate::error::DeviceError;
use crate::protocol::id::{DeviceId, Direction, Endpoint, FrameId, FrameType};

/// Classic CAN payload capacity. CANIOT never exceeds a single frame.
pub const MAX_PAYLOAD: usize = 8;

pub(crate) fn read_le16(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}

pub(crate) fn read_le32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

pub(crate) fn write_le16(buf: &mut [u8], val: u16) {
    buf[..2].copy_from_slice(&val.to_le_bytes());
}

pub(crate) fn write_le32(buf: &mut [u8], val: u32) {
    buf[..4].copy_from_slice(&val.to_le_bytes());
}

//==================================================================================FRAME
#[derive(Clone, Debug, PartialEq, Eq)]
/// Raw CANIOT frame as read from or written to the CAN bus.
pub struct Frame {
    /// Structured identifier, packed to 11 bits on the wire.
    pub id: FrameId,
    /// Payload buffer. Classic CAN frames always provide eight bytes.
    pub data: [u8; MAX_PAYLOAD],
    /// Number of valid payload bytes (0 to 8).
    pub len: u8,
}

impl Frame {
    /// Empty frame with the given identifier.
    pub const fn new(id: FrameId) -> Self {
        Self {
            id,
            data: [0; MAX_PAYLOAD],
            len: 0,
        }
    }

    /// Telemetry query for one endpoint of `did`. Empty payload.
    pub const fn query_telemetry(did: DeviceId, endpoint: Endpoint) -> Self {
        Self::new(FrameId::new(
            FrameType::Telemetry,
            Direction::Query,
            did,
            endpoint,
        ))
    }

    /// Command query carrying an application payload. Payloads longer than
    /// eight bytes are silently truncated, matching the wire capacity.
    pub fn query_command(did: DeviceId, endpoint: Endpoint, payload: &[u8]) -> Self {
        let mut frame = Self::new(FrameId::new(
            FrameType::Command,
            Direction::Query,
            did,
            endpoint,
        ));
        let len = payload.len().min(MAX_PAYLOAD);
        frame.data[..len].copy_from_slice(&payload[..len]);
        frame.len = len as u8;
        frame
    }

    /// Read-attribute query for `key`. Payload is the 2-byte key.
    pub fn query_read_attribute(did: DeviceId, key: u16) -> Self {
        let mut frame = Self::new(FrameId::new(
            FrameType::ReadAttribute,
            Direction::Query,
            did,
            Endpoint::App,
        ));
        write_le16(&mut frame.data, key);
        frame.len = 2;
        frame
    }

    /// Write-attribute query. Payload is the 2-byte key and 4-byte value.
    pub fn query_write_attribute(did: DeviceId, key: u16, value: u32) -> Self {
        let mut frame = Self::new(FrameId::new(
            FrameType::WriteAttribute,
            Direction::Query,
            did,
            Endpoint::App,
        ));
        write_le16(&mut frame.data, key);
        write_le32(&mut frame.data[2..], value);
        frame.len = 6;
        frame
    }

    /// Attribute response echoing the key and the read-back value.
    pub fn attribute_response(did: DeviceId, endpoint: Endpoint, key: u16, value: u32) -> Self {
        let mut frame = Self::new(FrameId::new(
            FrameType::ReadAttribute,
            Direction::Response,
            did,
            endpoint,
        ));
        write_le16(&mut frame.data, key);
        write_le32(&mut frame.data[2..], value);
        frame.len = 6;
        frame
    }

    /// Error response to a query of type `query_type`. The error type is the
    /// complement of the regular response type, which is how receivers tell
    /// errors apart. Attribute failures attach the offending key as a 4-byte
    /// argument, giving an 8-byte payload; other errors carry 4 bytes.
    pub fn error_response(
        did: DeviceId,
        query_type: FrameType,
        endpoint: Endpoint,
        error: DeviceError,
        arg: Option<u32>,
    ) -> Self {
        let mut frame = Self::new(FrameId::new(
            query_type.error_type(),
            Direction::Response,
            did,
            endpoint,
        ));
        write_le32(&mut frame.data, error.code() as u32);
        match arg {
            Some(arg) => {
                write_le32(&mut frame.data[4..], arg);
                frame.len = 8;
            }
            None => frame.len = 4,
        }
        frame
    }

    /// Valid payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    //==============================================================================VIEWS
    /// Attribute key (bytes 0-2, little-endian).
    pub fn attr_key(&self) -> Result<u16, DeviceError> {
        if self.len < 2 {
            return Err(DeviceError::MalformedFrame);
        }
        Ok(read_le16(&self.data))
    }

    /// Attribute value (bytes 2-6, little-endian).
    pub fn attr_value(&self) -> Result<u32, DeviceError> {
        if self.len < 6 {
            return Err(DeviceError::MalformedFrame);
        }
        Ok(read_le32(&self.data[2..]))
    }

    /// Signed error code of an error frame (bytes 0-4, little-endian).
    pub fn error_code(&self) -> Result<i32, DeviceError> {
        if self.len < 4 {
            return Err(DeviceError::MalformedFrame);
        }
        Ok(read_le32(&self.data) as i32)
    }

    /// Error argument (offending attribute key) when present.
    pub fn error_arg(&self) -> Option<u32> {
        if self.len >= 8 {
            Some(read_le32(&self.data[4..]))
        } else {
            None
        }
    }

    //==============================================================================CLASSIFICATION
    /// An error frame is a response under the query's complementary type.
    pub const fn is_error(&self) -> bool {
        matches!(self.id.direction, Direction::Response)
            && matches!(
                self.id.frame_type,
                FrameType::Command | FrameType::WriteAttribute
            )
    }

    /// Telemetry response, as produced for telemetry queries and successful
    /// commands.
    pub const fn is_telemetry_response(&self) -> bool {
        matches!(self.id.direction, Direction::Response)
            && matches!(self.id.frame_type, FrameType::Telemetry)
    }

    /// Whether the frame is addressed to every device on the bus.
    pub const fn is_broadcast(&self) -> bool {
        self.id.did.is_broadcast()
    }
}
