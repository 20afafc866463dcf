//! Creation and extraction of the 11-bit CAN standard identifiers used by
//! CANIOT, plus the acceptance filter/mask arithmetic for device targeting.
//!
//! Bit layout of an encoded identifier, from the LSB:
//!
//! | bits  | field      |
//! |-------|------------|
//! | 0-1   | frame type |
//! | 2     | direction  |
//! | 3-5   | class      |
//! | 6-8   | sub-id     |
//! | 9-10  | endpoint   |
//!
//! This layout is the wire contract; it does not rely on any C bitfield
//! ordering. Out-of-range inputs are truncated to their field width at
//! construction.
use embedded_can::StandardId;

const TYPE_POS: u16 = 0;
const DIR_POS: u16 = 2;
const CLASS_POS: u16 = 3;
const SUBID_POS: u16 = 6;
const ENDPOINT_POS: u16 = 9;

/// Acceptance mask selecting the direction, class, and sub-id bits.
pub const DEVICE_MASK: u16 = 0x1FC;

/// Acceptance mask selecting only the direction and class bits, used for
/// class-wide addressing where every sub-id of the class must match.
pub const CLASS_MASK: u16 = 0x03C;

//==================================================================================FRAME_TYPE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The four CANIOT request/response kinds.
pub enum FrameType {
    Command = 0,
    Telemetry = 1,
    WriteAttribute = 2,
    ReadAttribute = 3,
}

impl FrameType {
    /// Decode from the two type bits. All four values are valid.
    pub const fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => FrameType::Command,
            1 => FrameType::Telemetry,
            2 => FrameType::WriteAttribute,
            _ => FrameType::ReadAttribute,
        }
    }

    /// Expected response type for a query of this type. Commands are
    /// acknowledged by telemetry, attribute writes by an attribute read-back.
    pub const fn response_type(self) -> FrameType {
        match self {
            FrameType::Command | FrameType::Telemetry => FrameType::Telemetry,
            FrameType::WriteAttribute | FrameType::ReadAttribute => FrameType::ReadAttribute,
        }
    }

    /// Type under which an error reply to a query of this type is reported.
    /// Always the complement of [`FrameType::response_type`].
    pub const fn error_type(self) -> FrameType {
        match self {
            FrameType::Command | FrameType::Telemetry => FrameType::Command,
            FrameType::WriteAttribute | FrameType::ReadAttribute => FrameType::WriteAttribute,
        }
    }

    /// Whether `resp` is the valid (non-error) response type for `self`.
    pub const fn is_valid_response(self, resp: FrameType) -> bool {
        resp as u8 == self.response_type() as u8
    }
}

//==================================================================================DIRECTION
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Frame direction. Queries flow from the controller to devices.
pub enum Direction {
    Response = 0,
    Query = 1,
}

impl Direction {
    pub const fn from_raw(raw: u8) -> Self {
        if raw & 0x1 == 0 {
            Direction::Response
        } else {
            Direction::Query
        }
    }
}

//==================================================================================ENDPOINT
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
/// Application endpoint addressed by command/telemetry frames.
/// Board control is the highest-priority endpoint.
pub enum Endpoint {
    App = 0,
    Endpoint1 = 1,
    Endpoint2 = 2,
    BoardControl = 3,
}

impl Endpoint {
    /// Decode from the two endpoint bits. All four values are valid.
    pub const fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => Endpoint::App,
            1 => Endpoint::Endpoint1,
            2 => Endpoint::Endpoint2,
            _ => Endpoint::BoardControl,
        }
    }

    /// All endpoints ordered from highest to lowest scheduling priority.
    pub const PRIORITY_ORDER: [Endpoint; 4] = [
        Endpoint::BoardControl,
        Endpoint::Endpoint2,
        Endpoint::Endpoint1,
        Endpoint::App,
    ];
}

//==================================================================================DEVICE_ID
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Two-part device address: class (0-7) and sub-id (0-7).
/// Class 7 with sub-id 7 is the broadcast address.
pub struct DeviceId {
    class: u8,
    sub_id: u8,
}

impl DeviceId {
    /// The broadcast address targeting every device on the bus.
    pub const BROADCAST: DeviceId = DeviceId::new(7, 7);

    /// Build a device id. Inputs are truncated to 3 bits.
    pub const fn new(class: u8, sub_id: u8) -> Self {
        Self {
            class: class & 0x7,
            sub_id: sub_id & 0x7,
        }
    }

    /// Decode from the 6-bit scalar form (class bits 0-2, sub-id bits 3-5).
    pub const fn from_raw(raw: u8) -> Self {
        Self::new(raw & 0x7, (raw >> 3) & 0x7)
    }

    /// 6-bit scalar form.
    pub const fn to_raw(self) -> u8 {
        self.class | (self.sub_id << 3)
    }

    pub const fn class(self) -> u8 {
        self.class
    }

    pub const fn sub_id(self) -> u8 {
        self.sub_id
    }

    pub const fn is_broadcast(self) -> bool {
        self.class == 7 && self.sub_id == 7
    }
}

//==================================================================================FRAME_ID
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Structured CANIOT frame identifier. Constructed per frame, immutable in
/// spirit: mutate only while building, never after transmission.
pub struct FrameId {
    pub frame_type: FrameType,
    pub direction: Direction,
    pub did: DeviceId,
    pub endpoint: Endpoint,
}

impl FrameId {
    pub const fn new(
        frame_type: FrameType,
        direction: Direction,
        did: DeviceId,
        endpoint: Endpoint,
    ) -> Self {
        Self {
            frame_type,
            direction,
            did,
            endpoint,
        }
    }

    /// Pack into the 11-bit wire value.
    pub const fn to_raw(self) -> u16 {
        ((self.frame_type as u16) << TYPE_POS)
            | ((self.direction as u16) << DIR_POS)
            | ((self.did.class() as u16) << CLASS_POS)
            | ((self.did.sub_id() as u16) << SUBID_POS)
            | ((self.endpoint as u16) << ENDPOINT_POS)
    }

    /// Unpack from a wire value. Bits above the 11-bit identifier are
    /// ignored, so any CAN standard id decodes without error.
    pub const fn from_raw(raw: u16) -> Self {
        Self {
            frame_type: FrameType::from_raw((raw >> TYPE_POS) as u8),
            direction: Direction::from_raw((raw >> DIR_POS) as u8),
            did: DeviceId::new((raw >> CLASS_POS) as u8, (raw >> SUBID_POS) as u8),
            endpoint: Endpoint::from_raw((raw >> ENDPOINT_POS) as u8),
        }
    }

    /// Encoded identifier as an `embedded-can` standard id, for programming
    /// hardware acceptance filters.
    pub fn to_standard_id(self) -> StandardId {
        // An 11-bit packed value is always a valid standard id.
        StandardId::new(self.to_raw()).unwrap_or(StandardId::ZERO)
    }
}

impl From<StandardId> for FrameId {
    fn from(id: StandardId) -> Self {
        FrameId::from_raw(id.as_raw())
    }
}

//==================================================================================FILTERS
/// Masked comparison value matching queries addressed to `did`.
pub const fn filter_for(did: DeviceId) -> u16 {
    ((Direction::Query as u16) << DIR_POS)
        | ((did.class() as u16) << CLASS_POS)
        | ((did.sub_id() as u16) << SUBID_POS)
}

/// Masked comparison value matching broadcast queries.
pub const fn filter_broadcast() -> u16 {
    filter_for(DeviceId::BROADCAST)
}

/// Masked comparison value matching queries to any device of `class`,
/// to be compared under [`CLASS_MASK`].
pub const fn filter_by_class(class: u8) -> u16 {
    ((Direction::Query as u16) << DIR_POS) | (((class & 0x7) as u16) << CLASS_POS)
}

/// Whether a received identifier targets the device `did`: either its own
/// unicast filter or the broadcast filter matches.
pub const fn is_targeted(did: DeviceId, received: FrameId) -> bool {
    let raw = received.to_raw();
    (raw & DEVICE_MASK) == filter_for(did) || (raw & DEVICE_MASK) == filter_broadcast()
}

/// Class-wide variant of [`is_targeted`]: any sub-id of `class`, or
/// broadcast.
pub const fn is_targeted_class(class: u8, received: FrameId) -> bool {
    let raw = received.to_raw();
    (raw & CLASS_MASK) == filter_by_class(class)
        || (raw & DEVICE_MASK) == filter_broadcast()
}
