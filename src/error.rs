//! Error definitions shared across library modules.
//! `DeviceError` models protocol-level failures and their signed wire codes;
//! `ProcessError` wraps them together with transport-level conditions.
use thiserror_no_std::Error;

/// Base of the CANIOT wire error code range. Codes are transmitted as the
/// negated base-relative value, encoded as a little-endian `i32`.
pub const ERROR_BASE: u32 = 0x3A00;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Protocol-level failures raised while handling a request.
/// Every variant maps to a stable wire code around [`ERROR_BASE`].
pub enum DeviceError {
    /// The inbound frame is not a query.
    #[error("Frame direction is not a query")]
    InvalidDirection,
    /// Payload too short for the request kind (missing key or value).
    #[error("Malformed frame payload")]
    MalformedFrame,
    /// Operation defined by the protocol but not provided here.
    #[error("Not implemented")]
    NotImplemented,
    /// Attribute key names a section index out of range.
    #[error("Unknown attribute section")]
    UnknownSection,
    /// Attribute key names an attribute the section does not declare.
    #[error("Unknown attribute in section")]
    UnknownAttribute,
    /// Attribute key names a 4-byte part beyond the attribute size.
    #[error("Invalid attribute part offset")]
    InvalidPart,
    /// Class-tagged attribute accessed from a device of another class.
    #[error("Attribute not available for this device class")]
    ClassMismatch,
    /// Write to an attribute without the writable option.
    #[error("Attribute is read-only")]
    ReadOnlyAttribute,
    /// Section cannot serve the requested access.
    #[error("Unsupported section access")]
    UnsupportedSection,
    /// Command query received but no command handler is registered.
    #[error("No command handler registered")]
    NoCommandHandler,
    /// Telemetry query received but no telemetry handler is registered.
    #[error("No telemetry handler registered")]
    NoTelemetryHandler,
    /// Key did not resolve and the application declines custom attributes.
    #[error("Custom attributes unsupported")]
    CustomAttributeUnsupported,
    /// The configuration reload hook failed; the RAM cache stays dirty.
    #[error("Configuration reload failed")]
    ConfigReloadFailed,
    /// Application callback failure propagated verbatim.
    #[error("Application error {0}")]
    Application(i32),
}

impl DeviceError {
    /// Signed code as transmitted in error frames (always negative).
    pub fn code(self) -> i32 {
        match self {
            DeviceError::Application(code) => code,
            _ => -((ERROR_BASE + self.offset()) as i32),
        }
    }

    fn offset(self) -> u32 {
        match self {
            DeviceError::InvalidDirection => 0x01,
            DeviceError::MalformedFrame => 0x02,
            DeviceError::NotImplemented => 0x03,
            DeviceError::UnknownSection => 0x10,
            DeviceError::UnknownAttribute => 0x11,
            DeviceError::InvalidPart => 0x12,
            DeviceError::ClassMismatch => 0x13,
            DeviceError::ReadOnlyAttribute => 0x14,
            DeviceError::UnsupportedSection => 0x15,
            DeviceError::NoCommandHandler => 0x20,
            DeviceError::NoTelemetryHandler => 0x21,
            DeviceError::CustomAttributeUnsupported => 0x22,
            DeviceError::ConfigReloadFailed => 0x23,
            DeviceError::Application(_) => 0x00,
        }
    }

    /// Rebuild the error from a signed wire code. Codes outside the CANIOT
    /// range come back as [`DeviceError::Application`].
    pub fn from_code(code: i32) -> Self {
        match (-code) as u32 {
            c if c == ERROR_BASE + 0x01 => DeviceError::InvalidDirection,
            c if c == ERROR_BASE + 0x02 => DeviceError::MalformedFrame,
            c if c == ERROR_BASE + 0x03 => DeviceError::NotImplemented,
            c if c == ERROR_BASE + 0x10 => DeviceError::UnknownSection,
            c if c == ERROR_BASE + 0x11 => DeviceError::UnknownAttribute,
            c if c == ERROR_BASE + 0x12 => DeviceError::InvalidPart,
            c if c == ERROR_BASE + 0x13 => DeviceError::ClassMismatch,
            c if c == ERROR_BASE + 0x14 => DeviceError::ReadOnlyAttribute,
            c if c == ERROR_BASE + 0x15 => DeviceError::UnsupportedSection,
            c if c == ERROR_BASE + 0x20 => DeviceError::NoCommandHandler,
            c if c == ERROR_BASE + 0x21 => DeviceError::NoTelemetryHandler,
            c if c == ERROR_BASE + 0x22 => DeviceError::CustomAttributeUnsupported,
            c if c == ERROR_BASE + 0x23 => DeviceError::ConfigReloadFailed,
            _ => DeviceError::Application(code),
        }
    }

    /// Attribute-level failures: the key or access was bad, but the device
    /// itself is healthy. Non-fatal during startup attribute delivery.
    pub fn is_attribute_error(self) -> bool {
        matches!(
            self,
            DeviceError::UnknownSection
                | DeviceError::UnknownAttribute
                | DeviceError::InvalidPart
                | DeviceError::ClassMismatch
                | DeviceError::ReadOnlyAttribute
                | DeviceError::UnsupportedSection
                | DeviceError::CustomAttributeUnsupported
        )
    }

    /// True when the signed code belongs to the CANIOT error range.
    pub fn is_protocol_code(code: i32) -> bool {
        let neg = code.wrapping_neg();
        neg >= ERROR_BASE as i32 && neg <= (ERROR_BASE + 0xFF) as i32
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
/// Outcome of a `process()` cycle that did not complete a full
/// read/dispatch/write round.
pub enum ProcessError<E: core::fmt::Debug> {
    /// No inbound frame and nothing queued. A scheduling signal, not a
    /// failure: the caller should sleep until the next deadline.
    #[error("No frame available")]
    NoFrame,

    /// Request handling failed. When error responses are enabled the
    /// matching error frame has already been sent.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The transport driver rejected a send or receive.
    #[error("Driver error: {0:?}")]
    Driver(E),
}
