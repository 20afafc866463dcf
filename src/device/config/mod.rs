//! RAM image of the persistent device configuration.
//!
//! The engine only ever touches this cache: the application syncs it with
//! persistent storage through the config callbacks, and a dirty flag defers
//! reloads until a configuration attribute is actually read.

use crate::protocol::id::Endpoint;

/// Telemetry period applied until the configuration says otherwise.
pub const TELEMETRY_PERIOD_DEFAULT_MS: u32 = 60_000;
/// Fixed response delay default.
pub const TELEMETRY_DELAY_DEFAULT_MS: u16 = 100;
/// Lower bound of the broadcast response jitter window.
pub const TELEMETRY_DELAY_MIN_DEFAULT_MS: u16 = 0;
/// Upper bound of the broadcast response jitter window.
pub const TELEMETRY_DELAY_MAX_DEFAULT_MS: u16 = 100;

//==================================================================================TELEMETRY
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Timing parameters of the telemetry scheduler.
pub struct TelemetryConfig {
    /// Periodic telemetry interval, milliseconds.
    pub period_ms: u32,
    /// Fixed response delay, milliseconds.
    pub delay_ms: u16,
    /// Broadcast jitter window lower bound, milliseconds.
    pub delay_min_ms: u16,
    /// Broadcast jitter window upper bound, milliseconds.
    pub delay_max_ms: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            period_ms: TELEMETRY_PERIOD_DEFAULT_MS,
            delay_ms: TELEMETRY_DELAY_DEFAULT_MS,
            delay_min_ms: TELEMETRY_DELAY_MIN_DEFAULT_MS,
            delay_max_ms: TELEMETRY_DELAY_MAX_DEFAULT_MS,
        }
    }
}

//==================================================================================FLAGS
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Behavioral switches, packed into a single attribute byte.
///
/// | bits | field                       |
/// |------|-----------------------------|
/// | 0    | emit error response frames  |
/// | 1    | randomize broadcast delay   |
/// | 2-3  | periodic telemetry endpoint |
/// | 4    | periodic telemetry enabled  |
pub struct ConfigFlags {
    pub error_response: bool,
    pub telemetry_delay_rdm: bool,
    pub telemetry_endpoint: Endpoint,
    pub telemetry_periodic_enabled: bool,
}

impl ConfigFlags {
    pub const fn from_word(word: u8) -> Self {
        Self {
            error_response: word & 0x01 != 0,
            telemetry_delay_rdm: word & 0x02 != 0,
            telemetry_endpoint: Endpoint::from_raw(word >> 2),
            telemetry_periodic_enabled: word & 0x10 != 0,
        }
    }

    pub const fn to_word(self) -> u8 {
        (self.error_response as u8)
            | ((self.telemetry_delay_rdm as u8) << 1)
            | ((self.telemetry_endpoint as u8) << 2)
            | ((self.telemetry_periodic_enabled as u8) << 4)
    }
}

impl Default for ConfigFlags {
    fn default() -> Self {
        Self {
            error_response: true,
            telemetry_delay_rdm: true,
            telemetry_endpoint: Endpoint::BoardControl,
            telemetry_periodic_enabled: true,
        }
    }
}

//==================================================================================CLASS_BLOCKS
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Class-0 board block: four outputs with pulse durations.
pub struct Class0Config {
    /// Pulse duration per output, milliseconds.
    pub pulse_duration_ms: [u32; 4],
    /// Output states applied at startup, one bit per output.
    pub outputs_default: u32,
    /// Inputs whose edges trigger an immediate telemetry, one bit per input.
    pub telemetry_on_change: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Class-1 board block: bulk GPIO bank with per-pin direction.
pub struct Class1Config {
    /// Pulse duration per pin, milliseconds, one entry per bank pin.
    pub pulse_duration_ms: [u32; 20],
    /// Pin directions, one bit per pin (set = output).
    pub directions: u32,
    /// Output states applied at startup, one bit per pin.
    pub outputs_default: u32,
    /// Pins whose edges trigger an immediate telemetry, one bit per pin.
    pub telemetry_on_change: u32,
}

//==================================================================================DEVICE_CONFIG
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Full configuration image exposed through the configuration attribute
/// section.
pub struct DeviceConfig {
    pub telemetry: TelemetryConfig,
    pub flags: ConfigFlags,
    /// Timezone offset, seconds east of UTC.
    pub timezone: i32,
    /// Two-letter region and country codes, NUL padded.
    pub location: [u8; 4],
    pub class0: Class0Config,
    pub class1: Class1Config,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            telemetry: TelemetryConfig::default(),
            flags: ConfigFlags::default(),
            timezone: 0,
            location: *b"EU\0\0",
            class0: Class0Config::default(),
            class1: Class1Config::default(),
        }
    }
}
