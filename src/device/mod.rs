//! Device engine: identity, runtime state, and the poll-driven request
//! dispatcher/scheduler built on top of the protocol layer.

use crate::device::config::DeviceConfig;
use crate::device::traits::api::DeviceApi;
use crate::device::traits::driver::CanIotDriver;
use crate::protocol::id::{DeviceId, Endpoint};

pub mod attributes;
pub mod config;
pub mod traits;

mod dispatch;
mod scheduler;

#[cfg(test)]
pub(crate) mod mock;

//==================================================================================IDENTIFICATION
#[derive(Clone, Debug, PartialEq, Eq)]
/// Immutable identity of a device, typically flashed with the firmware and
/// exposed through the identification attribute section.
pub struct Identification {
    /// Packed class and sub-id.
    pub did: DeviceId,
    /// Firmware version.
    pub version: u16,
    /// Human-readable name, NUL padded.
    pub name: [u8; 32],
    /// Build or provisioning magic, for fleet bookkeeping.
    pub magic_number: u32,
    /// Feature bitmap advertised to controllers.
    pub features: u32,
}

//==================================================================================SYSTEM_STATE
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Receive counters, one per accepted frame type plus the filtered-out
/// remainder.
pub struct RxCounters {
    pub total: u32,
    pub read_attribute: u32,
    pub write_attribute: u32,
    pub command: u32,
    pub request_telemetry: u32,
    /// Frames seen but not addressed to this device.
    pub ignored: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Transmit counters.
pub struct TxCounters {
    pub total: u32,
    pub telemetry: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Volatile runtime state exposed through the system attribute section.
/// Reset wholesale by [`Device::init`].
pub struct SystemState {
    /// Uptime at the moment the wall clock was last set, seconds.
    pub uptime_synced: u32,
    /// Last wall-clock reading, seconds.
    pub time: u32,
    /// Seconds since [`Device::init`].
    pub uptime: u32,
    /// Wall-clock reading at [`Device::init`], seconds.
    pub start_time: u32,
    /// Wall-clock second of the last periodic telemetry emission.
    pub last_telemetry: u32,
    /// Millisecond reading of the last periodic telemetry emission.
    pub last_telemetry_ms: u32,
    pub received: RxCounters,
    pub sent: TxCounters,
    /// Wire code of the most recent command handler outcome, 0 on success.
    pub last_command_error: i32,
    /// Wire code of the most recent telemetry handler outcome, 0 on success.
    pub last_telemetry_error: i32,
    /// Battery level, board-defined unit.
    pub battery: u8,
}

//==================================================================================RUNTIME_FLAGS
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RuntimeFlags {
    /// One pending bit per endpoint, indexed by the raw endpoint value.
    pub telemetry_pending: u8,
    /// RAM configuration cache is stale and must be reloaded before a read.
    pub config_dirty: bool,
    pub initialized: bool,
    /// Startup attribute notifications all delivered.
    pub startup_attrs_done: bool,
}

//==================================================================================DEVICE
/// One CANIOT device: protocol engine plus the driver and application
/// callbacks it orchestrates.
///
/// The embedding firmware owns the loop: call [`Device::process`] whenever a
/// frame arrives or [`Device::time_until_next_process`] elapses.
pub struct Device<'a, D: CanIotDriver, A: DeviceApi> {
    identification: &'a Identification,
    pub system: SystemState,
    pub config: DeviceConfig,
    pub(crate) driver: D,
    pub(crate) api: A,
    pub(crate) flags: RuntimeFlags,
    /// Attribute keys pushed unsolicited once after startup.
    startup_attrs: &'a [u16],
    startup_cursor: usize,
}

impl<'a, D: CanIotDriver, A: DeviceApi> Device<'a, D, A> {
    pub fn new(
        identification: &'a Identification,
        config: DeviceConfig,
        driver: D,
        api: A,
        startup_attrs: &'a [u16],
    ) -> Self {
        Self {
            identification,
            system: SystemState::default(),
            config,
            driver,
            api,
            flags: RuntimeFlags::default(),
            startup_attrs,
            startup_cursor: 0,
        }
    }

    /// Reset the runtime state and anchor the uptime base. Must be called
    /// once before the first [`Device::process`].
    pub fn init(&mut self) {
        self.system = SystemState::default();
        self.system.start_time = self.driver.get_time().secs;
        self.flags = RuntimeFlags {
            telemetry_pending: 0,
            config_dirty: true,
            initialized: true,
            startup_attrs_done: self.startup_attrs.is_empty(),
        };
        self.startup_cursor = 0;

        #[cfg(feature = "defmt")]
        defmt::info!("device: init did={}", self.identification.did.to_raw());
    }

    pub fn did(&self) -> DeviceId {
        self.identification.did
    }

    pub fn identification(&self) -> &Identification {
        self.identification
    }

    /// Whether the wall clock has been set since startup.
    pub fn time_synced(&self) -> bool {
        self.system.uptime_synced != 0
    }

    /// Mark the configuration cache stale after an out-of-band change, so
    /// the next read goes through the reload callback.
    pub fn mark_config_dirty(&mut self) {
        self.flags.config_dirty = true;
    }

    //==============================================================================TELEMETRY_TRIGGERS
    /// Request an unsolicited telemetry emission on `endpoint`. Picked up by
    /// the next idle [`Device::process`] call.
    pub fn trigger_telemetry(&mut self, endpoint: Endpoint) {
        self.flags.telemetry_pending |= 1 << endpoint as u8;
    }

    pub fn triggered_telemetry(&self, endpoint: Endpoint) -> bool {
        self.flags.telemetry_pending & (1 << endpoint as u8) != 0
    }

    pub fn triggered_telemetry_any(&self) -> bool {
        self.flags.telemetry_pending != 0
    }

    pub(crate) fn clear_telemetry_trigger(&mut self, endpoint: Endpoint) {
        self.flags.telemetry_pending &= !(1 << endpoint as u8);
    }

    //==============================================================================ACCESSORS
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }
}
