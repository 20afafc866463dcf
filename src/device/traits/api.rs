//! Application callback surface invoked by the request dispatcher.
//!
//! Every method has a default body reproducing the behavior of an
//! unregistered callback, so implementations only override what the board
//! actually supports.
use crate::device::config::DeviceConfig;
use crate::error::DeviceError;
use crate::protocol::control::SystemCommand;
use crate::protocol::frame::MAX_PAYLOAD;
use crate::protocol::id::Endpoint;

/// Contract between the device engine and the embedding application.
pub trait DeviceApi {
    /// Execute a command addressed to `endpoint`. The payload is the raw
    /// frame content, including a possible trailing system control byte.
    fn command(&mut self, endpoint: Endpoint, payload: &[u8]) -> Result<(), DeviceError> {
        let _ = (endpoint, payload);
        Err(DeviceError::NoCommandHandler)
    }

    /// Fill `buf` with the telemetry payload for `endpoint` and return the
    /// number of valid bytes (at most eight).
    fn telemetry(
        &mut self,
        endpoint: Endpoint,
        buf: &mut [u8; MAX_PAYLOAD],
    ) -> Result<usize, DeviceError> {
        let _ = (endpoint, buf);
        Err(DeviceError::NoTelemetryHandler)
    }

    /// Reload `config` from persistent storage. Called before a
    /// configuration read while the RAM cache is dirty.
    fn config_on_read(&mut self, config: &mut DeviceConfig) -> Result<(), DeviceError> {
        let _ = config;
        Ok(())
    }

    /// Persist and apply `config`. Called after a configuration write.
    fn config_on_write(&mut self, config: &DeviceConfig) -> Result<(), DeviceError> {
        let _ = config;
        Ok(())
    }

    /// Read an application-defined attribute. Keys reaching here did not
    /// resolve against the static tables; reporting
    /// [`DeviceError::CustomAttributeUnsupported`] surfaces the original
    /// resolution error instead.
    fn custom_attr_read(&mut self, key: u16) -> Result<u32, DeviceError> {
        let _ = key;
        Err(DeviceError::CustomAttributeUnsupported)
    }

    /// Write an application-defined attribute.
    fn custom_attr_write(&mut self, key: u16, value: u32) -> Result<(), DeviceError> {
        let _ = (key, value);
        Err(DeviceError::CustomAttributeUnsupported)
    }

    /// Execute one board-control system command. Dispatch stops at the
    /// first failure.
    fn system_command(&mut self, command: SystemCommand) -> Result<(), DeviceError> {
        let _ = command;
        Ok(())
    }
}
