//! Request dispatcher: routes one accepted query to the command, telemetry,
//! or attribute path and shapes the single response frame.
//!
//! The dispatcher never touches the bus. It returns the outcome and the
//! frame to send (a regular response or an error frame); the scheduler
//! decides whether and when that frame leaves the device.
use crate::device::attributes::{self, AttrRef, Section, KEY_SYSTEM_TIME};
use crate::device::traits::api::DeviceApi;
use crate::device::traits::driver::CanIotDriver;
use crate::device::Device;
use crate::error::DeviceError;
use crate::protocol::control::SystemControl;
use crate::protocol::frame::{Frame, MAX_PAYLOAD};
use crate::protocol::id::{Direction, Endpoint, FrameId, FrameType};

impl<D: CanIotDriver, A: DeviceApi> Device<'_, D, A> {
    /// Handle one query addressed to this device and shape the response.
    ///
    /// On failure the returned frame is the matching error frame; the caller
    /// applies the error-response configuration flag before sending it.
    /// Non-query frames produce no response at all.
    pub fn handle_rx_frame(&mut self, req: &Frame) -> (Result<(), DeviceError>, Option<Frame>) {
        if req.id.direction != Direction::Query {
            return (Err(DeviceError::InvalidDirection), None);
        }
        self.system.received.total = self.system.received.total.wrapping_add(1);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "dispatch: type={} ep={} len={}",
            req.id.frame_type as u8,
            req.id.endpoint as u8,
            req.len
        );

        let (result, key) = match req.id.frame_type {
            FrameType::Command => {
                self.system.received.command = self.system.received.command.wrapping_add(1);
                (self.handle_command(req), None)
            }
            FrameType::Telemetry => {
                self.system.received.request_telemetry =
                    self.system.received.request_telemetry.wrapping_add(1);
                (self.build_telemetry_response(req.id.endpoint), None)
            }
            FrameType::WriteAttribute => {
                self.system.received.write_attribute =
                    self.system.received.write_attribute.wrapping_add(1);
                self.handle_attribute(req, true)
            }
            FrameType::ReadAttribute => {
                self.system.received.read_attribute =
                    self.system.received.read_attribute.wrapping_add(1);
                self.handle_attribute(req, false)
            }
        };

        match result {
            Ok(resp) => (Ok(()), Some(resp)),
            Err(err) => {
                let frame = Frame::error_response(
                    self.did(),
                    req.id.frame_type,
                    req.id.endpoint,
                    err,
                    key.map(u32::from),
                );
                (Err(err), Some(frame))
            }
        }
    }

    //==============================================================================COMMAND
    /// Execute a command query: dissect the system control byte on the
    /// board-control endpoint, run the application handler, and answer with
    /// fresh telemetry for the same endpoint.
    fn handle_command(&mut self, req: &Frame) -> Result<Frame, DeviceError> {
        let endpoint = req.id.endpoint;
        if endpoint == Endpoint::BoardControl && req.len as usize == MAX_PAYLOAD {
            let control = SystemControl::from_byte(req.data[MAX_PAYLOAD - 1]);
            for command in control.commands() {
                self.api.system_command(command)?;
            }
        }

        let outcome = self.api.command(endpoint, req.payload());
        self.system.last_command_error = match &outcome {
            Ok(()) => 0,
            Err(err) => err.code(),
        };
        outcome?;

        self.build_telemetry_response(endpoint)
    }

    //==============================================================================TELEMETRY
    /// Run the telemetry handler for `endpoint` and wrap its payload in a
    /// telemetry response.
    pub(crate) fn build_telemetry_response(
        &mut self,
        endpoint: Endpoint,
    ) -> Result<Frame, DeviceError> {
        let mut resp = Frame::new(FrameId::new(
            FrameType::Telemetry,
            Direction::Response,
            self.did(),
            endpoint,
        ));
        match self.api.telemetry(endpoint, &mut resp.data) {
            Ok(len) => {
                resp.len = len.min(MAX_PAYLOAD) as u8;
                self.system.sent.telemetry = self.system.sent.telemetry.wrapping_add(1);
                self.system.last_telemetry_error = 0;
                Ok(resp)
            }
            Err(err) => {
                self.system.last_telemetry_error = err.code();
                Err(err)
            }
        }
    }

    //==============================================================================ATTRIBUTES
    /// Parse the key (and value for writes) and run the attribute path.
    /// The key only becomes the error-frame argument once the payload
    /// parsed, so malformed frames report bare codes.
    fn handle_attribute(
        &mut self,
        req: &Frame,
        write: bool,
    ) -> (Result<Frame, DeviceError>, Option<u16>) {
        let key = match req.attr_key() {
            Ok(key) => key,
            Err(err) => return (Err(err), None),
        };
        let value = if write {
            match req.attr_value() {
                Ok(value) => Some(value),
                Err(err) => return (Err(err), None),
            }
        } else {
            None
        };
        (self.attribute_request(req.id.endpoint, key, value), Some(key))
    }

    /// Serve one attribute access: optional write, then the read-back that
    /// feeds the response. Keys unknown to the static tables are offered to
    /// the application as custom attributes.
    pub(crate) fn attribute_request(
        &mut self,
        endpoint: Endpoint,
        key: u16,
        write_value: Option<u32>,
    ) -> Result<Frame, DeviceError> {
        match attributes::resolve(key) {
            Ok(resolved) => {
                if let Some(value) = write_value {
                    self.attribute_write(&resolved, key, value)?;
                }
                let value = self.attribute_read(&resolved)?;
                Ok(Frame::attribute_response(self.did(), endpoint, key, value))
            }
            Err(resolve_err) => match self.custom_attribute_request(key, write_value) {
                Ok(value) => Ok(Frame::attribute_response(self.did(), endpoint, key, value)),
                Err(DeviceError::CustomAttributeUnsupported) => Err(resolve_err),
                Err(err) => Err(err),
            },
        }
    }

    fn custom_attribute_request(
        &mut self,
        key: u16,
        write_value: Option<u32>,
    ) -> Result<u32, DeviceError> {
        if let Some(value) = write_value {
            self.api.custom_attr_write(key, value)?;
        }
        self.api.custom_attr_read(key)
    }

    fn attribute_read(&mut self, resolved: &AttrRef) -> Result<u32, DeviceError> {
        if !resolved.option.class_visible(self.did().class()) {
            return Err(DeviceError::ClassMismatch);
        }
        match resolved.section {
            Section::Identification => {
                Ok(self.identification().attr_load(resolved.index, resolved.part))
            }
            Section::System => Ok(self.system.attr_load(resolved.index)),
            Section::Configuration => {
                self.prepare_config_read()?;
                Ok(self.config.attr_load(resolved.index))
            }
        }
    }

    fn attribute_write(
        &mut self,
        resolved: &AttrRef,
        key: u16,
        value: u32,
    ) -> Result<(), DeviceError> {
        if !resolved.option.writable {
            return Err(DeviceError::ReadOnlyAttribute);
        }
        if !resolved.option.class_visible(self.did().class()) {
            return Err(DeviceError::ClassMismatch);
        }
        match resolved.section {
            Section::System if key == KEY_SYSTEM_TIME => {
                self.realign_time(value);
                Ok(())
            }
            Section::System => Err(DeviceError::UnsupportedSection),
            Section::Configuration => {
                self.config.attr_store(resolved.index, value);
                self.config_written()
            }
            // The section policy already cleared the writable bit.
            Section::Identification => Err(DeviceError::ReadOnlyAttribute),
        }
    }

    //==============================================================================TIME
    /// Apply a wall-clock write: set the driver clock and shift every
    /// time-anchored field by the same delta so elapsed computations stay
    /// coherent across the jump.
    fn realign_time(&mut self, secs: u32) {
        let prev = self.driver.get_time();
        self.driver.set_time(secs);

        let diff_s = secs.wrapping_sub(prev.secs);
        let diff_ms = diff_s
            .wrapping_mul(1000)
            .wrapping_sub(prev.millis as u32);

        self.system.last_telemetry = self.system.last_telemetry.wrapping_add(diff_s);
        self.system.last_telemetry_ms = self.system.last_telemetry_ms.wrapping_add(diff_ms);
        self.system.start_time = self.system.start_time.wrapping_add(diff_s);
        self.system.time = secs;
        self.system.uptime_synced = secs.wrapping_sub(self.system.start_time);

        #[cfg(feature = "defmt")]
        defmt::info!("time: realigned to {}", secs);
    }

    //==============================================================================CONFIG_SYNC
    /// Reload the configuration cache through the application hook when it
    /// is marked dirty.
    pub(crate) fn prepare_config_read(&mut self) -> Result<(), DeviceError> {
        if !self.flags.config_dirty {
            return Ok(());
        }
        self.api
            .config_on_read(&mut self.config)
            .map_err(|_| DeviceError::ConfigReloadFailed)?;
        self.flags.config_dirty = false;

        #[cfg(feature = "defmt")]
        defmt::debug!("config: cache reloaded");
        Ok(())
    }

    /// Persist the configuration after a write, compensating the telemetry
    /// anchors for however long the hook took to run.
    fn config_written(&mut self) -> Result<(), DeviceError> {
        let before = self.driver.get_time();
        let outcome = self.api.config_on_write(&self.config);
        let after = self.driver.get_time();

        let diff_s = after.secs.wrapping_sub(before.secs);
        let diff_ms = after.millis_total().wrapping_sub(before.millis_total());
        self.system.start_time = self.system.start_time.wrapping_add(diff_s);
        self.system.last_telemetry = self.system.last_telemetry.wrapping_add(diff_s);
        self.system.last_telemetry_ms = self.system.last_telemetry_ms.wrapping_add(diff_ms);

        outcome
    }
}

//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
