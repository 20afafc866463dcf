//! Poll-driven scheduler: one `process()` call drains at most one inbound
//! frame or emits at most one queued frame, so the embedding loop stays
//! run-to-completion with bounded work per wakeup.
use crate::device::traits::api::DeviceApi;
use crate::device::traits::driver::CanIotDriver;
use crate::device::Device;
use crate::error::ProcessError;
use crate::protocol::frame::Frame;
use crate::protocol::id::{self, Endpoint, FrameType};

/// Backoff applied while the configuration reload hook keeps failing.
const CONFIG_RETRY_DELAY_MS: u32 = 1_000;

impl<D: CanIotDriver, A: DeviceApi> Device<'_, D, A> {
    /// Run one device cycle: refresh the clock, arm the periodic telemetry
    /// trigger, then serve one inbound query or one queued emission
    /// (startup attribute or pending telemetry).
    ///
    /// [`ProcessError::NoFrame`] means the cycle found nothing to do; sleep
    /// until [`Device::time_until_next_process`] and call again.
    pub fn process(&mut self) -> Result<(), ProcessError<D::Error>> {
        // Reads retry the reload themselves, a failure here only delays it.
        let _ = self.prepare_config_read();

        let now = self.driver.get_time();
        self.system.time = now.secs;
        self.system.uptime = now.secs.wrapping_sub(self.system.start_time);
        let now_ms = now.millis_total();

        if self.config.flags.telemetry_periodic_enabled {
            let elapsed = now_ms.wrapping_sub(self.system.last_telemetry_ms);
            if elapsed >= self.config.telemetry.period_ms {
                self.trigger_telemetry(self.config.flags.telemetry_endpoint);
            }
        }

        let mut jitter = false;
        let (result, response) = match self.driver.recv().map_err(ProcessError::Driver)? {
            Some(req) => {
                if !id::is_targeted(self.did(), req.id) {
                    self.system.received.ignored = self.system.received.ignored.wrapping_add(1);
                    return Ok(());
                }
                jitter = req.is_broadcast() && self.config.flags.telemetry_delay_rdm;
                self.handle_rx_frame(&req)
            }
            None if !self.flags.startup_attrs_done => match self.next_startup_attribute() {
                Some(resp) => (Ok(()), Some(resp)),
                None => return Ok(()),
            },
            None => match self.pending_telemetry_endpoint() {
                Some(endpoint) => match self.build_telemetry_response(endpoint) {
                    Ok(resp) => (Ok(()), Some(resp)),
                    Err(err) => {
                        // Clear the trigger so a broken handler cannot wedge
                        // the scheduler in a hot loop.
                        self.clear_telemetry_trigger(endpoint);
                        let frame =
                            Frame::error_response(self.did(), FrameType::Telemetry, endpoint, err, None);
                        (Err(err), Some(frame))
                    }
                },
                None => return Err(ProcessError::NoFrame),
            },
        };

        let Some(resp) = response else {
            return result.map_err(ProcessError::Device);
        };
        if result.is_err() && !self.config.flags.error_response {
            return result.map_err(ProcessError::Device);
        }

        let delay_ms = self.response_delay(jitter);
        self.driver.send(&resp, delay_ms).map_err(ProcessError::Driver)?;
        self.system.sent.total = self.system.sent.total.wrapping_add(1);

        if resp.is_telemetry_response() {
            self.clear_telemetry_trigger(resp.id.endpoint);
            if self.config.flags.telemetry_periodic_enabled
                && resp.id.endpoint == self.config.flags.telemetry_endpoint
            {
                self.system.last_telemetry = self.system.time;
                self.system.last_telemetry_ms = now_ms;
            }
        }

        result.map_err(ProcessError::Device)
    }

    /// Milliseconds until `process()` has scheduled work again, for the
    /// embedding loop's sleep. `None` when only bus traffic can create work.
    pub fn time_until_next_process(&mut self) -> Option<u32> {
        if !self.flags.startup_attrs_done {
            return Some(0);
        }
        if self.prepare_config_read().is_err() {
            return Some(CONFIG_RETRY_DELAY_MS);
        }
        if !self.config.flags.telemetry_periodic_enabled {
            return None;
        }
        let now_ms = self.driver.get_time().millis_total();
        let elapsed = now_ms.wrapping_sub(self.system.last_telemetry_ms);
        Some(self.config.telemetry.period_ms.saturating_sub(elapsed))
    }

    //==============================================================================STARTUP_ATTRS
    /// Produce the next unsolicited startup attribute response, one per
    /// idle cycle. Attribute-level failures skip the entry; transient
    /// failures (configuration reload) leave the cursor for a retry.
    fn next_startup_attribute(&mut self) -> Option<Frame> {
        let key = self.startup_attrs[self.startup_cursor];
        let frame = match self.attribute_request(Endpoint::App, key, None) {
            Ok(resp) => Some(resp),
            Err(err) if err.is_attribute_error() => {
                #[cfg(feature = "defmt")]
                defmt::warn!("startup: attribute {=u16:#x} skipped", key);
                None
            }
            Err(_) => return None,
        };
        self.startup_cursor += 1;
        if self.startup_cursor >= self.startup_attrs.len() {
            self.flags.startup_attrs_done = true;
        }
        frame
    }

    //==============================================================================DELAY
    /// Delay before a response leaves the device. Zero except for broadcast
    /// responses, which spread over the configured jitter window so the bus
    /// does not collapse under simultaneous answers.
    ///
    /// The spread is deliberately gated on the `telemetry_delay_rdm`
    /// configuration flag rather than applied to every broadcast, so an
    /// installation can opt out of randomized delays at runtime.
    fn response_delay(&mut self, jitter: bool) -> u32 {
        if !jitter {
            return 0;
        }
        let mut buf = [0u8; 2];
        self.driver.entropy(&mut buf);
        let rdm = u16::from_le_bytes(buf) as u32;

        let min = self.config.telemetry.delay_min_ms as u32;
        let max = self.config.telemetry.delay_max_ms as u32;
        min + rdm % max.saturating_sub(min).max(1)
    }

    /// Highest-priority endpoint with a pending telemetry trigger.
    fn pending_telemetry_endpoint(&self) -> Option<Endpoint> {
        Endpoint::PRIORITY_ORDER
            .into_iter()
            .find(|ep| self.triggered_telemetry(*ep))
    }
}
