//! Test doubles for the dispatcher and scheduler unit tests: an in-memory
//! driver with scripted time and entropy, and a recording application.
use crate::device::config::DeviceConfig;
use crate::device::traits::api::DeviceApi;
use crate::device::traits::driver::{CanIotDriver, Timestamp};
use crate::device::{Device, Identification};
use crate::error::DeviceError;
use crate::protocol::control::SystemCommand;
use crate::protocol::frame::{Frame, MAX_PAYLOAD};
use crate::protocol::id::{DeviceId, Endpoint};

pub(crate) const QUEUE: usize = 8;

/// Class 1, sub-id 2.
pub(crate) static TEST_IDENT: Identification = Identification {
    did: DeviceId::new(1, 2),
    version: 0x0100,
    name: [0; 32],
    magic_number: 0x1234_5678,
    features: 0,
};

//==================================================================================DRIVER
pub(crate) struct MockDriver {
    rx: [Option<Frame>; QUEUE],
    rx_read: usize,
    rx_write: usize,
    sent: [Option<(Frame, u32)>; QUEUE],
    sent_read: usize,
    sent_write: usize,
    pub now: Timestamp,
    /// Value returned verbatim by `entropy()`, little-endian.
    pub entropy_value: u16,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            rx: core::array::from_fn(|_| None),
            rx_read: 0,
            rx_write: 0,
            sent: core::array::from_fn(|_| None),
            sent_read: 0,
            sent_write: 0,
            now: Timestamp::new(1_000, 0),
            entropy_value: 0,
        }
    }

    pub fn push_rx(&mut self, frame: Frame) {
        self.rx[self.rx_write % QUEUE] = Some(frame);
        self.rx_write += 1;
    }

    pub fn take_sent(&mut self) -> Option<(Frame, u32)> {
        if self.sent_read == self.sent_write {
            return None;
        }
        let entry = self.sent[self.sent_read % QUEUE].take();
        self.sent_read += 1;
        entry
    }

    pub fn sent_count(&self) -> usize {
        self.sent_write - self.sent_read
    }

    pub fn advance_ms(&mut self, ms: u32) {
        let total = self.now.millis as u32 + ms;
        self.now.secs += total / 1000;
        self.now.millis = (total % 1000) as u16;
    }
}

impl CanIotDriver for MockDriver {
    type Error = ();

    fn recv(&mut self) -> Result<Option<Frame>, ()> {
        if self.rx_read == self.rx_write {
            return Ok(None);
        }
        let frame = self.rx[self.rx_read % QUEUE].take();
        self.rx_read += 1;
        Ok(frame)
    }

    fn send(&mut self, frame: &Frame, delay_ms: u32) -> Result<(), ()> {
        self.sent[self.sent_write % QUEUE] = Some((frame.clone(), delay_ms));
        self.sent_write += 1;
        Ok(())
    }

    fn get_time(&mut self) -> Timestamp {
        self.now
    }

    fn set_time(&mut self, secs: u32) {
        self.now = Timestamp::new(secs, 0);
    }

    fn entropy(&mut self, buf: &mut [u8]) {
        let bytes = self.entropy_value.to_le_bytes();
        for (i, b) in buf.iter_mut().enumerate() {
            *b = bytes[i % 2];
        }
    }
}

//==================================================================================API
#[derive(Default)]
pub(crate) struct MockApi {
    /// `None` keeps the trait default (no handler registered).
    pub command_outcome: Option<Result<(), DeviceError>>,
    pub last_command: Option<(Endpoint, [u8; MAX_PAYLOAD], usize)>,
    pub telemetry_outcome: Option<Result<(), DeviceError>>,
    pub telemetry_payload: [u8; MAX_PAYLOAD],
    pub telemetry_len: usize,
    pub system_commands: [Option<SystemCommand>; QUEUE],
    pub system_command_count: usize,
    pub system_command_fail_on: Option<SystemCommand>,
    pub config_read_fail: bool,
    pub config_reads: u32,
    pub config_writes: u32,
    /// Single application-defined attribute, when supported.
    pub custom_attr: Option<(u16, u32)>,
}

impl DeviceApi for MockApi {
    fn command(&mut self, endpoint: Endpoint, payload: &[u8]) -> Result<(), DeviceError> {
        match self.command_outcome {
            None => Err(DeviceError::NoCommandHandler),
            Some(outcome) => {
                let mut data = [0u8; MAX_PAYLOAD];
                data[..payload.len()].copy_from_slice(payload);
                self.last_command = Some((endpoint, data, payload.len()));
                outcome
            }
        }
    }

    fn telemetry(
        &mut self,
        _endpoint: Endpoint,
        buf: &mut [u8; MAX_PAYLOAD],
    ) -> Result<usize, DeviceError> {
        match self.telemetry_outcome {
            None => Err(DeviceError::NoTelemetryHandler),
            Some(Err(err)) => Err(err),
            Some(Ok(())) => {
                buf[..self.telemetry_len].copy_from_slice(&self.telemetry_payload[..self.telemetry_len]);
                Ok(self.telemetry_len)
            }
        }
    }

    fn config_on_read(&mut self, _config: &mut DeviceConfig) -> Result<(), DeviceError> {
        self.config_reads += 1;
        if self.config_read_fail {
            return Err(DeviceError::Application(-1));
        }
        Ok(())
    }

    fn config_on_write(&mut self, _config: &DeviceConfig) -> Result<(), DeviceError> {
        self.config_writes += 1;
        Ok(())
    }

    fn custom_attr_read(&mut self, key: u16) -> Result<u32, DeviceError> {
        match self.custom_attr {
            Some((k, v)) if k == key => Ok(v),
            _ => Err(DeviceError::CustomAttributeUnsupported),
        }
    }

    fn custom_attr_write(&mut self, key: u16, value: u32) -> Result<(), DeviceError> {
        match &mut self.custom_attr {
            Some((k, v)) if *k == key => {
                *v = value;
                Ok(())
            }
            _ => Err(DeviceError::CustomAttributeUnsupported),
        }
    }

    fn system_command(&mut self, command: SystemCommand) -> Result<(), DeviceError> {
        if self.system_command_fail_on == Some(command) {
            return Err(DeviceError::Application(-2));
        }
        self.system_commands[self.system_command_count % QUEUE] = Some(command);
        self.system_command_count += 1;
        Ok(())
    }
}

//==================================================================================BUILDERS
pub(crate) fn telemetry_api(payload: &[u8]) -> MockApi {
    let mut api = MockApi::default();
    api.telemetry_outcome = Some(Ok(()));
    api.telemetry_payload[..payload.len()].copy_from_slice(payload);
    api.telemetry_len = payload.len();
    api
}

pub(crate) fn make_device(api: MockApi) -> Device<'static, MockDriver, MockApi> {
    make_device_with(api, &[])
}

pub(crate) fn make_device_with(
    api: MockApi,
    startup_attrs: &'static [u16],
) -> Device<'static, MockDriver, MockApi> {
    let mut device = Device::new(
        &TEST_IDENT,
        DeviceConfig::default(),
        MockDriver::new(),
        api,
        startup_attrs,
    );
    device.init();
    device
}
