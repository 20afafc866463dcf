/// Test doubles to simulate the CAN bus, clock, and board application
/// during integration tests.
use caniot_device::device::config::DeviceConfig;
use caniot_device::device::traits::api::DeviceApi;
use caniot_device::device::traits::driver::{CanIotDriver, Timestamp};
use caniot_device::device::Identification;
use caniot_device::error::DeviceError;
use caniot_device::protocol::control::SystemCommand;
use caniot_device::protocol::frame::{Frame, MAX_PAYLOAD};
use caniot_device::protocol::id::{DeviceId, Endpoint};
use std::collections::VecDeque;

/// Class 0, sub-id 3: a garage-door style board.
pub static BENCH_IDENT: Identification = Identification {
    did: DeviceId::new(0, 3),
    version: 0x0101,
    name: *b"bench-device\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0",
    magic_number: 0xCAFE_F00D,
    features: 0x1,
};

#[allow(dead_code)]
/// In-memory CAN bus with a controllable clock, seen from the device side.
pub struct SimBus {
    /// Frames the host "sent" to the device.
    pub rx: VecDeque<Frame>,
    /// Frames the device sent, with their transmit delay.
    pub tx: VecDeque<(Frame, u32)>,
    pub now: Timestamp,
    /// Scripted entropy, little-endian.
    pub entropy: u16,
}

#[allow(dead_code)]
impl SimBus {
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            tx: VecDeque::new(),
            now: Timestamp::new(100_000, 0),
            entropy: 0,
        }
    }

    /// Host-side send: queue a frame for the device to receive.
    pub fn host_send(&mut self, frame: Frame) {
        self.rx.push_back(frame);
    }

    /// Host-side receive: next frame the device emitted.
    pub fn host_recv(&mut self) -> Option<(Frame, u32)> {
        self.tx.pop_front()
    }

    pub fn advance_ms(&mut self, ms: u32) {
        let total = self.now.millis as u32 + ms;
        self.now.secs += total / 1000;
        self.now.millis = (total % 1000) as u16;
    }
}

impl CanIotDriver for SimBus {
    type Error = ();

    fn recv(&mut self) -> Result<Option<Frame>, ()> {
        Ok(self.rx.pop_front())
    }

    fn send(&mut self, frame: &Frame, delay_ms: u32) -> Result<(), ()> {
        self.tx.push_back((frame.clone(), delay_ms));
        Ok(())
    }

    fn get_time(&mut self) -> Timestamp {
        self.now
    }

    fn set_time(&mut self, secs: u32) {
        self.now = Timestamp::new(secs, 0);
    }

    fn entropy(&mut self, buf: &mut [u8]) {
        let bytes = self.entropy.to_le_bytes();
        for (i, b) in buf.iter_mut().enumerate() {
            *b = bytes[i % 2];
        }
    }
}

#[allow(dead_code)]
#[derive(Default)]
/// Board application: a byte of outputs, persisted configuration, and a
/// reset counter.
pub struct BenchApp {
    pub outputs: u8,
    pub stored_config: Option<DeviceConfig>,
    pub resets: u32,
}

impl DeviceApi for BenchApp {
    fn command(&mut self, _endpoint: Endpoint, payload: &[u8]) -> Result<(), DeviceError> {
        if let Some(&first) = payload.first() {
            self.outputs = first;
        }
        Ok(())
    }

    fn telemetry(
        &mut self,
        endpoint: Endpoint,
        buf: &mut [u8; MAX_PAYLOAD],
    ) -> Result<usize, DeviceError> {
        buf[0] = self.outputs;
        buf[1] = endpoint as u8;
        Ok(2)
    }

    fn config_on_read(&mut self, config: &mut DeviceConfig) -> Result<(), DeviceError> {
        if let Some(stored) = self.stored_config {
            *config = stored;
        }
        Ok(())
    }

    fn config_on_write(&mut self, config: &DeviceConfig) -> Result<(), DeviceError> {
        self.stored_config = Some(*config);
        Ok(())
    }

    fn system_command(&mut self, command: SystemCommand) -> Result<(), DeviceError> {
        if command == SystemCommand::Reset {
            self.resets += 1;
        }
        Ok(())
    }
}
