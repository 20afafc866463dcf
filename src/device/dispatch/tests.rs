//! Unit tests for the request dispatcher, driven through scripted mocks.
use crate::device::mock::*;
use crate::error::DeviceError;
use crate::protocol::control::SystemCommand;
use crate::protocol::frame::Frame;
use crate::protocol::id::{Direction, Endpoint, FrameId, FrameType};

//==================================================================================COMMANDS
#[test]
fn test_command_without_handler() {
    let mut device = make_device(MockApi::default());
    let req = Frame::query_command(device.did(), Endpoint::App, &[0x01]);

    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::NoCommandHandler));

    let resp = resp.unwrap();
    assert!(resp.is_error());
    assert_eq!(resp.id.frame_type, FrameType::Command);
    assert_eq!(resp.len, 4);
    assert_eq!(
        resp.error_code().unwrap(),
        DeviceError::NoCommandHandler.code()
    );
    assert_eq!(
        device.system.last_command_error,
        DeviceError::NoCommandHandler.code()
    );
}

#[test]
/// A successful command answers with fresh telemetry for the same endpoint.
fn test_command_success_returns_telemetry() {
    let mut api = telemetry_api(&[0xAA, 0xBB]);
    api.command_outcome = Some(Ok(()));
    let mut device = make_device(api);

    let req = Frame::query_command(device.did(), Endpoint::Endpoint1, &[0x42, 0x43]);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));

    let resp = resp.unwrap();
    assert!(resp.is_telemetry_response());
    assert_eq!(resp.id.endpoint, Endpoint::Endpoint1);
    assert_eq!(resp.payload(), &[0xAA, 0xBB]);

    let (endpoint, data, len) = device.api_mut().last_command.unwrap();
    assert_eq!(endpoint, Endpoint::Endpoint1);
    assert_eq!(&data[..len], &[0x42, 0x43]);
    assert_eq!(device.system.last_command_error, 0);
    assert_eq!(device.system.received.command, 1);
    assert_eq!(device.system.sent.telemetry, 1);
}

#[test]
/// A full board-control command carries the system control byte last, and
/// its sub-commands run in priority order before the handler.
fn test_board_control_system_byte() {
    let mut api = telemetry_api(&[]);
    api.command_outcome = Some(Ok(()));
    let mut device = make_device(api);

    // config_reset + reset + watchdog on
    let payload = [0, 0, 0, 0, 0, 0, 0, 0b0010_1001];
    let req = Frame::query_command(device.did(), Endpoint::BoardControl, &payload);
    let (result, _) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));

    let api = device.api_mut();
    assert_eq!(api.system_command_count, 3);
    assert_eq!(api.system_commands[0], Some(SystemCommand::ConfigReset));
    assert_eq!(api.system_commands[1], Some(SystemCommand::WatchdogEnable));
    assert_eq!(api.system_commands[2], Some(SystemCommand::Reset));
    assert!(api.last_command.is_some());
}

#[test]
/// System command dispatch stops at the first failure, before the command
/// handler runs.
fn test_system_command_failure_aborts() {
    let mut api = telemetry_api(&[]);
    api.command_outcome = Some(Ok(()));
    api.system_command_fail_on = Some(SystemCommand::WatchdogEnable);
    let mut device = make_device(api);

    let payload = [0, 0, 0, 0, 0, 0, 0, 0b0010_1001];
    let req = Frame::query_command(device.did(), Endpoint::BoardControl, &payload);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::Application(-2)));
    assert!(resp.unwrap().is_error());

    let api = device.api_mut();
    assert_eq!(api.system_commands[0], Some(SystemCommand::ConfigReset));
    assert_eq!(api.system_command_count, 1);
    assert!(api.last_command.is_none());
}

#[test]
/// A short board-control command has no system byte to dissect.
fn test_short_board_control_command() {
    let mut api = telemetry_api(&[]);
    api.command_outcome = Some(Ok(()));
    let mut device = make_device(api);

    let req = Frame::query_command(device.did(), Endpoint::BoardControl, &[0xFF]);
    let (result, _) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));
    assert_eq!(device.api_mut().system_command_count, 0);
}

//==================================================================================TELEMETRY
#[test]
fn test_telemetry_query() {
    let mut device = make_device(telemetry_api(&[1, 2, 3, 4]));
    let req = Frame::query_telemetry(device.did(), Endpoint::Endpoint2);

    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));

    let resp = resp.unwrap();
    assert!(resp.is_telemetry_response());
    assert_eq!(resp.id.endpoint, Endpoint::Endpoint2);
    assert_eq!(resp.payload(), &[1, 2, 3, 4]);
    assert_eq!(device.system.received.request_telemetry, 1);
    assert_eq!(device.system.last_telemetry_error, 0);
}

#[test]
fn test_telemetry_query_without_handler() {
    let mut device = make_device(MockApi::default());
    let req = Frame::query_telemetry(device.did(), Endpoint::App);

    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::NoTelemetryHandler));

    // Telemetry errors come back under the command type.
    let resp = resp.unwrap();
    assert!(resp.is_error());
    assert_eq!(resp.id.frame_type, FrameType::Command);
    assert_eq!(
        device.system.last_telemetry_error,
        DeviceError::NoTelemetryHandler.code()
    );
}

//==================================================================================ATTRIBUTES
#[test]
fn test_read_attribute_echoes_key() {
    let mut device = make_device(MockApi::default());

    // Fresh device: uptime starts at zero.
    let req = Frame::query_read_attribute(device.did(), 0x1020);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));
    assert_eq!(resp.unwrap().attr_value().unwrap(), 0);

    device.system.uptime = 777;
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));

    let resp = resp.unwrap();
    assert_eq!(resp.id.frame_type, FrameType::ReadAttribute);
    assert_eq!(resp.id.direction, Direction::Response);
    assert_eq!(resp.len, 6);
    assert_eq!(resp.attr_key().unwrap(), 0x1020);
    assert_eq!(resp.attr_value().unwrap(), 777);
}

#[test]
/// The first configuration access reloads the RAM cache, later ones do not.
fn test_config_read_reloads_once() {
    let mut device = make_device(MockApi::default());

    let req = Frame::query_read_attribute(device.did(), 0x2000);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));
    assert_eq!(resp.unwrap().attr_value().unwrap(), 60_000);
    assert_eq!(device.api_mut().config_reads, 1);

    let (result, _) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));
    assert_eq!(device.api_mut().config_reads, 1);
}

#[test]
/// A failing reload hook surfaces as `ConfigReloadFailed` and keeps the
/// cache dirty for a retry.
fn test_config_reload_failure() {
    let mut api = MockApi::default();
    api.config_read_fail = true;
    let mut device = make_device(api);

    let req = Frame::query_read_attribute(device.did(), 0x2000);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::ConfigReloadFailed));
    assert_eq!(resp.unwrap().error_arg(), Some(0x2000));

    device.api_mut().config_read_fail = false;
    let (result, _) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));
    assert_eq!(device.api_mut().config_reads, 2);
}

#[test]
/// A configuration write persists through the hook and echoes the stored
/// value back.
fn test_write_attribute_config() {
    let mut device = make_device(MockApi::default());

    let req = Frame::query_write_attribute(device.did(), 0x2000, 5_000);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));

    let resp = resp.unwrap();
    assert_eq!(resp.attr_key().unwrap(), 0x2000);
    assert_eq!(resp.attr_value().unwrap(), 5_000);
    assert_eq!(device.config.telemetry.period_ms, 5_000);
    assert_eq!(device.api_mut().config_writes, 1);
}

#[test]
fn test_write_readonly_attribute() {
    let mut device = make_device(MockApi::default());

    // uptime is read-only
    let req = Frame::query_write_attribute(device.did(), 0x1020, 1);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::ReadOnlyAttribute));

    let resp = resp.unwrap();
    assert_eq!(resp.id.frame_type, FrameType::WriteAttribute);
    assert_eq!(resp.len, 8);
    assert_eq!(resp.error_arg(), Some(0x1020));

    // identification is read-only as a whole section
    let req = Frame::query_write_attribute(device.did(), 0x0010, 1);
    let (result, _) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::ReadOnlyAttribute));
}

#[test]
/// The test device is class 1: class-0 attributes are out of scope, class-1
/// attributes resolve.
fn test_class_scoped_attributes() {
    let mut device = make_device(MockApi::default());

    let req = Frame::query_read_attribute(device.did(), 0x2070);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::ClassMismatch));
    assert_eq!(resp.unwrap().error_arg(), Some(0x2070));

    let req = Frame::query_write_attribute(device.did(), 0x2210, 0x0F);
    let (result, _) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));
    assert_eq!(device.config.class1.directions, 0x0F);
}

#[test]
fn test_resolution_errors_carry_key() {
    let mut device = make_device(MockApi::default());

    for (key, expected) in [
        (0x4000u16, DeviceError::UnknownSection),
        (0x0050, DeviceError::UnknownAttribute),
        (0x1011, DeviceError::InvalidPart),
    ] {
        let req = Frame::query_read_attribute(device.did(), key);
        let (result, resp) = device.handle_rx_frame(&req);
        assert_eq!(result, Err(expected));
        let resp = resp.unwrap();
        assert_eq!(resp.error_code().unwrap(), expected.code());
        assert_eq!(resp.error_arg(), Some(key as u32));
    }
}

#[test]
/// Truncated attribute payloads fail with a bare malformed-frame error,
/// no key argument.
fn test_malformed_attribute_payloads() {
    let mut device = make_device(MockApi::default());

    let mut req = Frame::new(FrameId::new(
        FrameType::ReadAttribute,
        Direction::Query,
        device.did(),
        Endpoint::App,
    ));
    req.len = 1;
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::MalformedFrame));
    let resp = resp.unwrap();
    assert_eq!(resp.len, 4);
    assert_eq!(resp.error_arg(), None);

    // key present but value missing on a write
    let mut req = Frame::query_write_attribute(device.did(), 0x2000, 0);
    req.len = 4;
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::MalformedFrame));
    assert_eq!(resp.unwrap().error_arg(), None);
}

#[test]
/// Keys outside the static tables route to the application; declining them
/// surfaces the original resolution error.
fn test_custom_attributes() {
    let mut api = MockApi::default();
    api.custom_attr = Some((0x5000, 42));
    let mut device = make_device(api);

    let req = Frame::query_read_attribute(device.did(), 0x5000);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));
    assert_eq!(resp.unwrap().attr_value().unwrap(), 42);

    let req = Frame::query_write_attribute(device.did(), 0x5000, 99);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));
    assert_eq!(resp.unwrap().attr_value().unwrap(), 99);

    // Unsupported custom key: the resolver's verdict wins.
    let req = Frame::query_read_attribute(device.did(), 0x5010);
    let (result, _) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::UnknownSection));
}

//==================================================================================TIME
#[test]
/// Writing the time attribute realigns the clock and shifts every anchor by
/// the same delta.
fn test_time_write_realigns_anchors() {
    let mut device = make_device(MockApi::default());
    device.driver_mut().now.secs = 2_000;
    device.system.last_telemetry = 1_990;
    device.system.last_telemetry_ms = 1_990_000;

    let req = Frame::query_write_attribute(device.did(), 0x1010, 1_000_000);
    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Ok(()));
    assert_eq!(resp.unwrap().attr_value().unwrap(), 1_000_000);

    assert_eq!(device.driver_mut().now.secs, 1_000_000);
    assert_eq!(device.system.time, 1_000_000);
    // start_time was 1_000, shifted by the same 998_000 delta.
    assert_eq!(device.system.start_time, 999_000);
    assert_eq!(device.system.last_telemetry, 999_990);
    assert_eq!(device.system.last_telemetry_ms, 999_990_000);
    assert_eq!(device.system.uptime_synced, 1_000);
    assert!(device.time_synced());
}

//==================================================================================DIRECTION
#[test]
fn test_non_query_frames_get_no_response() {
    let mut device = make_device(telemetry_api(&[]));
    let mut req = Frame::query_telemetry(device.did(), Endpoint::App);
    req.id.direction = Direction::Response;

    let (result, resp) = device.handle_rx_frame(&req);
    assert_eq!(result, Err(DeviceError::InvalidDirection));
    assert!(resp.is_none());
    assert_eq!(device.system.received.total, 0);
}
