//! `caniot-device`: device-side implementation of the CANIOT application
//! protocol in a `no_std` environment. The crate exposes the wire codecs
//! (11-bit identifiers, frames, attribute keys), the request dispatcher that
//! turns inbound queries into responses, and the poll-driven scheduler for
//! periodic telemetry and startup attribute delivery.
#![no_std]
//==================================================================================
/// Device runtime: state, attribute tables, dispatcher, and scheduler.
pub mod device;
/// Protocol and process errors, including the signed wire error codes.
pub mod error;
/// Wire-level building blocks: identifier codec, frames, system control byte.
pub mod protocol;
//==================================================================================
