//! CANIOT wire layer: 11-bit identifier codec, frame representation and
//! builders, and the board-control system command byte.

pub mod control;
pub mod frame;
pub mod id;
