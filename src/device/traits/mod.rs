//! Hardware and application seams of the device engine: the transport/board
//! driver consumed by the scheduler, and the application callback surface
//! invoked by the dispatcher.

pub mod api;
pub mod driver;
