//! Mock transport for tests and simulation.
//!
//! Events are scripted through a handle and delivered in order, without any
//! physical reader.

pub mod transport;

pub use transport::{MockTransport, MockTransportHandle};
