pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod types;

pub use diagnostics::{CounterUpdate, DiagnosticData, DiagnosticsCounters};
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
