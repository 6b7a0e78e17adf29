//! # Kestrel Core
//!
//! Core error definitions, result aliases, and tracing setup shared by
//! every Kestrel crate.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
pub use telemetry::*;
