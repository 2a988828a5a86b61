pub mod conversions;

pub use conversions::{to_sync_error, InfraError};
