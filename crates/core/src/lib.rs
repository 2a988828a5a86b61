//! # restsync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The endpoint registry and URL template handling
//! - Port interfaces (traits) for token, gateway and storage adapters
//! - The entity synchronizer that drives a run
//!
//! ## Architecture Principles
//! - Only depends on `restsync-domain`
//! - No database or HTTP code
//! - All external dependencies via traits

pub mod clock;
pub mod ports;
pub mod registry;
pub mod synchronizer;
pub mod template;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ports::{AccessTokenProvider, EntityGateway, RefreshStateStore, UpsertStore};
pub use registry::EndpointRegistry;
pub use synchronizer::EntitySynchronizer;
pub use template::PathParams;
