//! Remote REST API access
//!
//! The gateway resolves an entity to its endpoint, renders the URL, attaches
//! the bearer token and returns the decoded JSON body.

pub mod gateway;

pub use gateway::ApiGateway;
