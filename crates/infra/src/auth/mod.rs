//! Bearer credential lifecycle for the remote API

pub mod credential_manager;
pub mod refresh_store;

pub use credential_manager::CredentialManager;
pub use refresh_store::FileRefreshStateStore;
