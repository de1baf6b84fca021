//! # Dormwatch Providers
//!
//! The Resource Fetcher: [`portal::PortalClient`] talks to the campus e-card
//! portal, [`fetch::fetch`] turns its answers into a [`StatusSnapshot`].
//!
//! [`StatusSnapshot`]: dormwatch_core::types::StatusSnapshot

pub mod fetch;
pub mod portal;

pub use fetch::fetch;
pub use portal::PortalClient;
