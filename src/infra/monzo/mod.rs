//! Monzo banking provider integration.

pub mod client;

pub use client::{DEFAULT_API_URL, DEFAULT_AUTH_URL, MonzoClient, MonzoConfig};
