//! Test doubles for the token store and banking API.

pub mod mocks;

pub use mocks::{MockBankingApi, MockConfig, MockTokenStore};
