//! Monzo webhook receiver that posts "N hours spent" feed items for each
//! outgoing payment, priced against the account holder's disposable income.

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
