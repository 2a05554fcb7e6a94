//! Outbound integration with the SmobilPay (enKap) payment API.

pub mod client;
pub mod error;
