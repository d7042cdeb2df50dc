//! Client module for the ledger service.
//!
//! This module provides the `SessionClient` trait, its HTTP gateway
//! implementation, and the `ApiError` taxonomy used to tell connection
//! failures, rejected credentials and first-admin provisioning apart.

pub mod client;
pub mod error;

pub use client::{HttpSession, HttpSessionClient, SessionClient};
pub use error::ApiError;
