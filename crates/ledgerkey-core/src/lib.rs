//! Client-side session lifecycle for the ledger service.
//!
//! A command connects a [`SessionClient`](api::SessionClient), runs the
//! [`LoginFlow`](auth::LoginFlow) for login or logout, and always
//! disconnects afterwards; [`session::run_session_command`] ties the three
//! together.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use error::SessionError;
