//! Authentication module for logging in and out of the ledger service.
//!
//! This module provides:
//! - `PasswordReader`: the capability used to ask the operator for a secret
//! - `TokenStore`: persistence of the session token at a single path
//! - `LoginFlow`: the login/logout controller, including first-admin detection

pub mod credentials;
pub mod flow;
pub mod token;

pub use credentials::{Credentials, Password, PasswordReader};
pub use flow::{LoginFlow, LoginStage, Outcome, ADMIN_USERNAME, PASSWORD_PROMPT};
pub use token::{Token, TokenStore};
