use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

/// Fatal outcomes of a login or logout command.
///
/// Display strings are what the operator sees on stderr.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{0}")]
    Connection(#[source] ApiError),

    #[error(
        "===============\n\
         This looks like the very first admin login attempt, hence the following \
         credentials have been generated:{credentials}\n\
         IMPORTANT: This is the only time they are shown, so make sure you remember them.\n\
         ==============="
    )]
    FirstAdminLogin { credentials: String },

    #[error("{0}")]
    PasswordRead(#[source] io::Error),

    #[error("unauthenticated, please login")]
    Unauthenticated,

    #[error("{0}")]
    Login(#[source] ApiError),

    #[error("Failed to {action} token file {}: {source}", .path.display())]
    TokenStore {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SessionError {
    /// Process exit status for this error
    pub const fn exit_code(&self) -> i32 {
        1
    }
}
