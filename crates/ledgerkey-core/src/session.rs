//! Connect, run one login or logout, and always disconnect.

use tracing::{debug, warn};

use crate::api::SessionClient;
use crate::auth::{LoginFlow, Outcome, PasswordReader, TokenStore};
use crate::config::ConnectionOptions;
use crate::error::SessionError;

/// A command that needs an open session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Login { username: String },
    Logout,
}

/// Run `command` inside a session opened from `options`.
///
/// The session is released on every path once connect succeeded. A
/// command error takes precedence over a disconnect error.
pub async fn run_session_command<C, R>(
    client: &C,
    options: &ConnectionOptions,
    reader: &R,
    command: SessionCommand,
) -> Result<Outcome, SessionError>
where
    C: SessionClient,
    R: PasswordReader,
{
    let session = client
        .connect(options)
        .await
        .map_err(SessionError::Connection)?;
    debug!(address = %options.address, port = options.port, "Session open");

    let flow = LoginFlow::new(client, reader, TokenStore::new(&options.token_file));
    let result = match command {
        SessionCommand::Login { ref username } => flow.login(&session, username).await,
        SessionCommand::Logout => flow.logout(),
    };

    let released = client
        .disconnect(session)
        .await
        .map_err(SessionError::Connection);

    match (result, released) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(disconnect_err)) => {
            warn!(error = %disconnect_err, "Disconnect failed after command error");
            Err(err)
        }
    }
}
