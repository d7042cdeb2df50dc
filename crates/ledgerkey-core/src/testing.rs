//! In-memory doubles for the session client and password reader.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;

use crate::api::{ApiError, SessionClient};
use crate::auth::{Password, PasswordReader, Token};
use crate::config::ConnectionOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Login { username: Vec<u8>, password: Vec<u8> },
    Disconnect,
}

/// Records every call and answers logins from a script.
#[derive(Default)]
pub struct ScriptedClient {
    pub calls: RefCell<Vec<Call>>,
    logins: RefCell<VecDeque<Result<Token, ApiError>>>,
    connect_error: RefCell<Option<ApiError>>,
    disconnect_error: RefCell<Option<ApiError>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_login(self, result: Result<Token, ApiError>) -> Self {
        self.logins.borrow_mut().push_back(result);
        self
    }

    pub fn failing_connect(self, err: ApiError) -> Self {
        *self.connect_error.borrow_mut() = Some(err);
        self
    }

    pub fn failing_disconnect(self, err: ApiError) -> Self {
        *self.disconnect_error.borrow_mut() = Some(err);
        self
    }

    pub fn logins(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Login { username, password } => Some((username.clone(), password.clone())),
                _ => None,
            })
            .collect()
    }
}

impl SessionClient for ScriptedClient {
    type Session = ();

    async fn connect(&self, _options: &ConnectionOptions) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(Call::Connect);
        match self.connect_error.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn login(&self, _session: &(), username: &[u8], password: &[u8]) -> Result<Token, ApiError> {
        self.calls.borrow_mut().push(Call::Login {
            username: username.to_vec(),
            password: password.to_vec(),
        });
        self.logins
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::ServerError("unscripted login".to_string())))
    }

    async fn disconnect(&self, _session: ()) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(Call::Disconnect);
        match self.disconnect_error.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Returns a fixed password, or an I/O error when none is set.
pub struct CannedReader {
    password: Option<&'static str>,
    pub prompts: RefCell<Vec<String>>,
    pub reads: Cell<usize>,
}

impl CannedReader {
    pub fn with(password: &'static str) -> Self {
        Self {
            password: Some(password),
            prompts: RefCell::new(Vec::new()),
            reads: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            password: None,
            prompts: RefCell::new(Vec::new()),
            reads: Cell::new(0),
        }
    }
}

impl PasswordReader for CannedReader {
    fn read(&self, prompt: &str) -> io::Result<Password> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.reads.set(self.reads.get() + 1);
        match self.password {
            Some(password) => Ok(Password::from(password.to_string())),
            None => Err(io::Error::new(io::ErrorKind::Interrupted, "read interrupted")),
        }
    }
}

pub fn first_admin(credentials: &str) -> ApiError {
    ApiError::FirstAdminLogin {
        credentials: credentials.to_string(),
    }
}
