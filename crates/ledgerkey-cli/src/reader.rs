use std::io;

use ledgerkey_core::auth::{Password, PasswordReader};

/// Reads the password from the controlling terminal without echo.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPasswordReader;

impl PasswordReader for TerminalPasswordReader {
    fn read(&self, prompt: &str) -> io::Result<Password> {
        println!("{}", prompt);
        let password = rpassword::read_password()?;
        Ok(Password::from(password))
    }
}
