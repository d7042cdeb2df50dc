//! Session client for the ledger service.
//!
//! [`SessionClient`] is the seam the login flow is written against.
//! [`HttpSessionClient`] talks to the service's JSON gateway: it opens a
//! transport on connect (checked with a health probe), exchanges
//! credentials for a token on login, and releases the transport on
//! disconnect.

use std::net::{SocketAddr, ToSocketAddrs};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Certificate, Client, Identity, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::auth::Token;
use crate::config::{ConnectionOptions, MtlsOptions};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const HEALTH_PATH: &str = "/health";
const LOGIN_PATH: &str = "/login";

/// Connection lifecycle and login against the remote service.
///
/// `connect` only opens the transport. `disconnect` consumes the session
/// so it cannot be used after release.
#[allow(async_fn_in_trait)]
pub trait SessionClient {
    type Session;

    async fn connect(&self, options: &ConnectionOptions) -> Result<Self::Session, ApiError>;

    /// Empty usernames and passwords are valid and are sent as-is.
    async fn login(
        &self,
        session: &Self::Session,
        username: &[u8],
        password: &[u8],
    ) -> Result<Token, ApiError>;

    async fn disconnect(&self, session: Self::Session) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    user: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// An open transport to the service.
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    base_url: String,
    auth: bool,
}

impl HttpSession {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth
    }
}

/// [`SessionClient`] over the service's HTTP gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSessionClient;

impl HttpSessionClient {
    pub fn new() -> Self {
        Self
    }

    fn build_client(options: &ConnectionOptions) -> Result<(Client, String), ApiError> {
        let mut builder = Client::builder().timeout(options.request_timeout);

        let base_url = match options.mtls {
            Some(ref mtls) => {
                let addr = Self::socket_addr(&options.address, options.port)?;
                builder = builder
                    .use_rustls_tls()
                    .identity(Self::load_identity(mtls)?)
                    .add_root_certificate(Self::load_ca(mtls)?)
                    .tls_built_in_root_certs(false)
                    // Dial the configured address, verify against servername
                    .resolve(&mtls.servername, addr);
                format!("https://{}:{}", mtls.servername, options.port)
            }
            None => format!("http://{}:{}", url_host(&options.address), options.port),
        };

        let client = builder
            .build()
            .map_err(|e| ApiError::Connection(format!("Failed to build HTTP client: {}", e)))?;
        Ok((client, base_url))
    }

    fn socket_addr(address: &str, port: u16) -> Result<SocketAddr, ApiError> {
        (address, port)
            .to_socket_addrs()
            .map_err(|e| ApiError::Connection(format!("Failed to resolve {}: {}", address, e)))?
            .next()
            .ok_or_else(|| ApiError::Connection(format!("No address found for {}", address)))
    }

    fn load_identity(mtls: &MtlsOptions) -> Result<Identity, ApiError> {
        let mut pem = read_pem(&mtls.certificate, "certificate")?;
        pem.push(b'\n');
        pem.extend_from_slice(&read_pem(&mtls.pkey, "private key")?);
        let identity = Identity::from_pem(&pem)
            .map_err(|e| ApiError::Connection(format!("Invalid client identity: {}", e)));
        zeroize::Zeroize::zeroize(&mut pem);
        identity
    }

    fn load_ca(mtls: &MtlsOptions) -> Result<Certificate, ApiError> {
        let pem = read_pem(&mtls.clientcas, "CA bundle")?;
        Certificate::from_pem(&pem)
            .map_err(|e| ApiError::Connection(format!("Invalid CA bundle: {}", e)))
    }

    /// Map non-success responses to [`ApiError`]
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }
}

impl SessionClient for HttpSessionClient {
    type Session = HttpSession;

    async fn connect(&self, options: &ConnectionOptions) -> Result<HttpSession, ApiError> {
        let (client, base_url) = Self::build_client(options)?;
        debug!(url = %base_url, auth = options.auth, mtls = options.mtls.is_some(), "Connecting");

        let response = client
            .get(format!("{}{}", base_url, HEALTH_PATH))
            .send()
            .await
            .map_err(|e| {
                ApiError::Connection(format!(
                    "Failed to connect to {}:{}: {}",
                    options.address, options.port, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Connection(format!(
                "Health check against {} failed with status {}",
                base_url, status
            )));
        }

        if !options.auth {
            warn!("Authentication is disabled for this connection");
        }

        Ok(HttpSession {
            client,
            base_url,
            auth: options.auth,
        })
    }

    async fn login(
        &self,
        session: &HttpSession,
        username: &[u8],
        password: &[u8],
    ) -> Result<Token, ApiError> {
        let user = STANDARD.encode(username);
        let password = Zeroizing::new(STANDARD.encode(password));

        let response = session
            .client
            .post(format!("{}{}", session.base_url, LOGIN_PATH))
            .json(&LoginRequest {
                user: &user,
                password: &password,
            })
            .send()
            .await?;

        let response = Self::check_response(response).await?;

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;
        let token = STANDARD
            .decode(body.token.as_bytes())
            .map_err(|e| ApiError::InvalidResponse(format!("Token is not valid base64: {}", e)))?;

        debug!(token_len = token.len(), "Login accepted");
        Ok(Token::new(token))
    }

    async fn disconnect(&self, session: HttpSession) -> Result<(), ApiError> {
        debug!(url = %session.base_url, "Disconnecting");
        drop(session);
        Ok(())
    }
}

fn read_pem(path: &std::path::Path, what: &str) -> Result<Vec<u8>, ApiError> {
    std::fs::read(path).map_err(|e| {
        ApiError::Connection(format!("Failed to read {} {}: {}", what, path.display(), e))
    })
}

/// Bracket IPv6 literals for use in a URL authority
fn url_host(address: &str) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{}]", address)
    } else {
        address.to_string()
    }
}
