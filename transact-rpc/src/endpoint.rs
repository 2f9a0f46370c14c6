//! Where and how to reach the node.
//!
//! An [`RpcEndpoint`] is parsed from a service URL of the form
//! `http[s]://user:password@host:port`. The credentials are split off the
//! URL and sent as HTTP Basic authentication; the request target is the bare
//! `scheme://host:port/`.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use transact::error::TransportError;
use url::Url;

use crate::constants::{DEFAULT_RPC_PORT, DEFAULT_TIMEOUT};

/// Trusted root certificates for `https` endpoints.
#[derive(Clone)]
pub struct TlsContext {
    roots: Vec<reqwest::Certificate>,
}

impl TlsContext {
    /// Parses one or more PEM-encoded certificates.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the bundle is malformed or empty.
    pub fn from_pem(pem: &[u8]) -> Result<Self, TransportError> {
        let roots = reqwest::Certificate::from_pem_bundle(pem)
            .map_err(|e| TransportError::new(format!("invalid PEM certificate bundle: {e}")))?;
        if roots.is_empty() {
            return Err(TransportError::new("PEM bundle contains no certificates"));
        }
        Ok(Self { roots })
    }

    /// Reads a PEM bundle from disk.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the file cannot be read or parsed.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| {
            TransportError::new(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_pem(&pem)
    }

    /// Number of trusted roots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Always `false` for a successfully built context.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub(crate) fn roots(&self) -> &[reqwest::Certificate] {
        &self.roots
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("roots", &self.roots.len())
            .finish()
    }
}

/// Address, credentials and transport settings of a node's RPC interface.
#[derive(Clone)]
pub struct RpcEndpoint {
    url: Url,
    host: String,
    port: u16,
    user: String,
    password: String,
    timeout: Duration,
    tls: Option<TlsContext>,
}

impl RpcEndpoint {
    /// Parses `http[s]://user:password@host[:port]`. A missing port defaults
    /// to 8332.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for malformed URLs, schemes other than
    /// `http`/`https`, or a missing host.
    pub fn parse(service_url: &str) -> Result<Self, TransportError> {
        let parsed = Url::parse(service_url)
            .map_err(|e| TransportError::new(format!("invalid service URL: {e}")))?;
        let secure = match parsed.scheme() {
            "http" => false,
            "https" => true,
            other => {
                return Err(TransportError::new(format!(
                    "unsupported service URL scheme '{other}'"
                )));
            }
        };
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TransportError::new("service URL has no host"))?
            .to_owned();
        let port = parsed.port().unwrap_or(DEFAULT_RPC_PORT);

        Self::build(
            secure,
            host,
            port,
            parsed.username().to_owned(),
            parsed.password().unwrap_or_default().to_owned(),
        )
    }

    /// Plain-HTTP endpoint from its parts. Credentials are taken verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if `host` is not a valid host name.
    pub fn new(
        host: &str,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, TransportError> {
        Self::build(false, host.to_owned(), port, user.into(), password.into())
    }

    fn build(
        secure: bool,
        host: String,
        port: u16,
        user: String,
        password: String,
    ) -> Result<Self, TransportError> {
        let scheme = if secure { "https" } else { "http" };
        // IPv6 literals need brackets inside a URL authority.
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host
        };
        let url = Url::parse(&format!("{scheme}://{host}:{port}/"))
            .map_err(|e| TransportError::new(format!("invalid endpoint '{host}:{port}': {e}")))?;
        Ok(Self {
            url,
            host,
            port,
            user,
            password,
            timeout: DEFAULT_TIMEOUT,
            tls: None,
        })
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Trusts `tls` roots on `https` connections. Ignored for `http`.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsContext) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Request target, without credentials.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, as sent in the `Host` header.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// RPC user name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Trusted roots for `https`.
    #[must_use]
    pub const fn tls(&self) -> Option<&TlsContext> {
        self.tls.as_ref()
    }

    /// Returns `true` for `https` endpoints.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }
}

impl fmt::Debug for RpcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcEndpoint")
            .field("url", &self.url.as_str())
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("tls", &self.tls)
            .finish()
    }
}
