//! Client address resolution for security logging.

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

/// Whether `X-Forwarded-For` may be trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProxyMode {
    /// Use the socket peer address.
    #[default]
    Direct,
    /// The server sits behind a reverse proxy that sets `X-Forwarded-For`.
    BehindProxy,
}

impl ProxyMode {
    /// Maps the `server.behind_proxy` flag.
    #[must_use]
    pub fn from_flag(behind_proxy: bool) -> Self {
        if behind_proxy {
            Self::BehindProxy
        } else {
            Self::Direct
        }
    }
}

/// Best-effort address of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    /// Resolves the caller address from request parts.
    ///
    /// Behind a proxy the first `X-Forwarded-For` entry wins; otherwise the
    /// peer address recorded by `into_make_service_with_connect_info` is
    /// used. Falls back to `unknown`.
    #[must_use]
    pub fn resolve(parts: &Parts, mode: ProxyMode) -> Self {
        if mode == ProxyMode::BehindProxy
            && let Some(ip) = forwarded_for(&parts.headers)
        {
            return Self(ip);
        }

        match parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => Self(addr.ip().to_string()),
            None => Self("unknown".to_string()),
        }
    }
}

impl fmt::Display for ClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
    ProxyMode: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::resolve(parts, ProxyMode::from_ref(state)))
    }
}

/// First entry of `X-Forwarded-For` ("client, proxy1, proxy2").
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(ToString::to_string)
}
