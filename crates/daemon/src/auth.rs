// SPDX-License-Identifier: MIT

//! The authentication contract (spec §10.5): every inbound HTTP/WS request
//! is resolved to an [`AuthenticatedPrincipal`] before it reaches
//! `SessionManager`. The reference provider trusts identity headers set by
//! a reverse proxy in front of this process; swap in a different
//! `AuthProvider` for a deployment with its own identity system.

use async_trait::async_trait;
use axum::http::HeaderMap;
use chost_core::HostError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedPrincipal {
    pub user_id: String,
    pub email: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedPrincipal, HostError>;
}

/// Trusts `x-user-id` / `x-user-email` headers verbatim. Suitable for a
/// control plane deployed behind a proxy that has already authenticated the
/// caller and injects identity headers; not suitable as a public-internet
/// boundary on its own.
#[derive(Default)]
pub struct HeaderAuthProvider;

#[async_trait]
impl AuthProvider for HeaderAuthProvider {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedPrincipal, HostError> {
        let user_id = headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .ok_or(HostError::Unauthenticated)?;
        let email = headers
            .get("x-user-email")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Ok(AuthenticatedPrincipal {
            user_id: user_id.to_string(),
            email: email.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
