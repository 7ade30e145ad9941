use std::collections::HashSet;
use std::sync::RwLock;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StoreError;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Single-account admin gate with in-memory bearer tokens.
///
/// Tokens live until the process exits.
pub struct AdminAuth {
    username: String,
    password: String,
    tokens: RwLock<HashSet<String>>,
}

impl AdminAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            tokens: RwLock::new(HashSet::new()),
        }
    }

    /// Check credentials and issue a fresh token.
    pub fn login(&self, username: &str, password: &str) -> Result<String, StoreError> {
        if username.trim() != self.username || password != self.password {
            tracing::warn!(username = %username.trim(), "Rejected admin login");
            return Err(StoreError::InvalidCredentials);
        }
        let token = Uuid::new_v4().simple().to_string();
        self.tokens
            .write()
            .map_err(|_| StoreError::Database(anyhow::anyhow!("token store poisoned")))?
            .insert(token.clone());
        tracing::info!(username = %self.username, "Admin logged in");
        Ok(token)
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.tokens
            .read()
            .map(|tokens| tokens.contains(token))
            .unwrap_or(false)
    }

    /// Require `Authorization: Bearer <token>` with an issued token.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), StoreError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(StoreError::Unauthorized)?;
        if self.is_valid(token) {
            Ok(())
        } else {
            Err(StoreError::Unauthorized)
        }
    }
}
