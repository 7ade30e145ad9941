//! Connection setup shared by the remote admin commands.

use anyhow::{Context, Result};
use std::path::Path;

use lumiere::client::StoreClient;
use lumiere::config::LumiereToml;

use super::super::RemoteArgs;

/// Build an authenticated client: the given token, or a fresh login with
/// the given credentials falling back to the admin section of lumiere.toml.
pub async fn connect(config_path: &Path, remote: &RemoteArgs) -> Result<StoreClient> {
    let mut client = StoreClient::new(remote.url.clone());
    if let Some(token) = remote.token.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(client.with_token(token));
    }

    let settings = LumiereToml::load_or_default(config_path)?;
    let username = remote
        .username
        .clone()
        .unwrap_or_else(|| settings.admin.username.clone());
    let password = remote
        .password
        .clone()
        .unwrap_or_else(|| settings.admin.password.clone());

    client
        .login(&username, &password)
        .await
        .with_context(|| format!("Failed to log in to {} as '{}'", remote.url, username))?;
    tracing::debug!(url = %remote.url, user = %username, "Logged in");
    Ok(client)
}
