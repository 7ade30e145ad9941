//! API server command — `lumiere serve`.

use anyhow::Result;
use std::path::{Path, PathBuf};

use lumiere::config::LumiereToml;
use lumiere::storefront::server::{ServerConfig, start_server};

pub async fn cmd_serve(
    config_path: &Path,
    port: Option<u16>,
    host: Option<String>,
    db_path: Option<PathBuf>,
    dev: bool,
) -> Result<()> {
    let settings = LumiereToml::load_or_default(config_path)?.with_env_overrides();
    for warning in settings.validate() {
        tracing::warn!("{}", warning);
    }

    let mut config = ServerConfig::from_toml(&settings);
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(db_path) = db_path {
        config.db_path = db_path;
    }
    config.dev_mode |= dev;

    start_server(config, &settings).await
}
