//! Preview server command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sprig_server::{DevServer, DevServerConfig, ReloadHub};

use crate::config::load_config;

/// Run the serve command.
pub async fn run(config_path: &Path, port: u16, dir: Option<PathBuf>, open: bool) -> Result<()> {
    let file_config = load_config(config_path)?;
    let dir = dir.unwrap_or(file_config.site.output);

    if !dir.exists() {
        anyhow::bail!(
            "Directory not found: {}. Run 'sprig build' first.",
            dir.display()
        );
    }

    let config = DevServerConfig {
        output_dir: dir.clone(),
        port,
        host: file_config.server.host,
        live_reload: false,
    };

    let handle = DevServer::new(config, ReloadHub::new()).bind().await?;

    let url = format!("http://{}", handle.local_addr());
    tracing::info!("Serving {} at {}", dir.display(), url);

    if open {
        let _ = open::that(&url);
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    handle.shutdown().await?;

    Ok(())
}
