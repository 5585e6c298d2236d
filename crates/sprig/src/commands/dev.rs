//! Development server command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sprig_server::{ServerError, SessionConfig, Supervisor};

use crate::config::load_config;

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct DevOverrides {
    pub port: Option<u16>,
    pub no_reload: bool,
    pub open: bool,
}

/// Run the dev server until Ctrl+C.
pub async fn run(config_path: PathBuf, overrides: DevOverrides) -> Result<()> {
    let session = load_session(&config_path, &overrides)?;
    tracing::info!("Starting development server on port {}", session.port);

    let reload = move || {
        load_session(&config_path, &overrides)
            .map_err(|e| ServerError::ConfigError(format!("{e:#}")))
    };

    Supervisor::new(session, reload).run(shutdown_signal()).await?;

    Ok(())
}

fn load_session(config_path: &Path, overrides: &DevOverrides) -> Result<SessionConfig> {
    let mut session = load_config(config_path)?.session_config(config_path);

    if let Some(port) = overrides.port {
        session.port = port;
    }
    if overrides.no_reload {
        session.live_reload = false;
    }
    session.open |= overrides.open;

    Ok(session)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn overrides_win_over_config() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sprig.toml");
        fs::write(&path, "[server]\nport = 9000\nlive_reload = true\n").unwrap();

        let session = load_session(
            &path,
            &DevOverrides {
                port: Some(9100),
                no_reload: true,
                open: false,
            },
        )
        .unwrap();

        assert_eq!(session.port, 9100);
        assert!(!session.live_reload);
        assert!(!session.open);
    }

    #[test]
    fn config_values_without_overrides() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sprig.toml");
        fs::write(&path, "[server]\nport = 9000\nopen = true\n").unwrap();

        let session = load_session(&path, &DevOverrides::default()).unwrap();

        assert_eq!(session.port, 9000);
        assert!(session.live_reload);
        assert!(session.open);
    }
}
