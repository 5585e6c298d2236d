//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sprig_static::{AssetOrigin, SiteBuilder};

use crate::config::load_config;

/// Run the build command.
pub async fn run(config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building static site...");

    let file_config = load_config(config_path)?;

    let mut config = file_config.site_config();
    if let Some(output) = output {
        config.output_dir = output;
    }

    let result = SiteBuilder::new(config).build()?;

    for asset in &result.assets {
        if asset.origin == AssetOrigin::Fallback {
            tracing::info!("Wrote fallback {}", asset.path.display());
        }
    }

    tracing::info!(
        "Built {} bytes of markup and {} assets in {}ms",
        result.markup.len(),
        result.assets.len(),
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
