//! Site builder.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use sprig_tree::{parse_document, render_document};

use crate::assets::{
    AssetKind, AssetPublisher, PublishedAsset, DEFAULT_SCRIPT, DEFAULT_STYLESHEET,
};
use crate::output::write_atomic;

/// Name of the rendered markup file inside the output directory.
pub const INDEX_FILE: &str = "index.html";

/// Configuration for building a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Declarative YAML document
    pub document: PathBuf,

    /// Source stylesheet (optional on disk)
    pub stylesheet: PathBuf,

    /// Source script (optional on disk)
    pub script: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Written when the stylesheet is absent or uncopiable
    pub stylesheet_fallback: String,

    /// Written when the script is absent or uncopiable
    pub script_fallback: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            document: PathBuf::from("templates/index.yaml"),
            stylesheet: PathBuf::from("static/css/style.css"),
            script: PathBuf::from("static/js/main.js"),
            output_dir: PathBuf::from("output"),
            stylesheet_fallback: DEFAULT_STYLESHEET.to_string(),
            script_fallback: DEFAULT_SCRIPT.to_string(),
        }
    }
}

/// Result of a build operation.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Rendered markup, as written to [`INDEX_FILE`]
    pub markup: String,

    /// Published stylesheet and script
    pub assets: Vec<PublishedAsset>,

    /// Output directory
    pub output_dir: PathBuf,

    /// Total build time in milliseconds
    pub duration_ms: u64,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

/// Static site builder.
///
/// The builder holds no state besides its configuration; every call
/// recomputes the whole output.
#[derive(Debug, Clone)]
pub struct SiteBuilder {
    config: SiteConfig,
}

impl SiteBuilder {
    /// Create a new site builder.
    pub fn new(config: SiteConfig) -> Self {
        Self { config }
    }

    /// Build the site: publish assets, then render and write the markup.
    ///
    /// A document that cannot be read or parsed aborts the build before
    /// the markup file is touched, so the previous markup stays in place.
    pub fn build(&self) -> Result<BuildOutput, BuildError> {
        let start = Instant::now();

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        let assets = self.publish_assets()?;

        let markup = self.render()?;

        let index_path = self.config.output_dir.join(INDEX_FILE);
        write_atomic(&index_path, markup.as_bytes())
            .map_err(|e| BuildError::WriteError(format!("{}: {}", index_path.display(), e)))?;

        Ok(BuildOutput {
            markup,
            assets,
            output_dir: self.config.output_dir.clone(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Publish the stylesheet and script without touching the markup.
    pub fn publish_assets(&self) -> Result<Vec<PublishedAsset>, BuildError> {
        let assets = [
            (
                AssetKind::Stylesheet,
                &self.config.stylesheet,
                &self.config.stylesheet_fallback,
            ),
            (
                AssetKind::Script,
                &self.config.script,
                &self.config.script_fallback,
            ),
        ];

        assets
            .into_iter()
            .map(|(kind, source, fallback)| -> Result<PublishedAsset, BuildError> {
                let dest = self.config.output_dir.join(kind.output_name());
                let origin = AssetPublisher::publish(source, &dest, fallback)
                    .map_err(|e| BuildError::WriteError(format!("{}: {}", dest.display(), e)))?;
                Ok(PublishedAsset {
                    kind,
                    path: dest,
                    origin,
                })
            })
            .collect()
    }

    /// Read, parse and render the document without writing anything.
    pub fn render(&self) -> Result<String, BuildError> {
        let path = &self.config.document;

        let source = fs::read_to_string(path).map_err(|e| BuildError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let doc = parse_document(&source).map_err(|e| BuildError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(render_document(&doc))
    }
}
