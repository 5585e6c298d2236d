//! Static site builder for sprig documents.
//!
//! Renders a declarative YAML document to `index.html` and publishes the
//! stylesheet and script next to it.

pub mod assets;
pub mod builder;
pub mod output;

pub use assets::{AssetKind, AssetOrigin, AssetPublisher, PublishedAsset};
pub use builder::{BuildError, BuildOutput, SiteBuilder, SiteConfig, INDEX_FILE};
