//! Stylesheet and script publishing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::output::write_atomic;

/// Written in place of a missing or uncopiable stylesheet.
pub const DEFAULT_STYLESHEET: &str = "/* Styles */\n";

/// Written in place of a missing or uncopiable script.
pub const DEFAULT_SCRIPT: &str = "// Main JavaScript file\n";

/// Kinds of auxiliary assets published next to the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Stylesheet,
    Script,
}

impl AssetKind {
    /// File name inside the output directory.
    pub fn output_name(self) -> &'static str {
        match self {
            AssetKind::Stylesheet => "style.css",
            AssetKind::Script => "main.js",
        }
    }
}

/// Where the published bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    /// Copied verbatim from the source file
    Copied,

    /// Fallback content
    Fallback,
}

/// An asset present in the output directory after a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedAsset {
    /// Asset kind
    pub kind: AssetKind,

    /// Destination path
    pub path: PathBuf,

    /// Copied or fallback
    pub origin: AssetOrigin,
}

/// Asset publishing utilities.
pub struct AssetPublisher;

impl AssetPublisher {
    /// Publish `source` to `dest`, or `fallback` when it cannot be copied.
    ///
    /// A missing source is not an error. A failed copy is logged and
    /// recovered with the fallback. On `Ok`, `dest` exists with either the
    /// source bytes or the fallback; only a failure to write the fallback
    /// itself is returned.
    pub fn publish(source: &Path, dest: &Path, fallback: &str) -> io::Result<AssetOrigin> {
        if source.exists() {
            match fs::read(source).and_then(|bytes| write_atomic(dest, &bytes)) {
                Ok(()) => {
                    tracing::debug!("Copied {} to {}", source.display(), dest.display());
                    return Ok(AssetOrigin::Copied);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to copy {} to {}: {}. Writing fallback content",
                        source.display(),
                        dest.display(),
                        e
                    );
                }
            }
        } else {
            tracing::info!(
                "{} not found, writing fallback to {}",
                source.display(),
                dest.display()
            );
        }

        write_atomic(dest, fallback.as_bytes())?;
        Ok(AssetOrigin::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copies_existing_source_verbatim() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("static/css/style.css");
        let dest = temp.path().join("output/style.css");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "body { color: red; }\n").unwrap();

        let origin = AssetPublisher::publish(&source, &dest, DEFAULT_STYLESHEET).unwrap();

        assert_eq!(origin, AssetOrigin::Copied);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "body { color: red; }\n");
    }

    #[test]
    fn writes_fallback_for_missing_source() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("missing.css");
        let dest = temp.path().join("output/style.css");

        let origin = AssetPublisher::publish(&source, &dest, DEFAULT_STYLESHEET).unwrap();

        assert_eq!(origin, AssetOrigin::Fallback);
        assert!(dest.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), DEFAULT_STYLESHEET);
    }

    #[test]
    fn falls_back_when_copy_fails() {
        let temp = tempdir().unwrap();
        // A directory exists but cannot be read as a file.
        let source = temp.path().join("main.js");
        fs::create_dir_all(&source).unwrap();
        let dest = temp.path().join("output/main.js");

        let origin = AssetPublisher::publish(&source, &dest, DEFAULT_SCRIPT).unwrap();

        assert_eq!(origin, AssetOrigin::Fallback);
        assert_eq!(fs::read_to_string(&dest).unwrap(), DEFAULT_SCRIPT);
    }

    #[test]
    fn replaces_fallback_once_source_appears() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("main.js");
        let dest = temp.path().join("output/main.js");

        AssetPublisher::publish(&source, &dest, DEFAULT_SCRIPT).unwrap();
        fs::write(&source, "console.log('hi');\n").unwrap();
        AssetPublisher::publish(&source, &dest, DEFAULT_SCRIPT).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "console.log('hi');\n");
    }

    #[test]
    fn output_names() {
        assert_eq!(AssetKind::Stylesheet.output_name(), "style.css");
        assert_eq!(AssetKind::Script.output_name(), "main.js");
    }
}
