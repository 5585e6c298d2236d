//! Configuration file (sprig.toml).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use sprig_server::{default_bindings, SessionConfig, WatchAction, WatchBinding};
use sprig_static::SiteConfig;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub watch: WatchSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub document: PathBuf,
    pub stylesheet: PathBuf,
    pub script: PathBuf,
    pub output: PathBuf,
    /// Replaces the built-in stylesheet fallback
    pub stylesheet_fallback: Option<String>,
    /// Replaces the built-in script fallback
    pub script_fallback: Option<String>,
}

impl Default for SiteSection {
    fn default() -> Self {
        let site = SiteConfig::default();
        Self {
            document: site.document,
            stylesheet: site.stylesheet,
            script: site.script,
            output: site.output_dir,
            stylesheet_fallback: None,
            script_fallback: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub live_reload: bool,
    pub open: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            host: session.host,
            port: session.port,
            live_reload: session.live_reload,
            open: session.open,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub root: PathBuf,
    pub debounce_ms: u64,
    /// Replaces the default bindings when present
    pub bindings: Option<Vec<BindingEntry>>,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            debounce_ms: 50,
            bindings: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BindingEntry {
    pub pattern: String,
    pub action: WatchAction,
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());

    Ok(config)
}

impl ConfigFile {
    /// Site builder settings.
    pub fn site_config(&self) -> SiteConfig {
        let defaults = SiteConfig::default();
        SiteConfig {
            document: self.site.document.clone(),
            stylesheet: self.site.stylesheet.clone(),
            script: self.site.script.clone(),
            output_dir: self.site.output.clone(),
            stylesheet_fallback: self
                .site
                .stylesheet_fallback
                .clone()
                .unwrap_or(defaults.stylesheet_fallback),
            script_fallback: self
                .site
                .script_fallback
                .clone()
                .unwrap_or(defaults.script_fallback),
        }
    }

    /// Dev session settings. The config file itself is always bound to a
    /// restart, whether or not it exists yet.
    pub fn session_config(&self, config_path: &Path) -> SessionConfig {
        let mut bindings = match &self.watch.bindings {
            Some(entries) => entries
                .iter()
                .map(|entry| WatchBinding::new(entry.pattern.clone(), entry.action))
                .collect(),
            None => default_bindings(),
        };
        bindings.push(WatchBinding::new(
            restart_pattern(&self.watch.root, config_path),
            WatchAction::Restart,
        ));

        SessionConfig {
            site: self.site_config(),
            host: self.server.host.clone(),
            port: self.server.port,
            live_reload: self.server.live_reload,
            open: self.server.open,
            watch_root: self.watch.root.clone(),
            bindings,
            debounce: Duration::from_millis(self.watch.debounce_ms),
        }
    }
}

/// Glob for the config file relative to the watch root.
fn restart_pattern(watch_root: &Path, config_path: &Path) -> String {
    let relative = match (watch_root.canonicalize(), config_path.canonicalize()) {
        (Ok(root), Ok(file)) => file.strip_prefix(&root).ok().map(Path::to_path_buf),
        _ => None,
    };

    let path = relative.unwrap_or_else(|| config_path.to_path_buf());
    if path.is_absolute() || path.starts_with("..") {
        tracing::warn!(
            "{} is outside the watch root {}; editing it will not restart the server",
            config_path.display(),
            watch_root.display()
        );
    }

    let path = path.to_string_lossy().replace('\\', "/");
    globset::escape(path.trim_start_matches("./"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_server::WatchBindings;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let config = load_config(&temp.path().join("sprig.toml")).unwrap();

        let site = config.site_config();
        assert_eq!(site, SiteConfig::default());
        assert_eq!(config.server.port, 8000);
        assert!(config.server.live_reload);
        assert_eq!(config.watch.debounce_ms, 50);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: ConfigFile = toml::from_str(
            r#"
[site]
output = "dist"

[server]
port = 9000
"#,
        )
        .unwrap();

        assert_eq!(config.site.output, PathBuf::from("dist"));
        assert_eq!(config.site.document, PathBuf::from("templates/index.yaml"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn parses_bindings() {
        let config: ConfigFile = toml::from_str(
            r#"
[[watch.bindings]]
pattern = "**/*.yaml"
action = "rebuild"

[[watch.bindings]]
pattern = "**/*.css"
action = "publish-assets"
"#,
        )
        .unwrap();

        let session = config.session_config(Path::new("sprig.toml"));

        assert_eq!(
            session.bindings,
            vec![
                WatchBinding::new("**/*.yaml", WatchAction::Rebuild),
                WatchBinding::new("**/*.css", WatchAction::PublishAssets),
                WatchBinding::new("sprig.toml", WatchAction::Restart),
            ]
        );
    }

    #[test]
    fn rejects_unknown_actions() {
        let result: Result<ConfigFile, _> = toml::from_str(
            r#"
[[watch.bindings]]
pattern = "*"
action = "explode"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sprig.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn custom_fallbacks() {
        let config: ConfigFile =
            toml::from_str("[site]\nscript_fallback = \"// empty\\n\"\n").unwrap();

        let site = config.site_config();
        assert_eq!(site.script_fallback, "// empty\n");
        assert_eq!(site.stylesheet_fallback, "/* Styles */\n");
    }

    #[test]
    fn restart_pattern_is_relative_to_watch_root() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("conf");
        fs::create_dir_all(&nested).unwrap();
        let path = nested.join("sprig.toml");
        fs::write(&path, "").unwrap();

        assert_eq!(restart_pattern(temp.path(), &path), "conf/sprig.toml");
        assert_eq!(
            restart_pattern(Path::new("."), Path::new("./sprig.toml")),
            "sprig.toml"
        );
    }

    #[test]
    fn restart_pattern_escapes_glob_characters() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("site[1].toml");
        fs::write(&path, "").unwrap();

        let pattern = restart_pattern(temp.path(), &path);
        let bindings =
            WatchBindings::new(&[WatchBinding::new(pattern, WatchAction::Restart)]).unwrap();

        assert_eq!(bindings.actions_for("site[1].toml"), vec![WatchAction::Restart]);
        assert!(bindings.actions_for("site1.toml").is_empty());
    }
}
