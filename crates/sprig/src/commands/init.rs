//! Scaffold a new site in the current directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Files written by `sprig init`, relative to the project root.
const SCAFFOLD: &[(&str, &str)] = &[
    ("sprig.toml", DEFAULT_CONFIG),
    ("templates/index.yaml", DEFAULT_DOCUMENT),
    ("static/css/style.css", DEFAULT_STYLESHEET),
    ("static/js/main.js", DEFAULT_SCRIPT),
];

/// Run the init command.
pub async fn run(yes: bool) -> Result<()> {
    tracing::info!("Initializing sprig...");
    scaffold(Path::new("."), yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'sprig dev' to start the development server.");

    Ok(())
}

/// Write the scaffold under `root`. Existing files are kept unless
/// `overwrite` is set.
fn scaffold(root: &Path, overwrite: bool) -> Result<Vec<&'static str>> {
    let mut written = Vec::new();

    for (name, contents) in SCAFFOLD {
        let path = root.join(name);
        if path.exists() && !overwrite {
            tracing::warn!("{} already exists. Use --yes to overwrite.", name);
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", name))?;
        tracing::info!("Created {}", name);
        written.push(*name);
    }

    Ok(written)
}

const DEFAULT_CONFIG: &str = r#"# Sprig Configuration

[site]
# Declarative page document
document = "templates/index.yaml"

# Copied to output/style.css and output/main.js
stylesheet = "static/css/style.css"
script = "static/js/main.js"

# Output directory for the built site
output = "output"

[server]
host = "127.0.0.1"
port = 8000
live_reload = true
open = false

[watch]
root = "."
debounce_ms = 50

# Replaces the default bindings when present.
# Actions: "rebuild", "publish-assets", "restart"
# [[watch.bindings]]
# pattern = "**/*.{yaml,yml}"
# action = "rebuild"
"#;

const DEFAULT_DOCUMENT: &str = r#"html:
  tag: html
  attrs:
    lang: en
  content:
    - tag: head
      content:
        - tag: meta
          attrs:
            charset: utf-8
        - tag: title
          content: Hello from sprig
        - tag: link
          attrs:
            rel: stylesheet
            href: style.css
    - tag: body
      content:
        - tag: div
          attrs:
            class: container
          content:
            - tag: h1
              attrs:
                class: hello
              content: Hello, world!
            - tag: p
              content: Edit templates/index.yaml and save to rebuild.
        - tag: script
          attrs:
            src: main.js
"#;

const DEFAULT_STYLESHEET: &str = r#"body {
  font-family: system-ui, sans-serif;
  margin: 0;
}

.container {
  max-width: 40rem;
  margin: 4rem auto;
}
"#;

const DEFAULT_SCRIPT: &str = r#"document.addEventListener("DOMContentLoaded", () => {
  const hello = document.querySelector(".hello");
  if (hello) {
    hello.addEventListener("click", () => hello.classList.toggle("active"));
  }
});
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_static::{SiteBuilder, SiteConfig};
    use tempfile::tempdir;

    #[test]
    fn scaffold_writes_all_files() {
        let temp = tempdir().unwrap();

        let written = scaffold(temp.path(), false).unwrap();

        assert_eq!(written.len(), SCAFFOLD.len());
        for (name, _) in SCAFFOLD {
            assert!(temp.path().join(name).exists(), "{name}");
        }
    }

    #[test]
    fn scaffold_keeps_existing_files() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("sprig.toml"), "# mine\n").unwrap();

        let written = scaffold(temp.path(), false).unwrap();

        assert!(!written.contains(&"sprig.toml"));
        assert_eq!(
            fs::read_to_string(temp.path().join("sprig.toml")).unwrap(),
            "# mine\n"
        );

        scaffold(temp.path(), true).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("sprig.toml")).unwrap(),
            DEFAULT_CONFIG
        );
    }

    #[test]
    fn scaffolded_config_and_site_build() {
        let temp = tempdir().unwrap();
        scaffold(temp.path(), false).unwrap();

        let config: crate::config::ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.server.port, 8000);

        let output = SiteBuilder::new(SiteConfig {
            document: temp.path().join("templates/index.yaml"),
            stylesheet: temp.path().join("static/css/style.css"),
            script: temp.path().join("static/js/main.js"),
            output_dir: temp.path().join("output"),
            ..Default::default()
        })
        .build()
        .unwrap();

        assert!(output.markup.starts_with("<!DOCTYPE html>\n<html lang=\"en\"><head>"));
        assert!(output
            .markup
            .contains(r#"<h1 class="hello">Hello, world!</h1>"#));
        assert_eq!(
            fs::read_to_string(temp.path().join("output/style.css")).unwrap(),
            DEFAULT_STYLESHEET
        );
    }
}
