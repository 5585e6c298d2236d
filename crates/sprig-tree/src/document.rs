//! Document parsing.

use serde_yaml::Value;

use crate::element::{Element, Node, ShapeError};

/// The root of a declarative tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Root element, rendered after the doctype
    pub html: Element,
}

/// Errors that can occur when parsing a document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid YAML: {0}")]
    InvalidYaml(String),

    #[error("Document root must be a mapping")]
    NotAMapping,

    #[error("Invalid element at {0}")]
    Shape(#[from] ShapeError),
}

/// Parse a YAML document of the form `html: <element>`.
///
/// A missing `html` key yields an empty tagless root, which renders as
/// nothing. Other top-level keys are ignored, so they can hold anchors.
/// Merge keys (`<<`) are expanded; duplicate keys are rejected.
pub fn parse_document(source: &str) -> Result<Document, ParseError> {
    let mut value: Value =
        serde_yaml::from_str(source).map_err(|e| ParseError::InvalidYaml(e.to_string()))?;
    value
        .apply_merge()
        .map_err(|e| ParseError::InvalidYaml(e.to_string()))?;

    let Value::Mapping(root) = value else {
        return Err(ParseError::NotAMapping);
    };

    let html = match root.get("html") {
        Some(value) => Element::from_yaml(value, "html")?,
        None => Element::Node(Node::default()),
    };

    Ok(Document { html })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_root_element() {
        let source = r#"
html:
  tag: html
  content:
    - tag: body
      content: Hello
"#;

        let doc = parse_document(source).unwrap();

        assert_eq!(
            doc.html,
            Node::new("html")
                .child(Node::new("body").child("Hello"))
                .into()
        );
    }

    #[test]
    fn missing_html_is_empty_root() {
        let doc = parse_document("title: unused\n").unwrap();
        assert_eq!(doc.html, Element::Node(Node::default()));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let result = parse_document("html: [unclosed\n");
        assert!(matches!(result, Err(ParseError::InvalidYaml(_))));
    }

    #[test]
    fn errors_on_non_mapping_root() {
        let result = parse_document("- just\n- a list\n");
        assert!(matches!(result, Err(ParseError::NotAMapping)));
    }

    #[test]
    fn errors_on_empty_source() {
        assert!(matches!(parse_document(""), Err(ParseError::NotAMapping)));
    }

    #[test]
    fn expands_merge_keys() {
        let source = r#"
common: &common
  class: box
html:
  tag: div
  attrs:
    <<: *common
    id: x
"#;

        let doc = parse_document(source).unwrap();

        assert_eq!(
            crate::render(&doc.html),
            r#"<div class="box" id="x"></div>"#
        );
    }

    #[test]
    fn rejects_duplicate_keys() {
        let source = "html:\n  tag: div\n  attrs:\n    id: x\n    id: y\n";

        let err = parse_document(source).unwrap_err();

        assert!(matches!(err, ParseError::InvalidYaml(_)));
        assert!(err.to_string().contains("duplicate entry"));
    }

    #[test]
    fn shape_errors_carry_path() {
        let err = parse_document("html:\n  tag: div\n  content:\n    - [a]\n").unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid element at html.content[0]: expected text or a mapping, found a sequence"
        );
    }
}
