//! Element tree model and its conversion from YAML values.

use serde_yaml::{Mapping, Value};

/// A node in the declarative tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Literal text, rendered verbatim
    Text(String),

    /// Tagged structure with attributes and children
    Node(Node),
}

/// A tagged element.
///
/// A node without a tag (or with an empty one) is valid and renders as
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    /// Element name, e.g. `div`
    pub tag: Option<String>,

    /// Attributes in input order
    pub attrs: Vec<(String, String)>,

    /// Children in input order
    pub content: Vec<Element>,
}

impl Node {
    /// Create a node with the given tag and no attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    /// Append an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Append a child element.
    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.content.push(child.into());
        self
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Element::Node(node)
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::Text(text.to_string())
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Element::Text(text)
    }
}

/// An element that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct ShapeError {
    /// Location in the tree, e.g. `html.content[1].attrs`
    pub path: String,

    /// What was wrong
    pub message: String,
}

impl Element {
    /// Convert a YAML value into an element.
    ///
    /// `path` names the value in error messages.
    pub fn from_yaml(value: &Value, path: &str) -> Result<Self, ShapeError> {
        match value {
            Value::Mapping(map) => node_from_yaml(map, path).map(Element::Node),
            Value::Sequence(_) => Err(shape_error(
                path,
                "expected text or a mapping, found a sequence",
            )),
            Value::Tagged(tagged) => Err(shape_error(
                path,
                format!("unsupported YAML tag {}", tagged.tag),
            )),
            scalar => Ok(Element::Text(scalar_text(scalar).unwrap_or_default())),
        }
    }
}

fn node_from_yaml(map: &Mapping, path: &str) -> Result<Node, ShapeError> {
    let tag = match map.get("tag") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            scalar_text(value)
                .ok_or_else(|| shape_error(&format!("{path}.tag"), "tag must be a scalar"))?,
        ),
    };

    let attrs = match map.get("attrs") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Mapping(attrs)) => attrs_from_yaml(attrs, &format!("{path}.attrs"))?,
        Some(_) => {
            return Err(shape_error(
                &format!("{path}.attrs"),
                "attrs must be a mapping",
            ))
        }
    };

    let content = match map.get("content") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| Element::from_yaml(item, &format!("{path}.content[{i}]")))
            .collect::<Result<Vec<_>, _>>()?,
        Some(single) => vec![Element::from_yaml(single, &format!("{path}.content"))?],
    };

    Ok(Node {
        tag,
        attrs,
        content,
    })
}

fn attrs_from_yaml(attrs: &Mapping, path: &str) -> Result<Vec<(String, String)>, ShapeError> {
    let mut out = Vec::with_capacity(attrs.len());

    for (key, value) in attrs {
        let name = match key {
            Value::Null => None,
            other => scalar_text(other),
        }
        .ok_or_else(|| shape_error(path, "attribute names must be scalars"))?;

        let value = scalar_text(value).ok_or_else(|| {
            shape_error(
                &format!("{path}.{name}"),
                "attribute values must be scalars",
            )
        })?;

        out.push((name, value));
    }

    Ok(out)
}

/// Textual form of a YAML scalar. Null is the empty string.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn shape_error(path: &str, message: impl Into<String>) -> ShapeError {
    ShapeError {
        path: path.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn yaml(source: &str) -> Value {
        serde_yaml::from_str(source).unwrap()
    }

    #[test]
    fn converts_strings_to_text() {
        let el = Element::from_yaml(&yaml("hello"), "html").unwrap();
        assert_eq!(el, Element::Text("hello".to_string()));
    }

    #[test]
    fn converts_scalars_to_text() {
        assert_eq!(
            Element::from_yaml(&yaml("42"), "html").unwrap(),
            Element::Text("42".to_string())
        );
        assert_eq!(
            Element::from_yaml(&yaml("true"), "html").unwrap(),
            Element::Text("true".to_string())
        );
        assert_eq!(
            Element::from_yaml(&Value::Null, "html").unwrap(),
            Element::Text(String::new())
        );
    }

    #[test]
    fn keeps_attribute_order() {
        let el = Element::from_yaml(
            &yaml("tag: a\nattrs:\n  href: /x\n  id: y\n  class: z\n"),
            "html",
        )
        .unwrap();

        let Element::Node(node) = el else {
            panic!("expected a node");
        };
        let names: Vec<&str> = node.attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["href", "id", "class"]);
    }

    #[test]
    fn single_content_becomes_one_child() {
        let el = Element::from_yaml(&yaml("tag: p\ncontent: hi\n"), "html").unwrap();
        assert_eq!(el, Node::new("p").child("hi").into());
    }

    #[test]
    fn sequence_content_keeps_order() {
        let el = Element::from_yaml(
            &yaml("tag: ul\ncontent:\n  - tag: li\n    content: A\n  - tag: li\n    content: B\n"),
            "html",
        )
        .unwrap();

        let expected: Element = Node::new("ul")
            .child(Node::new("li").child("A"))
            .child(Node::new("li").child("B"))
            .into();
        assert_eq!(el, expected);
    }

    #[test]
    fn missing_tag_is_not_an_error() {
        let el = Element::from_yaml(&yaml("attrs:\n  id: x\n"), "html").unwrap();
        let Element::Node(node) = el else {
            panic!("expected a node");
        };
        assert_eq!(node.tag, None);
    }

    #[test]
    fn rejects_nested_sequences_with_path() {
        let err = Element::from_yaml(&yaml("tag: ul\ncontent:\n  - a\n  - [b, c]\n"), "html")
            .unwrap_err();
        assert_eq!(err.path, "html.content[1]");
    }

    #[test]
    fn rejects_non_mapping_attrs() {
        let err = Element::from_yaml(&yaml("tag: a\nattrs: [x]\n"), "html").unwrap_err();
        assert_eq!(err.path, "html.attrs");
    }

    #[test]
    fn rejects_nested_attribute_values() {
        let err =
            Element::from_yaml(&yaml("tag: a\nattrs:\n  data:\n    k: v\n"), "html").unwrap_err();
        assert_eq!(err.path, "html.attrs.data");
    }

    #[test]
    fn rejects_mapping_tag() {
        let err = Element::from_yaml(&yaml("tag:\n  name: div\n"), "html").unwrap_err();
        assert_eq!(err.path, "html.tag");
    }
}
