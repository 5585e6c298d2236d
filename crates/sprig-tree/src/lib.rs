//! Declarative element tree and markup renderer.
//!
//! This crate parses a YAML document describing an HTML tree into a typed
//! [`Element`] tree and renders it to markup.

pub mod document;
pub mod element;
pub mod render;

pub use document::{parse_document, Document, ParseError};
pub use element::{Element, Node, ShapeError};
pub use render::{render, render_document, render_into};
