use anyhow::{
    Result,
    bail,
};

use crate::field_path::FieldPath;
use crate::json_node::JsonNode;

/// One value reached by a field path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedElement<'a> {
    pub value: &'a JsonNode,
    /// Position inside the nearest enclosing array, when the path went through one.
    pub array_offset: Option<usize>,
}

/// Anything a match expression can be evaluated against.
///
/// Path semantics, including array traversal, belong to the implementor.
pub trait MatchableDocument: Send + Sync {
    fn get_elements(&self, path: &FieldPath) -> Result<Vec<ExtractedElement<'_>>>;

    /// The whole document as a single value.
    fn to_node(&self) -> &JsonNode;
}

/// A borrowed JSON object used as a document.
#[derive(Debug, Clone, Copy)]
pub struct JsonDocument<'a> {
    root: &'a JsonNode,
}

impl<'a> JsonDocument<'a> {
    pub fn new(root: &'a JsonNode) -> Result<Self> {
        if !root.is_object() {
            bail!("a document must be a json object, got {}", root.type_name())
        }

        Ok(JsonDocument { root })
    }

    fn collect(node: &'a JsonNode, parts: &[String], array_offset: Option<usize>, out: &mut Vec<ExtractedElement<'a>>) {
        let (head, rest) = match parts.split_first() {
            Some(split) => split,
            None => {
                out.push(ExtractedElement { value: node, array_offset });
                if let Some(items) = node.as_array() {
                    for (i, item) in items.iter().enumerate() {
                        out.push(ExtractedElement { value: item, array_offset: Some(i) });
                    }
                }
                return;
            }
        };

        match node {
            JsonNode::Object(_) => {
                if let Some(child) = node.get(head) {
                    JsonDocument::collect(child, rest, array_offset, out);
                }
            }

            JsonNode::Array(items) => {
                if let Some((i, item)) = head.parse::<usize>().ok().and_then(|i| Some((i, items.get(i)?))) {
                    JsonDocument::collect(item, rest, Some(i), out);
                }

                for (i, item) in items.iter().enumerate() {
                    if item.is_object() {
                        JsonDocument::collect(item, parts, Some(i), out);
                    }
                }
            }

            _ => (),
        }
    }
}

impl MatchableDocument for JsonDocument<'_> {
    fn get_elements(&self, path: &FieldPath) -> Result<Vec<ExtractedElement<'_>>> {
        let mut elements = Vec::new();
        JsonDocument::collect(self.root, path.parts(), None, &mut elements);
        log::trace!("field path {} resolved to {} element(s)", path, elements.len());

        Ok(elements)
    }

    fn to_node(&self) -> &JsonNode {
        self.root
    }
}
