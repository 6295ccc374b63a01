//! This library provides:
//! - MatchExpression: The predicate node contract every query operator implements, with its closed kind taxonomy
//! - AtomicMatchExpression / FalseMatchExpression: The always-true and always-false nodes
//! - JsonNode / JsonDocument: A JSON value model and the document abstraction nodes are evaluated against
//!
//! Concrete comparison, logical and array operators are built on top of the contract and are not part of this crate.

mod peekable_codepoints;
mod json_tag;
mod json_node;
mod field_path;
mod document;
mod match_details;
mod match_expression;

pub use crate::json_tag::JsonTag;
pub use crate::json_node::{JsonNode, JsonObjProp};
pub use crate::field_path::FieldPath;
pub use crate::document::{ExtractedElement, JsonDocument, MatchableDocument};
pub use crate::match_details::MatchDetails;
pub use crate::match_expression::{
    AtomicMatchExpression,
    FalseMatchExpression,
    MatchCategory,
    MatchExpression,
    MatchType,
    DEBUG_INDENT,
    children,
    children_equivalent,
    debug_add_space,
};
