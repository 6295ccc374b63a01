use std::any::Any;
use std::fmt;

use anyhow::Result;

use crate::document::*;
use crate::json_node::JsonNode;
use crate::match_details::MatchDetails;

/// One level of nesting in debug output.
pub const DEBUG_INDENT: &str = "    ";

/// The closed set of predicate kinds. Fixed for a node at construction.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum MatchType {
    // tree
    And,
    Or,
    Nor,
    Not,

    // array
    All,
    ElemMatchObject,
    ElemMatchValue,
    Size,

    // leaf
    Lte,
    Lt,
    Eq,
    Gt,
    Gte,
    Regex,
    Mod,
    Exists,
    In,
    Nin,

    // special
    TypeOperator,
    Geo,
    Where,

    // degenerate
    Atomic,
    AlwaysFalse,
}

/// Informational grouping of [`MatchType`]; carries no behavior.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum MatchCategory {
    Tree,
    Array,
    Leaf,
    Special,
    Degenerate,
}

impl MatchType {
    pub fn category(self) -> MatchCategory {
        match self {
            MatchType::And | MatchType::Or | MatchType::Nor | MatchType::Not => MatchCategory::Tree,

            MatchType::All
            | MatchType::ElemMatchObject
            | MatchType::ElemMatchValue
            | MatchType::Size
            => MatchCategory::Array,

            MatchType::Lte
            | MatchType::Lt
            | MatchType::Eq
            | MatchType::Gt
            | MatchType::Gte
            | MatchType::Regex
            | MatchType::Mod
            | MatchType::Exists
            | MatchType::In
            | MatchType::Nin
            => MatchCategory::Leaf,

            MatchType::TypeOperator | MatchType::Geo | MatchType::Where => MatchCategory::Special,

            MatchType::Atomic | MatchType::AlwaysFalse => MatchCategory::Degenerate,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MatchType::And => "$and",
            MatchType::Or => "$or",
            MatchType::Nor => "$nor",
            MatchType::Not => "$not",
            MatchType::All => "$all",
            MatchType::ElemMatchObject => "$elemMatch (object)",
            MatchType::ElemMatchValue => "$elemMatch (value)",
            MatchType::Size => "$size",
            MatchType::Lte => "$lte",
            MatchType::Lt => "$lt",
            MatchType::Eq => "$eq",
            MatchType::Gt => "$gt",
            MatchType::Gte => "$gte",
            MatchType::Regex => "$regex",
            MatchType::Mod => "$mod",
            MatchType::Exists => "$exists",
            MatchType::In => "$in",
            MatchType::Nin => "$nin",
            MatchType::TypeOperator => "$type",
            MatchType::Geo => "$geo",
            MatchType::Where => "$where",
            MatchType::Atomic => "$atomic",
            MatchType::AlwaysFalse => "$false",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A predicate node in a match expression tree.
///
/// Every predicate kind implements this directly. Nodes are immutable once
/// built, so a finished tree can be evaluated from many threads at once as
/// long as each caller brings its own [`MatchDetails`].
///
/// Parents own their children exclusively; [`MatchExpression::get_child`]
/// only lends them out.
pub trait MatchExpression: fmt::Debug + Send + Sync {
    fn match_type(&self) -> MatchType;

    /// Lets `equivalent` downcast the other node to reach its state.
    fn as_any(&self) -> &dyn Any;

    /// Tests a whole document, pulling whatever fields the predicate needs
    /// through the document's own path extraction.
    ///
    /// Errors only come from the document. `details` is filled in by nodes
    /// that have sub-match information to report and left alone by the rest.
    fn matches(&self, doc: &dyn MatchableDocument, details: Option<&mut MatchDetails>) -> Result<bool>;

    /// Tests a raw JSON object as a document.
    fn matches_json(&self, doc: &JsonNode, details: Option<&mut MatchDetails>) -> Result<bool> {
        let doc = JsonDocument::new(doc)?;
        self.matches(&doc, details)
    }

    /// Tests one already extracted value.
    ///
    /// Kinds that only make sense against a whole document return `false`.
    fn matches_single_element(&self, element: &JsonNode) -> bool;

    fn num_children(&self) -> usize {
        0
    }

    /// Borrows child `i`. `None` whenever `i >= num_children()`.
    fn get_child(&self, _i: usize) -> Option<&dyn MatchExpression> {
        None
    }

    /// Appends this node and its subtree, one [`DEBUG_INDENT`] per level.
    fn debug_string(&self, debug: &mut String, level: usize);

    fn to_debug_string(&self) -> String {
        let mut debug = String::new();
        self.debug_string(&mut debug, 0);
        debug
    }

    /// Structural equality: same kind and same predicate state, children
    /// compared pairwise in order. Never based on identity.
    ///
    /// Compare `match_type()` first, then downcast `other.as_any()` to read
    /// its state.
    fn equivalent(&self, other: &dyn MatchExpression) -> bool;
}

pub fn debug_add_space(debug: &mut String, level: usize) {
    for _ in 0..level {
        debug.push_str(DEBUG_INDENT);
    }
}

pub fn children<'a>(node: &'a dyn MatchExpression) -> impl Iterator<Item = &'a dyn MatchExpression> + 'a {
    (0..node.num_children()).filter_map(move |i| {
        let child = node.get_child(i);
        debug_assert!(
            child.is_some(),
            "{} reports {} children but has none at index {}",
            node.match_type(),
            node.num_children(),
            i,
        );
        child
    })
}

/// Positional, order-sensitive comparison of two nodes' children.
pub fn children_equivalent(a: &dyn MatchExpression, b: &dyn MatchExpression) -> bool {
    a.num_children() == b.num_children()
        && children(a).zip(children(b)).all(|(x, y)| x.equivalent(y))
}

/// Matches everything. Stands in where a predicate must be present but
/// should not filter.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct AtomicMatchExpression;

impl AtomicMatchExpression {
    pub fn new() -> Self {
        AtomicMatchExpression
    }
}

impl MatchExpression for AtomicMatchExpression {
    fn match_type(&self) -> MatchType {
        MatchType::Atomic
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn matches(&self, _doc: &dyn MatchableDocument, _details: Option<&mut MatchDetails>) -> Result<bool> {
        Ok(true)
    }

    fn matches_single_element(&self, _element: &JsonNode) -> bool {
        true
    }

    fn debug_string(&self, debug: &mut String, level: usize) {
        debug_add_space(debug, level);
        debug.push_str("$atomic\n");
    }

    fn equivalent(&self, other: &dyn MatchExpression) -> bool {
        other.match_type() == MatchType::Atomic
    }
}

/// Matches nothing.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct FalseMatchExpression;

impl FalseMatchExpression {
    pub fn new() -> Self {
        FalseMatchExpression
    }
}

impl MatchExpression for FalseMatchExpression {
    fn match_type(&self) -> MatchType {
        MatchType::AlwaysFalse
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn matches(&self, _doc: &dyn MatchableDocument, _details: Option<&mut MatchDetails>) -> Result<bool> {
        Ok(false)
    }

    fn matches_single_element(&self, _element: &JsonNode) -> bool {
        false
    }

    fn debug_string(&self, debug: &mut String, level: usize) {
        debug_add_space(debug, level);
        debug.push_str("$false\n");
    }

    fn equivalent(&self, other: &dyn MatchExpression) -> bool {
        other.match_type() == MatchType::AlwaysFalse
    }
}

#[cfg(test)]
mod match_expression_tests {
    use std::sync::Arc;
    use std::thread;

    use anyhow::bail;

    use super::*;
    use crate::field_path::FieldPath;

    // Minimal combinator and leaf, enough to drive the shared helpers.

    #[derive(Debug)]
    struct AndNode {
        children: Vec<Box<dyn MatchExpression>>,
    }

    impl MatchExpression for AndNode {
        fn match_type(&self) -> MatchType {
            MatchType::And
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn matches(&self, doc: &dyn MatchableDocument, mut details: Option<&mut MatchDetails>) -> Result<bool> {
            for child in &self.children {
                if !child.matches(doc, details.as_deref_mut())? {
                    return Ok(false);
                }
            }
            Ok(true)
        }

        fn matches_single_element(&self, element: &JsonNode) -> bool {
            self.children.iter().all(|c| c.matches_single_element(element))
        }

        fn num_children(&self) -> usize {
            self.children.len()
        }

        fn get_child(&self, i: usize) -> Option<&dyn MatchExpression> {
            self.children.get(i).map(|c| c.as_ref())
        }

        fn debug_string(&self, debug: &mut String, level: usize) {
            debug_add_space(debug, level);
            debug.push_str("$and\n");
            for child in &self.children {
                child.debug_string(debug, level + 1);
            }
        }

        fn equivalent(&self, other: &dyn MatchExpression) -> bool {
            other.match_type() == MatchType::And && children_equivalent(self, other)
        }
    }

    #[derive(Debug)]
    struct ExistsNode {
        path: FieldPath,
    }

    impl MatchExpression for ExistsNode {
        fn match_type(&self) -> MatchType {
            MatchType::Exists
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn matches(&self, doc: &dyn MatchableDocument, details: Option<&mut MatchDetails>) -> Result<bool> {
            let elements = doc.get_elements(&self.path)?;
            if let (Some(details), Some(offset)) = (details, elements.first().and_then(|e| e.array_offset)) {
                details.record_array_offset(offset);
            }
            Ok(!elements.is_empty())
        }

        fn matches_single_element(&self, _element: &JsonNode) -> bool {
            true
        }

        fn debug_string(&self, debug: &mut String, level: usize) {
            debug_add_space(debug, level);
            debug.push_str(&format!("{} $exists\n", self.path));
        }

        fn equivalent(&self, other: &dyn MatchExpression) -> bool {
            other.match_type() == MatchType::Exists
                && other.as_any().downcast_ref::<ExistsNode>().is_some_and(|o| o.path == self.path)
        }
    }

    /// Claims children it cannot hand out.
    #[derive(Debug)]
    struct HollowNode;

    impl MatchExpression for HollowNode {
        fn match_type(&self) -> MatchType {
            MatchType::Or
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn matches(&self, _doc: &dyn MatchableDocument, _details: Option<&mut MatchDetails>) -> Result<bool> {
            Ok(false)
        }

        fn matches_single_element(&self, _element: &JsonNode) -> bool {
            false
        }

        fn num_children(&self) -> usize {
            2
        }

        fn debug_string(&self, debug: &mut String, level: usize) {
            debug_add_space(debug, level);
            debug.push_str("$or\n");
        }

        fn equivalent(&self, other: &dyn MatchExpression) -> bool {
            other.match_type() == MatchType::Or && children_equivalent(self, other)
        }
    }

    struct BrokenDocument {
        root: JsonNode,
    }

    impl MatchableDocument for BrokenDocument {
        fn get_elements(&self, path: &FieldPath) -> Result<Vec<ExtractedElement<'_>>> {
            bail!("cannot read {}", path)
        }

        fn to_node(&self) -> &JsonNode {
            &self.root
        }
    }

    fn sample_documents() -> Result<Vec<JsonNode>> {
        Ok(vec![
            "{}".parse()?,
            r#"{"a": 1}"#.parse()?,
            r#"{"a": {"b": [1, {"c": "d"}]}}"#.parse()?,
        ])
    }

    fn sample_values() -> Result<Vec<JsonNode>> {
        Ok(vec!["5".parse()?, r#""x""#.parse()?, "null".parse()?])
    }

    #[test]
    fn test_always_true_matches_everything() -> Result<()> {
        let t = AtomicMatchExpression::new();
        for doc in sample_documents()? {
            assert!(t.matches_json(&doc, None)?);
            assert!(t.matches(&JsonDocument::new(&doc)?, None)?);
        }
        for value in sample_values()? {
            assert!(t.matches_single_element(&value));
        }
        Ok(())
    }

    #[test]
    fn test_always_false_matches_nothing() -> Result<()> {
        let f = FalseMatchExpression::new();
        for doc in sample_documents()? {
            assert!(!f.matches_json(&doc, None)?);
            assert!(!f.matches(&JsonDocument::new(&doc)?, None)?);
        }
        for value in sample_values()? {
            assert!(!f.matches_single_element(&value));
        }
        Ok(())
    }

    #[test]
    fn test_details_left_untouched() -> Result<()> {
        let doc: JsonNode = r#"{"a": [1, 2]}"#.parse()?;
        let mut details = MatchDetails::new();
        details.request_array_offset();

        assert!(AtomicMatchExpression::new().matches_json(&doc, Some(&mut details))?);
        assert!(!FalseMatchExpression::new().matches_json(&doc, Some(&mut details))?);

        let mut untouched = MatchDetails::new();
        untouched.request_array_offset();
        assert_eq!(details, untouched);
        Ok(())
    }

    #[test]
    fn test_degenerate_nodes_have_no_children() {
        let t = AtomicMatchExpression::new();
        let f = FalseMatchExpression::new();
        assert_eq!(t.num_children(), 0);
        assert_eq!(f.num_children(), 0);
        assert!(t.get_child(0).is_none());
        assert!(f.get_child(0).is_none());
        assert_eq!(children(&f).count(), 0);
    }

    #[test]
    fn test_degenerate_equivalence() {
        let t1 = AtomicMatchExpression::new();
        let t2 = AtomicMatchExpression::new();
        let t3 = AtomicMatchExpression::new();
        let f1 = FalseMatchExpression::new();
        let f2 = FalseMatchExpression::new();

        assert!(t1.equivalent(&t1));
        assert!(t1.equivalent(&t2) && t2.equivalent(&t1));
        assert!(t2.equivalent(&t3) && t1.equivalent(&t3));
        assert!(f1.equivalent(&f2) && f2.equivalent(&f1));
        assert!(!t1.equivalent(&f1));
        assert!(!f1.equivalent(&t1));
    }

    #[test]
    fn test_debug_rendering() {
        let t = AtomicMatchExpression::new();
        let f = FalseMatchExpression::new();

        assert_eq!(t.to_debug_string(), "$atomic\n");
        assert_eq!(f.to_debug_string(), "$false\n");
        assert_eq!(t.to_debug_string(), t.to_debug_string());
        assert_ne!(t.to_debug_string(), f.to_debug_string());

        let mut debug = String::new();
        f.debug_string(&mut debug, 2);
        assert_eq!(debug, "        $false\n");
    }

    #[test]
    fn test_taxonomy() {
        assert_eq!(MatchType::Nor.category(), MatchCategory::Tree);
        assert_eq!(MatchType::ElemMatchValue.category(), MatchCategory::Array);
        assert_eq!(MatchType::Nin.category(), MatchCategory::Leaf);
        assert_eq!(MatchType::Where.category(), MatchCategory::Special);
        assert_eq!(AtomicMatchExpression::new().match_type().category(), MatchCategory::Degenerate);
        assert_eq!(FalseMatchExpression::new().match_type().category(), MatchCategory::Degenerate);
        assert_eq!(MatchType::AlwaysFalse.to_string(), "$false");
    }

    #[test]
    fn test_tree_traversal_and_rendering() -> Result<()> {
        let tree = AndNode {
            children: vec![
                Box::new(AtomicMatchExpression::new()),
                Box::new(AndNode { children: vec![Box::new(FalseMatchExpression::new())] }),
            ],
        };

        assert_eq!(tree.num_children(), 2);
        assert_eq!(tree.get_child(1).map(|c| c.num_children()), Some(1));
        assert!(tree.get_child(2).is_none());
        let kinds: Vec<_> = children(&tree).map(|c| c.match_type()).collect();
        assert_eq!(kinds, vec![MatchType::Atomic, MatchType::And]);

        assert_eq!(tree.to_debug_string(), "$and\n    $atomic\n    $and\n        $false\n");
        let empty: JsonNode = "{}".parse()?;
        assert!(!tree.matches_json(&empty, None)?);
        Ok(())
    }

    #[test]
    fn test_tree_equivalence_is_positional() {
        let build = |first_true: bool| -> AndNode {
            let (a, b): (Box<dyn MatchExpression>, Box<dyn MatchExpression>) = if first_true {
                (Box::new(AtomicMatchExpression::new()), Box::new(FalseMatchExpression::new()))
            } else {
                (Box::new(FalseMatchExpression::new()), Box::new(AtomicMatchExpression::new()))
            };
            AndNode { children: vec![a, b] }
        };

        assert!(build(true).equivalent(&build(true)));
        assert!(!build(true).equivalent(&build(false)));

        let shorter = AndNode { children: vec![Box::new(AtomicMatchExpression::new())] };
        assert!(!build(true).equivalent(&shorter));
        assert!(!shorter.equivalent(&AtomicMatchExpression::new()));
    }

    #[test]
    fn test_leaf_equivalence_compares_state() -> Result<()> {
        let exists = |path: &str| -> Result<ExistsNode> { Ok(ExistsNode { path: FieldPath::parse(path)? }) };
        let on_a = exists("a")?;
        let on_b = exists("b")?;

        let doc: JsonNode = r#"{"a": 1}"#.parse()?;
        assert!(on_a.matches_json(&doc, None)?);
        assert!(!on_b.matches_json(&doc, None)?);

        assert!(on_a.equivalent(&exists("a")?));
        assert!(!on_a.equivalent(&on_b));
        assert!(!on_b.equivalent(&on_a));
        assert!(!on_a.equivalent(&AtomicMatchExpression::new()));

        let wrap = |leaf: ExistsNode| AndNode {
            children: vec![Box::new(AtomicMatchExpression::new()), Box::new(leaf)],
        };
        assert!(wrap(exists("a")?).equivalent(&wrap(exists("a")?)));
        assert!(!wrap(exists("a")?).equivalent(&wrap(exists("b")?)));
        assert!(!wrap(exists("b")?).equivalent(&wrap(exists("a")?)));
        Ok(())
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "reports 2 children but has none at index 0")]
    fn test_missing_child_is_an_invariant_violation() {
        let _ = children(&HollowNode).count();
    }

    #[test]
    fn test_details_reported_by_array_aware_node() -> Result<()> {
        let exists = ExistsNode { path: FieldPath::parse("items.k")? };
        let doc: JsonNode = r#"{"items": [5, {"k": true}]}"#.parse()?;

        let mut details = MatchDetails::new();
        details.request_array_offset();
        assert!(exists.matches_json(&doc, Some(&mut details))?);
        assert_eq!(details.array_offset(), Some(1));

        assert!(exists.matches_json(&doc, None)?);
        Ok(())
    }

    #[test]
    fn test_document_failure_propagates() {
        let broken = BrokenDocument { root: JsonNode::Object(vec![]) };
        let exists = ExistsNode { path: FieldPath::parse("a").unwrap() };
        assert!(exists.matches(&broken, None).is_err());

        let tree = AndNode { children: vec![Box::new(AtomicMatchExpression::new()), Box::new(exists)] };
        assert!(tree.matches(&broken, None).is_err());

        // degenerate nodes never consult the document
        assert!(AtomicMatchExpression::new().matches(&broken, None).unwrap());
    }

    #[test]
    fn test_non_object_document_rejected() -> Result<()> {
        let value: JsonNode = "5".parse()?;
        assert!(AtomicMatchExpression::new().matches_json(&value, None).is_err());
        Ok(())
    }

    #[test]
    fn test_shared_across_threads() -> Result<()> {
        let t: Arc<dyn MatchExpression> = Arc::new(AtomicMatchExpression::new());
        let results = thread::scope(|scope| {
            let handles: Vec<_> = (0..100)
                .map(|i| {
                    let t = Arc::clone(&t);
                    scope.spawn(move || -> Result<bool> {
                        let doc: JsonNode = format!(r#"{{"i": {}, "tags": ["t{}"]}}"#, i, i).parse()?;
                        t.matches_json(&doc, None)
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        });

        assert_eq!(results.len(), 100);
        for result in results {
            match result {
                Ok(matched) => assert!(matched?),
                Err(_) => bail!("matcher thread panicked"),
            }
        }
        Ok(())
    }
}
