//! Branch/loop semantics derived from connection handles.
//!
//! Conditional and loop nodes expose named connection points. When an
//! edge is drawn from or to one of them, the edge gains a condition tag
//! (read by execution), a display label, and a stroke color. The mapping
//! is fixed; handles not listed here leave the edge untouched.
//!
//! When both endpoints match (no handle pair in the current node set
//! does, but imported documents may) the target-side resolution is
//! applied second and overwrites the source-side condition, label, and
//! stroke. Unrelated keys in `data`/`style` are preserved either way.

use crate::edge::Edge;
use crate::node::JsonObject;

/// The semantics a matched handle confers on an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleSemantics {
    /// Condition tag stored under the edge's `data.condition` key.
    pub condition: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Stroke color stored under the edge's `style.stroke` key.
    pub stroke: &'static str,
}

/// Source-side handle mappings.
const SOURCE_HANDLES: &[(&str, HandleSemantics)] = &[
    (
        "ifTrue",
        HandleSemantics {
            condition: "if_true",
            label: "IF TRUE",
            stroke: "#4ade80",
        },
    ),
    (
        "ifFalse",
        HandleSemantics {
            condition: "if_false",
            label: "IF FALSE",
            stroke: "#f87171",
        },
    ),
    (
        "loopBody",
        HandleSemantics {
            condition: "loop_body",
            label: "LOOP BODY",
            stroke: "#38bdf8",
        },
    ),
    (
        "loopAfter",
        HandleSemantics {
            condition: "loop_next",
            label: "AFTER LOOP",
            stroke: "#7c3aed",
        },
    ),
];

/// Target-side handle mappings.
const TARGET_HANDLES: &[(&str, HandleSemantics)] = &[
    (
        "loopContinue",
        HandleSemantics {
            condition: "loop_continue",
            label: "CONTINUE",
            stroke: "#22c55e",
        },
    ),
    (
        "loopBreak",
        HandleSemantics {
            condition: "loop_break",
            label: "BREAK",
            stroke: "#f43f5e",
        },
    ),
];

fn lookup(table: &'static [(&str, HandleSemantics)], handle: &str) -> Option<HandleSemantics> {
    table
        .iter()
        .find(|(name, _)| *name == handle)
        .map(|(_, semantics)| *semantics)
}

/// Resolves a source-side handle ID.
#[must_use]
pub fn resolve_source(handle: &str) -> Option<HandleSemantics> {
    lookup(SOURCE_HANDLES, handle)
}

/// Resolves a target-side handle ID.
#[must_use]
pub fn resolve_target(handle: &str) -> Option<HandleSemantics> {
    lookup(TARGET_HANDLES, handle)
}

/// Applies handle semantics to an edge in place.
///
/// Source-side resolution is applied first, target-side second; existing
/// `condition`/`label`/`stroke` values are overwritten by each
/// application, while sibling keys in `data` and `style` are kept.
pub fn annotate(edge: &mut Edge) {
    let source = edge.source_handle.as_deref().and_then(resolve_source);
    let target = edge.target_handle.as_deref().and_then(resolve_target);

    for semantics in [source, target].into_iter().flatten() {
        apply(edge, semantics);
    }
}

fn apply(edge: &mut Edge, semantics: HandleSemantics) {
    edge.data
        .get_or_insert_with(JsonObject::new)
        .insert("condition".to_string(), semantics.condition.into());
    edge.label = Some(semantics.label.to_string());
    edge.style
        .get_or_insert_with(JsonObject::new)
        .insert("stroke".to_string(), semantics.stroke.into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Connection;

    #[test]
    fn source_handles_resolve() {
        let semantics = resolve_source("ifTrue").expect("known handle");
        assert_eq!(semantics.condition, "if_true");
        assert_eq!(semantics.label, "IF TRUE");
        assert_eq!(semantics.stroke, "#4ade80");

        assert_eq!(resolve_source("loopAfter").unwrap().condition, "loop_next");
    }

    #[test]
    fn target_handles_resolve() {
        let semantics = resolve_target("loopBreak").expect("known handle");
        assert_eq!(semantics.condition, "loop_break");
        assert_eq!(semantics.stroke, "#f43f5e");
    }

    #[test]
    fn unknown_handles_resolve_to_none() {
        assert_eq!(resolve_source("loopContinue"), None); // target-side only
        assert_eq!(resolve_target("ifTrue"), None); // source-side only
        assert_eq!(resolve_source("output"), None);
    }

    #[test]
    fn annotate_sets_condition_label_and_stroke() {
        let mut edge = Edge::from_connection(
            Connection::new("cond", "next").with_source_handle("ifFalse"),
        );
        annotate(&mut edge);

        assert_eq!(edge.condition(), Some("if_false"));
        assert_eq!(edge.label.as_deref(), Some("IF FALSE"));
        assert_eq!(edge.stroke(), Some("#f87171"));
    }

    #[test]
    fn annotate_preserves_sibling_keys() {
        let mut edge = Edge::from_connection(
            Connection::new("cond", "next").with_source_handle("ifTrue"),
        );
        let mut data = JsonObject::new();
        data.insert("condition".to_string(), serde_json::json!("stale"));
        data.insert("note".to_string(), serde_json::json!("keep me"));
        edge.data = Some(data);
        let mut style = JsonObject::new();
        style.insert("strokeWidth".to_string(), serde_json::json!(2));
        edge.style = Some(style);

        annotate(&mut edge);

        assert_eq!(edge.condition(), Some("if_true"));
        let data = edge.data.as_ref().unwrap();
        assert_eq!(data["note"], "keep me");
        let style = edge.style.as_ref().unwrap();
        assert_eq!(style["strokeWidth"], 2);
        assert_eq!(style["stroke"], "#4ade80");
    }

    #[test]
    fn target_resolution_overwrites_source_resolution() {
        let mut edge = Edge::from_connection(
            Connection::new("a", "loop")
                .with_source_handle("ifTrue")
                .with_target_handle("loopContinue"),
        );
        annotate(&mut edge);

        // Both sides match; the target side is applied last.
        assert_eq!(edge.condition(), Some("loop_continue"));
        assert_eq!(edge.label.as_deref(), Some("CONTINUE"));
        assert_eq!(edge.stroke(), Some("#22c55e"));
    }

    #[test]
    fn annotate_without_handles_is_a_no_op() {
        let mut edge = Edge::new("e1", "a", "b");
        annotate(&mut edge);
        assert_eq!(edge.data, None);
        assert_eq!(edge.label, None);
        assert_eq!(edge.style, None);
    }
}
