//! Lazy scope-based resolution of references and metadata fallback.
//!
//! Everything here is a pure function of the document and a node: nothing is
//! cached, and repeated lookups re-walk the scope chain. That keeps results
//! reproducible at the cost of repeated work, which is acceptable for the
//! palette-sized documents PAL targets.

use crate::ast::{Document, EntityKind, Metadata, NodeId};

/// Resolves a dotted `path` starting the search at `scope`.
///
/// The first segment is looked up among `scope`'s children; remaining
/// segments walk strictly downward from there, with no ancestor fallback
/// mid-path. When the first segment misses (or the downward walk dies), the
/// whole path restarts from `scope`'s parent. Exhausting the root yields
/// `None` — an unresolved reference is not an error.
pub fn resolve_path(doc: &Document, scope: NodeId, path: &[String]) -> Option<NodeId> {
    if path.is_empty() {
        return None;
    }
    let mut scope = Some(scope);
    while let Some(s) = scope {
        if let Some(hit) = lookup_down(doc, s, path) {
            return Some(hit);
        }
        scope = doc.node(s).parent;
    }
    log::trace!("no match for path {path:?}");
    None
}

fn lookup_down(doc: &Document, scope: NodeId, path: &[String]) -> Option<NodeId> {
    let mut current = doc.child_by_name(scope, &path[0])?;
    for segment in &path[1..] {
        current = doc.child_by_name(current, segment)?;
    }
    Some(current)
}

/// Follows `id` to its final non-reference target.
///
/// Non-reference entities resolve to themselves. A reference resolves its
/// path from its enclosing scope and, when the target is itself a reference,
/// recurses through it. There is no cycle detection: a direct or indirect
/// reference cycle recurses without bound.
pub fn resolve_entity(doc: &Document, id: NodeId) -> Option<NodeId> {
    let node = doc.node(id);
    let EntityKind::Reference { path } = &node.kind else {
        return Some(id);
    };
    let start = node.parent?;
    let target = resolve_path(doc, start, path)?;
    match doc.node(target).kind {
        EntityKind::Reference { .. } => resolve_entity(doc, target),
        _ => Some(target),
    }
}

/// The ordered list of secondary metadata providers for `id`, consulted when
/// a lookup misses the entity's own list. Only references populate it (with
/// their fully resolved target), but the mechanism is an ordered chain.
pub fn fallback_sources(doc: &Document, id: NodeId) -> Vec<NodeId> {
    match doc.node(id).kind {
        EntityKind::Reference { .. } => resolve_entity(doc, id).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Looks up metadata by exact namespaced name: the entity's own entries
/// first, then each fallback source in order.
pub fn lookup_metadata<'a>(
    doc: &'a Document,
    id: NodeId,
    name: &str,
) -> Option<&'a Metadata> {
    let find = |candidate: NodeId| {
        doc.node(candidate)
            .metadata
            .iter()
            .find(|m| m.name == name)
    };
    if let Some(meta) = find(id) {
        return Some(meta);
    }
    fallback_sources(doc, id).into_iter().find_map(find)
}
