use crate::ast::{Document, EntityKind, NodeId};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Object(BTreeMap<String, Value>),
}

pub(crate) fn to_value(doc: &Document, id: NodeId) -> Value {
    let node = doc.node(id);
    match &node.kind {
        EntityKind::ColorValue { value } => Value::String(value.clone()),
        // References export as their literal path text. Serialization never
        // forces resolution: resolution is lazy and can fail or cycle.
        EntityKind::Reference { path } => Value::String(format!("={}", path.join("."))),
        EntityKind::Palette | EntityKind::Color => {
            let mut map = BTreeMap::new();
            for &child in &node.children {
                map.insert(doc.node(child).name.clone(), to_value(doc, child));
            }
            // Metadata annotations are not part of the exported data.
            Value::Object(map)
        }
    }
}
