use crate::ast::{Document, EntityKind, MetaValue, Metadata, NodeId};
use crate::error::PalError;
use crate::parser::Parser;
use crate::resolver;
use crate::serialization::{to_value, Value};
use serde::{Serialize, Serializer};
use std::fmt::Display;

/// Parses PAL source into its materialized entity graph.
///
/// This is the primary entry point. The returned [`Document`] owns the whole
/// graph; navigation happens through the borrow-carrying [`EntityRef`]
/// handles starting at [`Document::root`].
///
/// # Arguments
///
/// * `source` - The PAL source text.
/// * `file_name` - The name shown in error reports.
///
/// # Errors
///
/// Returns a [`PalError`] on the first syntax, semantic or value-format
/// error; there is no partial result. Unresolvable references are NOT parse
/// errors — they surface as `None` at resolution time.
pub fn parse(source: &str, file_name: &str) -> Result<Document, PalError> {
    let mut parser = Parser::new_with_name(source, file_name.to_string());
    parser.parse_document()
}

impl Document {
    /// The unnamed root palette.
    #[must_use]
    pub fn root(&self) -> EntityRef<'_> {
        EntityRef {
            doc: self,
            id: NodeId(0),
        }
    }

    /// The entity behind an id, for callers that stored one.
    #[must_use]
    pub fn entity(&self, id: NodeId) -> EntityRef<'_> {
        EntityRef { doc: self, id }
    }

    /// Serializes the palette structure into a generic, serializable `Value`.
    /// Metadata annotations are not part of the exported data; references
    /// export as their literal `=path` text without being resolved.
    #[must_use]
    pub fn to_value(&self) -> Value {
        to_value(self, NodeId(0))
    }

    /// Serializes the palette structure into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the palette structure into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

/// A borrowed handle onto one entity of a [`Document`].
///
/// Handles are cheap to copy and never outlive the document. All queries are
/// computed on access; nothing is cached.
#[derive(Debug, Clone, Copy)]
pub struct EntityRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> EntityRef<'a> {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Empty for the root palette and anonymous metadata values.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.doc.node(self.id).name
    }

    /// 0-based source line the entity was declared on.
    #[must_use]
    pub fn line(&self) -> usize {
        self.doc.node(self.id).line
    }

    #[must_use]
    pub fn kind(&self) -> &'a EntityKind {
        &self.doc.node(self.id).kind
    }

    #[must_use]
    pub fn is_palette(&self) -> bool {
        matches!(self.kind(), EntityKind::Palette)
    }

    #[must_use]
    pub fn is_color(&self) -> bool {
        matches!(self.kind(), EntityKind::Color)
    }

    #[must_use]
    pub fn is_color_value(&self) -> bool {
        matches!(self.kind(), EntityKind::ColorValue { .. })
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self.kind(), EntityKind::Reference { .. })
    }

    /// Child lookup by name, first match in insertion order.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<EntityRef<'a>> {
        let id = self.doc.child_by_name(self.id, name)?;
        Some(EntityRef { doc: self.doc, id })
    }

    /// Child lookup by position.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<EntityRef<'a>> {
        let id = *self.doc.node(self.id).children.get(index)?;
        Some(EntityRef { doc: self.doc, id })
    }

    pub fn children(&self) -> impl Iterator<Item = EntityRef<'a>> + 'a {
        let doc = self.doc;
        doc.node(self.id)
            .children
            .iter()
            .map(move |id| EntityRef { doc, id: *id })
    }

    #[must_use]
    pub fn parent(&self) -> Option<EntityRef<'a>> {
        let id = self.doc.node(self.id).parent?;
        Some(EntityRef { doc: self.doc, id })
    }

    /// The literal text of a color value. `None` for other kinds.
    #[must_use]
    pub fn value(&self) -> Option<&'a str> {
        match self.kind() {
            EntityKind::ColorValue { value } => Some(value),
            _ => None,
        }
    }

    /// Follows this entity to its final non-reference target.
    ///
    /// Non-reference entities resolve to themselves. A reference re-walks the
    /// scope chain on every call and chains through reference targets. An
    /// unresolvable path yields `None`, never an error. Reference cycles are
    /// not detected and recurse without bound.
    #[must_use]
    pub fn resolved(&self) -> Option<EntityRef<'a>> {
        let id = resolver::resolve_entity(self.doc, self.id)?;
        Some(EntityRef { doc: self.doc, id })
    }

    /// The preferred hex representation of a color: its "rgb" value if
    /// present, else "rgba". On a reference, the resolved target's.
    #[must_use]
    pub fn hexcolor(&self) -> Option<&'a str> {
        match self.kind() {
            EntityKind::Color => self
                .get("rgb")
                .or_else(|| self.get("rgba"))
                .and_then(|v| v.value()),
            EntityKind::Reference { .. } => self.resolved()?.hexcolor(),
            _ => None,
        }
    }

    /// Metadata lookup by exact namespaced name, with fallback: a reference
    /// that misses locally falls through to its resolved target's metadata.
    #[must_use]
    pub fn metadata(&self, name: &str) -> Option<MetaRef<'a>> {
        let entry = resolver::lookup_metadata(self.doc, self.id, name)?;
        Some(MetaRef {
            doc: self.doc,
            entry,
        })
    }

    /// The entity's own metadata entries, in declaration order. Fallback
    /// sources are not merged in.
    pub fn metadata_entries(&self) -> impl Iterator<Item = MetaRef<'a>> + 'a {
        let doc = self.doc;
        doc.node(self.id)
            .metadata
            .iter()
            .map(move |entry| MetaRef { doc, entry })
    }
}

/// A borrowed handle onto one metadata entry.
#[derive(Debug, Clone, Copy)]
pub struct MetaRef<'a> {
    doc: &'a Document,
    entry: &'a Metadata,
}

impl<'a> MetaRef<'a> {
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.entry.name
    }

    #[must_use]
    pub fn line(&self) -> usize {
        self.entry.line
    }

    #[must_use]
    pub fn value(&self) -> MetaValueRef<'a> {
        match &self.entry.value {
            MetaValue::Bool(b) => MetaValueRef::Bool(*b),
            MetaValue::Int(n) => MetaValueRef::Int(*n),
            MetaValue::Float(f) => MetaValueRef::Float(*f),
            MetaValue::Entity(id) => MetaValueRef::Entity(EntityRef {
                doc: self.doc,
                id: *id,
            }),
            MetaValue::Text(t) => MetaValueRef::Text(t),
        }
    }
}

/// A coerced metadata value as seen through the handle API. Color and
/// reference values surface as entity handles.
#[derive(Debug, Clone, Copy)]
pub enum MetaValueRef<'a> {
    Bool(bool),
    Int(i64),
    Float(f64),
    Entity(EntityRef<'a>),
    Text(&'a str),
}

impl<'a> MetaValueRef<'a> {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValueRef::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValueRef::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            MetaValueRef::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            MetaValueRef::Text(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_entity(&self) -> Option<EntityRef<'a>> {
        match self {
            MetaValueRef::Entity(e) => Some(*e),
            _ => None,
        }
    }

    /// Follows an embedded reference (or color value) to its final entity.
    #[must_use]
    pub fn resolved(&self) -> Option<EntityRef<'a>> {
        self.as_entity()?.resolved()
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Palette => write!(f, "palette"),
            EntityKind::Color => write!(f, "color"),
            EntityKind::ColorValue { value } => write!(f, "color value '{value}'"),
            EntityKind::Reference { path } => write!(f, "reference '={}'", path.join(".")),
        }
    }
}
