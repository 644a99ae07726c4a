/// Identifies an entity within its owning [`Document`] arena.
///
/// Parent links are plain arena indices, kept separate from the owning child
/// lists, so the graph can carry back-references without ownership cycles.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, PartialEq, Clone)]
pub enum EntityKind {
    /// A named group of colors and/or nested palettes. The document root is
    /// an unnamed Palette.
    Palette,
    /// A named color; its children are ColorValue alternates of one color.
    Color,
    /// A literal color representation. The entity's name is derived from the
    /// literal: "rgb"/"rgba" for hex lengths 3/6 and 4/8, or the function
    /// name for function-call syntax.
    ColorValue { value: String },
    /// A dotted path to another entry, resolved lazily on access.
    Reference { path: Vec<String> },
}

#[derive(Debug, PartialEq, Clone)]
pub struct Entity {
    /// Empty for the root palette and for anonymous metadata values.
    pub name: String,
    /// 0-based source line, for diagnostics.
    pub line: usize,
    pub kind: EntityKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) metadata: Vec<Metadata>,
}

/// A namespaced annotation attached to an entity, e.g. `oct/view`.
#[derive(Debug, PartialEq, Clone)]
pub struct Metadata {
    pub name: String,
    pub line: usize,
    pub value: MetaValue,
}

/// A coerced metadata value. Color and reference values live as anonymous
/// entities in the document arena (parented at the owning entity) so that
/// references embedded in metadata resolve through the same lexical scope.
#[derive(Debug, PartialEq, Clone)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Entity(NodeId),
    Text(String),
}

/// The materialized entity graph. `nodes[0]` is the unnamed root palette.
#[derive(Debug, Default)]
pub struct Document {
    pub(crate) nodes: Vec<Entity>,
}

impl Document {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entity: Entity) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(entity);
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> &Entity {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Entity {
        &mut self.nodes[id.0]
    }

    /// First child of `id` with the given name, in insertion order.
    pub(crate) fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|c| self.node(*c).name == name)
    }

    /// Total number of entities in the arena, anonymous metadata values
    /// included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Derives a color value's entity name from its literal.
///
/// Hex literals classify by digit count: 3/6 → "rgb", 4/8 → "rgba", anything
/// else is malformed. Function-call literals take the function's name.
pub(crate) fn color_value_name(value: &str) -> Result<String, ColorSyntaxError> {
    if let Some(digits) = value.strip_prefix('#') {
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorSyntaxError::MalformedHex);
        }
        return match digits.len() {
            3 | 6 => Ok("rgb".to_string()),
            4 | 8 => Ok("rgba".to_string()),
            _ => Err(ColorSyntaxError::MalformedHex),
        };
    }

    if let Some(open) = value.find('(') {
        let name = &value[..open];
        let is_ident = !name.is_empty()
            && name
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if is_ident && value.ends_with(')') {
            return Ok(name.to_string());
        }
    }

    Err(ColorSyntaxError::Unrecognized)
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum ColorSyntaxError {
    MalformedHex,
    Unrecognized,
}

/// Splits `=a.b.c` into its path segments. `None` when the leading `=` is
/// missing.
pub(crate) fn parse_reference_path(text: &str) -> Option<Vec<String>> {
    let path = text.strip_prefix('=')?;
    Some(path.split('.').map(|s| s.trim().to_string()).collect())
}
