use crate::ast::{self, ColorSyntaxError, Document, Entity, EntityKind, MetaValue, Metadata, NodeId};
use crate::error::{PalError, SemanticError, SyntaxError, ValueError};
use crate::lexer::{Lexer, Line};
use crate::utils::join_meta_name;
use miette::{NamedSource, SourceSpan};
use std::sync::Arc;

/// Kinds a raw tree node can carry before and during type resolution.
///
/// `Palette`, `Value` and `Colorvalue` are what the line grammar can see;
/// type resolution rewrites them into `Color`, `Metavalue` or `Reference`
/// where the surrounding structure disambiguates. `Metagroup` and `Metavalue`
/// never survive into the materialized graph.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum RawKind {
    Root,
    Palette,
    Metagroup,
    Color,
    Colorvalue,
    Metavalue,
    Value,
    Reference,
}

#[derive(Debug)]
pub(crate) struct RawNode {
    pub kind: RawKind,
    pub name: String,
    pub value: Option<String>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub meta: Vec<RawMeta>,
    pub line: usize,
    pub pos_start: usize,
    pub pos_end: usize,
}

/// A metadata entry hoisted out of the structural tree, still in raw text
/// form. Coercion happens at materialization.
#[derive(Debug, Clone)]
pub(crate) struct RawMeta {
    pub name: String,
    pub value: String,
    pub line: usize,
    pub pos_start: usize,
    pub pos_end: usize,
}

/// The PAL parsing pipeline: indentation-driven tree construction, type
/// disambiguation, metadata normalization and materialization into the typed
/// entity graph. The generic tree is mutated in place between stages; the
/// typed graph is built once at the end.
#[derive(Debug)]
pub struct Parser {
    source: Arc<NamedSource<String>>,
    lines: Vec<Line>,
    nodes: Vec<RawNode>,
}

impl Parser {
    pub fn new(source_text: &str) -> Self {
        Self::new_with_name(source_text, "source.pal".to_string())
    }

    pub fn new_with_name(source_text: &str, name: String) -> Self {
        let source = Arc::new(NamedSource::new(name, source_text.to_string()));
        let lines = Lexer::new(source_text).lex();
        log::debug!("lexed {} lines", lines.len());
        Self {
            source,
            lines,
            nodes: Vec::new(),
        }
    }

    /// Runs the whole pipeline and returns the materialized entity graph.
    /// Fatal on the first error; there is no partial result.
    pub fn parse_document(&mut self) -> Result<Document, PalError> {
        self.build_tree()?;
        self.resolve_types(0)?;
        self.normalize_metadata(0);
        self.materialize()
    }

    // === TreeBuilder ===

    /// Folds the line stream into a generic nested tree. The cursor follows
    /// indentation: deeper lines descend into the most-recently-added child,
    /// shallower lines pop the level stack (a dedent may close several levels
    /// at once), equal indentation stays put.
    fn build_tree(&mut self) -> Result<(), PalError> {
        self.nodes.clear();
        self.nodes.push(RawNode {
            kind: RawKind::Root,
            name: String::new(),
            value: None,
            parent: None,
            children: Vec::new(),
            meta: Vec::new(),
            line: 0,
            pos_start: 0,
            pos_end: 0,
        });

        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut current = 0usize;
        let mut current_indent = 0usize;

        for i in 0..self.lines.len() {
            let line = self.lines[i].clone();
            if line.is_blank() {
                continue;
            }

            if line.indent > current_indent {
                // Descend into the latest child. A deeper line with nothing
                // to descend into keeps the cursor and adopts the indent,
                // which lets uniformly base-indented documents parse.
                if let Some(&last) = self.nodes[current].children.last() {
                    stack.push((current_indent, current));
                    current = last;
                }
                current_indent = line.indent;
            } else if line.indent < current_indent {
                while current_indent > line.indent {
                    match stack.pop() {
                        Some((indent, node)) => {
                            current_indent = indent;
                            current = node;
                        }
                        None => break,
                    }
                }
                current_indent = line.indent;
            }

            let node = self.classify(&line)?;
            let idx = self.nodes.len();
            self.nodes.push(RawNode {
                parent: Some(current),
                ..node
            });
            self.nodes[current].children.push(idx);
        }
        Ok(())
    }

    /// The line classification table. Field counts and their shapes decide
    /// the raw kind; anything with more than two fields is a syntax error.
    fn classify(&self, line: &Line) -> Result<RawNode, PalError> {
        let make = |kind: RawKind, name: &str, value: Option<&str>| RawNode {
            kind,
            name: name.to_string(),
            value: value.map(str::to_string),
            parent: None,
            children: Vec::new(),
            meta: Vec::new(),
            line: line.number,
            pos_start: line.pos_start,
            pos_end: line.pos_end,
        };

        match line.fields.as_slice() {
            // `name:` opens a group; a '/' in the name makes it a metagroup.
            [name, rest] if rest.is_empty() => {
                if name.contains('/') {
                    Ok(make(RawKind::Metagroup, name, None))
                } else {
                    Ok(make(RawKind::Palette, name, None))
                }
            }
            [text] => {
                if text.ends_with('/') {
                    // `oct/` shorthand for an open metagroup.
                    Ok(make(RawKind::Metagroup, text, None))
                } else if text.contains('/') {
                    Err(SyntaxError::UnclosedMetagroup {
                        name: text.clone(),
                        line: line.number,
                        src: self.src(),
                        span: line_span(line),
                    }
                    .into())
                } else if text.starts_with('=') {
                    Ok(make(RawKind::Reference, "", Some(text)))
                } else {
                    Ok(make(RawKind::Colorvalue, "", Some(text)))
                }
            }
            [name, value] => {
                if name.contains('/') {
                    Ok(make(RawKind::Metavalue, name, Some(value)))
                } else {
                    Ok(make(RawKind::Value, name, Some(value)))
                }
            }
            _ => Err(SyntaxError::TooManyColons {
                line: line.number,
                src: self.src(),
                span: line_span(line),
            }
            .into()),
        }
    }

    // === TypeResolver ===

    /// Pre-order disambiguation pass: a node's children are classified before
    /// recursing into them, so grandchildren kinds are still raw when a
    /// palette is inspected for promotion to color.
    fn resolve_types(&mut self, idx: usize) -> Result<(), PalError> {
        for i in 0..self.nodes[idx].children.len() {
            let child = self.nodes[idx].children[i];
            match self.nodes[child].kind {
                RawKind::Palette => {
                    let kinds: Vec<RawKind> = self.nodes[child]
                        .children
                        .iter()
                        .map(|c| self.nodes[*c].kind)
                        .collect();
                    if kinds.contains(&RawKind::Colorvalue) {
                        let node = &self.nodes[child];
                        if kinds.contains(&RawKind::Palette) {
                            return Err(SemanticError::MixedColorAndPalette {
                                name: node.name.clone(),
                                line: node.line,
                                src: self.src(),
                                span: node_span(node),
                            }
                            .into());
                        }
                        if kinds.contains(&RawKind::Value) {
                            return Err(SemanticError::MixedColorAndNamedColors {
                                name: node.name.clone(),
                                line: node.line,
                                src: self.src(),
                                span: node_span(node),
                            }
                            .into());
                        }
                        self.nodes[child].kind = RawKind::Color;
                    }
                }
                RawKind::Value => {
                    if self.nodes[idx].kind == RawKind::Metagroup {
                        self.nodes[child].kind = RawKind::Metavalue;
                        self.ensure_leaf("Metavalue", child)?;
                    } else if self.nodes[child]
                        .value
                        .as_deref()
                        .is_some_and(|v| v.starts_with('='))
                    {
                        self.nodes[child].kind = RawKind::Reference;
                    } else {
                        // A plain `name: literal` is a color with one
                        // implicit color value; the scalar moves down.
                        self.nodes[child].kind = RawKind::Color;
                        let literal = self.nodes[child].value.take();
                        let leaf = RawNode {
                            kind: RawKind::Colorvalue,
                            name: String::new(),
                            value: literal,
                            parent: Some(child),
                            children: Vec::new(),
                            meta: Vec::new(),
                            line: self.nodes[child].line,
                            pos_start: self.nodes[child].pos_start,
                            pos_end: self.nodes[child].pos_end,
                        };
                        let leaf_idx = self.nodes.len();
                        self.nodes.push(leaf);
                        self.nodes[child].children.push(leaf_idx);
                    }
                }
                RawKind::Metavalue => self.ensure_leaf("Metavalue", child)?,
                RawKind::Colorvalue => self.ensure_leaf("Color value", child)?,
                _ => {}
            }
            self.resolve_types(child)?;
        }
        Ok(())
    }

    fn ensure_leaf(&self, kind: &'static str, idx: usize) -> Result<(), PalError> {
        let node = &self.nodes[idx];
        if node.children.is_empty() {
            return Ok(());
        }
        let display = if node.name.is_empty() {
            node.value.clone().unwrap_or_default()
        } else {
            node.name.clone()
        };
        Err(SemanticError::LeafWithChildren {
            kind,
            name: display,
            line: node.line,
            src: self.src(),
            span: node_span(node),
        }
        .into())
    }

    // === MetadataNormalizer ===

    /// Bottom-up hoisting of metagroup/metavalue nodes into the `meta` lists
    /// of their owning structural nodes. Metagroup names join onto their
    /// entries with '/', doubled separators collapsed. After this pass only
    /// palette/color/colorvalue/reference nodes remain reachable; re-running
    /// it is a no-op.
    fn normalize_metadata(&mut self, idx: usize) {
        for i in 0..self.nodes[idx].children.len() {
            let child = self.nodes[idx].children[i];
            self.normalize_metadata(child);
        }

        let children = std::mem::take(&mut self.nodes[idx].children);
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            match self.nodes[child].kind {
                RawKind::Metavalue => {
                    let node = &self.nodes[child];
                    let entry = RawMeta {
                        name: node.name.clone(),
                        value: node.value.clone().unwrap_or_default(),
                        line: node.line,
                        pos_start: node.pos_start,
                        pos_end: node.pos_end,
                    };
                    self.nodes[idx].meta.push(entry);
                }
                RawKind::Metagroup => {
                    let prefix = self.nodes[child].name.clone();
                    let collected = std::mem::take(&mut self.nodes[child].meta);
                    for mut entry in collected {
                        entry.name = join_meta_name(&prefix, &entry.name);
                        self.nodes[idx].meta.push(entry);
                    }
                }
                _ => kept.push(child),
            }
        }
        self.nodes[idx].children = kept;
    }

    // === Materializer ===

    /// Converts the normalized generic tree into the typed entity graph,
    /// deriving color value names, parsing reference paths and coercing
    /// metadata scalars.
    fn materialize(&self) -> Result<Document, PalError> {
        let mut doc = Document::new();
        self.materialize_node(0, None, &mut doc)?;
        log::debug!("materialized {} entities", doc.len());
        Ok(doc)
    }

    fn materialize_node(
        &self,
        idx: usize,
        parent: Option<NodeId>,
        doc: &mut Document,
    ) -> Result<NodeId, PalError> {
        let raw = &self.nodes[idx];
        let (name, kind) = match raw.kind {
            RawKind::Root | RawKind::Palette => (raw.name.clone(), EntityKind::Palette),
            RawKind::Color => (raw.name.clone(), EntityKind::Color),
            RawKind::Colorvalue => {
                let value = raw.value.clone().unwrap_or_default();
                let name = self.color_name(&value, raw)?;
                (name, EntityKind::ColorValue { value })
            }
            RawKind::Reference => {
                let text = raw.value.clone().unwrap_or_default();
                let path = ast::parse_reference_path(&text).ok_or_else(|| {
                    ValueError::InvalidReference {
                        value: text.clone(),
                        line: raw.line,
                        src: self.src(),
                        span: node_span(raw),
                    }
                })?;
                (raw.name.clone(), EntityKind::Reference { path })
            }
            RawKind::Metagroup | RawKind::Metavalue | RawKind::Value => {
                unreachable!("metadata and ambiguous nodes are eliminated before materialization")
            }
        };

        let id = doc.push(Entity {
            name,
            line: raw.line,
            kind,
            parent,
            children: Vec::new(),
            metadata: Vec::new(),
        });
        for &child in &raw.children {
            let child_id = self.materialize_node(child, Some(id), doc)?;
            doc.node_mut(id).children.push(child_id);
        }
        for entry in &raw.meta {
            let value = self.coerce_meta(entry, id, doc);
            doc.node_mut(id).metadata.push(Metadata {
                name: entry.name.clone(),
                line: entry.line,
                value,
            });
        }
        Ok(id)
    }

    fn color_name(&self, value: &str, raw: &RawNode) -> Result<String, PalError> {
        ast::color_value_name(value).map_err(|e| match e {
            ColorSyntaxError::MalformedHex => ValueError::MalformedHex {
                value: value.to_string(),
                line: raw.line,
                src: self.src(),
                span: node_span(raw),
            }
            .into(),
            ColorSyntaxError::Unrecognized => ValueError::UnrecognizedColorValue {
                value: value.to_string(),
                line: raw.line,
                src: self.src(),
                span: node_span(raw),
            }
            .into(),
        })
    }

    /// Metadata value coercion, first match wins. Never fails: a candidate
    /// that does not survive its own parse falls through to the next rule,
    /// and the last rule keeps the raw text.
    fn coerce_meta(&self, entry: &RawMeta, owner: NodeId, doc: &mut Document) -> MetaValue {
        let text = entry.value.as_str();
        if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("yes") {
            return MetaValue::Bool(true);
        }
        if text.eq_ignore_ascii_case("false") || text.eq_ignore_ascii_case("no") {
            return MetaValue::Bool(false);
        }
        if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = text.parse::<i64>() {
                return MetaValue::Int(n);
            }
            if let Ok(f) = text.parse::<f64>() {
                return MetaValue::Float(f);
            }
        }
        if is_float_shape(text) {
            if let Ok(f) = text.parse::<f64>() {
                return MetaValue::Float(f);
            }
        }
        if let Ok(name) = ast::color_value_name(text) {
            let id = doc.push(Entity {
                name,
                line: entry.line,
                kind: EntityKind::ColorValue {
                    value: text.to_string(),
                },
                parent: Some(owner),
                children: Vec::new(),
                metadata: Vec::new(),
            });
            return MetaValue::Entity(id);
        }
        if let Some(path) = ast::parse_reference_path(text) {
            let id = doc.push(Entity {
                name: String::new(),
                line: entry.line,
                kind: EntityKind::Reference { path },
                parent: Some(owner),
                children: Vec::new(),
                metadata: Vec::new(),
            });
            return MetaValue::Entity(id);
        }
        MetaValue::Text(text.to_string())
    }

    fn src(&self) -> NamedSource<String> {
        (*self.source).clone()
    }
}

fn line_span(line: &Line) -> SourceSpan {
    (line.pos_start, line.pos_end - line.pos_start).into()
}

fn node_span(node: &RawNode) -> SourceSpan {
    (node.pos_start, node.pos_end - node.pos_start).into()
}

/// Digits with exactly one dot. All-digit text is the integer rule's job.
fn is_float_shape(text: &str) -> bool {
    let mut dots = 0;
    let mut digits = 0;
    for c in text.chars() {
        match c {
            '.' => dots += 1,
            c if c.is_ascii_digit() => digits += 1,
            _ => return false,
        }
    }
    digits > 0 && dots == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Report;

    fn parse_ok(source: &str) -> Document {
        let mut parser = Parser::new_with_name(source, "test.pal".to_string());
        match parser.parse_document() {
            Ok(doc) => doc,
            Err(err) => {
                let report = Report::from(err);
                panic!("{report:#}");
            }
        }
    }

    fn raw_kinds(parser: &Parser, idx: usize) -> Vec<RawKind> {
        parser.nodes[idx]
            .children
            .iter()
            .map(|c| parser.nodes[*c].kind)
            .collect()
    }

    #[test]
    fn test_empty_document() {
        let doc = parse_ok("");
        assert_eq!(doc.root().children().count(), 0);
    }

    #[test]
    fn test_group_with_color() {
        let doc = parse_ok("group:\n  color: #f00\n");
        let group = doc.root().get("group").unwrap();
        assert!(group.is_palette());
        let color = group.get("color").unwrap();
        assert!(color.is_color());
        assert_eq!(color.get("rgb").unwrap().value(), Some("#f00"));
    }

    #[test]
    fn test_bare_value_lines_become_color_values() {
        let doc = parse_ok("red:\n  #f00\n  rgba(255, 0, 0, 1)\n");
        let red = doc.root().get("red").unwrap();
        assert!(red.is_color());
        assert_eq!(red.get("rgb").unwrap().value(), Some("#f00"));
        assert_eq!(red.get("rgba").unwrap().value(), Some("rgba(255, 0, 0, 1)"));
    }

    #[test]
    fn test_base_indented_document() {
        // Every line indented, heredoc style. The builder adopts the base
        // indent instead of descending into nothing.
        let doc = parse_ok("    group:\n      color: #f00\n");
        let color = doc.root().get("group").unwrap().get("color").unwrap();
        assert_eq!(color.get("rgb").unwrap().value(), Some("#f00"));
    }

    #[test]
    fn test_multi_level_dedent() {
        let doc = parse_ok("a:\n  b:\n    c: #00f\nd: #0f0\n");
        assert!(doc.root().get("d").unwrap().is_color());
        let c = doc
            .root()
            .get("a")
            .unwrap()
            .get("b")
            .unwrap()
            .get("c")
            .unwrap();
        assert_eq!(c.hexcolor(), Some("#00f"));
    }

    #[test]
    fn test_classification_table() {
        let mut parser = Parser::new(
            "group:\noct/meta:\noct/\n=a.b\n#f00\noct/k: v\nplain: v\n",
        );
        parser.build_tree().unwrap();
        assert_eq!(
            raw_kinds(&parser, 0),
            vec![
                RawKind::Palette,
                RawKind::Metagroup,
                RawKind::Metagroup,
                RawKind::Reference,
                RawKind::Colorvalue,
                RawKind::Metavalue,
                RawKind::Value,
            ]
        );
    }

    #[test]
    fn test_metadata_hoisting() {
        let doc = parse_ok("group:\n  oct/view: simple\n  color: #f00\n");
        let group = doc.root().get("group").unwrap();
        // The metavalue left the structural tree.
        assert_eq!(group.children().count(), 1);
        assert_eq!(
            group.metadata("oct/view").unwrap().value().as_str(),
            Some("simple")
        );
    }

    #[test]
    fn test_metagroup_block_hoisting() {
        let doc = parse_ok("group:\n  oct/:\n    view: simple\n    showValue: true\n  color: #f00\n");
        let group = doc.root().get("group").unwrap();
        assert_eq!(
            group.metadata("oct/view").unwrap().value().as_str(),
            Some("simple")
        );
        assert_eq!(
            group.metadata("oct/showValue").unwrap().value().as_bool(),
            Some(true)
        );
    }

    #[test]
    fn test_nested_metagroup_names_join() {
        let doc = parse_ok("group:\n  oct/:\n    ui/:\n      view: large\n  color: #f00\n");
        let group = doc.root().get("group").unwrap();
        assert!(group.metadata("oct/ui/view").is_some());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let source = "group:\n  oct/:\n    view: simple\n  color: #f00\n";
        let mut parser = Parser::new(source);
        parser.build_tree().unwrap();
        parser.resolve_types(0).unwrap();
        parser.normalize_metadata(0);

        let meta_after_one: Vec<(String, String)> = parser.nodes[1]
            .meta
            .iter()
            .map(|m| (m.name.clone(), m.value.clone()))
            .collect();
        let children_after_one = parser.nodes[1].children.clone();

        parser.normalize_metadata(0);
        let meta_after_two: Vec<(String, String)> = parser.nodes[1]
            .meta
            .iter()
            .map(|m| (m.name.clone(), m.value.clone()))
            .collect();

        assert_eq!(meta_after_one, meta_after_two);
        assert_eq!(children_after_one, parser.nodes[1].children);
        for &child in &parser.nodes[1].children {
            assert!(!matches!(
                parser.nodes[child].kind,
                RawKind::Metagroup | RawKind::Metavalue
            ));
        }
    }

    #[test]
    fn test_metadata_on_color() {
        let doc = parse_ok("color: #f00\n  oct/hint: warm\n");
        let color = doc.root().get("color").unwrap();
        assert!(color.is_color());
        assert_eq!(
            color.metadata("oct/hint").unwrap().value().as_str(),
            Some("warm")
        );
    }

    #[test]
    fn test_reference_with_local_overrides() {
        let doc = parse_ok("group:\n  color: #f00\nref: =group\n  oct/view: large\n");
        let r = doc.root().get("ref").unwrap();
        assert!(r.is_reference());
        assert_eq!(
            r.metadata("oct/view").unwrap().value().as_str(),
            Some("large")
        );
    }

    #[test]
    fn test_meta_coercion() {
        let doc = parse_ok(
            "group:\n  oct/a: true\n  oct/b: no\n  oct/c: 42\n  oct/d: 1.5\n  oct/e: plain text\n  oct/f: #0f0\n  color: #f00\n",
        );
        let group = doc.root().get("group").unwrap();
        let value = |key: &str| group.metadata(key).unwrap().value();
        assert_eq!(value("oct/a").as_bool(), Some(true));
        assert_eq!(value("oct/b").as_bool(), Some(false));
        assert_eq!(value("oct/c").as_int(), Some(42));
        assert_eq!(value("oct/d").as_float(), Some(1.5));
        assert_eq!(value("oct/e").as_str(), Some("plain text"));
        let color = value("oct/f").as_entity().unwrap();
        assert_eq!(color.value(), Some("#0f0"));
    }

    #[test]
    fn test_bad_length_hex_in_metadata_stays_text() {
        // Coercion never fails: an almost-hex literal falls through to text.
        let doc = parse_ok("group:\n  oct/c: #12345\n  color: #f00\n");
        let group = doc.root().get("group").unwrap();
        assert_eq!(
            group.metadata("oct/c").unwrap().value().as_str(),
            Some("#12345")
        );
    }

    #[test]
    fn test_is_float_shape() {
        assert!(is_float_shape("1.5"));
        assert!(is_float_shape(".5"));
        assert!(is_float_shape("12."));
        assert!(!is_float_shape("1.2.3"));
        assert!(!is_float_shape("."));
        assert!(!is_float_shape("1x5"));
        assert!(!is_float_shape("15"));
    }
}
