use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum PalError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Value(#[from] ValueError),
}

impl PalError {
    /// The 0-based source line the error was raised on.
    /// Display machinery (miette) renders positions 1-based on its own.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            PalError::Syntax(e) => e.line(),
            PalError::Semantic(e) => e.line(),
            PalError::Value(e) => e.line(),
        }
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum SyntaxError {
    #[error("Too many colons")]
    #[diagnostic(
        code(pal::syntax::too_many_colons),
        help("A line holds at most one ':' separating a name from its value or opening a group.")
    )]
    TooManyColons {
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("this line has more than two fields")]
        span: SourceSpan,
    },

    #[error("Malformed metagroup declaration '{name}'")]
    #[diagnostic(
        code(pal::syntax::unclosed_metagroup),
        help("A metagroup must end with '/' or be closed with a colon, e.g. `oct/` or `oct/sub:`.")
    )]
    UnclosedMetagroup {
        name: String,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("missing closing '/' or ':'")]
        span: SourceSpan,
    },
}

impl SyntaxError {
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            SyntaxError::TooManyColons { line, .. }
            | SyntaxError::UnclosedMetagroup { line, .. } => *line,
        }
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum SemanticError {
    #[error("Color '{name}' contains both color values and a subpalette")]
    #[diagnostic(
        code(pal::semantic::color_with_subpalette),
        help("An entry holding bare color values is a color; colors cannot nest further groups.")
    )]
    MixedColorAndPalette {
        name: String,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("this entry mixes color values with a nested group")]
        span: SourceSpan,
    },

    #[error("Color '{name}' contains both color values and other named colors")]
    #[diagnostic(
        code(pal::semantic::color_with_named_colors),
        help("An entry holding bare color values is a color; move the named entries into a sibling group.")
    )]
    MixedColorAndNamedColors {
        name: String,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("this entry mixes color values with named entries")]
        span: SourceSpan,
    },

    #[error("{kind} '{name}' can't have children")]
    #[diagnostic(
        code(pal::semantic::leaf_with_children),
        help("Color values and metadata entries are leaves; nothing may be nested under them.")
    )]
    LeafWithChildren {
        kind: &'static str,
        name: String,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("children are nested under this leaf")]
        span: SourceSpan,
    },
}

impl SemanticError {
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            SemanticError::MixedColorAndPalette { line, .. }
            | SemanticError::MixedColorAndNamedColors { line, .. }
            | SemanticError::LeafWithChildren { line, .. } => *line,
        }
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum ValueError {
    #[error("Malformed hex value '{value}'")]
    #[diagnostic(
        code(pal::value::malformed_hex),
        help("Hex colors use 3 or 6 digits (rgb) or 4 or 8 digits (rgba), e.g. #f00 or #ff0000cc.")
    )]
    MalformedHex {
        value: String,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("not a valid hex color")]
        span: SourceSpan,
    },

    #[error("Invalid color value '{value}'")]
    #[diagnostic(
        code(pal::value::unrecognized_color),
        help("A color value is either a hex literal like #f00 or a function call like rgb(255, 0, 0).")
    )]
    UnrecognizedColorValue {
        value: String,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("not a recognized color syntax")]
        span: SourceSpan,
    },

    #[error("Invalid reference '{value}'")]
    #[diagnostic(
        code(pal::value::invalid_reference),
        help("References start with '=' followed by a dotted path, e.g. =group.color.")
    )]
    InvalidReference {
        value: String,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("missing the leading '='")]
        span: SourceSpan,
    },
}

impl ValueError {
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            ValueError::MalformedHex { line, .. }
            | ValueError::UnrecognizedColorValue { line, .. }
            | ValueError::InvalidReference { line, .. } => *line,
        }
    }
}
