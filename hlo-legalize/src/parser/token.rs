use std::fmt::Display;
use std::fmt::Formatter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Markers
    Eof,
    /// A character that is not valid in this position.
    Error,

    // Identifiers
    /// foo, stablehlo.token
    BareIdentifier,
    /// @foo
    AtIdentifier,
    /// %foo, %0#1
    PercentIdentifier,
    /// ^bb0
    CaretIdentifier,
    /// #stablehlo, #stablehlo.gather
    HashIdentifier,

    // Literals
    /// 1.0
    FloatLiteral,
    /// 42
    Integer,
    /// "foo"
    String,

    // Punctuation
    /// ->
    Arrow,
    /// :
    Colon,
    /// ,
    Comma,
    /// =
    Equal,
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// -
    Minus,
    /// !
    Exclamation,
    /// >
    Greater,
    /// <
    Less,
    /// ?
    Question,
    /// *
    Star,
    /// The `x` between dimensions in `tensor<4x?xf32>`.
    DimensionSeparator,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// The line number of the token.
    line: usize,
    /// The column number of the token.
    column: usize,
    /// The character location in the raw source string.
    start: usize,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "loc(:{}:{})", self.line, self.column)
    }
}

impl Location {
    pub fn new(line: usize, column: usize, start: usize) -> Self {
        Self {
            line,
            column,
            start,
        }
    }
    pub fn line(&self) -> usize {
        self.line
    }
    pub fn column(&self) -> usize {
        self.column
    }
    pub fn start(&self) -> usize {
        self.start
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// The kind of token, such as `@foo` (AtIdentifier) or `42` (Integer).
    pub kind: TokenKind,
    /// The text of the token as it appears in the source.
    pub lexeme: String,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: String, location: Location) -> Self {
        Self {
            kind,
            lexeme,
            location,
        }
    }
    pub fn line(&self) -> usize {
        self.location.line()
    }
    pub fn column(&self) -> usize {
        self.location.column()
    }
    /// Character offset just past the end of the token.
    pub fn end(&self) -> usize {
        self.location.start() + self.lexeme.chars().count()
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} \"{}\" {}", self.kind, self.lexeme, self.location)
    }
}
