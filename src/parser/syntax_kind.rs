//! Syntax kinds for the Rowan-based CST
//!
//! This enum defines every node and token kind the structural Ruby parser
//! produces. Only the constructs that decide block structure (and therefore
//! where a class or module opening ends) get their own kinds; everything else
//! is carried through as plain tokens so the tree stays lossless.

/// All syntax kinds (tokens and nodes) of the Ruby CST
///
/// Tokens are leaf nodes (identifiers, keywords, punctuation).
/// Nodes are composite (class and module openings, method definitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA (preserved but not semantically meaningful)
    // =========================================================================
    WHITESPACE = 0,
    COMMENT,         // # ...
    EMBDOC,          // =begin ... =end
    HEREDOC_BODY,    // lines following a heredoc opener, terminator included
    DATA_SECTION,    // __END__ and everything after it

    /// Line break; significant because it terminates statements
    NEWLINE,

    // =========================================================================
    // LITERALS AND NAMES
    // =========================================================================
    IDENT,           // foo, foo?, foo!
    CONSTANT,        // Foo
    IVAR,            // @foo
    CVAR,            // @@foo
    GVAR,            // $foo
    SYMBOL,          // :foo, :"foo"
    INTEGER,         // 42
    FLOAT,           // 3.14
    STRING,          // "...", '...', `...`
    PERCENT_LITERAL, // %w[...], %i(...), %q{...}
    REGEX,           // /.../
    HEREDOC_START,   // <<~EOS

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    L_PAREN,         // (
    R_PAREN,         // )
    L_BRACKET,       // [
    R_BRACKET,       // ]
    L_BRACE,         // {
    R_BRACE,         // }
    COLON_COLON,     // ::
    COLON,           // :
    SEMICOLON,       // ;
    COMMA,           // ,
    DOT,             // .
    AMP_DOT,         // &.
    EQ,              // =
    LT,              // <
    LT_LT,           // <<
    SLASH,           // /
    PIPE,            // |
    ARROW,           // ->
    FAT_ARROW,       // =>
    OPERATOR,        // every other operator (==, +, &&, ...)

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    ALIAS_KW,
    AND_KW,
    BEGIN_KW,
    BREAK_KW,
    CASE_KW,
    CLASS_KW,
    DEF_KW,
    DEFINED_KW,
    DO_KW,
    ELSE_KW,
    ELSIF_KW,
    END_KW,
    ENSURE_KW,
    FALSE_KW,
    FOR_KW,
    IF_KW,
    IN_KW,
    MODULE_KW,
    NEXT_KW,
    NIL_KW,
    NOT_KW,
    OR_KW,
    REDO_KW,
    RESCUE_KW,
    RETRY_KW,
    RETURN_KW,
    SELF_KW,
    SUPER_KW,
    THEN_KW,
    TRUE_KW,
    UNDEF_KW,
    UNLESS_KW,
    UNTIL_KW,
    WHEN_KW,
    WHILE_KW,
    YIELD_KW,

    // =========================================================================
    // NODES
    // =========================================================================
    SOURCE_FILE,
    /// `class Name [< Superclass] ... end`
    CLASS_DEF,
    /// `module Name ... end`
    MODULE_DEF,
    /// `class << self ... end`
    SINGLETON_CLASS,
    /// `def [receiver.]name[(params)] ... end` or `def name = expr`
    METHOD_DEF,
    /// `Foo::Bar` in a declaration header or mixin argument
    CONST_PATH,
    /// `< Expr` of a class header
    SUPERCLASS,
    /// `self.` / `Const.` before a method name
    METHOD_RECEIVER,
    METHOD_NAME,
    PARAM_LIST,
    /// Statements between a header and its `end`
    BODY,
    /// `include Foo`, `prepend Foo`, `extend Foo`
    MIXIN_CALL,
    /// `private`, `protected`, `public`, `module_function`
    VISIBILITY_CALL,
    /// `attr_reader :a`, `attr_writer :a`, `attr_accessor :a`
    ATTR_CALL,
    /// `do`/`begin`/`case`/`if`/`unless`/`while`/`until`/`for` ... `end`
    END_BLOCK,

    // Special
    ERROR,

    #[doc(hidden)]
    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace, comments, skipped text)
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::WHITESPACE
                | Self::COMMENT
                | Self::EMBDOC
                | Self::HEREDOC_BODY
                | Self::DATA_SECTION
        )
    }

    /// Check if this is a keyword
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::ALIAS_KW as u16) && (self as u16) <= (Self::YIELD_KW as u16)
    }

    /// Check if this is a punctuation token
    pub fn is_punct(self) -> bool {
        (self as u16) >= (Self::L_PAREN as u16) && (self as u16) <= (Self::OPERATOR as u16)
    }

    /// Check if this token terminates a statement
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::NEWLINE | Self::SEMICOLON)
    }

    /// Keywords that open a block closed by `end` when they start a statement
    pub fn opens_end_block(self) -> bool {
        matches!(
            self,
            Self::BEGIN_KW
                | Self::CASE_KW
                | Self::DO_KW
                | Self::FOR_KW
                | Self::IF_KW
                | Self::UNLESS_KW
                | Self::UNTIL_KW
                | Self::WHILE_KW
        )
    }

    /// Check if this is a literal
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::INTEGER
                | Self::FLOAT
                | Self::STRING
                | Self::SYMBOL
                | Self::PERCENT_LITERAL
                | Self::REGEX
                | Self::HEREDOC_START
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RubyLanguage {}

impl rowan::Language for RubyLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<RubyLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<RubyLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<RubyLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<RubyLanguage>;
