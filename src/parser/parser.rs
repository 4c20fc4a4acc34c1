//! Recursive descent parser for Ruby block structure
//!
//! Builds a rowan GreenNode tree from tokens. Only the constructs that open a
//! block closed by `end` (and the declarations the indexer cares about) get
//! nodes; every other token is attached in place, so the CST is lossless and
//! each node's range runs from its keyword to the end of its `end`.

use super::errors::{ErrorCode, SyntaxError};
use super::lexer::{Lexer, Token};
use super::syntax_kind::SyntaxKind;
use rowan::{GreenNode, GreenNodeBuilder, TextRange, TextSize};

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone)]
pub struct Parse {
    pub green: GreenNode,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse Ruby source code into a CST
pub fn parse(input: &str) -> Parse {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::new(&tokens);
    parser.parse_source_file();
    parser.finish()
}

/// Calls that take the statement they start as their argument list
const MIXIN_CALLS: &[&str] = &["include", "prepend", "extend"];
const VISIBILITY_CALLS: &[&str] = &[
    "private",
    "protected",
    "public",
    "module_function",
    "private_class_method",
    "public_class_method",
];
const ATTR_CALLS: &[&str] = &["attr_reader", "attr_writer", "attr_accessor", "attr"];

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
    /// Last non-trivia token consumed
    prev: Option<SyntaxKind>,
    /// Open `(`, `[` and `{` with their ranges
    delimiters: Vec<(SyntaxKind, TextRange)>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            pos: 0,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
            prev: None,
            delimiters: Vec::new(),
        }
    }

    fn finish(self) -> Parse {
        Parse {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> SyntaxKind {
        self.current().map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    fn current_text(&self) -> &'a str {
        self.tokens.get(self.pos).map(|t| t.text).unwrap_or("")
    }

    fn current_range(&self) -> TextRange {
        self.current()
            .map(|t| TextRange::at(t.offset, TextSize::of(t.text)))
            .unwrap_or_else(|| TextRange::empty(self.end_offset()))
    }

    fn end_offset(&self) -> TextSize {
        self.tokens
            .last()
            .map(|t| t.offset + TextSize::of(t.text))
            .unwrap_or_default()
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        !self.at_eof() && self.current_kind() == kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        !self.at_eof() && kinds.contains(&self.current_kind())
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Kind of the token `n` positions ahead, trivia included
    fn raw_nth(&self, n: usize) -> SyntaxKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(SyntaxKind::ERROR)
    }

    /// Look ahead, skipping trivia
    fn nth(&self, n: usize) -> SyntaxKind {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .nth(n)
            .map(|t| t.kind)
            .unwrap_or(SyntaxKind::ERROR)
    }

    fn at_terminator(&self) -> bool {
        self.at_eof() || self.current_kind().is_terminator()
    }

    /// `end` that closes the innermost open block (not `range.end` or `end:`)
    fn at_block_end(&self) -> bool {
        self.at(SyntaxKind::END_KW) && !self.keyword_is_name()
    }

    /// Keywords after `.`, `&.` or `::`, or written as `label:`, are plain names.
    fn keyword_is_name(&self) -> bool {
        matches!(
            self.prev,
            Some(SyntaxKind::DOT | SyntaxKind::AMP_DOT | SyntaxKind::COLON_COLON)
        ) || self.raw_nth(1) == SyntaxKind::COLON
    }

    /// Where a conditional keyword starts a statement rather than acting as a modifier
    fn at_statement_start(&self) -> bool {
        match self.prev {
            None => true,
            Some(kind) => matches!(
                kind,
                SyntaxKind::NEWLINE
                    | SyntaxKind::SEMICOLON
                    | SyntaxKind::L_PAREN
                    | SyntaxKind::L_BRACKET
                    | SyntaxKind::L_BRACE
                    | SyntaxKind::COMMA
                    | SyntaxKind::EQ
                    | SyntaxKind::OPERATOR
                    | SyntaxKind::LT_LT
                    | SyntaxKind::PIPE
                    | SyntaxKind::FAT_ARROW
                    | SyntaxKind::THEN_KW
                    | SyntaxKind::ELSE_KW
                    | SyntaxKind::DO_KW
                    | SyntaxKind::BEGIN_KW
                    | SyntaxKind::ENSURE_KW
            ),
        }
    }

    fn at_line_start(&self) -> bool {
        matches!(
            self.prev,
            None | Some(SyntaxKind::NEWLINE | SyntaxKind::SEMICOLON)
        )
    }

    fn at_const_path(&self) -> bool {
        self.at(SyntaxKind::CONSTANT)
            || (self.at(SyntaxKind::COLON_COLON) && self.raw_nth(1) == SyntaxKind::CONSTANT)
    }

    /// `private :x` is a call; `private = 1` and `private.foo` are not.
    fn at_command_call(&self) -> bool {
        !matches!(
            self.nth(1),
            SyntaxKind::EQ | SyntaxKind::OPERATOR | SyntaxKind::DOT | SyntaxKind::AMP_DOT
        )
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn bump(&mut self) {
        let Some(token) = self.current() else {
            return;
        };
        let (kind, text, range) = (token.kind, token.text, self.current_range());
        self.builder.token(kind.into(), text);
        self.pos += 1;

        match kind {
            k if k.is_trivia() => return,
            SyntaxKind::ERROR => self.lexical_error(text, range),
            SyntaxKind::L_PAREN | SyntaxKind::L_BRACKET | SyntaxKind::L_BRACE => {
                self.delimiters.push((kind, range));
            }
            SyntaxKind::R_PAREN | SyntaxKind::R_BRACKET | SyntaxKind::R_BRACE => {
                self.close_delimiter(kind, range);
            }
            _ => {}
        }
        self.prev = Some(kind);
    }

    fn skip_trivia(&mut self) {
        while self.current().is_some_and(|t| t.kind.is_trivia()) {
            self.bump();
        }
    }

    fn close_delimiter(&mut self, closer: SyntaxKind, range: TextRange) {
        let expected = match closer {
            SyntaxKind::R_PAREN => SyntaxKind::L_PAREN,
            SyntaxKind::R_BRACKET => SyntaxKind::L_BRACKET,
            _ => SyntaxKind::L_BRACE,
        };
        match self.delimiters.pop() {
            Some((open, _)) if open == expected => {}
            Some((_, open_range)) => self.errors.push(
                SyntaxError::builder(ErrorCode::E0207)
                    .range(range)
                    .related("opened here", open_range)
                    .build(),
            ),
            None => self.errors.push(
                SyntaxError::builder(ErrorCode::E0205)
                    .message(format!("unexpected closing delimiter '{}'", closer_text(closer)))
                    .range(range)
                    .build(),
            ),
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, code: ErrorCode, message: impl Into<String>) {
        let range = self.current_range();
        self.errors.push(SyntaxError::new(message, range, code));
    }

    fn lexical_error(&mut self, text: &str, range: TextRange) {
        let code = if text.starts_with("=begin") {
            ErrorCode::E0103
        } else {
            match text.chars().next() {
                Some('"' | '\'' | '`' | '%' | ':') => ErrorCode::E0102,
                Some('/') => ErrorCode::E0105,
                _ if text.chars().count() == 1 => ErrorCode::E0101,
                _ => ErrorCode::E0104,
            }
        };
        let message = match code {
            ErrorCode::E0101 => format!("invalid character '{}'", text),
            other => other.default_message().to_string(),
        };
        self.errors.push(SyntaxError::new(message, range, code));
    }

    /// Consume the `end` of a block, or report it missing at end of input.
    fn finish_block(&mut self, opened: TextRange, description: &str) {
        if self.at_block_end() {
            self.bump();
            return;
        }
        let keyword = description.split(' ').next().unwrap_or(description);
        self.errors.push(
            SyntaxError::builder(ErrorCode::E0201)
                .message(format!("missing 'end' for {}", description))
                .range(TextRange::empty(self.end_offset()))
                .hint("every class, module, def and block needs a matching 'end'")
                .related(format!("{} opened here", keyword), opened)
                .build(),
        );
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    fn start_node(&mut self, kind: SyntaxKind) {
        self.builder.start_node(kind.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    // =========================================================================
    // Grammar rules
    // =========================================================================

    /// SourceFile = Statement*
    fn parse_source_file(&mut self) {
        self.start_node(SyntaxKind::SOURCE_FILE);

        while !self.at_eof() {
            if self.at_block_end() {
                self.error(ErrorCode::E0202, "unexpected 'end' with no open block");
                self.start_node(SyntaxKind::ERROR);
                self.bump();
                self.finish_node();
                continue;
            }
            self.parse_element();
        }

        for (open, range) in std::mem::take(&mut self.delimiters) {
            let code = match open {
                SyntaxKind::L_PAREN => ErrorCode::E0203,
                SyntaxKind::L_BRACKET => ErrorCode::E0204,
                _ => ErrorCode::E0206,
            };
            self.errors.push(
                SyntaxError::builder(code)
                    .range(TextRange::empty(self.end_offset()))
                    .related("opened here", range)
                    .build(),
            );
        }

        self.finish_node();
    }

    /// Statements up to (not including) the `end` of the current block
    fn parse_statements(&mut self) {
        while !self.at_eof() && !self.at_block_end() {
            self.parse_element();
        }
    }

    /// One token, or one construct if the current token opens one.
    fn parse_element(&mut self) {
        let kind = self.current_kind();
        if kind.is_keyword() && self.keyword_is_name() {
            self.bump();
            return;
        }

        match kind {
            SyntaxKind::CLASS_KW if self.nth(1) == SyntaxKind::LT_LT => {
                self.parse_singleton_class()
            }
            SyntaxKind::CLASS_KW => self.parse_class(),
            SyntaxKind::MODULE_KW => self.parse_module(),
            SyntaxKind::DEF_KW => self.parse_method_def(),
            SyntaxKind::BEGIN_KW | SyntaxKind::CASE_KW | SyntaxKind::DO_KW => {
                self.parse_end_block()
            }
            SyntaxKind::IF_KW | SyntaxKind::UNLESS_KW if self.at_statement_start() => {
                self.parse_end_block()
            }
            SyntaxKind::FOR_KW => self.parse_loop_block(),
            SyntaxKind::WHILE_KW | SyntaxKind::UNTIL_KW if self.at_statement_start() => {
                self.parse_loop_block()
            }
            SyntaxKind::IDENT if self.at_line_start() => self.parse_call_statement(),
            _ => self.bump(),
        }
    }

    /// Elements up to the end of the current statement.
    ///
    /// Newlines inside open delimiters or nested blocks do not end it.
    fn parse_expression(&mut self) {
        let depth = self.delimiters.len();
        while !self.at_eof() {
            if self.delimiters.len() <= depth {
                let closes_outer = self.at_any(&[
                    SyntaxKind::R_PAREN,
                    SyntaxKind::R_BRACKET,
                    SyntaxKind::R_BRACE,
                ]);
                if self.at_terminator() || self.at_block_end() || closes_outer {
                    break;
                }
            }
            self.parse_element();
        }
    }

    /// A delimiter and everything up to its matching closer
    fn parse_balanced(&mut self) {
        let depth = self.delimiters.len();
        self.bump();
        while !self.at_eof() && self.delimiters.len() > depth {
            self.parse_element();
        }
    }

    /// ConstPath = '::'? CONSTANT ('::' CONSTANT)*
    fn parse_const_path(&mut self) -> Option<String> {
        if !self.at_const_path() {
            return None;
        }
        self.start_node(SyntaxKind::CONST_PATH);
        let mut path = String::new();
        if self.at(SyntaxKind::COLON_COLON) {
            path.push_str("::");
            self.bump();
        }
        loop {
            path.push_str(self.current_text());
            self.bump();
            if self.at(SyntaxKind::COLON_COLON) && self.raw_nth(1) == SyntaxKind::CONSTANT {
                path.push_str("::");
                self.bump();
            } else {
                break;
            }
        }
        self.finish_node();
        Some(path)
    }

    /// ClassDef = 'class' ConstPath Superclass? Body 'end'
    fn parse_class(&mut self) {
        let opened = self.current_range();
        self.start_node(SyntaxKind::CLASS_DEF);
        self.bump();
        self.skip_trivia();

        let name = self.parse_const_path();
        if name.is_none() {
            self.errors.push(
                SyntaxError::builder(ErrorCode::E0301)
                    .message("expected class name after 'class'")
                    .range(self.current_range())
                    .hint("class names are constants and start with an uppercase letter")
                    .build(),
            );
        }
        self.skip_trivia();

        if self.at(SyntaxKind::LT) {
            self.start_node(SyntaxKind::SUPERCLASS);
            self.bump();
            self.skip_trivia();
            if self.at_terminator() {
                self.error(ErrorCode::E0302, "expected superclass after '<'");
            } else {
                self.parse_const_path();
                self.parse_expression();
            }
            self.finish_node();
        }

        self.parse_body();
        let description = format!("class {}", name.as_deref().unwrap_or("<anonymous>"));
        self.finish_block(opened, &description);
        self.finish_node();
    }

    /// SingletonClass = 'class' '<<' Expr Body 'end'
    fn parse_singleton_class(&mut self) {
        let opened = self.current_range();
        self.start_node(SyntaxKind::SINGLETON_CLASS);
        self.bump();
        self.skip_trivia();
        self.bump(); // <<
        self.skip_trivia();
        if self.at_terminator() {
            self.error(ErrorCode::E0304, "expected object after 'class <<'");
        } else {
            self.parse_expression();
        }
        self.parse_body();
        self.finish_block(opened, "class << block");
        self.finish_node();
    }

    /// ModuleDef = 'module' ConstPath Body 'end'
    fn parse_module(&mut self) {
        let opened = self.current_range();
        self.start_node(SyntaxKind::MODULE_DEF);
        self.bump();
        self.skip_trivia();

        let name = self.parse_const_path();
        if name.is_none() {
            self.errors.push(
                SyntaxError::builder(ErrorCode::E0301)
                    .message("expected module name after 'module'")
                    .range(self.current_range())
                    .hint("module names are constants and start with an uppercase letter")
                    .build(),
            );
        }

        self.parse_body();
        let description = format!("module {}", name.as_deref().unwrap_or("<anonymous>"));
        self.finish_block(opened, &description);
        self.finish_node();
    }

    fn parse_body(&mut self) {
        self.start_node(SyntaxKind::BODY);
        self.parse_statements();
        self.finish_node();
    }

    /// MethodDef = 'def' Receiver? MethodName ParamList? (Body 'end' | '=' Expr)
    fn parse_method_def(&mut self) {
        let opened = self.current_range();
        self.start_node(SyntaxKind::METHOD_DEF);
        self.bump();
        self.skip_trivia();

        if self.at_any(&[SyntaxKind::SELF_KW, SyntaxKind::CONSTANT, SyntaxKind::IDENT])
            && self.raw_nth(1) == SyntaxKind::DOT
        {
            self.start_node(SyntaxKind::METHOD_RECEIVER);
            self.bump();
            self.bump();
            self.finish_node();
        }

        let Some(name) = self.parse_method_name() else {
            self.errors.push(
                SyntaxError::builder(ErrorCode::E0303)
                    .message("expected method name after 'def'")
                    .range(self.current_range())
                    .related("definition started here", opened)
                    .build(),
            );
            self.parse_body();
            self.finish_block(opened, "def");
            self.finish_node();
            return;
        };

        self.skip_trivia();
        if self.at(SyntaxKind::L_PAREN) {
            self.start_node(SyntaxKind::PARAM_LIST);
            self.parse_balanced();
            self.finish_node();
            self.skip_trivia();
        } else if !self.at_terminator() && !self.at(SyntaxKind::EQ) {
            self.start_node(SyntaxKind::PARAM_LIST);
            self.parse_expression();
            self.finish_node();
        }

        if self.at(SyntaxKind::EQ) {
            // Endless definition: the body is the rest of the statement
            self.bump();
            self.skip_trivia();
            self.start_node(SyntaxKind::BODY);
            self.parse_expression();
            self.finish_node();
            self.finish_node();
            return;
        }

        self.parse_body();
        self.finish_block(opened, &format!("def {}", name));
        self.finish_node();
    }

    /// MethodName = IDENT | CONSTANT | keyword | operator | '[]' ; with a glued
    /// `=` for setters and a glued `@` for unary operators
    fn parse_method_name(&mut self) -> Option<String> {
        let kind = self.current_kind();
        let is_name = matches!(
            kind,
            SyntaxKind::IDENT
                | SyntaxKind::CONSTANT
                | SyntaxKind::OPERATOR
                | SyntaxKind::LT
                | SyntaxKind::LT_LT
                | SyntaxKind::SLASH
                | SyntaxKind::PIPE
                | SyntaxKind::L_BRACKET
        ) || kind.is_keyword();
        if self.at_eof() || !is_name {
            return None;
        }

        self.start_node(SyntaxKind::METHOD_NAME);
        let mut name = String::from(self.current_text());
        self.bump();

        match kind {
            SyntaxKind::L_BRACKET if self.at(SyntaxKind::R_BRACKET) => {
                name.push(']');
                self.bump();
                if self.at(SyntaxKind::EQ) {
                    name.push('=');
                    self.bump();
                }
            }
            SyntaxKind::OPERATOR if self.at(SyntaxKind::OPERATOR) && self.current_text() == "@" => {
                name.push('@');
                self.bump();
            }
            SyntaxKind::IDENT | SyntaxKind::CONSTANT
                if self.at(SyntaxKind::EQ) && self.raw_nth(1) == SyntaxKind::L_PAREN =>
            {
                name.push('=');
                self.bump();
            }
            k if k.is_keyword()
                && self.at(SyntaxKind::EQ)
                && self.raw_nth(1) == SyntaxKind::L_PAREN =>
            {
                name.push('=');
                self.bump();
            }
            _ => {}
        }

        self.finish_node();
        Some(name)
    }

    /// EndBlock = ('begin' | 'case' | 'do' | 'if' | 'unless') ... 'end'
    fn parse_end_block(&mut self) {
        let opened = self.current_range();
        let keyword = self.current_text();
        self.start_node(SyntaxKind::END_BLOCK);
        self.bump();
        self.parse_statements();
        self.finish_block(opened, &format!("'{}' block", keyword));
        self.finish_node();
    }

    /// LoopBlock = ('while' | 'until' | 'for') Header 'do'? ... 'end'
    ///
    /// The optional `do` belongs to the loop header and does not open a block.
    fn parse_loop_block(&mut self) {
        let opened = self.current_range();
        let keyword = self.current_text();
        self.start_node(SyntaxKind::END_BLOCK);
        self.bump();

        let depth = self.delimiters.len();
        while !self.at_eof() {
            let at_rest = self.delimiters.len() <= depth;
            if at_rest && self.at(SyntaxKind::DO_KW) {
                self.bump();
                break;
            }
            if at_rest && (self.at_terminator() || self.at_block_end()) {
                break;
            }
            self.parse_element();
        }

        self.parse_statements();
        self.finish_block(opened, &format!("'{}' block", keyword));
        self.finish_node();
    }

    /// Statement-initial identifiers that may be declaration-level calls
    fn parse_call_statement(&mut self) {
        let text = self.current_text();
        if !self.at_command_call() {
            self.bump();
        } else if MIXIN_CALLS.contains(&text) {
            self.parse_mixin_call();
        } else if VISIBILITY_CALLS.contains(&text) {
            self.parse_visibility_call();
        } else if ATTR_CALLS.contains(&text) {
            self.parse_attr_call();
        } else {
            self.bump();
        }
    }

    /// MixinCall = ('include' | 'prepend' | 'extend') '('? ConstPath (',' ConstPath)* ')'?
    fn parse_mixin_call(&mut self) {
        self.start_node(SyntaxKind::MIXIN_CALL);
        self.bump();

        let depth = self.delimiters.len();
        while !self.at_eof() {
            if self.delimiters.len() <= depth && (self.at_terminator() || self.at_block_end()) {
                break;
            }
            if self.at_const_path() {
                self.parse_const_path();
            } else {
                self.parse_element();
            }
        }

        self.finish_node();
    }

    /// VisibilityCall = ('private' | 'protected' | ...) (Symbol | MethodDef | AttrCall)*
    fn parse_visibility_call(&mut self) {
        self.start_node(SyntaxKind::VISIBILITY_CALL);
        self.bump();

        let depth = self.delimiters.len();
        while !self.at_eof() {
            if self.delimiters.len() <= depth && (self.at_terminator() || self.at_block_end()) {
                break;
            }
            if self.at(SyntaxKind::IDENT) && ATTR_CALLS.contains(&self.current_text()) {
                self.parse_attr_call();
            } else {
                self.parse_element();
            }
        }

        self.finish_node();
    }

    /// AttrCall = ('attr_reader' | 'attr_writer' | 'attr_accessor') Symbol (',' Symbol)*
    fn parse_attr_call(&mut self) {
        self.start_node(SyntaxKind::ATTR_CALL);
        self.bump();
        self.parse_expression();
        self.finish_node();
    }
}

fn closer_text(kind: SyntaxKind) -> &'static str {
    match kind {
        SyntaxKind::R_PAREN => ")",
        SyntaxKind::R_BRACKET => "]",
        _ => "}",
    }
}
