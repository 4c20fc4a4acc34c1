//! Logos-based lexer for Ruby
//!
//! Fast tokenization using the logos crate. Logos handles the regular part of
//! the language; the [`Lexer`] wrapper handles the context-sensitive
//! literals (regexes, percent literals, interpolated strings, heredoc bodies,
//! `=begin` blocks and `__END__`) by bumping the logos lexer manually.

use std::collections::VecDeque;

use super::syntax_kind::SyntaxKind;
use logos::Logos;
use rowan::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: TextSize,
}

/// A heredoc whose body starts after the current line
#[derive(Debug, Clone)]
struct PendingHeredoc {
    terminator: String,
    /// `<<~` and `<<-` allow an indented terminator
    indented: bool,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    /// Tokens split off a logos token, emitted before lexing resumes
    queued: VecDeque<Token<'a>>,
    heredocs: Vec<PendingHeredoc>,
    at_line_start: bool,
    /// Last token that was not whitespace or a comment
    prev_significant: Option<SyntaxKind>,
    /// Whether whitespace separated the previous token from the current one
    space_before: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            queued: VecDeque::new(),
            heredocs: Vec::new(),
            at_line_start: true,
            prev_significant: None,
            space_before: false,
        }
    }

    /// Take `len` bytes after the last token as one raw token.
    fn raw_token(&mut self, len: usize, kind: SyntaxKind) -> Token<'a> {
        let source = self.inner.source();
        let start = self.inner.span().end;
        let text = &source[start..start + len];
        self.inner.bump(len);
        Token {
            kind,
            text,
            offset: TextSize::new(start as u32),
        }
    }

    /// Trivia that can only begin at the start of a line
    fn line_start_token(&mut self) -> Option<Token<'a>> {
        let rest = self.inner.remainder();
        if rest.is_empty() {
            return None;
        }

        if !self.heredocs.is_empty() {
            let pending = std::mem::take(&mut self.heredocs);
            return Some(match heredoc_body_len(rest, &pending) {
                Some(len) => self.raw_token(len, SyntaxKind::HEREDOC_BODY),
                None => self.raw_token(rest.len(), SyntaxKind::ERROR),
            });
        }

        if starts_line_directive(rest, "=begin") {
            return Some(match embdoc_len(rest) {
                Some(len) => self.raw_token(len, SyntaxKind::EMBDOC),
                None => self.raw_token(rest.len(), SyntaxKind::ERROR),
            });
        }

        if starts_line_directive(rest, "__END__") {
            return Some(self.raw_token(rest.len(), SyntaxKind::DATA_SECTION));
        }

        None
    }

    /// Whether the next token sits where an operand (not an operator) is expected.
    fn expects_operand(&self) -> bool {
        let Some(prev) = self.prev_significant else {
            return true;
        };
        if prev == SyntaxKind::IDENT {
            // `split /,/` is a command call with a regex argument, `a / b` is division
            let next = self.inner.remainder().chars().next();
            return self.space_before && next.is_some_and(|c| !c.is_whitespace());
        }
        // `def /(other)` names an operator method
        prev.is_keyword()
            && !matches!(
                prev,
                SyntaxKind::END_KW | SyntaxKind::SELF_KW | SyntaxKind::DEF_KW
            )
            || matches!(
                prev,
                SyntaxKind::NEWLINE
                    | SyntaxKind::SEMICOLON
                    | SyntaxKind::L_PAREN
                    | SyntaxKind::L_BRACKET
                    | SyntaxKind::L_BRACE
                    | SyntaxKind::COMMA
                    | SyntaxKind::EQ
                    | SyntaxKind::LT
                    | SyntaxKind::LT_LT
                    | SyntaxKind::PIPE
                    | SyntaxKind::ARROW
                    | SyntaxKind::FAT_ARROW
                    | SyntaxKind::COLON
                    | SyntaxKind::OPERATOR
            )
    }

    /// Whether the previous token ends an operand directly before this one (`a<<B`)
    fn glued_to_operand(&self) -> bool {
        !self.space_before
            && matches!(
                self.prev_significant,
                Some(
                    SyntaxKind::IDENT
                        | SyntaxKind::CONSTANT
                        | SyntaxKind::IVAR
                        | SyntaxKind::CVAR
                        | SyntaxKind::GVAR
                        | SyntaxKind::R_PAREN
                        | SyntaxKind::R_BRACKET
                        | SyntaxKind::R_BRACE
                )
            )
    }

    /// Lex the next token from logos, applying context-sensitive rescans.
    fn lex(&mut self) -> Option<Token<'a>> {
        let logos_token = self.inner.next()?;
        let start = self.inner.span().start;

        let kind = match logos_token {
            Ok(LogosToken::Slash | LogosToken::SlashEq) if self.expects_operand() => {
                // `/=` already consumed the first body character
                let rest = self.inner.remainder();
                match scan_delimited(rest, '/', '/', true) {
                    Some(len) => {
                        let flags = rest[len..]
                            .bytes()
                            .take_while(|b| b.is_ascii_alphabetic())
                            .count();
                        self.inner.bump(len + flags);
                        SyntaxKind::REGEX
                    }
                    None => SyntaxKind::ERROR,
                }
            }
            Ok(LogosToken::DoubleQuote) => self.rescan_delimited('"', '"', true),
            Ok(LogosToken::Backtick) => self.rescan_delimited('`', '`', true),
            Ok(LogosToken::PercentStart) => {
                let opener = self.inner.slice();
                let has_letter = opener.len() == 3;
                if !has_letter && !self.expects_operand() {
                    return Some(self.split_percent_operator(start));
                }
                let letter = if has_letter { opener.as_bytes()[1] } else { b'Q' };
                let open = opener.chars().last().unwrap_or('(');
                let close = closing_delimiter(open);
                let interpolate = !matches!(letter, b'q' | b'w' | b'i' | b's');
                match self.rescan_delimited(open, close, interpolate) {
                    SyntaxKind::STRING => SyntaxKind::PERCENT_LITERAL,
                    other => other,
                }
            }
            Ok(LogosToken::HeredocStart) => {
                if self.glued_to_operand() {
                    return Some(self.split_heredoc_opener(start));
                }
                let opener = self.inner.slice();
                self.heredocs.push(parse_heredoc_opener(opener));
                SyntaxKind::HEREDOC_START
            }
            Ok(t) => t.into(),
            Err(()) => SyntaxKind::ERROR,
        };

        Some(Token {
            kind,
            text: self.inner.slice(),
            offset: TextSize::new(start as u32),
        })
    }

    /// Extend the current token to the end of a delimited literal.
    fn rescan_delimited(&mut self, open: char, close: char, interpolate: bool) -> SyntaxKind {
        match scan_delimited(self.inner.remainder(), open, close, interpolate) {
            Some(len) => {
                self.inner.bump(len);
                SyntaxKind::STRING
            }
            None => {
                let rest = self.inner.remainder().len();
                self.inner.bump(rest);
                SyntaxKind::ERROR
            }
        }
    }

    /// `a %(b)` in operator position: the `%` is modulo, the delimiter is its own token.
    fn split_percent_operator(&mut self, start: usize) -> Token<'a> {
        let text = self.inner.slice();
        let (op, delim) = text.split_at(1);
        let delim_kind = match delim {
            "(" => SyntaxKind::L_PAREN,
            "[" => SyntaxKind::L_BRACKET,
            "{" => SyntaxKind::L_BRACE,
            "<" => SyntaxKind::LT,
            "|" => SyntaxKind::PIPE,
            "/" => SyntaxKind::SLASH,
            _ => SyntaxKind::OPERATOR,
        };
        self.queued.push_back(Token {
            kind: delim_kind,
            text: delim,
            offset: TextSize::new(start as u32 + 1),
        });
        Token {
            kind: SyntaxKind::OPERATOR,
            text: op,
            offset: TextSize::new(start as u32),
        }
    }

    /// `list<<Item` is an append, not a heredoc.
    fn split_heredoc_opener(&mut self, start: usize) -> Token<'a> {
        let text = self.inner.slice();
        let (shift, mut rest) = text.split_at(2);
        let mut offset = start as u32 + 2;
        if let Some(sign) = rest.get(..1).filter(|s| *s == "~" || *s == "-") {
            self.queued.push_back(Token {
                kind: SyntaxKind::OPERATOR,
                text: sign,
                offset: TextSize::new(offset),
            });
            rest = &rest[1..];
            offset += 1;
        }
        let kind = match rest.chars().next() {
            Some('\'' | '"' | '`') => SyntaxKind::STRING,
            Some(c) if c.is_ascii_uppercase() => SyntaxKind::CONSTANT,
            _ => SyntaxKind::IDENT,
        };
        self.queued.push_back(Token {
            kind,
            text: rest,
            offset: TextSize::new(offset),
        });
        Token {
            kind: SyntaxKind::LT_LT,
            text: shift,
            offset: TextSize::new(start as u32),
        }
    }

    fn track(&mut self, token: &Token<'a>) {
        match token.kind {
            SyntaxKind::WHITESPACE => self.space_before = true,
            kind if kind.is_trivia() => {}
            kind => {
                self.space_before = false;
                self.prev_significant = Some(kind);
                if kind == SyntaxKind::NEWLINE {
                    self.at_line_start = true;
                }
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = if let Some(queued) = self.queued.pop_front() {
            queued
        } else if std::mem::take(&mut self.at_line_start)
            && let Some(trivia) = self.line_start_token()
        {
            trivia
        } else {
            self.lex()?
        };
        self.track(&token);
        Some(token)
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

fn closing_delimiter(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        other => other,
    }
}

/// Length of a literal body up to and including its closing delimiter.
///
/// `rest` starts right after the opening delimiter. Bracket-style delimiters
/// nest; `#{...}` interpolation is skipped as a unit when `interpolate` is set.
fn scan_delimited(rest: &str, open: char, close: char, interpolate: bool) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = 0;
    while let Some(c) = rest[pos..].chars().next() {
        pos += c.len_utf8();
        match c {
            '\\' => {
                let escaped = rest[pos..].chars().next()?;
                pos += escaped.len_utf8();
            }
            '#' if interpolate && rest[pos..].starts_with('{') => {
                pos += 1;
                pos += scan_interpolation(&rest[pos..])?;
            }
            c if c == close && depth == 0 => return Some(pos),
            c if c == close => depth -= 1,
            c if c == open && open != close => depth += 1,
            _ => {}
        }
    }
    None
}

/// Length of an interpolation body up to and including its closing `}`.
fn scan_interpolation(rest: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut pos = 0;
    while let Some(c) = rest[pos..].chars().next() {
        pos += c.len_utf8();
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            }
            '"' | '`' => pos += scan_delimited(&rest[pos..], c, c, true)?,
            '\'' => pos += scan_delimited(&rest[pos..], c, c, false)?,
            '\\' => {
                let escaped = rest[pos..].chars().next()?;
                pos += escaped.len_utf8();
            }
            _ => {}
        }
    }
    None
}

fn parse_heredoc_opener(opener: &str) -> PendingHeredoc {
    let tag = &opener[2..];
    let (indented, tag) = match tag.as_bytes().first() {
        Some(b'~' | b'-') => (true, &tag[1..]),
        _ => (false, tag),
    };
    let terminator = tag.trim_matches(|c| c == '\'' || c == '"' || c == '`');
    PendingHeredoc {
        terminator: terminator.to_string(),
        indented,
    }
}

/// Length of the bodies of all pending heredocs, ending before the newline
/// of the last terminator line.
fn heredoc_body_len(rest: &str, pending: &[PendingHeredoc]) -> Option<usize> {
    let mut pos = 0;
    let mut end = 0;
    for heredoc in pending {
        loop {
            if pos >= rest.len() {
                return None;
            }
            let line_end = rest[pos..].find('\n').map_or(rest.len(), |i| pos + i);
            let line = rest[pos..line_end].trim_end_matches('\r');
            let candidate = if heredoc.indented {
                line.trim_start()
            } else {
                line
            };
            let is_terminator = candidate == heredoc.terminator;
            end = line_end;
            pos = (line_end + 1).min(rest.len());
            if is_terminator {
                break;
            }
        }
    }
    Some(end)
}

/// `=begin`/`__END__` only count when followed by whitespace or end of input.
fn starts_line_directive(rest: &str, directive: &str) -> bool {
    rest.strip_prefix(directive)
        .is_some_and(|after| after.is_empty() || after.starts_with(char::is_whitespace))
}

/// Length of an `=begin` block through the end of its `=end` line.
fn embdoc_len(rest: &str) -> Option<usize> {
    let mut pos = 0;
    loop {
        let line_end = rest[pos..].find('\n').map(|i| pos + i)?;
        pos = line_end + 1;
        if starts_line_directive(&rest[pos..], "=end") {
            let close_end = rest[pos..].find('\n').map_or(rest.len(), |i| pos + i);
            return Some(close_end);
        }
    }
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\f]+")]
    #[regex(r"\\\r?\n")]
    Whitespace,

    #[token("\n")]
    Newline,

    #[regex(r"#[^\n]*")]
    Comment,

    // =========================================================================
    // NAMES AND LITERALS
    // =========================================================================
    #[regex(r"([a-z_]|[^\x00-\x7F])([A-Za-z0-9_]|[^\x00-\x7F])*[?!]?")]
    Ident,

    #[regex(r"[A-Z]([A-Za-z0-9_]|[^\x00-\x7F])*")]
    Constant,

    #[regex(r"@[A-Za-z_][A-Za-z0-9_]*")]
    Ivar,

    #[regex(r"@@[A-Za-z_][A-Za-z0-9_]*")]
    Cvar,

    #[regex(r"\$([A-Za-z_][A-Za-z0-9_]*|[0-9]+|[!@&`'+~=/\\,;.<>*$?:\x22])")]
    Gvar,

    #[regex(r":([A-Za-z_]|[^\x00-\x7F])([A-Za-z0-9_]|[^\x00-\x7F])*[?!]?")]
    #[regex(r#":"([^"\\]|\\(.|\n))*""#)]
    Symbol,

    #[regex(r"[0-9][0-9_]*")]
    #[regex(r"0[xX][0-9a-fA-F_]+")]
    #[regex(r"0[bB][01_]+")]
    #[regex(r"0[oO][0-7_]+")]
    Integer,

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+")]
    Float,

    #[regex(r"'([^'\\]|\\(.|\n))*'")]
    SingleQuoted,

    /// Opening `"`; the body is rescanned by the wrapper
    #[token("\"")]
    DoubleQuote,

    /// Opening backtick; the body is rescanned by the wrapper
    #[token("`")]
    Backtick,

    /// `%w[`, `%(`; the body is rescanned by the wrapper
    #[regex(r"%[qQwWiIrsx]?[(\[{<|!/]")]
    PercentStart,

    #[regex(r"<<[~-]([A-Za-z_][A-Za-z0-9_]*|'[^'\n]*'|\x22[^\x22\n]*\x22|`[^`\n]*`)")]
    #[regex(r"<<([A-Z_][A-Za-z0-9_]*|'[^'\n]*'|\x22[^\x22\n]*\x22)")]
    HeredocStart,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("&.")]
    AmpDot,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token("<<")]
    LtLt,
    #[token("/")]
    Slash,
    #[token("/=")]
    SlashEq,
    #[token("|")]
    Pipe,
    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,

    #[token("==")]
    #[token("===")]
    #[token("!=")]
    #[token("=~")]
    #[token("!~")]
    #[token("<=>")]
    #[token("<=")]
    #[token(">=")]
    #[token(">")]
    #[token(">>")]
    #[token("&&")]
    #[token("||")]
    #[token("**")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("%")]
    #[token("!")]
    #[token("~")]
    #[token("^")]
    #[token("&")]
    #[token("?")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("%=")]
    #[token("**=")]
    #[token("||=")]
    #[token("&&=")]
    #[token("|=")]
    #[token("&=")]
    #[token("^=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token("..")]
    #[token("...")]
    #[token("@")]
    Operator,

    // =========================================================================
    // KEYWORDS (literal tokens win over the identifier regex)
    // =========================================================================
    #[token("alias")]
    AliasKw,
    #[token("and")]
    AndKw,
    #[token("begin")]
    BeginKw,
    #[token("break")]
    BreakKw,
    #[token("case")]
    CaseKw,
    #[token("class")]
    ClassKw,
    #[token("def")]
    DefKw,
    #[token("defined?")]
    DefinedKw,
    #[token("do")]
    DoKw,
    #[token("else")]
    ElseKw,
    #[token("elsif")]
    ElsifKw,
    #[token("end")]
    EndKw,
    #[token("ensure")]
    EnsureKw,
    #[token("false")]
    FalseKw,
    #[token("for")]
    ForKw,
    #[token("if")]
    IfKw,
    #[token("in")]
    InKw,
    #[token("module")]
    ModuleKw,
    #[token("next")]
    NextKw,
    #[token("nil")]
    NilKw,
    #[token("not")]
    NotKw,
    #[token("or")]
    OrKw,
    #[token("redo")]
    RedoKw,
    #[token("rescue")]
    RescueKw,
    #[token("retry")]
    RetryKw,
    #[token("return")]
    ReturnKw,
    #[token("self")]
    SelfKw,
    #[token("super")]
    SuperKw,
    #[token("then")]
    ThenKw,
    #[token("true")]
    TrueKw,
    #[token("undef")]
    UndefKw,
    #[token("unless")]
    UnlessKw,
    #[token("until")]
    UntilKw,
    #[token("when")]
    WhenKw,
    #[token("while")]
    WhileKw,
    #[token("yield")]
    YieldKw,
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        use LogosToken::*;
        match token {
            Whitespace => SyntaxKind::WHITESPACE,
            Newline => SyntaxKind::NEWLINE,
            Comment => SyntaxKind::COMMENT,
            Ident => SyntaxKind::IDENT,
            Constant => SyntaxKind::CONSTANT,
            Ivar => SyntaxKind::IVAR,
            Cvar => SyntaxKind::CVAR,
            Gvar => SyntaxKind::GVAR,
            Symbol => SyntaxKind::SYMBOL,
            Integer => SyntaxKind::INTEGER,
            Float => SyntaxKind::FLOAT,
            SingleQuoted | DoubleQuote | Backtick => SyntaxKind::STRING,
            PercentStart => SyntaxKind::PERCENT_LITERAL,
            HeredocStart => SyntaxKind::HEREDOC_START,
            LParen => SyntaxKind::L_PAREN,
            RParen => SyntaxKind::R_PAREN,
            LBracket => SyntaxKind::L_BRACKET,
            RBracket => SyntaxKind::R_BRACKET,
            LBrace => SyntaxKind::L_BRACE,
            RBrace => SyntaxKind::R_BRACE,
            ColonColon => SyntaxKind::COLON_COLON,
            Colon => SyntaxKind::COLON,
            Semicolon => SyntaxKind::SEMICOLON,
            Comma => SyntaxKind::COMMA,
            Dot => SyntaxKind::DOT,
            AmpDot => SyntaxKind::AMP_DOT,
            Eq => SyntaxKind::EQ,
            Lt => SyntaxKind::LT,
            LtLt => SyntaxKind::LT_LT,
            Slash => SyntaxKind::SLASH,
            SlashEq => SyntaxKind::OPERATOR,
            Pipe => SyntaxKind::PIPE,
            Arrow => SyntaxKind::ARROW,
            FatArrow => SyntaxKind::FAT_ARROW,
            Operator => SyntaxKind::OPERATOR,
            AliasKw => SyntaxKind::ALIAS_KW,
            AndKw => SyntaxKind::AND_KW,
            BeginKw => SyntaxKind::BEGIN_KW,
            BreakKw => SyntaxKind::BREAK_KW,
            CaseKw => SyntaxKind::CASE_KW,
            ClassKw => SyntaxKind::CLASS_KW,
            DefKw => SyntaxKind::DEF_KW,
            DefinedKw => SyntaxKind::DEFINED_KW,
            DoKw => SyntaxKind::DO_KW,
            ElseKw => SyntaxKind::ELSE_KW,
            ElsifKw => SyntaxKind::ELSIF_KW,
            EndKw => SyntaxKind::END_KW,
            EnsureKw => SyntaxKind::ENSURE_KW,
            FalseKw => SyntaxKind::FALSE_KW,
            ForKw => SyntaxKind::FOR_KW,
            IfKw => SyntaxKind::IF_KW,
            InKw => SyntaxKind::IN_KW,
            ModuleKw => SyntaxKind::MODULE_KW,
            NextKw => SyntaxKind::NEXT_KW,
            NilKw => SyntaxKind::NIL_KW,
            NotKw => SyntaxKind::NOT_KW,
            OrKw => SyntaxKind::OR_KW,
            RedoKw => SyntaxKind::REDO_KW,
            RescueKw => SyntaxKind::RESCUE_KW,
            RetryKw => SyntaxKind::RETRY_KW,
            ReturnKw => SyntaxKind::RETURN_KW,
            SelfKw => SyntaxKind::SELF_KW,
            SuperKw => SyntaxKind::SUPER_KW,
            ThenKw => SyntaxKind::THEN_KW,
            TrueKw => SyntaxKind::TRUE_KW,
            UndefKw => SyntaxKind::UNDEF_KW,
            UnlessKw => SyntaxKind::UNLESS_KW,
            UntilKw => SyntaxKind::UNTIL_KW,
            WhenKw => SyntaxKind::WHEN_KW,
            WhileKw => SyntaxKind::WHILE_KW,
            YieldKw => SyntaxKind::YIELD_KW,
        }
    }
}
