use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

// Raw tokens straight from logos. Whitespace is kept because indentation is
// significant outside of brackets; the layout pass below decides what it means.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"#[^\r\n]*")] // Skip comments
#[logos(error = LexerErrorKind)]
enum RawToken {
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("<")]
    Less,
    #[token(".")]
    Dot,
    #[token("$")]
    Dollar,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[regex(r#""([^"\\\r\n]|\\[^\r\n])*""#, |lex| {
        let slice = lex.slice();
        unescape::unescape(&slice[1..slice.len() - 1])
    })]
    Str(String),
    // Same body without the closing quote: only wins when the string never ends.
    #[regex(r#""([^"\\\r\n]|\\[^\r\n])*"#)]
    UnterminatedStr,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r"[0-9]+", |lex| {
        let slice = lex.slice();
        slice
            .parse::<i64>()
            .map_err(|_| LexerErrorKind::IntegerOutOfRange(slice.to_string()))
    })]
    Int(i64),
    #[regex(r"[0-9]+\.[0-9]+", |lex| {
        let slice = lex.slice();
        slice
            .parse::<f64>()
            .map_err(|_| LexerErrorKind::InvalidNumberFormat(slice.to_string()))
    })]
    Float(f64),
    #[regex(r" +", |lex| lex.slice().len())]
    Spaces(usize),
    #[regex(r"\r?\n")]
    Newline,
    #[token("\r")]
    CarriageReturn,
    #[token("\t")]
    Tab,
    #[regex(r"[\x0B\x0C\u{85}\u{A0}\u{1680}\u{2000}-\u{200A}\u{2028}\u{2029}\u{202F}\u{205F}\u{3000}]")]
    OtherWhitespace,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Colon,
    Comma,
    /// `-` opening a block array item. Only produced at the start of a line
    /// while whitespace is significant.
    Dash,
    Plus,
    Minus,
    Star,
    Slash,
    Less,
    Dot,
    Dollar,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Newline,
    OpenBlock,
    CloseBlock,
    Str(String),
    Ident(String),
    Int(i64),
    Float(f64),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

mod unescape {
    use super::LexerErrorKind;

    // Basic unescape logic
    pub fn unescape(s: &str) -> Result<String, LexerErrorKind> {
        // un-escaping should only ever reduce the length of the string.
        let mut result = String::with_capacity(s.len());
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('\\') => result.push('\\'),
                    Some('"') => result.push('"'),
                    Some(c) => return Err(LexerErrorKind::UnknownEscapeSequence(c)),
                    None => return Err(LexerErrorKind::UnterminatedString),
                }
            } else {
                result.push(c);
            }
        }
        Ok(result)
    }
}

// Implement Display for easy printing
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dash => write!(f, "- (array item)"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Less => write!(f, "<"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Dollar => write!(f, "$"),
            TokenKind::OpenParen => write!(f, "("),
            TokenKind::CloseParen => write!(f, ")"),
            TokenKind::OpenBracket => write!(f, "["),
            TokenKind::CloseBracket => write!(f, "]"),
            TokenKind::OpenBrace => write!(f, "{{"),
            TokenKind::CloseBrace => write!(f, "}}"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::OpenBlock => write!(f, "indent"),
            TokenKind::CloseBlock => write!(f, "dedent"),
            TokenKind::Str(s) => write!(f, "\"{}\"", s), // Display with quotes for clarity
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::Int(n) => write!(f, "{}", n),
            TokenKind::Float(n) => write!(f, "{:?}", n),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Error, Default, Debug, Clone, PartialEq)]
pub enum LexerErrorKind {
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Unknown escape sequence: '\\{0}'")]
    UnknownEscapeSequence(char),
    #[error("Integer literal out of range: '{0}'")]
    IntegerOutOfRange(String),
    #[error("Invalid number format: '{0}'")]
    InvalidNumberFormat(String),
    #[error("Unexpected tab, only spaces are valid indentation")]
    UnexpectedTab,
    #[error("Unexpected carriage return, line endings are LF or CRLF")]
    UnexpectedCarriageReturn,
    #[error("Unexpected whitespace")]
    UnexpectedWhitespace,
    #[error("Unindent does not match any outer indentation level")]
    InconsistentDedent,
    #[default]
    #[error("Invalid token")]
    InvalidToken,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

// Turns raw tokens into the token stream the parser sees: whitespace is
// dropped, and indentation changes become OpenBlock/CloseBlock/Newline.
struct Layout {
    tokens: Vec<Token>,
    errors: Vec<LexerError>,
    // Indentation column of every open block, innermost last.
    indents: Vec<usize>,
    // Bracket nesting; whitespace only matters at depth 0.
    depth: usize,
    at_line_start: bool,
    line_break: bool,
    indent: usize,
    line_start: usize,
}

impl Layout {
    fn new(input: &str) -> Self {
        Layout {
            tokens: Vec::with_capacity(input.len() / 2),
            errors: Vec::new(),
            indents: Vec::new(),
            depth: 0,
            at_line_start: true,
            line_break: false,
            indent: 0,
            line_start: 0,
        }
    }

    fn is_sensitive(&self) -> bool {
        self.depth == 0
    }

    fn starts_block_item(&self) -> bool {
        self.is_sensitive() && self.at_line_start
    }

    fn emit(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token { kind, span });
    }

    fn error(&mut self, error: LexerErrorKind, span: Span) {
        self.errors.push(LexerError { error, span });
    }

    // Compares the indentation of a new line against the open blocks. Runs
    // once per line, right before its first significant token.
    fn begin_line(&mut self, span: Span) {
        if !self.starts_block_item() {
            return;
        }
        self.at_line_start = false;

        let at = Span::point(span.start);
        let indent = self.indent;
        let top = self.indents.last().copied().unwrap_or(0);

        if indent > top {
            self.indents.push(indent);
            self.emit(TokenKind::OpenBlock, at);
        } else if indent < top {
            while self.indents.last().is_some_and(|&open| indent < open) {
                self.indents.pop();
                self.emit(TokenKind::CloseBlock, at);
            }
            if indent != self.indents.last().copied().unwrap_or(0) {
                self.error(LexerErrorKind::InconsistentDedent, at);
            }
            // Dedenting always involves a newline
            self.emit(TokenKind::Newline, at);
        } else if self.line_break && !self.tokens.is_empty() {
            self.emit(TokenKind::Newline, at);
        }

        self.line_break = false;
    }

    // A leading `-` opens a block whose indentation is the column of whatever
    // follows it, so continuation lines of the item line up with its content.
    fn dash(&mut self, span: Span, content_start: usize) {
        self.begin_line(span);
        self.emit(TokenKind::Dash, span);
        self.emit(TokenKind::OpenBlock, Span::point(content_start));
        self.indents.push(content_start - self.line_start);
    }

    fn push(&mut self, token: RawToken, span: Span) {
        let kind = match token {
            RawToken::Newline => {
                if self.is_sensitive() {
                    self.at_line_start = true;
                    self.line_break = true;
                    self.indent = 0;
                    self.line_start = span.end;
                }
                return;
            }
            RawToken::Spaces(count) => {
                if self.starts_block_item() {
                    self.indent = count;
                }
                return;
            }
            RawToken::Tab => {
                if self.is_sensitive() {
                    self.error(LexerErrorKind::UnexpectedTab, span);
                }
                return;
            }
            RawToken::CarriageReturn => {
                if self.is_sensitive() {
                    self.error(LexerErrorKind::UnexpectedCarriageReturn, span);
                }
                return;
            }
            RawToken::OtherWhitespace => {
                if self.is_sensitive() {
                    self.error(LexerErrorKind::UnexpectedWhitespace, span);
                }
                return;
            }
            RawToken::UnterminatedStr => {
                self.begin_line(span);
                self.error(LexerErrorKind::UnterminatedString, span);
                return;
            }
            RawToken::Colon => TokenKind::Colon,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Star => TokenKind::Star,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Less => TokenKind::Less,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Dollar => TokenKind::Dollar,
            RawToken::OpenParen => TokenKind::OpenParen,
            RawToken::CloseParen => TokenKind::CloseParen,
            RawToken::OpenBracket => TokenKind::OpenBracket,
            RawToken::CloseBracket => TokenKind::CloseBracket,
            RawToken::OpenBrace => TokenKind::OpenBrace,
            RawToken::CloseBrace => TokenKind::CloseBrace,
            RawToken::Str(s) => TokenKind::Str(s),
            RawToken::Ident(s) => TokenKind::Ident(s),
            RawToken::Int(n) => TokenKind::Int(n),
            RawToken::Float(n) => TokenKind::Float(n),
        };

        self.begin_line(span);

        match kind {
            TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::OpenBrace => {
                self.depth += 1
            }
            TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseBrace => {
                self.depth = self.depth.saturating_sub(1)
            }
            _ => {}
        }

        self.emit(kind, span);
    }

    fn finish(mut self, end: usize) -> Result<Vec<Token>, Vec<LexerError>> {
        // Auto-close all blocks by adding a dedent for every indent.
        for _ in 0..self.indents.len() {
            self.emit(TokenKind::CloseBlock, Span::point(end));
        }
        self.emit(TokenKind::Eof, Span::point(end));

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }
}

/// Tokenizes a whole document. Lexing recovers from bad input, so every
/// error found is reported, not just the first one.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Vec<LexerError>> {
    let mut layout = Layout::new(input);
    let mut raw = RawToken::lexer(input).spanned().peekable();

    while let Some((result, range)) = raw.next() {
        let span = Span::new(range.start, range.end);
        match result {
            Ok(RawToken::Minus) if layout.starts_block_item() => {
                // All spaces after the dash count as indentation of the item,
                // unless nothing else follows on the line.
                let spaces_end = match raw.peek() {
                    Some((Ok(RawToken::Spaces(_)), next)) => Some(next.end),
                    _ => None,
                };
                let content_start = match spaces_end {
                    Some(end) => {
                        raw.next();
                        let rest = &input[end..];
                        if rest.is_empty() || rest.starts_with(['\n', '\r', '#']) {
                            span.end
                        } else {
                            end
                        }
                    }
                    None => span.end,
                };
                layout.dash(span, content_start);
            }
            Ok(token) => layout.push(token, span),
            Err(error) => layout.error(error, span),
        }
    }

    layout.finish(input.len())
}
