use crate::Span;
use crate::ast::{BinaryOp, Expr, ExprId, ExprKind, RefModifier, Reference, TableItem, UnaryOp};
use crate::lexer::{LexerError, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(
        "Parse Error [at {}]: Unexpected token '{}', expected {expected}",
        .found.span,
        .found.kind
    )]
    UnexpectedToken { found: Token, expected: String },
    #[error("Parse Error: Unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String, span: Span },
    #[error(
        "Parse Error [at {}]: Expression is nested more than {} levels deep",
        .0,
        MAX_NESTING
    )]
    NestingTooDeep(Span),
    #[error("Lexer Error during parse: {0}")]
    LexerError(#[from] LexerError), // Propagate lexer errors when parsing from a string
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { found, .. } => found.span,
            ParseError::UnexpectedEof { span, .. } => *span,
            ParseError::NestingTooDeep(span) => *span,
            ParseError::LexerError(lex_err) => lex_err.span,
        }
    }
}

// Result type alias for convenience
type ParseResult<T> = Result<T, ParseError>;

/// How deep blocks, brackets, parentheses, unary signs and operator chains may
/// nest. Every deeper level costs a stack frame here and in the evaluator.
pub const MAX_NESTING: usize = 128;

pub struct Parser {
    // An index cursor instead of an iterator: telling a `[key]: value` item
    // from an array literal needs to look past the closing bracket.
    tokens: Vec<Token>,
    current: usize,
    next_id: u32,
    depth: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        // The grammar relies on a trailing Eof to stop every loop.
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let end = tokens.last().map_or(0, |t| t.span.end);
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::point(end),
            });
        }
        Parser {
            tokens,
            current: 0,
            next_id: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.current + offset).min(last)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    // Consumes the next token. Eof is never consumed, so the cursor cannot
    // run off the end.
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = self.peek().clone();
        if found.kind == TokenKind::Eof {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
                span: found.span,
            }
        } else {
            ParseError::UnexpectedToken {
                found,
                expected: expected.to_string(),
            }
        }
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    // One level deeper. The caller restores `depth` when the level is done.
    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::NestingTooDeep(self.peek().span));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let depth = self.depth;
        self.descend()?;
        let result = parse(self);
        self.depth = depth;
        result
    }

    fn node(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        Expr::new(id, kind, span)
    }

    /// Parses the whole token stream as one document.
    pub fn parse(mut self) -> ParseResult<Expr> {
        let expr = if self.check(&TokenKind::Eof) {
            // An empty document is an empty table.
            let span = self.peek().span;
            self.node(ExprKind::Table(Vec::new()), span)
        } else {
            self.parse_block_body(TokenKind::Eof)?
        };

        if self.check(&TokenKind::Eof) {
            Ok(expr)
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    // The contents of an indented block (or of the whole document): a block
    // array, a block table, a nested block, or a single inline expression.
    // The closing `end` token is left for the caller.
    fn parse_block_body(&mut self, end: TokenKind) -> ParseResult<Expr> {
        match self.peek().kind {
            TokenKind::OpenBlock => {
                self.advance();
                let expr = self.nested(|p| p.parse_block_body(TokenKind::CloseBlock))?;
                self.consume(TokenKind::CloseBlock, "end of indented block")?;
                Ok(expr)
            }
            TokenKind::Dash => self.parse_block_array(&end),
            _ if self.looks_like_table_item() => self.parse_block_table(&end),
            _ => self.parse_inline(),
        }
    }

    fn parse_block_array(&mut self, end: &TokenKind) -> ParseResult<Expr> {
        let start = self.peek().span.start;
        let mut items = Vec::new();

        loop {
            self.consume(TokenKind::Dash, "'-' before array item")?;
            self.consume(TokenKind::OpenBlock, "array item")?;
            items.push(self.nested(|p| p.parse_block_body(TokenKind::CloseBlock))?);
            self.consume(TokenKind::CloseBlock, "end of array item")?;

            match &self.peek().kind {
                TokenKind::Newline => {
                    self.advance();
                }
                kind if kind == end => break,
                _ => return Err(self.unexpected("newline between array items")),
            }
        }

        let end = items.last().map_or(start, |item| item.span.end);
        Ok(self.node(ExprKind::Array(items), Span::new(start, end)))
    }

    fn parse_block_table(&mut self, end: &TokenKind) -> ParseResult<Expr> {
        let start = self.peek().span.start;
        let mut items = Vec::new();

        loop {
            items.push(self.parse_table_item(true)?);

            match &self.peek().kind {
                TokenKind::Newline => {
                    self.advance();
                    if &self.peek().kind == end {
                        break;
                    }
                }
                kind if kind == end => break,
                _ => return Err(self.unexpected("newline between table items")),
            }
        }

        let end = items.last().map_or(start, |item: &TableItem| item.value.span.end);
        Ok(self.node(ExprKind::Table(items), Span::new(start, end)))
    }

    // `key: value`, `"key": value` or `[expr]: value`, optionally followed by
    // `< parent` before the colon.
    fn looks_like_table_item(&self) -> bool {
        let after_key = match &self.peek().kind {
            TokenKind::Str(_) | TokenKind::Ident(_) => 1,
            TokenKind::OpenBracket => {
                let mut depth = 0usize;
                let mut offset = 0;
                loop {
                    match &self.peek_at(offset).kind {
                        TokenKind::OpenBracket => depth += 1,
                        TokenKind::CloseBracket => {
                            depth -= 1;
                            if depth == 0 {
                                break offset + 1;
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                    offset += 1;
                }
            }
            _ => return false,
        };
        matches!(
            self.peek_at(after_key).kind,
            TokenKind::Colon | TokenKind::Less
        )
    }

    fn parse_table_item(&mut self, block: bool) -> ParseResult<TableItem> {
        let key = match self.peek().kind.clone() {
            // Literal key
            TokenKind::Str(name) | TokenKind::Ident(name) => {
                let token = self.advance();
                self.node(ExprKind::Str(name), token.span)
            }
            // Expression key
            TokenKind::OpenBracket => {
                self.advance();
                let key = self.parse_inline()?;
                self.consume(TokenKind::CloseBracket, "']' after expression key")?;
                key
            }
            _ => return Err(self.unexpected("string, identifier, or [expression] for key")),
        };

        let inherits = if self.check(&TokenKind::Less) {
            self.advance();
            Some(self.parse_inline()?)
        } else {
            None
        };

        self.consume(TokenKind::Colon, "':' between key and value")?;

        let value = if block && self.check(&TokenKind::OpenBlock) {
            self.nested(|p| p.parse_block_body(TokenKind::CloseBlock))?
        } else {
            self.parse_inline()?
        };

        Ok(TableItem {
            key,
            inherits,
            value,
        })
    }

    /// Parses an expression that fits on one line (or inside brackets).
    /// Each operator in a chain like `1 + 2 + 3` nests the tree one level
    /// deeper, so chains count against [`MAX_NESTING`] too.
    pub fn parse_inline(&mut self) -> ParseResult<Expr> {
        self.nested(|p| p.parse_term())
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_factor()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Plus,
                TokenKind::Minus => BinaryOp::Minus,
                _ => break,
            };
            self.descend()?;
            let op_span = self.advance().span;
            let right = self.parse_factor()?;
            expr = self.binary(op, op_span, expr, right);
        }

        Ok(expr)
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_unary()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Star,
                TokenKind::Slash => BinaryOp::Slash,
                _ => break,
            };
            self.descend()?;
            let op_span = self.advance().span;
            let right = self.parse_unary()?;
            expr = self.binary(op, op_span, expr, right);
        }

        Ok(expr)
    }

    fn binary(&mut self, op: BinaryOp, op_span: Span, left: Expr, right: Expr) -> Expr {
        let span = left.span.merge(right.span);
        self.node(
            ExprKind::Binary {
                op,
                op_span,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            _ => return self.parse_primary(),
        };
        let op_span = self.advance().span;
        let operand = self.nested(|p| p.parse_unary())?;
        let span = op_span.merge(operand.span);
        Ok(self.node(
            ExprKind::Unary {
                op,
                op_span,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.peek().kind.clone() {
            TokenKind::Str(s) => {
                let token = self.advance();
                Ok(self.node(ExprKind::Str(s), token.span))
            }
            // Identifiers are only keywords in expression position
            TokenKind::Ident(name) if name == "true" || name == "false" => {
                let token = self.advance();
                Ok(self.node(ExprKind::Bool(name == "true"), token.span))
            }
            TokenKind::Int(n) => {
                let token = self.advance();
                Ok(self.node(ExprKind::Int(n), token.span))
            }
            TokenKind::Float(n) => {
                let token = self.advance();
                Ok(self.node(ExprKind::Float(n), token.span))
            }
            // Grouping
            TokenKind::OpenParen => {
                self.advance();
                let expr = self.parse_inline()?;
                self.consume(TokenKind::CloseParen, "')' after expression")?;
                Ok(expr)
            }
            TokenKind::Dollar | TokenKind::Dot => self.parse_reference(),
            TokenKind::OpenBracket => self.parse_inline_array(),
            TokenKind::OpenBrace => self.parse_inline_table(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_reference(&mut self) -> ParseResult<Expr> {
        let modifier_token = self.advance();
        let modifier = if modifier_token.kind == TokenKind::Dollar {
            RefModifier::Absolute
        } else {
            RefModifier::Relative
        };
        let mut keys = Vec::new();
        let mut end = modifier_token.span.end;

        // `.key` and `$key` take the identifier right after the modifier
        if let TokenKind::Ident(name) = self.peek().kind.clone() {
            let token = self.advance();
            end = token.span.end;
            keys.push(self.node(ExprKind::Str(name), token.span));
        }

        loop {
            match self.peek().kind {
                // `..key` is a typo, not a path
                TokenKind::Dot if !(keys.is_empty() && modifier == RefModifier::Relative) => {
                    self.advance();
                    match self.peek().kind.clone() {
                        TokenKind::Ident(name) => {
                            let token = self.advance();
                            end = token.span.end;
                            keys.push(self.node(ExprKind::Str(name), token.span));
                        }
                        TokenKind::OpenBracket => {
                            let (key, close) = self.parse_computed_key()?;
                            end = close.end;
                            keys.push(key);
                        }
                        _ => return Err(self.unexpected("identifier or '[' after '.'")),
                    }
                }
                TokenKind::OpenBracket => {
                    let (key, close) = self.parse_computed_key()?;
                    end = close.end;
                    keys.push(key);
                }
                _ => break,
            }
        }

        Ok(self.node(
            ExprKind::Ref(Reference {
                modifier,
                modifier_span: modifier_token.span,
                keys,
            }),
            Span::new(modifier_token.span.start, end),
        ))
    }

    fn parse_computed_key(&mut self) -> ParseResult<(Expr, Span)> {
        self.consume(TokenKind::OpenBracket, "'['")?;
        let key = self.parse_inline()?;
        let close = self.consume(TokenKind::CloseBracket, "']' after expression key")?;
        Ok((key, close.span))
    }

    fn parse_inline_array(&mut self) -> ParseResult<Expr> {
        let open = self.advance().span;
        let mut items = Vec::new();

        while !self.check(&TokenKind::CloseBracket) {
            items.push(self.parse_inline()?);
            // Check for comma if not at closing bracket, otherwise just repeat.
            if !self.check(&TokenKind::CloseBracket) {
                self.consume(TokenKind::Comma, "',' between items")?;
            }
        }

        let close = self.consume(TokenKind::CloseBracket, "']' after array")?;
        Ok(self.node(ExprKind::Array(items), open.merge(close.span)))
    }

    fn parse_inline_table(&mut self) -> ParseResult<Expr> {
        let open = self.advance().span;
        let mut items = Vec::new();

        while !self.check(&TokenKind::CloseBrace) {
            items.push(self.parse_table_item(false)?);
            if !self.check(&TokenKind::CloseBrace) {
                self.consume(TokenKind::Comma, "',' between items")?;
            }
        }

        let close = self.consume(TokenKind::CloseBrace, "'}' after table")?;
        Ok(self.node(ExprKind::Table(items), open.merge(close.span)))
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> Result<Expr, Vec<ParseError>> {
    let tokens = crate::lexer::tokenize(input)
        .map_err(|errors| errors.into_iter().map(ParseError::from).collect::<Vec<_>>())?;
    Parser::new(tokens).parse().map_err(|e| vec![e])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::LexerErrorKind;
    use std::collections::HashSet;

    // Parses and prints back in inline form; keeps the assertions readable.
    fn assert_parsed_string(input: &str, expected_output: &str) {
        let expr = match parse_str(input) {
            Ok(result) => result,
            Err(e) => panic!("Parsing failed for input '{}': {:?}", input, e),
        };
        assert_eq!(expr.to_string(), expected_output, "Input: '{}'", input);
    }

    // Helper for asserting parse errors
    fn assert_parse_error(input: &str, expected_error_variant: ParseError) {
        match parse_str(input) {
            Ok(result) => panic!(
                "Expected parsing to fail for input '{}', but got: {}",
                input, result
            ),
            Err(errors) => {
                // Compare enum variants, ignoring specific content for simplicity
                assert_eq!(
                    std::mem::discriminant(&errors[0]),
                    std::mem::discriminant(&expected_error_variant),
                    "Input: '{}', Expected error variant like {:?}, got: {:?}",
                    input,
                    expected_error_variant,
                    errors
                );
            }
        }
    }

    fn unexpected_token() -> ParseError {
        ParseError::UnexpectedToken {
            found: Token {
                kind: TokenKind::Eof,
                span: Span::default(),
            },
            expected: String::new(),
        }
    }

    fn unexpected_eof() -> ParseError {
        ParseError::UnexpectedEof {
            expected: String::new(),
            span: Span::default(),
        }
    }

    fn nesting_too_deep() -> ParseError {
        ParseError::NestingTooDeep(Span::default())
    }

    fn collect_ids(expr: &Expr, ids: &mut Vec<ExprId>) {
        ids.push(expr.id);
        match &expr.kind {
            ExprKind::Ref(reference) => reference.keys.iter().for_each(|k| collect_ids(k, ids)),
            ExprKind::Unary { operand, .. } => collect_ids(operand, ids),
            ExprKind::Binary { left, right, .. } => {
                collect_ids(left, ids);
                collect_ids(right, ids);
            }
            ExprKind::Array(items) => items.iter().for_each(|i| collect_ids(i, ids)),
            ExprKind::Table(items) => {
                for item in items {
                    collect_ids(&item.key, ids);
                    if let Some(parent) = &item.inherits {
                        collect_ids(parent, ids);
                    }
                    collect_ids(&item.value, ids);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn test_parse_literals() {
        assert_parsed_string("123", "123");
        assert_parsed_string("4.5", "4.5");
        assert_parsed_string("true", "true");
        assert_parsed_string("false", "false");
        assert_parsed_string(r#""hello world""#, r#""hello world""#);
    }

    #[test]
    fn test_parse_literal_spans() {
        let expr = parse_str("  \"abc\"").expect("Should parse");
        assert_eq!(expr.span, Span::new(2, 7));
        assert!(matches!(expr.kind, ExprKind::Str(ref s) if s == "abc"));
    }

    #[test]
    fn test_parse_empty_document() {
        assert_parsed_string("", "{}");
        assert_parsed_string("# nothing here\n", "{}");
    }

    #[test]
    fn test_parse_precedence() {
        assert_parsed_string("1 + 2 * 3", "(1 + (2 * 3))");
        assert_parsed_string("1 - 2 - 3", "((1 - 2) - 3)");
        assert_parsed_string("(1 + 2) * 3", "((1 + 2) * 3)");
        // A `-` at the start of a line opens an array item, so wrap these
        assert_parsed_string("(-1 * 2)", "(-1 * 2)");
        assert_parsed_string("(- -2)", "--2");
        assert_parsed_string("8 / +2", "(8 / +2)");
    }

    #[test]
    fn test_parse_references() {
        assert_parsed_string("$.a.b", "$.a.b");
        assert_parsed_string(".a.b", ".a.b");
        assert_parsed_string("$a", "$.a");
        assert_parsed_string("$.a[0]", "$.a[0]");
        assert_parsed_string("$.[1]", "$[1]");
        assert_parsed_string("$[$.i + 1]", "$[($.i + 1)]");
        assert_parsed_string(".[\"spaced key\"]", ".[\"spaced key\"]");
        assert_parsed_string("$", "$");
    }

    #[test]
    fn test_parse_reference_span() {
        let expr = parse_str("$.ab[10]").expect("Should parse");
        assert_eq!(expr.span, Span::new(0, 8));
        match expr.kind {
            ExprKind::Ref(reference) => {
                assert_eq!(reference.modifier, RefModifier::Absolute);
                assert_eq!(reference.modifier_span, Span::new(0, 1));
                assert_eq!(reference.keys.len(), 2);
                assert_eq!(reference.keys[0].span, Span::new(2, 4));
                assert_eq!(reference.keys[1].span, Span::new(5, 7));
            }
            other => panic!("Expected a reference, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inline_containers() {
        assert_parsed_string("[1, 2, 3]", "[1, 2, 3]");
        assert_parsed_string("[1, 2,]", "[1, 2]");
        assert_parsed_string("[]", "[]");
        assert_parsed_string("{ a: 1, b: $.a + 1 }", "{a: 1, b: ($.a + 1)}");
        assert_parsed_string(
            "{ base: { x: 1 }, child < $.base: { y: 2 } }",
            "{base: {x: 1}, child < $.base: {y: 2}}",
        );
        assert_parsed_string("{\"a b\": 1, [\"c\"]: 2}", "{\"a b\": 1, c: 2}");
        assert_parsed_string("{}", "{}");
    }

    #[test]
    fn test_parse_multiline_brackets() {
        assert_parsed_string("a: [\n  1,\n  2\n]\nb: {\n  c: 3\n}", "{a: [1, 2], b: {c: 3}}");
    }

    #[test]
    fn test_parse_block_table() {
        assert_parsed_string("a: 1\nb: \"two\"", "{a: 1, b: \"two\"}");
        assert_parsed_string(
            "server:\n  host: \"localhost\"\n  port: 8080\nname: \"x\"",
            "{server: {host: \"localhost\", port: 8080}, name: \"x\"}",
        );
        assert_parsed_string(
            "a:\n  b:\n    c: 1\nd: 2",
            "{a: {b: {c: 1}}, d: 2}",
        );
    }

    #[test]
    fn test_parse_block_inheritance() {
        assert_parsed_string(
            "base:\n  x: 1\nchild < $.base:\n  y: 2",
            "{base: {x: 1}, child < $.base: {y: 2}}",
        );
    }

    #[test]
    fn test_parse_block_array() {
        assert_parsed_string("- 1\n- 2\n- 3", "[1, 2, 3]");
        assert_parsed_string("xs:\n  - 1\n  - \"a\"", "{xs: [1, \"a\"]}");
        assert_parsed_string(
            "- name: \"a\"\n  size: 1\n- name: \"b\"\n  size: 2",
            "[{name: \"a\", size: 1}, {name: \"b\", size: 2}]",
        );
        assert_parsed_string("-\n  - 1\n  - 2\n- 3", "[[1, 2], 3]");
    }

    #[test]
    fn test_parse_computed_block_key() {
        // `[expr]:` starts a table item, `[1, 2]` alone is an array
        assert_parsed_string("[\"k\"]: 1", "{k: 1}");
        assert_parsed_string("[$.x]: 1\nx: \"k\"", "{[$.x]: 1, x: \"k\"}");
        assert_parsed_string("[1, 2]", "[1, 2]");
    }

    #[test]
    fn test_parse_unique_ids() {
        let expr = parse_str("a: [1, $.b.c]\nb:\n  c < {z: 0}: {d: -1 + 2}").expect("Should parse");
        let mut ids = Vec::new();
        collect_ids(&expr, &mut ids);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_parse_errors() {
        assert_parse_error("[1, 2", unexpected_eof());
        assert_parse_error("{a 1}", unexpected_token());
        assert_parse_error("1 +", unexpected_eof());
        assert_parse_error("a: 1 2", unexpected_token());
        assert_parse_error("..a", unexpected_token());
        assert_parse_error("$.", unexpected_eof());
        assert_parse_error("maybe", unexpected_token());
        assert_parse_error("a: 1\n  b: 2", unexpected_token());
    }

    #[test]
    fn test_parse_nesting_limit() {
        let parens = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_parsed_string(&parens(MAX_NESTING / 2), "1");
        assert_parse_error(&parens(MAX_NESTING + 1), nesting_too_deep());
        assert_parse_error(&parens(5000), nesting_too_deep());

        assert_parse_error(&"[".repeat(5000), nesting_too_deep());
        assert_parse_error(&format!("{}1", "- ".repeat(5000)), nesting_too_deep());

        // Long operator chains nest the tree without recursing in the parser
        let sum = vec!["1"; 5000].join(" + ");
        assert_parse_error(&sum, nesting_too_deep());
        assert!(parse_str(&vec!["1"; 50].join(" * ")).is_ok());

        let mut blocks = String::new();
        for level in 0..MAX_NESTING + 1 {
            blocks.push_str(&format!("{}a:\n", "  ".repeat(level)));
        }
        blocks.push_str(&format!("{}a: 1", "  ".repeat(MAX_NESTING + 1)));
        assert_parse_error(&blocks, nesting_too_deep());

        match parse_str(&parens(1000)) {
            Err(errors) => assert_eq!(errors[0].span(), Span::new(MAX_NESTING, MAX_NESTING + 1)),
            Ok(expr) => panic!("Expected a nesting error, got {}", expr),
        }
    }

    #[test]
    fn test_parse_lexer_error() {
        assert_parse_error(
            "a: \"open",
            ParseError::LexerError(LexerError {
                error: LexerErrorKind::UnterminatedString,
                span: Span::default(),
            }),
        );
    }
}
