//! Parsers for the expression language and the template mini-language.
//!
//! [`ExprParser`] is a recursive-descent parser over the token stream from
//! [`crate::lexer`]. [`TemplateParser`] is a single forward character scan
//! with explicit bracket and paren depth tracking; nested directive bodies
//! recursively invoke the same parser with the block's closing delimiter as
//! terminator. Both are total and pure: no side effects, no I/O.

use crate::ast::{BinOp, ExprLiteral, PathSegment, TemplateExpr, TemplateNode};
use crate::error::ParseError;
use crate::lexer::{Spanned, Token, Tokenizer};

// ============================================================================
// Expression parser
// ============================================================================

/// Parse a standalone expression string.
///
/// Trailing garbage after a complete expression is an error.
pub fn parse_expr(input: &str) -> Result<TemplateExpr, ParseError> {
    parse_expr_at(input, 0)
}

/// Parse an expression embedded at byte offset `base` of a larger template,
/// so reported positions point into the original text.
fn parse_expr_at(input: &str, base: usize) -> Result<TemplateExpr, ParseError> {
    let shift = |err: ParseError| match err {
        ParseError::Expr { position, message } => ParseError::Expr {
            position: position + base,
            message,
        },
        other => other,
    };
    let tokens = Tokenizer::new(input).tokenize().map_err(shift)?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let expr = parser.parse_or().map_err(shift)?;
    if let Some(spanned) = parser.tokens.get(parser.pos) {
        return Err(ParseError::expr(
            spanned.position + base,
            format!("unexpected token after expression: {:?}", spanned.token),
        ));
    }
    Ok(expr)
}

struct ExprParser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.position)
            .or_else(|| self.tokens.last().map(|s| s.position))
            .unwrap_or(0)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        let position = self.position();
        match self.consume() {
            Some(t) if t == expected => Ok(()),
            Some(t) => Err(ParseError::expr(
                position,
                format!("expected {expected:?}, got {t:?}"),
            )),
            None => Err(ParseError::expr(
                position,
                format!("expected {expected:?}, got end of input"),
            )),
        }
    }

    fn parse_or(&mut self) -> Result<TemplateExpr, ParseError> {
        let mut lhs = self.parse_and()?;
        while let Some(Token::OrOr) = self.peek() {
            self.consume();
            let rhs = self.parse_and()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<TemplateExpr, ParseError> {
        let mut lhs = self.parse_equality()?;
        while let Some(Token::AndAnd) = self.peek() {
            self.consume();
            let rhs = self.parse_equality()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<TemplateExpr, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::Ne,
                _ => break,
            };
            self.consume();
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<TemplateExpr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::LtEq) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::GtEq) => BinOp::Ge,
                _ => break,
            };
            self.consume();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<TemplateExpr, ParseError> {
        if let Some(Token::Bang) = self.peek() {
            self.consume();
            let inner = self.parse_unary()?;
            return Ok(TemplateExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<TemplateExpr, ParseError> {
        let position = self.position();
        match self.consume() {
            Some(Token::Str(s)) => Ok(TemplateExpr::Literal(ExprLiteral::Str(s))),
            Some(Token::Int(n)) => Ok(TemplateExpr::Literal(ExprLiteral::Int(n))),
            Some(Token::True) => Ok(TemplateExpr::Literal(ExprLiteral::Bool(true))),
            Some(Token::False) => Ok(TemplateExpr::Literal(ExprLiteral::Bool(false))),
            Some(Token::Null) => Ok(TemplateExpr::Literal(ExprLiteral::Null)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(root)) => self.parse_path(root),
            Some(t) => Err(ParseError::expr(
                position,
                format!("expected expression, got {t:?}"),
            )),
            None => Err(ParseError::expr(
                position,
                "expected expression, got end of input",
            )),
        }
    }

    fn parse_path(&mut self, root: String) -> Result<TemplateExpr, ParseError> {
        let mut segments = vec![PathSegment::field(root)];
        while let Some(Token::Dot) = self.peek() {
            self.consume();
            let position = self.position();
            let name = match self.consume() {
                Some(Token::Ident(name)) => name,
                t => {
                    return Err(ParseError::expr(
                        position,
                        format!("expected identifier after `.`, got {t:?}"),
                    ))
                }
            };
            // `name()` marks a zero-argument accessor call.
            let is_call = matches!(
                (self.peek(), self.tokens.get(self.pos + 1).map(|s| &s.token)),
                (Some(Token::LParen), Some(Token::RParen))
            );
            if is_call {
                self.consume();
                self.consume();
            }
            segments.push(PathSegment {
                name,
                is_call,
            });
        }
        Ok(TemplateExpr::Path(segments))
    }
}

fn binary(op: BinOp, left: TemplateExpr, right: TemplateExpr) -> TemplateExpr {
    TemplateExpr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

// ============================================================================
// Template parser
// ============================================================================

const DIRECTIVES: &[&str] = &[
    "if", "for", "where", "having", "or", "in", "table", "col", "page", "orderBy", "fn",
];

/// Parse a template string into its node tree.
pub fn parse_template(input: &str) -> Result<Vec<TemplateNode>, ParseError> {
    let mut parser = TemplateParser::new(input, 0);
    let nodes = parser.parse_nodes(None)?;
    Ok(nodes)
}

struct TemplateParser<'a> {
    input: &'a str,
    cursor: usize,
    /// Byte offset of `input[0]` within the outermost template, so errors in
    /// nested fragments point into the original text.
    base: usize,
}

impl<'a> TemplateParser<'a> {
    fn new(input: &'a str, base: usize) -> Self {
        Self {
            input,
            cursor: 0,
            base,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn error(&self, at: usize, message: impl Into<String>) -> ParseError {
        ParseError::template(self.base + at, message)
    }

    /// Parse nodes until `terminator` (a closing `}`) or end of input.
    ///
    /// Quoted runs in the SQL text are opaque: a `:`, `@`, or `}` inside a
    /// string literal never starts a node or closes a block.
    fn parse_nodes(
        &mut self,
        terminator: Option<char>,
    ) -> Result<Vec<TemplateNode>, ParseError> {
        let mut nodes = Vec::new();
        let mut text = String::new();
        let mut quote: Option<char> = None;
        let block_start = self.cursor;

        loop {
            let rest = self.remaining();
            let Some(c) = rest.chars().next() else {
                if terminator.is_some() {
                    return Err(self.error(block_start, "unterminated block, expected `}`"));
                }
                break;
            };

            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                text.push(c);
                self.cursor += c.len_utf8();
                continue;
            }

            if Some(c) == terminator {
                self.cursor += 1;
                break;
            }

            if c == ':' && starts_ident(&rest[1..]) {
                flush_text(&mut nodes, &mut text);
                nodes.push(TemplateNode::Param(self.scan_param_path()?));
                continue;
            }

            if c == '@' {
                if let Some(name) = self.peek_directive() {
                    flush_text(&mut nodes, &mut text);
                    nodes.push(self.parse_directive(name)?);
                    continue;
                }
            }

            if c == '\'' || c == '"' {
                quote = Some(c);
            }
            text.push(c);
            self.cursor += c.len_utf8();
        }

        flush_text(&mut nodes, &mut text);
        Ok(nodes)
    }

    /// A `@` introduces a directive only when a known name follows; anything
    /// else (an email address, a literal `@`) stays text.
    fn peek_directive(&self) -> Option<&'static str> {
        let rest = &self.remaining()[1..];
        DIRECTIVES
            .iter()
            .find(|&&name| {
                rest.starts_with(name)
                    && !rest[name.len()..].starts_with(|c: char| c.is_alphanumeric() || c == '_')
            })
            .copied()
    }

    fn parse_directive(&mut self, name: &'static str) -> Result<TemplateNode, ParseError> {
        let start = self.cursor;
        self.cursor += 1 + name.len(); // `@` + name

        match name {
            "if" => {
                let (arg, arg_base) = self.read_parens()?;
                let cond = parse_expr_at(arg, self.base + arg_base)?;
                let body = self.open_block()?;
                Ok(TemplateNode::If { cond, body })
            }
            "for" => {
                let (arg, arg_base) = self.read_parens()?;
                let colon = arg.find(':').ok_or_else(|| {
                    self.error(arg_base, "@for expects `var : expr`")
                })?;
                let var = arg[..colon].trim();
                if var.is_empty() || !is_ident(var) {
                    return Err(self.error(arg_base, "@for expects an identifier loop variable"));
                }
                let source = parse_expr_at(&arg[colon + 1..], self.base + arg_base + colon + 1)?;
                let body = self.open_block()?;
                Ok(TemplateNode::For {
                    var: var.to_string(),
                    source,
                    body,
                })
            }
            "where" | "having" => {
                let keyword = if name == "where" { "WHERE" } else { "HAVING" };
                let body = self.open_block()?;
                Ok(TemplateNode::Clause { keyword, body })
            }
            "or" => {
                let body = self.open_block()?;
                Ok(TemplateNode::Or(body))
            }
            "in" => {
                let (arg, arg_base) = self.read_parens()?;
                let source = parse_expr_at(arg, self.base + arg_base)?;
                Ok(TemplateNode::In(source))
            }
            "table" => {
                let (arg, arg_base) = self.read_parens()?;
                let entity = arg.trim();
                if !is_ident(entity) {
                    return Err(self.error(arg_base, "@table expects an entity name"));
                }
                Ok(TemplateNode::Table(entity.to_string()))
            }
            "col" => {
                let (arg, arg_base) = self.read_parens()?;
                let sep = arg.find("::").ok_or_else(|| {
                    self.error(arg_base, "@col expects `Entity::field`")
                })?;
                let entity = arg[..sep].trim();
                let field = arg[sep + 2..].trim();
                if !is_ident(entity) || !is_ident(field) {
                    return Err(self.error(arg_base, "@col expects `Entity::field`"));
                }
                Ok(TemplateNode::Column {
                    entity: entity.to_string(),
                    field: field.to_string(),
                })
            }
            "page" => {
                let (arg, arg_base) = self.read_parens()?;
                let parts = split_top_level(arg, ',');
                if parts.len() != 2 {
                    return Err(self.error(arg_base, "@page expects two arguments"));
                }
                let (page_text, page_off) = parts[0];
                let (size_text, size_off) = parts[1];
                Ok(TemplateNode::Page {
                    page: parse_expr_at(page_text, self.base + arg_base + page_off)?,
                    page_size: parse_expr_at(size_text, self.base + arg_base + size_off)?,
                })
            }
            "orderBy" => {
                let (arg, arg_base) = self.read_parens()?;
                self.parse_order_by(arg, arg_base)
            }
            "fn" => {
                if !self.remaining().starts_with('.') {
                    return Err(self.error(start, "@fn expects `.name(args)`"));
                }
                self.cursor += 1;
                let fn_name: String = self
                    .remaining()
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                if fn_name.is_empty() {
                    return Err(self.error(self.cursor, "@fn expects a function name"));
                }
                self.cursor += fn_name.len();
                let (arg, arg_base) = self.read_parens()?;
                let mut args = Vec::new();
                for (part, off) in split_top_level(arg, ',') {
                    let mut sub = TemplateParser::new(part, self.base + arg_base + off);
                    args.push(sub.parse_nodes(None)?);
                }
                Ok(TemplateNode::Fn {
                    name: fn_name,
                    args,
                })
            }
            _ => unreachable!("unknown directive {name}"),
        }
    }

    /// `@orderBy(selection, allowed = { key: "fragment", … }, default = key)`
    fn parse_order_by(&self, arg: &str, arg_base: usize) -> Result<TemplateNode, ParseError> {
        let parts = split_top_level(arg, ',');
        if parts.len() < 2 {
            return Err(self.error(arg_base, "@orderBy expects a selection and an allowed map"));
        }

        let (selection_text, selection_off) = parts[0];
        let selection = parse_expr_at(selection_text, self.base + arg_base + selection_off)?;

        // `allowed = { … }` — parts[1] is a trimmed slice of `arg` starting
        // at allowed_off, so sub-offsets are allowed_off plus slice indices.
        let (allowed_text, allowed_off) = parts[1];
        let malformed =
            || self.error(arg_base + allowed_off, "@orderBy expects `allowed = { … }`");
        let rest = allowed_text
            .strip_prefix("allowed")
            .map(str::trim_start)
            .and_then(|s| s.strip_prefix('='))
            .map(str::trim_start)
            .ok_or_else(malformed)?;
        if !rest.starts_with('{') || !rest.ends_with('}') {
            return Err(malformed());
        }
        let inner = &rest[1..rest.len() - 1];
        let inner_off = allowed_off + (allowed_text.len() - rest.len()) + 1;

        let mut allowed = Vec::new();
        for (entry, entry_off) in split_top_level(inner, ',') {
            let abs = arg_base + inner_off + entry_off;
            if entry.is_empty() {
                continue;
            }
            let colon = entry
                .find(':')
                .ok_or_else(|| self.error(abs, "expected `key: \"fragment\"`"))?;
            let key = entry[..colon].trim();
            if !is_ident(key) {
                return Err(self.error(abs, "order-by key must be an identifier"));
            }
            let after_colon = &entry[colon + 1..];
            let fragment_text = after_colon.trim_start();
            let fragment_off = colon + 1 + (after_colon.len() - fragment_text.len());
            let quoted = fragment_text
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .ok_or_else(|| {
                    self.error(abs + fragment_off, "order-by fragment must be a quoted string")
                })?;
            let mut sub =
                TemplateParser::new(quoted, self.base + abs + fragment_off + 1);
            allowed.push((key.to_string(), sub.parse_nodes(None)?));
        }

        let mut default = None;
        for &(part, part_off) in parts.iter().skip(2) {
            let value = match_keyword_arg(part, "default").ok_or_else(|| {
                self.error(arg_base + part_off, "@orderBy expects `default = key`")
            })?;
            let key = value.trim();
            if !is_ident(key) {
                return Err(self.error(arg_base + part_off, "default must name an allowed key"));
            }
            default = Some(key.to_string());
        }

        Ok(TemplateNode::OrderBy {
            selection,
            allowed,
            default,
        })
    }

    /// Consume `( … )` (whitespace before the paren allowed) and return the
    /// raw content plus the offset where it starts.
    fn read_parens(&mut self) -> Result<(&'a str, usize), ParseError> {
        self.skip_spaces();
        let open_at = self.cursor;
        if !self.remaining().starts_with('(') {
            return Err(self.error(open_at, "expected `(`"));
        }
        self.cursor += 1;
        let content_start = self.cursor;

        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        let mut chars = self.remaining().char_indices();
        while let Some((i, c)) = chars.next() {
            if let Some(q) = quote {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let content = &self.input[content_start..content_start + i];
                        self.cursor = content_start + i + 1;
                        return Ok((content, content_start));
                    }
                }
                _ => {}
            }
        }
        Err(self.error(open_at, "unterminated `(`"))
    }

    /// Consume `{` (whitespace allowed before it) and parse the block body up
    /// to its matching `}`.
    fn open_block(&mut self) -> Result<Vec<TemplateNode>, ParseError> {
        self.skip_spaces();
        if !self.remaining().starts_with('{') {
            return Err(self.error(self.cursor, "expected `{`"));
        }
        self.cursor += 1;
        self.parse_nodes(Some('}'))
    }

    fn skip_spaces(&mut self) {
        let rest = self.remaining();
        self.cursor += rest.len() - rest.trim_start_matches([' ', '\t']).len();
    }

    /// Scan a bare `:path` reference: `ident ('.' ident ('()')?)*`.
    fn scan_param_path(&mut self) -> Result<TemplateExpr, ParseError> {
        self.cursor += 1; // ':'
        let mut segments = Vec::new();
        loop {
            let rest = self.remaining();
            let name: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if name.is_empty() {
                return Err(self.error(self.cursor, "expected identifier in parameter reference"));
            }
            self.cursor += name.len();

            let rest = self.remaining();
            let is_call = !segments.is_empty() && rest.starts_with("()");
            if is_call {
                self.cursor += 2;
            }
            segments.push(PathSegment { name, is_call });

            let rest = self.remaining();
            if rest.starts_with('.') && starts_ident(&rest[1..]) {
                self.cursor += 1;
            } else {
                break;
            }
        }
        Ok(TemplateExpr::Path(segments))
    }
}

fn flush_text(nodes: &mut Vec<TemplateNode>, text: &mut String) {
    if !text.is_empty() {
        nodes.push(TemplateNode::Text(std::mem::take(text)));
    }
}

fn starts_ident(s: &str) -> bool {
    s.starts_with(|c: char| c.is_alphabetic() || c == '_')
}

fn is_ident(s: &str) -> bool {
    starts_ident(s) && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Split on `sep` at depth zero, ignoring separators nested inside parens,
/// braces, brackets, or string literals. Returns trimmed parts with their
/// byte offsets into `input`.
fn split_top_level(input: &str, sep: char) -> Vec<(&str, usize)> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push((&input[start..i], start));
                start = i + sep.len_utf8();
            }
            _ => {}
        }
    }
    parts.push((&input[start..], start));
    parts
        .into_iter()
        .map(|(part, off)| {
            let leading = part.len() - part.trim_start().len();
            (part.trim(), off + leading)
        })
        .collect()
}

/// Match `name = rest` and return `rest` (untrimmed tail after the `=`).
fn match_keyword_arg<'a>(input: &'a str, name: &str) -> Option<&'a str> {
    let rest = input.trim_start().strip_prefix(name)?;
    let rest = rest.trim_start();
    rest.strip_prefix('=')
}
