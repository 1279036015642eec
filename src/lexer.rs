//! Tokenizer for the embedded expression language.
//!
//! A thin forward scanner producing position-tagged tokens; the parser on
//! top of it is LL(1). Unterminated strings and stray characters surface as
//! [`ParseError::Expr`] with the byte offset where the problem starts.

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Symbols
    OrOr,   // ||
    AndAnd, // &&
    EqEq,   // ==
    NotEq,  // !=
    Lt,     // <
    LtEq,   // <=
    Gt,     // >
    GtEq,   // >=
    Bang,   // !
    LParen, // (
    RParen, // )
    Dot,    // .

    // Keywords
    True,
    False,
    Null,

    // Data
    Ident(String),
    Int(i64),
    Str(String),
}

/// A token plus the byte offset where it begins.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, cursor: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn advance(&mut self, n: usize) {
        self.cursor += n;
    }

    /// Tokenize the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(spanned) = self.next_token()? {
            tokens.push(spanned);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, ParseError> {
        // Skip whitespace.
        let rest = self.remaining();
        let trimmed = rest.trim_start();
        self.advance(rest.len() - trimmed.len());

        let rest = self.remaining();
        if rest.is_empty() {
            return Ok(None);
        }
        let position = self.cursor;

        // `get` rather than slicing: the second byte may sit inside a
        // multibyte character.
        let symbol = rest.get(..2).and_then(|two| match two {
            "||" => Some((Token::OrOr, 2)),
            "&&" => Some((Token::AndAnd, 2)),
            "==" => Some((Token::EqEq, 2)),
            "!=" => Some((Token::NotEq, 2)),
            "<=" => Some((Token::LtEq, 2)),
            ">=" => Some((Token::GtEq, 2)),
            _ => None,
        });
        let symbol = symbol.or_else(|| match rest.as_bytes()[0] {
            b'<' => Some((Token::Lt, 1)),
            b'>' => Some((Token::Gt, 1)),
            b'!' => Some((Token::Bang, 1)),
            b'(' => Some((Token::LParen, 1)),
            b')' => Some((Token::RParen, 1)),
            b'.' => Some((Token::Dot, 1)),
            _ => None,
        });
        if let Some((token, len)) = symbol {
            self.advance(len);
            return Ok(Some(Spanned { token, position }));
        }

        let first = rest.chars().next().unwrap_or_default();

        // Parameter-style references: a leading `:` before an identifier is
        // accepted and stripped.
        if first == ':' {
            let after = rest[1..].chars().next();
            if matches!(after, Some(c) if c.is_alphabetic() || c == '_') {
                self.advance(1);
                return self.next_token();
            }
            return Err(ParseError::expr(position, "unexpected `:`"));
        }

        // String literal with backslash escapes.
        if first == '\'' || first == '"' {
            return self.string_literal(first).map(Some);
        }

        // Integer, optionally negative.
        if first.is_ascii_digit()
            || (first == '-' && rest[1..].starts_with(|c: char| c.is_ascii_digit()))
        {
            let digits: String = rest
                .char_indices()
                .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && c == '-'))
                .map(|(_, c)| c)
                .collect();
            self.advance(digits.len());
            let n: i64 = digits
                .parse()
                .map_err(|_| ParseError::expr(position, format!("invalid number `{digits}`")))?;
            return Ok(Some(Spanned {
                token: Token::Int(n),
                position,
            }));
        }

        // Identifiers and keywords.
        if first.is_alphabetic() || first == '_' {
            let ident: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            self.advance(ident.len());
            let token = match ident.as_str() {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                _ => Token::Ident(ident),
            };
            return Ok(Some(Spanned { token, position }));
        }

        Err(ParseError::expr(
            position,
            format!("unexpected character `{first}`"),
        ))
    }

    fn string_literal(&mut self, quote: char) -> Result<Spanned, ParseError> {
        let position = self.cursor;
        let rest = self.remaining();
        let mut consumed = 1; // opening quote
        let mut value = String::new();
        let mut chars = rest[1..].chars();
        while let Some(c) = chars.next() {
            consumed += c.len_utf8();
            if c == quote {
                self.advance(consumed);
                return Ok(Spanned {
                    token: Token::Str(value),
                    position,
                });
            }
            if c == '\\' {
                match chars.next() {
                    Some(esc) => {
                        consumed += esc.len_utf8();
                        match esc {
                            'n' => value.push('\n'),
                            't' => value.push('\t'),
                            other => value.push(other),
                        }
                    }
                    None => break,
                }
            } else {
                value.push(c);
            }
        }
        Err(ParseError::expr(position, "unterminated string literal"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Tokenizer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn symbols_and_keywords() {
        assert_eq!(
            tokens("a || b && !c == null"),
            vec![
                Token::Ident("a".into()),
                Token::OrOr,
                Token::Ident("b".into()),
                Token::AndAnd,
                Token::Bang,
                Token::Ident("c".into()),
                Token::EqEq,
                Token::Null,
            ]
        );
    }

    #[test]
    fn colon_prefix_is_stripped() {
        assert_eq!(
            tokens(":status == 'PAID'"),
            vec![
                Token::Ident("status".into()),
                Token::EqEq,
                Token::Str("PAID".into()),
            ]
        );
    }

    #[test]
    fn negative_numbers_and_relational() {
        assert_eq!(
            tokens("-12 <= 3"),
            vec![Token::Int(-12), Token::LtEq, Token::Int(3)]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(tokens(r#""a\n\"b""#), vec![Token::Str("a\n\"b".into())]);
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = Tokenizer::new("x == 'oops").tokenize().unwrap_err();
        assert_eq!(
            err,
            ParseError::expr(5, "unterminated string literal")
        );
    }

    #[test]
    fn call_parens_lex_as_parens() {
        assert_eq!(
            tokens("order.items()"),
            vec![
                Token::Ident("order".into()),
                Token::Dot,
                Token::Ident("items".into()),
                Token::LParen,
                Token::RParen,
            ]
        );
    }
}
