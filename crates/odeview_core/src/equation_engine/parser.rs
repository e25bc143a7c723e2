//! Tokenizer and recursive-descent parser for right-hand side expressions.
//!
//! Precedence, loosest first: `+ -`, `* /`, unary `- +`, `^`/`**` (right associative).
//! So `-y^2` is `-(y^2)` and `2^-1` is `2^(-1)`.

use super::{Expr, FUNCTIONS};
use crate::error::ParseError;

/// Deepest nesting of parentheses, signs and powers a single expression may use.
pub const MAX_DEPTH: usize = 128;

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    parse_tokens(&tokens, input.chars().count())
}

/// Parses a complete expression from a token slice.
/// `end` is the character position reported when input runs out.
pub(super) fn parse_tokens(tokens: &[Token], end: usize) -> Result<Expr, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::at("Expression is empty", end));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end,
        depth: 0,
    };
    let expr = parser.parse_expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ParseError::at_token(
            "Unexpected token",
            token.pos,
            &token.text,
        )),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Equals,
    Prime,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub kind: TokenKind,
    /// Character offset of the first character.
    pub pos: usize,
    pub text: String,
}

pub(super) fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let kind = if c.is_ascii_digit() || c == '.' {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // Exponent only when digits follow, so `2exp` stays an error instead of a number.
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            match text.parse::<f64>() {
                Ok(value) if value.is_finite() => TokenKind::Number(value),
                Ok(_) => return Err(ParseError::at_token("Number out of range", start, &text)),
                Err(_) => return Err(ParseError::at_token("Invalid number", start, &text)),
            }
        } else if c.is_ascii_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            TokenKind::Identifier(chars[start..i].iter().collect())
        } else {
            i += 1;
            match c {
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' if chars.get(i) == Some(&'*') => {
                    i += 1;
                    TokenKind::Caret
                }
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '^' => TokenKind::Caret,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '=' => TokenKind::Equals,
                '\'' => TokenKind::Prime,
                _ => {
                    return Err(ParseError::at_token(
                        "Unexpected character",
                        start,
                        &c.to_string(),
                    ))
                }
            }
        };

        tokens.push(Token {
            kind,
            pos: start,
            text: chars[start..i].iter().collect(),
        });
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn consume(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn expect_rparen(&mut self, open: &Token) -> Result<(), ParseError> {
        match self.consume() {
            Some(Token {
                kind: TokenKind::RParen,
                ..
            }) => Ok(()),
            Some(token) => Err(ParseError::at_token(
                "Expected ')'",
                token.pos,
                &token.text,
            )),
            None => Err(ParseError::at_token(
                "Unclosed '('",
                open.pos,
                &open.text,
            )),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;

        while let Some(kind) = self.peek_kind() {
            let op = match kind {
                TokenKind::Plus => '+',
                TokenKind::Minus => '-',
                _ => break,
            };
            self.consume();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        while let Some(kind) = self.peek_kind() {
            let op = match kind {
                TokenKind::Star => '*',
                TokenKind::Slash => '/',
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // Every level of nesting passes through here, so the recursion depth is bounded.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.depth >= MAX_DEPTH {
            let message = "Expression is nested too deeply";
            return Err(match self.peek() {
                Some(token) => ParseError::at_token(message, token.pos, &token.text),
                None => ParseError::at(message, self.end),
            });
        }
        self.depth += 1;
        let expr = self.parse_signed();
        self.depth -= 1;
        expr
    }

    fn parse_signed(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.consume();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary('-', Box::new(operand)))
            }
            Some(TokenKind::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if let Some(TokenKind::Caret) = self.peek_kind() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), '^', Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.consume() else {
            return Err(ParseError::at("Unexpected end of expression", self.end));
        };
        match &token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(*n)),
            TokenKind::Identifier(name) => {
                let is_function = FUNCTIONS.contains(&name.as_str());
                match self.peek() {
                    Some(open) if open.kind == TokenKind::LParen => {
                        if !is_function {
                            return Err(ParseError::at_token(
                                "Unknown function",
                                token.pos,
                                name,
                            ));
                        }
                        self.consume();
                        let arg = self.parse_expression()?;
                        self.expect_rparen(open)?;
                        Ok(Expr::Call(name.clone(), Box::new(arg)))
                    }
                    _ if is_function => Err(ParseError::at_token(
                        "Function requires an argument in parentheses",
                        token.pos,
                        name,
                    )),
                    _ => Ok(Expr::Variable(name.clone())),
                }
            }
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.expect_rparen(token)?;
                Ok(expr)
            }
            _ => Err(ParseError::at_token(
                "Unexpected token",
                token.pos,
                &token.text,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Variable(name.to_string()))
    }

    #[test]
    fn tokenize_tracks_positions_and_text() {
        let tokens = tokenize("a*y ** 2").expect("tokens");
        let summary: Vec<(usize, &str)> = tokens
            .iter()
            .map(|token| (token.pos, token.text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![(0, "a"), (1, "*"), (2, "y"), (4, "**"), (7, "2")]
        );
        assert_eq!(tokens[3].kind, TokenKind::Caret);
    }

    #[test]
    fn tokenize_reads_scientific_notation() {
        let tokens = tokenize("2.5e-3 + .5 + 1E2").expect("tokens");
        assert_eq!(tokens[0].kind, TokenKind::Number(2.5e-3));
        assert_eq!(tokens[2].kind, TokenKind::Number(0.5));
        assert_eq!(tokens[4].kind, TokenKind::Number(100.0));
    }

    #[test]
    fn tokenize_rejects_malformed_numbers_and_characters() {
        let err = tokenize("1.2.3 + y").expect_err("invalid number");
        assert_eq!(err.position, 0);
        assert_eq!(err.token.as_deref(), Some("1.2.3"));

        let err = tokenize("y + 1e400").expect_err("overflowing number");
        assert!(err.message.contains("out of range"));

        let err = tokenize("y # 2").expect_err("unexpected character");
        assert_eq!(err.position, 2);
        assert_eq!(err.token.as_deref(), Some("#"));
    }

    #[test]
    fn parse_builds_expected_tree() {
        let expr = parse("-a*y + sin(b*t)").expect("expression should parse");
        let expected = Expr::Binary(
            Box::new(Expr::Binary(
                Box::new(Expr::Unary('-', var("a"))),
                '*',
                var("y"),
            )),
            '+',
            Box::new(Expr::Call(
                "sin".to_string(),
                Box::new(Expr::Binary(var("b"), '*', var("t"))),
            )),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn parse_unary_plus_is_transparent() {
        assert_eq!(
            parse("+y").expect("parse"),
            parse("y").expect("parse")
        );
    }

    #[test]
    fn parse_reports_unknown_function_position() {
        let err = parse("y + foo(t)").expect_err("unknown function");
        assert_eq!(err.position, 4);
        assert_eq!(err.token.as_deref(), Some("foo"));
        assert!(err.message.contains("Unknown function"));
    }

    #[test]
    fn parse_requires_function_arguments() {
        let err = parse("sin + y").expect_err("bare function name");
        assert_eq!(err.position, 0);
        assert!(err.message.contains("requires an argument"));
    }

    #[test]
    fn parse_reports_unbalanced_parentheses() {
        let err = parse("(y + 1").expect_err("unclosed paren");
        assert_eq!(err.position, 0);
        assert!(err.message.contains("Unclosed"));

        let err = parse("y + 1)").expect_err("stray paren");
        assert_eq!(err.position, 5);
        assert_eq!(err.token.as_deref(), Some(")"));
    }

    #[test]
    fn parse_rejects_dangling_operator_and_implicit_product() {
        let err = parse("1 +").expect_err("dangling operator");
        assert_eq!(err.position, 3);
        assert!(err.message.contains("end of expression"));

        let err = parse("2y").expect_err("implicit multiplication");
        assert_eq!(err.position, 1);
        assert_eq!(err.token.as_deref(), Some("y"));
    }

    #[test]
    fn parse_limits_nesting_depth() {
        let nested = |n: usize| format!("{}y{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(parse(&nested(100)).expect("moderate nesting"), *var("y"));

        let err = parse(&nested(2000)).expect_err("deep parentheses");
        assert!(err.message.contains("nested too deeply"), "{err}");
        assert_eq!(err.position, MAX_DEPTH);

        let err = parse(&format!("{}y", "-".repeat(5000))).expect_err("long sign run");
        assert!(err.message.contains("nested too deeply"), "{err}");

        let err = parse(&vec!["2"; 500].join("^")).expect_err("long power tower");
        assert!(err.message.contains("nested too deeply"), "{err}");
    }

    #[test]
    fn identifiers_are_ascii_only() {
        let err = parse("λ * y").expect_err("non-ascii identifier");
        assert_eq!(err.position, 0);
        assert_eq!(err.token.as_deref(), Some("λ"));
        assert!(parse("k_2 * y").is_ok());
    }

    #[test]
    fn parse_rejects_empty_input() {
        let err = parse("   ").expect_err("empty expression");
        assert!(err.message.contains("empty"));
    }
}
