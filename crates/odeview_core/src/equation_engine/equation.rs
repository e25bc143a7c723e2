use super::parser::{parse_tokens, tokenize, Token, TokenKind};
use super::{is_reserved, Expr};
use crate::error::ParseError;
use std::collections::BTreeSet;
use std::fmt;

/// An explicit first-order scalar ODE `d<state>/d<time> = rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub state: String,
    pub time: String,
    pub rhs: Expr,
    /// Free parameter names referenced by `rhs`, sorted.
    pub parameters: Vec<String>,
}

impl Equation {
    /// Variable names in the order the VM expects them: `[time, state]`.
    pub fn var_names(&self) -> Vec<String> {
        vec![self.time.clone(), self.state.clone()]
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}/d{} = {}", self.state, self.time, self.rhs)
    }
}

/// Parses `dy/dt = f(t, y, params)` (or `y' = ...`) into an [`Equation`].
///
/// The left-hand side picks the state and time variable names; every other
/// identifier on the right-hand side becomes a free parameter.
pub fn parse_equation(input: &str) -> Result<Equation, ParseError> {
    let tokens = tokenize(input)?;
    let end = input.chars().count();

    let mut equals = tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| token.kind == TokenKind::Equals);
    let Some((split, _)) = equals.next() else {
        return Err(ParseError::at("Equation must contain '=' sign", end));
    };
    if let Some((_, extra)) = equals.next() {
        return Err(ParseError::at_token(
            "Equation must contain exactly one '=' sign",
            extra.pos,
            &extra.text,
        ));
    }

    let (lhs, rest) = tokens.split_at(split);
    let equals_token = &rest[0];
    let rhs_tokens = &rest[1..];

    let (state, time) = parse_lhs(lhs, equals_token)?;
    if is_reserved(&state) || is_reserved(&time) {
        let name = if is_reserved(&state) { &state } else { &time };
        return Err(ParseError::at_token(
            "Reserved name cannot be used as a variable",
            lhs[0].pos,
            name,
        ));
    }
    if state == time {
        return Err(ParseError::at_token(
            "State and time variable must differ",
            lhs[0].pos,
            &lhs[0].text,
        ));
    }

    reject_rhs_derivatives(rhs_tokens, &time)?;
    if rhs_tokens.is_empty() {
        return Err(ParseError::at("Right-hand side is empty", end));
    }
    let rhs = parse_tokens(rhs_tokens, end)?;

    let mut parameters = BTreeSet::new();
    rhs.for_each_variable(&mut |name| {
        if name != state && name != time && !is_reserved(name) {
            parameters.insert(name.to_string());
        }
    });

    Ok(Equation {
        state,
        time,
        rhs,
        parameters: parameters.into_iter().collect(),
    })
}

/// Accepts `dX/dT` and `X'`; returns `(state, time)`.
fn parse_lhs(lhs: &[Token], equals: &Token) -> Result<(String, String), ParseError> {
    let Some(first) = lhs.first() else {
        return Err(ParseError::at_token(
            "Left-hand side is empty",
            equals.pos,
            &equals.text,
        ));
    };

    let higher_order = |token: &Token| {
        ParseError::at_token(
            "Higher-order derivatives are not supported",
            token.pos,
            &token.text,
        )
    };
    let unsupported = || {
        ParseError::at_token(
            "Left-hand side must be a first derivative like dy/dt",
            first.pos,
            &first.text,
        )
    };

    let kinds: Vec<&TokenKind> = lhs.iter().map(|token| &token.kind).collect();
    match kinds.as_slice() {
        [TokenKind::Identifier(num), TokenKind::Slash, TokenKind::Identifier(den)] => {
            let (Some(state), Some(time)) = (derivative_operand(num), derivative_operand(den))
            else {
                return Err(unsupported());
            };
            if starts_with_digit(state) {
                return Err(higher_order(&lhs[0]));
            }
            if starts_with_digit(time) || time.ends_with(|c: char| c.is_ascii_digit()) {
                return Err(higher_order(&lhs[2]));
            }
            Ok((state.to_string(), time.to_string()))
        }
        [TokenKind::Identifier(name), TokenKind::Prime] => Ok((name.clone(), "t".to_string())),
        [TokenKind::Identifier(_), TokenKind::Prime, TokenKind::Prime, ..] => {
            Err(higher_order(&lhs[2]))
        }
        [TokenKind::Identifier(d), TokenKind::Caret, ..] if d == "d" => Err(higher_order(&lhs[1])),
        _ => Err(unsupported()),
    }
}

/// `dy` -> `y`. Plain `d` has no operand.
fn derivative_operand(name: &str) -> Option<&str> {
    name.strip_prefix('d').filter(|rest| !rest.is_empty())
}

fn starts_with_digit(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_digit())
}

/// Derivative notation on the right-hand side means a second dependent variable or a
/// higher-order equation, both outside a single explicit first-order ODE.
fn reject_rhs_derivatives(tokens: &[Token], time: &str) -> Result<(), ParseError> {
    let time_differential = format!("d{time}");
    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Prime {
            return Err(ParseError::at_token(
                "Derivative terms are not allowed on the right-hand side",
                token.pos,
                &token.text,
            ));
        }
        if let [Token {
            kind: TokenKind::Identifier(num),
            ..
        }, Token {
            kind: TokenKind::Slash,
            ..
        }, Token {
            kind: TokenKind::Identifier(den),
            ..
        }, ..] = &tokens[i..]
        {
            if *den == time_differential && derivative_operand(num).is_some() {
                return Err(ParseError::at_token(
                    "Derivative terms are not allowed on the right-hand side",
                    token.pos,
                    &format!("{num}/{den}"),
                ));
            }
        }
    }
    Ok(())
}
