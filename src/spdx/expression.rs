//! SPDX expression parsing and evaluation.
//!
//! Grammar (recursive descent, `AND` binds tighter than `OR`):
//!
//! ```text
//! expression := and-expr ( "OR" and-expr )*
//! and-expr   := atom ( "AND" atom )*
//! atom       := "(" expression ")"
//!             | identifier [ "+" ] [ "WITH" identifier ]
//! ```
//!
//! Operator keywords are case-sensitive, as are identifiers.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// A parsed SPDX expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// A single identifier, optionally with the `+` "or later" suffix.
    Simple { id: String, or_later: bool },

    /// `<license> WITH <exception>`. The exception is informational; it does
    /// not affect satisfaction.
    With {
        license: Box<Expression>,
        exception: String,
    },

    /// Both sides must be satisfied.
    And(Box<Expression>, Box<Expression>),

    /// At least one side must be satisfied.
    Or(Box<Expression>, Box<Expression>),
}

/// Expression parse failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty license expression")]
    Empty,

    #[error("unexpected token `{0}` in license expression")]
    UnexpectedToken(String),

    #[error("dangling operator `{0}` in license expression")]
    DanglingOperator(String),

    #[error("unmatched parenthesis in license expression")]
    UnmatchedParen,

    #[error("`WITH` must be followed by an exception identifier")]
    MissingException,

    #[error("invalid character `{0}` in license expression")]
    InvalidCharacter(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Plus,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            c if c.is_ascii_alphanumeric() => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(ParseError::InvalidCharacter(other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(id)) if id == kw)
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_and()?;
        while self.at_keyword("OR") {
            self.next();
            if self.peek().is_none() {
                return Err(ParseError::DanglingOperator("OR".into()));
            }
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_atom()?;
        while self.at_keyword("AND") {
            self.next();
            if self.peek().is_none() {
                return Err(ParseError::DanglingOperator("AND".into()));
            }
            let right = self.parse_atom()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<Expression, ParseError> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(self.maybe_with(inner)?),
                    _ => Err(ParseError::UnmatchedParen),
                }
            }
            Some(Token::Ident(id)) if id == "AND" || id == "OR" || id == "WITH" => {
                Err(ParseError::DanglingOperator(id))
            }
            Some(Token::Ident(id)) => {
                let or_later = if self.peek() == Some(&Token::Plus) {
                    self.next();
                    true
                } else {
                    false
                };
                self.maybe_with(Expression::Simple { id, or_later })
            }
            Some(Token::RParen) => Err(ParseError::UnmatchedParen),
            Some(Token::Plus) => Err(ParseError::UnexpectedToken("+".into())),
            None => Err(ParseError::Empty),
        }
    }

    fn maybe_with(&mut self, license: Expression) -> Result<Expression, ParseError> {
        if !self.at_keyword("WITH") {
            return Ok(license);
        }
        self.next();
        match self.next() {
            Some(Token::Ident(exception))
                if exception != "AND" && exception != "OR" && exception != "WITH" =>
            {
                Ok(Expression::With {
                    license: Box::new(license),
                    exception,
                })
            }
            _ => Err(ParseError::MissingException),
        }
    }
}

impl Expression {
    /// Parse an SPDX expression.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;

        match parser.next() {
            None => Ok(expr),
            Some(Token::RParen) => Err(ParseError::UnmatchedParen),
            Some(Token::Ident(id)) => Err(ParseError::UnexpectedToken(id)),
            Some(Token::Plus) => Err(ParseError::UnexpectedToken("+".into())),
            Some(Token::LParen) => Err(ParseError::UnmatchedParen),
        }
    }

    /// The transitive set of license identifiers (exceptions excluded).
    pub fn license_ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut BTreeSet<String>) {
        match self {
            Expression::Simple { id, .. } => {
                ids.insert(id.clone());
            }
            Expression::With { license, .. } => license.collect_ids(ids),
            Expression::And(a, b) | Expression::Or(a, b) => {
                a.collect_ids(ids);
                b.collect_ids(ids);
            }
        }
    }

    /// Whether the expression is satisfied by a set of allowed identifiers.
    pub fn satisfied_by(&self, allowed: &BTreeSet<String>) -> bool {
        match self {
            Expression::Simple { id, .. } => allowed.contains(id),
            Expression::With { license, .. } => license.satisfied_by(allowed),
            Expression::And(a, b) => a.satisfied_by(allowed) && b.satisfied_by(allowed),
            Expression::Or(a, b) => a.satisfied_by(allowed) || b.satisfied_by(allowed),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Simple { id, or_later } => {
                write!(f, "{}{}", id, if *or_later { "+" } else { "" })
            }
            Expression::With { license, exception } => {
                write!(f, "{} WITH {}", license, exception)
            }
            Expression::And(a, b) => write!(f, "{} AND {}", paren(a), paren(b)),
            Expression::Or(a, b) => write!(f, "{} OR {}", a, b),
        }
    }
}

fn paren(e: &Expression) -> String {
    match e {
        Expression::Or(..) => format!("({})", e),
        _ => e.to_string(),
    }
}
