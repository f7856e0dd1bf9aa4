//! Recursive-descent parser producing statements for the interpreter.

use std::iter::Peekable;
use std::vec::IntoIter;

use thiserror::Error;

use super::lexer::{LexError, Token, TokenKind, tokenize};

/// Deepest nesting of blocks, brackets, unary minus and operator chains
/// accepted in one statement. The parser and interpreter both recurse on it.
pub(crate) const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Stmt {
    Let { name: String, value: Expr },
    Print(Expr),
    Expr(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    Int(i64),
    Str(String),
    Name(String),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    pub(crate) const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("unexpected '{found}', expected {expected}")]
    Unexpected {
        found: TokenKind,
        expected: &'static str,
    },
    #[error("integer literal {digits} is out of range")]
    IntegerOutOfRange { digits: String },
    #[error("statement nests deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Parses every top-level statement in `source`. Empty statements (`;`) are
/// dropped.
pub(crate) fn parse(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(source)?.into_iter().peekable(),
        depth: 0,
    };
    let mut statements = Vec::new();
    while parser.tokens.peek().is_some() {
        if parser.eat(&TokenKind::Semi) {
            continue;
        }
        statements.push(parser.statement(true)?);
    }
    Ok(statements)
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    depth: usize,
}

impl Parser {
    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeep { limit: MAX_NESTING });
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    fn peek_kind(&mut self) -> Option<&TokenKind> {
        self.tokens.peek().map(|token| &token.kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.tokens.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), ParseError> {
        match self.tokens.next() {
            Some(token) if &token.kind == kind => Ok(()),
            Some(token) => Err(ParseError::Unexpected {
                found: token.kind,
                expected,
            }),
            None => Err(ParseError::UnexpectedEnd { expected }),
        }
    }

    fn statement(&mut self, top_level: bool) -> Result<Stmt, ParseError> {
        let stmt = match self.peek_kind() {
            Some(TokenKind::LBrace) => {
                self.tokens.next();
                self.descend()?;
                let block = self.block();
                self.ascend(1);
                return block;
            }
            Some(TokenKind::Let) => {
                self.tokens.next();
                let name = match self.tokens.next() {
                    Some(Token {
                        kind: TokenKind::Ident(name),
                        ..
                    }) => name,
                    Some(token) => {
                        return Err(ParseError::Unexpected {
                            found: token.kind,
                            expected: "a name after 'let'",
                        });
                    }
                    None => {
                        return Err(ParseError::UnexpectedEnd {
                            expected: "a name after 'let'",
                        });
                    }
                };
                self.expect(&TokenKind::Assign, "'='")?;
                Stmt::Let {
                    name,
                    value: self.expression()?,
                }
            }
            Some(TokenKind::Print) => {
                self.tokens.next();
                self.expect(&TokenKind::LParen, "'(' after 'print'")?;
                let value = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Stmt::Print(value)
            }
            _ => Stmt::Expr(self.expression()?),
        };
        if top_level && self.tokens.peek().is_none() {
            return Ok(stmt);
        }
        self.expect(&TokenKind::Semi, "';'")?;
        Ok(stmt)
    }

    fn block(&mut self) -> Result<Stmt, ParseError> {
        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::RBrace) => {
                    self.tokens.next();
                    return Ok(Stmt::Block(body));
                }
                Some(TokenKind::Semi) => {
                    self.tokens.next();
                }
                Some(_) => body.push(self.statement(false)?),
                None => return Err(ParseError::UnexpectedEnd { expected: "'}'" }),
            }
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        let mut chained = 0;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => {
                    self.ascend(chained);
                    return Ok(lhs);
                }
            };
            self.tokens.next();
            self.descend()?;
            chained += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        let mut chained = 0;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::Percent) => BinOp::Rem,
                _ => {
                    self.ascend(chained);
                    return Ok(lhs);
                }
            };
            self.tokens.next();
            self.descend()?;
            chained += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Minus) {
            self.descend()?;
            let inner = self.unary()?;
            self.ascend(1);
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        const EXPECTED: &str = "an expression";
        let Some(token) = self.tokens.next() else {
            return Err(ParseError::UnexpectedEnd { expected: EXPECTED });
        };
        match token.kind {
            TokenKind::Int(digits) => digits
                .parse::<i64>()
                .map(Expr::Int)
                .map_err(|_| ParseError::IntegerOutOfRange { digits }),
            TokenKind::Str(text) => Ok(Expr::Str(text)),
            TokenKind::Ident(name) => Ok(Expr::Name(name)),
            TokenKind::LParen => {
                self.descend()?;
                let inner = self.expression()?;
                self.ascend(1);
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            found => Err(ParseError::Unexpected {
                found,
                expected: EXPECTED,
            }),
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
