//! Tokenizer for the built-in script language.

use std::fmt;
use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Decimal digits exactly as written; range checked by the parser.
    Int(String),
    Str(String),
    Ident(String),
    Let,
    Print,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Semi,
    LParen,
    RParen,
    LBrace,
    RBrace,
}

impl TokenKind {
    /// Whether a statement cannot end on this token.
    pub(crate) const fn expects_more(&self) -> bool {
        matches!(
            self,
            Self::Let
                | Self::Print
                | Self::Plus
                | Self::Minus
                | Self::Star
                | Self::Slash
                | Self::Percent
                | Self::Assign
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(digits) => f.write_str(digits),
            Self::Str(text) => write!(f, "{text:?}"),
            Self::Ident(name) => f.write_str(name),
            Self::Let => f.write_str("let"),
            Self::Print => f.write_str("print"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::Percent => f.write_str("%"),
            Self::Assign => f.write_str("="),
            Self::Semi => f.write_str(";"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::LBrace => f.write_str("{"),
            Self::RBrace => f.write_str("}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    /// Byte range of the token in its source.
    pub(crate) span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString { offset: usize },
    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char, offset: usize },
}

/// Lazily yields tokens so callers can stop at the first statement.
pub(crate) struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            failed: false,
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(&(offset, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else if self.starts_comment(offset) {
                for (_, skipped) in self.chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn starts_comment(&self, offset: usize) -> bool {
        self.source
            .get(offset..)
            .is_some_and(|rest| rest.starts_with("//"))
    }

    fn end_of(&mut self) -> usize {
        self.chars
            .peek()
            .map_or(self.source.len(), |&(offset, _)| offset)
    }

    fn lex_token(&mut self, start: usize, first: char) -> Result<TokenKind, LexError> {
        let kind = match first {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => TokenKind::Assign,
            ';' => TokenKind::Semi,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '"' => TokenKind::Str(self.lex_string(start)?),
            ch if ch.is_ascii_digit() => {
                let mut digits = String::from(ch);
                while let Some(&(_, next)) = self.chars.peek() {
                    if !next.is_ascii_digit() {
                        break;
                    }
                    digits.push(next);
                    self.chars.next();
                }
                TokenKind::Int(digits)
            }
            ch if ch.is_alphabetic() || ch == '_' => {
                let mut name = String::from(ch);
                while let Some(&(_, next)) = self.chars.peek() {
                    if !(next.is_alphanumeric() || next == '_') {
                        break;
                    }
                    name.push(next);
                    self.chars.next();
                }
                match name.as_str() {
                    "let" => TokenKind::Let,
                    "print" => TokenKind::Print,
                    _ => TokenKind::Ident(name),
                }
            }
            ch => return Err(LexError::UnexpectedChar { ch, offset: start }),
        };
        Ok(kind)
    }

    fn lex_string(&mut self, start: usize) -> Result<String, LexError> {
        let mut text = String::new();
        while let Some((_, ch)) = self.chars.next() {
            match ch {
                '"' => return Ok(text),
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, escaped)) => text.push(escaped),
                    None => break,
                },
                other => text.push(other),
            }
        }
        Err(LexError::UnterminatedString { offset: start })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.skip_trivia();
        let (start, first) = self.chars.next()?;
        match self.lex_token(start, first) {
            Ok(kind) => {
                let end = self.end_of();
                Some(Ok(Token {
                    kind,
                    span: start..end,
                }))
            }
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}

/// Tokenizes all of `source`.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}
