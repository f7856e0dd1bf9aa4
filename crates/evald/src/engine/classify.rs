//! Completeness classification of buffered source text.

use crate::evaluator::CompletionInfo;

use super::lexer::{LexError, Lexer, TokenKind};

/// Splits the first statement off `source` and reports whether it can run.
///
/// The first statement ends at a `;` outside any brackets, at the `}` closing
/// a leading block, or at the end of the text. Open brackets, an unterminated
/// string or a dangling operator mean more input is needed; stray closers and
/// unknown characters are left for execution to diagnose.
pub(crate) fn classify(source: &str) -> CompletionInfo {
    let mut open: Vec<TokenKind> = Vec::new();
    let mut leading_block = false;
    let mut last: Option<TokenKind> = None;

    for (index, token) in Lexer::new(source).enumerate() {
        let token = match token {
            Ok(token) => token,
            Err(LexError::UnterminatedString { .. }) => {
                return CompletionInfo::incomplete(source);
            }
            Err(LexError::UnexpectedChar { .. }) => return CompletionInfo::unknown(source, ""),
        };
        match token.kind {
            TokenKind::LParen | TokenKind::LBrace => {
                if index == 0 && token.kind == TokenKind::LBrace {
                    leading_block = true;
                }
                open.push(token.kind.clone());
            }
            TokenKind::RParen | TokenKind::RBrace => {
                let closes = matches!(
                    (open.pop(), &token.kind),
                    (Some(TokenKind::LParen), TokenKind::RParen)
                        | (Some(TokenKind::LBrace), TokenKind::RBrace)
                );
                if !closes {
                    return CompletionInfo::unknown(source, "");
                }
                if leading_block && open.is_empty() {
                    return split_after(source, token.span.end);
                }
            }
            TokenKind::Semi if open.is_empty() => return split_after(source, token.span.end),
            _ => {}
        }
        last = Some(token.kind);
    }

    match last {
        None => CompletionInfo::empty(),
        Some(_) if !open.is_empty() => CompletionInfo::incomplete(source),
        Some(kind) if kind.expects_more() => CompletionInfo::incomplete(source),
        Some(_) => CompletionInfo::complete(source, ""),
    }
}

fn split_after(source: &str, end: usize) -> CompletionInfo {
    let (statement, remaining) = source.split_at(end);
    CompletionInfo::complete(statement, remaining)
}
