use thiserror::Error;

use crate::ast::Program;
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};

mod expression;
mod statement;

pub use expression::parse_expression;
pub use statement::parse_block;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} (line {line})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// One physical source line that produced at least one token.
#[derive(Debug, Clone, PartialEq)]
pub struct Line<'a> {
    pub number: usize,
    pub indent: usize,
    pub tokens: Vec<Token<'a>>,
}

/// Tokenizes `source` once and groups the tokens by physical line.
///
/// Blank and comment-only lines produce no tokens and are dropped. A tab in
/// the leading whitespace counts as four columns.
pub fn split_lines(source: &str) -> Vec<Line<'_>> {
    let raw_lines: Vec<&str> = source.split('\n').collect();
    let mut lines: Vec<Line<'_>> = Vec::new();

    for token in tokenize(source) {
        let number = token.span.line;
        match lines.last_mut() {
            Some(line) if line.number == number => line.tokens.push(token),
            _ => {
                let raw = raw_lines.get(number - 1).copied().unwrap_or_default();
                lines.push(Line {
                    number,
                    indent: indentation(raw),
                    tokens: vec![token],
                });
            }
        }
    }
    lines
}

fn indentation(raw: &str) -> usize {
    raw.chars()
        .map_while(|c| match c {
            ' ' => Some(1),
            '\t' => Some(4),
            _ => None,
        })
        .sum()
}

pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let lines = split_lines(source);
    let statements = if lines.is_empty() {
        Vec::new()
    } else {
        parse_block(&lines)?
    };
    Ok(Program { statements })
}

fn bracket_delta(kind: TokenKind) -> isize {
    match kind {
        TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => 1,
        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => -1,
        _ => 0,
    }
}

/// Index of the first token outside any bracket pair that satisfies `matches`.
pub(crate) fn find_top_level(
    tokens: &[Token<'_>],
    matches: impl Fn(&Token<'_>) -> bool,
) -> Option<usize> {
    let mut depth = 0isize;
    for (index, token) in tokens.iter().enumerate() {
        if depth == 0 && matches(token) {
            return Some(index);
        }
        depth += bracket_delta(token.kind);
    }
    None
}

/// Splits `tokens` on every bracket-depth-zero token satisfying `is_separator`.
pub(crate) fn split_top_level<'t, 'a>(
    tokens: &'t [Token<'a>],
    is_separator: impl Fn(&Token<'a>) -> bool,
) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0isize;
    let mut start = 0;
    for (index, token) in tokens.iter().enumerate() {
        if depth == 0 && is_separator(token) {
            parts.push(&tokens[start..index]);
            start = index + 1;
        }
        depth += bracket_delta(token.kind);
    }
    parts.push(&tokens[start..]);
    parts
}
