use std::{iter::Peekable, str::CharIndices};

use crate::token::{Span, Token, TokenKind, is_keyword};

/// Punctuation table, longest lexemes first so `**=` wins over `**` and `*`.
const SYMBOLS: [(&str, TokenKind); 31] = [
    ("**=", TokenKind::AugAssign),
    ("//=", TokenKind::AugAssign),
    ("**", TokenKind::Operator),
    ("//", TokenKind::Operator),
    ("==", TokenKind::Comparator),
    ("!=", TokenKind::Comparator),
    ("<=", TokenKind::Comparator),
    (">=", TokenKind::Comparator),
    ("+=", TokenKind::AugAssign),
    ("-=", TokenKind::AugAssign),
    ("*=", TokenKind::AugAssign),
    ("/=", TokenKind::AugAssign),
    ("%=", TokenKind::AugAssign),
    ("+", TokenKind::Operator),
    ("-", TokenKind::Operator),
    ("*", TokenKind::Operator),
    ("/", TokenKind::Operator),
    ("%", TokenKind::Operator),
    ("<", TokenKind::Comparator),
    (">", TokenKind::Comparator),
    ("=", TokenKind::Assign),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
    (".", TokenKind::Dot),
    (";", TokenKind::Semicolon),
];

/// Lenient tokenizer: characters that start no token are skipped, never reported.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 0,
        }
    }

    pub fn next_token(&mut self) -> Option<Token<'a>> {
        loop {
            let &(start, ch) = self.chars.peek()?;
            let line = self.line;
            let column = self.column;

            match ch {
                c if c.is_whitespace() => {
                    self.advance_char();
                }
                '#' => self.skip_comment(),
                '"' | '\'' => {
                    if let Some(token) = self.read_string(start, ch, line, column) {
                        return Some(token);
                    }
                    // Unpaired delimiter: drop it and keep scanning.
                    self.advance_char();
                }
                c if c.is_alphabetic() || c == '_' => {
                    return Some(self.read_identifier(start, line, column));
                }
                c if c.is_ascii_digit() => return Some(self.read_number(start, line, column)),
                _ => {
                    if let Some(token) = self.read_symbol(start, line, column) {
                        return Some(token);
                    }
                    self.advance_char();
                }
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char(); // Consume first char
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let lexeme = &self.input[start..end];
        let kind = if is_keyword(lexeme) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Token::new(kind, lexeme, span(start, end, line, column))
    }

    fn read_number(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.consume_digits();

        // A fractional part needs at least one digit after the dot.
        let rest = &self.input[self.current_index()..];
        let mut after_dot = rest.chars();
        if after_dot.next() == Some('.') && after_dot.next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance_char();
            self.consume_digits();
        }

        let end = self.current_index();
        Token::new(
            TokenKind::Number,
            &self.input[start..end],
            span(start, end, line, column),
        )
    }

    fn consume_digits(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    /// Reads a quoted string if its closing delimiter appears on the same line.
    fn read_string(
        &mut self,
        start: usize,
        quote: char,
        line: usize,
        column: usize,
    ) -> Option<Token<'a>> {
        let body_start = start + quote.len_utf8();
        let body = &self.input[body_start..];
        let line_end = body.find('\n').unwrap_or(body.len());
        let close = body[..line_end].find(quote)?;
        let end = body_start + close + quote.len_utf8();

        while self.current_index() < end {
            self.advance_char();
        }
        Some(Token::new(
            TokenKind::String,
            &self.input[start..end],
            span(start, end, line, column),
        ))
    }

    fn read_symbol(&mut self, start: usize, line: usize, column: usize) -> Option<Token<'a>> {
        let rest = &self.input[start..];
        let (symbol, kind) = SYMBOLS
            .iter()
            .find(|(symbol, _)| rest.starts_with(symbol))?;
        for _ in 0..symbol.len() {
            self.advance_char();
        }
        let end = start + symbol.len();
        Some(Token::new(
            *kind,
            &self.input[start..end],
            span(start, end, line, column),
        ))
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

fn span(start: usize, end: usize, line: usize, column: usize) -> Span {
    Span {
        start,
        end,
        line,
        column,
    }
}

/// Splits source text into tokens in source order. Never fails.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Renders tokens in the standalone lexer tool format, one token per line.
pub fn format_tokens(tokens: &[Token<'_>]) -> String {
    tokens
        .iter()
        .map(|token| format!("{:<15} --> {}", token.lexeme, token.kind))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds_and_lexemes(input: &str) -> Vec<(TokenKind, &str)> {
        tokenize(input)
            .into_iter()
            .map(|token| (token.kind, token.lexeme))
            .collect()
    }

    #[test]
    fn test_simple_program() {
        let input = indoc! {"
            def fn(a, b=2):
                n = a + 4.5 # trailing comment
                return n
        "};
        let expected = vec![
            (TokenKind::Keyword, "def"),
            (TokenKind::Identifier, "fn"),
            (TokenKind::LParen, "("),
            (TokenKind::Identifier, "a"),
            (TokenKind::Comma, ","),
            (TokenKind::Identifier, "b"),
            (TokenKind::Assign, "="),
            (TokenKind::Number, "2"),
            (TokenKind::RParen, ")"),
            (TokenKind::Colon, ":"),
            (TokenKind::Identifier, "n"),
            (TokenKind::Assign, "="),
            (TokenKind::Identifier, "a"),
            (TokenKind::Operator, "+"),
            (TokenKind::Number, "4.5"),
            (TokenKind::Keyword, "return"),
            (TokenKind::Identifier, "n"),
        ];
        assert_eq!(kinds_and_lexemes(input), expected);
    }

    #[test]
    fn skips_unmatched_characters() {
        let tokens = kinds_and_lexemes("x = 1 @ 2 $ !");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Identifier, "x"),
                (TokenKind::Assign, "="),
                (TokenKind::Number, "1"),
                (TokenKind::Number, "2"),
            ]
        );
    }

    #[test]
    fn strings_need_paired_delimiters() {
        let tokens = kinds_and_lexemes("s = 'it\"s' + \"ok\"\nt = 'open");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Identifier, "s"),
                (TokenKind::Assign, "="),
                (TokenKind::String, "'it\"s'"),
                (TokenKind::Operator, "+"),
                (TokenKind::String, "\"ok\""),
                (TokenKind::Identifier, "t"),
                (TokenKind::Assign, "="),
                (TokenKind::Identifier, "open"),
            ]
        );
    }

    #[test]
    fn prefers_longest_operator() {
        let tokens = kinds_and_lexemes("a **= b // c <= d != e += 1");
        let operators: Vec<_> = tokens
            .into_iter()
            .filter(|(kind, _)| {
                matches!(
                    kind,
                    TokenKind::Operator | TokenKind::Comparator | TokenKind::AugAssign
                )
            })
            .collect();
        assert_eq!(
            operators,
            vec![
                (TokenKind::AugAssign, "**="),
                (TokenKind::Operator, "//"),
                (TokenKind::Comparator, "<="),
                (TokenKind::Comparator, "!="),
                (TokenKind::AugAssign, "+="),
            ]
        );
    }

    #[test]
    fn number_without_fraction_digits_leaves_dot() {
        let tokens = kinds_and_lexemes("1.x");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Number, "1"),
                (TokenKind::Dot, "."),
                (TokenKind::Identifier, "x"),
            ]
        );
    }

    #[test]
    fn classifies_keywords() {
        let tokens = kinds_and_lexemes("not x in y and True or None");
        let keywords: Vec<_> = tokens
            .into_iter()
            .filter(|(kind, _)| *kind == TokenKind::Keyword)
            .map(|(_, lexeme)| lexeme)
            .collect();
        assert_eq!(keywords, vec!["not", "in", "and", "True", "or", "None"]);
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = tokenize("a\n  bb");
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 2);
        assert_eq!(tokens[1].span.start, 4);
    }

    #[test]
    fn formats_tool_output() {
        let output = format_tokens(&tokenize("x = 10"));
        assert_eq!(
            output,
            "x               --> IDENTIFIER\n=               --> ASSIGN\n10              --> NUMBER"
        );
    }
}
