//! Operator-precedence (shunting-yard) expression parser.
//!
//! Operands are primaries with their call/subscript/attribute trailers;
//! operators are resolved against a fixed precedence table:
//!
//! | precedence | operators                          | associativity |
//! |------------|------------------------------------|---------------|
//! | 1          | `or`                               | left          |
//! | 2          | `and`                              | left          |
//! | 3          | `not` (prefix)                     | right         |
//! | 4          | `== != < > <= >= in not in`        | chained       |
//! | 5          | `+ -`                              | left          |
//! | 6          | `* / // %`                         | left          |
//! | 7          | unary `-` `+` (prefix)             | right         |
//! | 8          | `**`                               | right         |

use crate::ast::{
    BinaryOperator, BoolOperator, CompareOperator, Expression, Literal, UnaryOperator,
};
use crate::token::{Token, TokenKind};

use super::ParseError;

#[derive(Debug, Clone, Copy)]
enum InfixOperator {
    Bool(BoolOperator),
    Compare(CompareOperator),
    Arithmetic(BinaryOperator),
}

impl InfixOperator {
    fn precedence(self) -> u8 {
        match self {
            Self::Bool(BoolOperator::Or) => 1,
            Self::Bool(BoolOperator::And) => 2,
            Self::Compare(_) => 4,
            Self::Arithmetic(BinaryOperator::Add | BinaryOperator::Sub) => 5,
            Self::Arithmetic(
                BinaryOperator::Mul
                | BinaryOperator::Div
                | BinaryOperator::FloorDiv
                | BinaryOperator::Mod,
            ) => 6,
            Self::Arithmetic(BinaryOperator::Pow) => 8,
        }
    }

    fn is_right_associative(self) -> bool {
        matches!(self, Self::Arithmetic(BinaryOperator::Pow))
    }
}

#[derive(Debug, Clone, Copy)]
enum Pending {
    Prefix(UnaryOperator),
    Infix(InfixOperator),
}

impl Pending {
    fn precedence(self) -> u8 {
        match self {
            Self::Prefix(UnaryOperator::Not) => 3,
            Self::Prefix(UnaryOperator::Negate | UnaryOperator::Plus) => 7,
            Self::Infix(op) => op.precedence(),
        }
    }
}

/// Operand on the output stack. `grouped` operands came straight from a
/// primary (including a parenthesized group) and never extend a chain.
struct Operand {
    expr: Expression,
    grouped: bool,
}

struct ExpressionParser<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    line: usize,
}

/// Parses a complete token slice as one expression; a top-level comma builds
/// a tuple.
pub fn parse_expression(tokens: &[Token<'_>]) -> Result<Expression, ParseError> {
    let mut parser = ExpressionParser::new(tokens);
    let expr = parser.parse_expression_list()?;
    parser.expect_end()?;
    Ok(expr)
}

impl<'t, 'a> ExpressionParser<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        let line = tokens.first().map(|token| token.span.line).unwrap_or(1);
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.current() {
            None => Ok(()),
            Some(token) if matches!(token.kind, TokenKind::RParen) => {
                Err(self.error_at(token, "unmatched ')'"))
            }
            Some(token) if matches!(token.kind, TokenKind::RBracket | TokenKind::RBrace) => {
                Err(self.error_at(token, format!("unmatched '{}'", token.lexeme)))
            }
            Some(token) => Err(self.error_at(
                token,
                format!("invalid syntax near '{}'", token.lexeme),
            )),
        }
    }

    fn parse_expression_list(&mut self) -> Result<Expression, ParseError> {
        let first = self.parse_expression()?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.at_expression_end() {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        Ok(Expression::Tuple(elements))
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let mut operands: Vec<Operand> = Vec::new();
        let mut operators: Vec<Pending> = Vec::new();

        loop {
            while let Some(op) = self.prefix_operator() {
                self.pos += 1;
                operators.push(Pending::Prefix(op));
            }
            let expr = self.parse_postfix()?;
            operands.push(Operand {
                expr,
                grouped: true,
            });

            let Some((op, width)) = self.infix_operator() else {
                break;
            };
            self.pos += width;
            let precedence = op.precedence();
            while let Some(&top) = operators.last() {
                let top_precedence = top.precedence();
                let binds_tighter = top_precedence > precedence
                    || (top_precedence == precedence && !op.is_right_associative());
                if !binds_tighter {
                    break;
                }
                operators.pop();
                self.reduce(&mut operands, top)?;
            }
            operators.push(Pending::Infix(op));
        }

        while let Some(op) = operators.pop() {
            self.reduce(&mut operands, op)?;
        }
        match (operands.pop(), operands.is_empty()) {
            (Some(operand), true) => Ok(operand.expr),
            _ => Err(self.error("invalid syntax")),
        }
    }

    fn reduce(&self, operands: &mut Vec<Operand>, op: Pending) -> Result<(), ParseError> {
        let missing = || self.error("invalid syntax");
        let right = operands.pop().ok_or_else(missing)?;
        let expr = match op {
            Pending::Prefix(op) => Expression::UnaryOp {
                op,
                operand: Box::new(right.expr),
            },
            Pending::Infix(op) => {
                let left = operands.pop().ok_or_else(missing)?;
                combine(left, op, right.expr)
            }
        };
        operands.push(Operand {
            expr,
            grouped: false,
        });
        Ok(())
    }

    fn prefix_operator(&self) -> Option<UnaryOperator> {
        let token = self.current()?;
        if token.is_keyword("not") {
            Some(UnaryOperator::Not)
        } else if token.is_operator("-") {
            Some(UnaryOperator::Negate)
        } else if token.is_operator("+") {
            Some(UnaryOperator::Plus)
        } else {
            None
        }
    }

    /// Operator at the cursor and the number of tokens it spans.
    fn infix_operator(&self) -> Option<(InfixOperator, usize)> {
        let token = self.current()?;
        let op = match token.kind {
            TokenKind::Operator => InfixOperator::Arithmetic(BinaryOperator::from_symbol(token.lexeme)?),
            TokenKind::Comparator => {
                InfixOperator::Compare(CompareOperator::from_symbol(token.lexeme)?)
            }
            TokenKind::Keyword => match token.lexeme {
                "and" => InfixOperator::Bool(BoolOperator::And),
                "or" => InfixOperator::Bool(BoolOperator::Or),
                "in" => InfixOperator::Compare(CompareOperator::In),
                "not" if self.peek(1).is_some_and(|next| next.is_keyword("in")) => {
                    return Some((InfixOperator::Compare(CompareOperator::NotIn), 2));
                }
                _ => return None,
            },
            _ => return None,
        };
        Some((op, 1))
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(TokenKind::LParen) {
                expr = self.parse_call(expr)?;
            } else if self.eat(TokenKind::LBracket) {
                let index = self.parse_subscript()?;
                self.expect_closing(TokenKind::RBracket, "[")?;
                expr = Expression::Subscript {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(TokenKind::Dot) {
                let name = self.expect_identifier("attribute name")?;
                expr = Expression::Attribute {
                    object: Box::new(expr),
                    name,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let Some(token) = self.current() else {
            return Err(self.error("unexpected end of expression"));
        };
        let token = token.clone();
        self.pos += 1;

        match token.kind {
            TokenKind::Number => parse_number(&token).map(Expression::Literal),
            TokenKind::String => {
                let body = &token.lexeme[1..token.lexeme.len() - 1];
                Ok(Expression::Literal(Literal::String(body.to_string())))
            }
            TokenKind::Identifier => Ok(Expression::Identifier(token.lexeme.to_string())),
            TokenKind::Keyword => match token.lexeme {
                "True" => Ok(Expression::Literal(Literal::Boolean(true))),
                "False" => Ok(Expression::Literal(Literal::Boolean(false))),
                "None" => Ok(Expression::Literal(Literal::None)),
                other => Err(self.error_at(&token, format!("invalid syntax near '{other}'"))),
            },
            TokenKind::LParen => {
                if self.eat(TokenKind::RParen) {
                    return Ok(Expression::Tuple(Vec::new()));
                }
                let inner = self.parse_expression_list()?;
                self.expect_closing(TokenKind::RParen, "(")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let elements = self.parse_sequence(TokenKind::RBracket, "[")?;
                Ok(Expression::List(elements))
            }
            TokenKind::LBrace => self.parse_brace_literal(),
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                Err(self.error_at(&token, format!("unmatched '{}'", token.lexeme)))
            }
            _ => Err(self.error_at(
                &token,
                format!("invalid syntax near '{}'", token.lexeme),
            )),
        }
    }

    fn parse_sequence(
        &mut self,
        close: TokenKind,
        open: &str,
    ) -> Result<Vec<Expression>, ParseError> {
        let mut elements = Vec::new();
        while !self.check(close) {
            elements.push(self.parse_expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(close, open)?;
        Ok(elements)
    }

    fn parse_brace_literal(&mut self) -> Result<Expression, ParseError> {
        if self.eat(TokenKind::RBrace) {
            return Ok(Expression::Dict(Vec::new()));
        }
        let first = self.parse_expression()?;
        if !self.eat(TokenKind::Colon) {
            let mut elements = vec![first];
            if self.eat(TokenKind::Comma) {
                elements.extend(self.parse_sequence(TokenKind::RBrace, "{")?);
            } else {
                self.expect_closing(TokenKind::RBrace, "{")?;
            }
            return Ok(Expression::Set(elements));
        }

        let mut entries = vec![(first, self.parse_expression()?)];
        while self.eat(TokenKind::Comma) {
            if self.check(TokenKind::RBrace) {
                break;
            }
            let key = self.parse_expression()?;
            self.expect(TokenKind::Colon, "':' in dict literal")?;
            entries.push((key, self.parse_expression()?));
        }
        self.expect_closing(TokenKind::RBrace, "{")?;
        Ok(Expression::Dict(entries))
    }

    fn parse_call(&mut self, callee: Expression) -> Result<Expression, ParseError> {
        let mut args = Vec::new();
        let mut keywords: Vec<(String, Expression)> = Vec::new();
        while !self.check(TokenKind::RParen) {
            let is_keyword = self.check(TokenKind::Identifier)
                && self.peek(1).is_some_and(|next| next.kind == TokenKind::Assign);
            if is_keyword {
                let name = self.expect_identifier("keyword argument")?;
                self.pos += 1;
                if keywords.iter().any(|(existing, _)| *existing == name) {
                    return Err(self.error(format!("keyword argument repeated: {name}")));
                }
                keywords.push((name, self.parse_expression()?));
            } else {
                if !keywords.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                args.push(self.parse_expression()?);
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(TokenKind::RParen, "(")?;
        Ok(Expression::Call {
            callee: Box::new(callee),
            args,
            keywords,
        })
    }

    fn parse_subscript(&mut self) -> Result<Expression, ParseError> {
        let lower = if self.check(TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression_list()?)
        };
        if !self.eat(TokenKind::Colon) {
            return lower.ok_or_else(|| self.error("invalid subscript"));
        }

        let upper = self.parse_slice_bound()?;
        let step = if self.eat(TokenKind::Colon) {
            self.parse_slice_bound()?
        } else {
            None
        };
        Ok(Expression::Slice {
            lower: lower.map(Box::new),
            upper,
            step,
        })
    }

    fn parse_slice_bound(&mut self) -> Result<Option<Box<Expression>>, ParseError> {
        if self.check(TokenKind::Colon) || self.check(TokenKind::RBracket) {
            return Ok(None);
        }
        Ok(Some(Box::new(self.parse_expression()?)))
    }

    fn at_expression_end(&self) -> bool {
        self.current().is_none_or(|token| {
            matches!(
                token.kind,
                TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
                    | TokenKind::Colon
                    | TokenKind::Assign
                    | TokenKind::AugAssign
                    | TokenKind::Semicolon
            )
        })
    }

    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek(&self, offset: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + offset)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().is_some_and(|token| token.kind == kind)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_closing(&mut self, close: TokenKind, open: &str) -> Result<(), ParseError> {
        if self.eat(close) {
            return Ok(());
        }
        match self.current() {
            None => Err(self.error(format!("unmatched '{open}'"))),
            Some(_) => Err(self.unexpected(&format!("closing bracket for '{open}'"))),
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.current() {
            Some(token) if token.kind == TokenKind::Identifier => {
                let name = token.lexeme.to_string();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(token) => self.error_at(
                token,
                format!("expected {expected}, got '{}'", token.lexeme),
            ),
            None => self.error(format!("expected {expected}, got end of line")),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let line = self
            .current()
            .or_else(|| self.tokens.last())
            .map(|token| token.span.line)
            .unwrap_or(self.line);
        ParseError::new(message, line)
    }

    fn error_at(&self, token: &Token<'_>, message: impl Into<String>) -> ParseError {
        ParseError::new(message, token.span.line)
    }
}

fn combine(left: Operand, op: InfixOperator, right: Expression) -> Expression {
    match op {
        InfixOperator::Arithmetic(op) => Expression::BinaryOp {
            left: Box::new(left.expr),
            op,
            right: Box::new(right),
        },
        InfixOperator::Compare(op) => match left {
            Operand {
                expr: Expression::Compare {
                    left,
                    mut comparisons,
                },
                grouped: false,
            } => {
                comparisons.push((op, right));
                Expression::Compare { left, comparisons }
            }
            left => Expression::Compare {
                left: Box::new(left.expr),
                comparisons: vec![(op, right)],
            },
        },
        InfixOperator::Bool(op) => match left {
            Operand {
                expr:
                    Expression::BoolOp {
                        op: left_op,
                        mut values,
                    },
                grouped: false,
            } if left_op == op => {
                values.push(right);
                Expression::BoolOp { op, values }
            }
            left => Expression::BoolOp {
                op,
                values: vec![left.expr, right],
            },
        },
    }
}

fn parse_number(token: &Token<'_>) -> Result<Literal, ParseError> {
    if token.lexeme.contains('.') {
        return token
            .lexeme
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| ParseError::new(format!("invalid number '{}'", token.lexeme), token.span.line));
    }
    token.lexeme.parse::<i64>().map(Literal::Integer).map_err(|_| {
        ParseError::new(
            format!("integer literal '{}' is too large", token.lexeme),
            token.span.line,
        )
    })
}
