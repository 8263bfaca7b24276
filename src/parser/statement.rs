//! Line-oriented block parser.
//!
//! A block is a run of lines sharing one indentation. Compound statements
//! (`if`, `elif`, `else`, `while`, `for`, `def`, `class`) end their header at
//! the first bracket-depth-zero `:` and take either the rest of that line or
//! the following, more deeply indented lines as their body.

use std::rc::Rc;

use crate::ast::{BinaryOperator, Expression, FunctionDef, Parameters, Statement};
use crate::token::{Token, TokenKind};

use super::{Line, ParseError, find_top_level, parse_expression, split_top_level};

const COMPOUND_KEYWORDS: [&str; 7] = ["if", "elif", "else", "while", "for", "def", "class"];

/// Parses a sequence of lines whose first line sets the block indentation.
pub fn parse_block(lines: &[Line<'_>]) -> Result<Vec<Statement>, ParseError> {
    let Some(first) = lines.first() else {
        return Ok(Vec::new());
    };
    let indent = first.indent;
    let mut statements = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let line = &lines[index];
        if line.indent > indent {
            return Err(ParseError::new("unexpected indent", line.number));
        }
        if line.indent < indent {
            return Err(ParseError::new(
                "unindent does not match any outer indentation level",
                line.number,
            ));
        }
        index = parse_line(lines, index, &mut statements)?;
    }
    Ok(statements)
}

/// Parses the statement(s) starting at `lines[index]` and returns the index of
/// the first line not consumed.
fn parse_line(
    lines: &[Line<'_>],
    index: usize,
    statements: &mut Vec<Statement>,
) -> Result<usize, ParseError> {
    let line = &lines[index];
    let keyword = line
        .tokens
        .first()
        .filter(|token| token.kind == TokenKind::Keyword)
        .map(|token| token.lexeme);

    match keyword {
        Some("if") => {
            let (statement, next) = parse_if(lines, index)?;
            statements.push(statement);
            Ok(next)
        }
        Some(word @ ("elif" | "else")) => Err(ParseError::new(
            format!("invalid syntax: '{word}' without matching 'if'"),
            line.number,
        )),
        Some("while") => {
            let clause = parse_clause(lines, index)?;
            let condition = parse_header_expression(clause.header, "while", line.number)?;
            statements.push(Statement::While {
                condition,
                body: clause.body,
            });
            Ok(clause.next)
        }
        Some("for") => {
            let clause = parse_clause(lines, index)?;
            let (target, iterable) = parse_for_header(clause.header, line.number)?;
            statements.push(Statement::For {
                target,
                iterable,
                body: clause.body,
            });
            Ok(clause.next)
        }
        Some("def") => {
            let clause = parse_clause(lines, index)?;
            let (name, params) = parse_def_header(clause.header, line.number)?;
            statements.push(Statement::FunctionDef(Rc::new(FunctionDef {
                name,
                params,
                body: clause.body,
            })));
            Ok(clause.next)
        }
        Some("class") => {
            let clause = parse_clause(lines, index)?;
            let name = parse_class_header(clause.header, line.number)?;
            statements.push(Statement::ClassDef {
                name,
                body: clause.body,
            });
            Ok(clause.next)
        }
        _ => {
            statements.extend(parse_simple_statements(&line.tokens, line.number)?);
            Ok(index + 1)
        }
    }
}

/// Header tokens (keyword and colon removed) plus the parsed body.
struct Clause<'t, 'a> {
    header: &'t [Token<'a>],
    body: Vec<Statement>,
    next: usize,
}

fn parse_clause<'t, 'a>(lines: &'t [Line<'a>], index: usize) -> Result<Clause<'t, 'a>, ParseError> {
    let line = &lines[index];
    let keyword = line.tokens[0].lexeme;
    let Some(colon) = find_top_level(&line.tokens, |token| token.kind == TokenKind::Colon) else {
        return Err(ParseError::new(
            format!("expected ':' after '{keyword}' header"),
            line.number,
        ));
    };
    let header = &line.tokens[1..colon];
    let suite = &line.tokens[colon + 1..];

    if !suite.is_empty() {
        return Ok(Clause {
            header,
            body: parse_simple_statements(suite, line.number)?,
            next: index + 1,
        });
    }

    let end = lines[index + 1..]
        .iter()
        .position(|body_line| body_line.indent <= line.indent)
        .map_or(lines.len(), |offset| index + 1 + offset);
    if end == index + 1 {
        return Err(ParseError::new(
            format!(
                "expected an indented block after '{keyword}' statement on line {}",
                line.number
            ),
            line.number,
        ));
    }
    Ok(Clause {
        header,
        body: parse_block(&lines[index + 1..end])?,
        next: end,
    })
}

/// `if` with any trailing `elif`/`else` clauses at the same indentation.
fn parse_if(lines: &[Line<'_>], index: usize) -> Result<(Statement, usize), ParseError> {
    let line = &lines[index];
    let keyword = line.tokens[0].lexeme;
    let clause = parse_clause(lines, index)?;
    let condition = parse_header_expression(clause.header, keyword, line.number)?;

    let mut else_body = Vec::new();
    let mut next = clause.next;
    if let Some(following) = lines.get(next)
        && following.indent == line.indent
    {
        let first = &following.tokens[0];
        if first.is_keyword("elif") {
            let (nested, after) = parse_if(lines, next)?;
            else_body.push(nested);
            next = after;
        } else if first.is_keyword("else") {
            let else_clause = parse_clause(lines, next)?;
            if !else_clause.header.is_empty() {
                return Err(ParseError::new(
                    "expected ':' after 'else'",
                    following.number,
                ));
            }
            else_body = else_clause.body;
            next = else_clause.next;
        }
    }

    Ok((
        Statement::If {
            condition,
            then_body: clause.body,
            else_body,
        },
        next,
    ))
}

fn parse_header_expression(
    header: &[Token<'_>],
    keyword: &str,
    line: usize,
) -> Result<Expression, ParseError> {
    if header.is_empty() {
        return Err(ParseError::new(
            format!("expected an expression after '{keyword}'"),
            line,
        ));
    }
    parse_expression(header)
}

fn parse_for_header(
    header: &[Token<'_>],
    line: usize,
) -> Result<(Expression, Expression), ParseError> {
    let Some(split) = find_top_level(header, |token| token.is_keyword("in")) else {
        return Err(ParseError::new("expected 'in' in 'for' header", line));
    };
    let target_tokens = &header[..split];
    if target_tokens.is_empty() {
        return Err(ParseError::new("expected a target after 'for'", line));
    }
    let target = parse_target(target_tokens, line)?;
    let iterable = parse_header_expression(&header[split + 1..], "in", line)?;
    Ok((target, iterable))
}

fn parse_def_header(
    header: &[Token<'_>],
    line: usize,
) -> Result<(String, Parameters), ParseError> {
    let malformed = || ParseError::new("invalid function header, expected 'def NAME(PARAMS):'", line);
    let [name, open, params @ .., close] = header else {
        return Err(malformed());
    };
    if name.kind != TokenKind::Identifier
        || open.kind != TokenKind::LParen
        || close.kind != TokenKind::RParen
    {
        return Err(malformed());
    }
    Ok((name.lexeme.to_string(), parse_parameters(params, line)?))
}

fn parse_parameters(tokens: &[Token<'_>], line: usize) -> Result<Parameters, ParseError> {
    let mut params = Parameters::default();
    if tokens.is_empty() {
        return Ok(params);
    }

    let mut parts = split_top_level(tokens, |token| token.kind == TokenKind::Comma);
    if parts.last().is_some_and(|part| part.is_empty()) {
        parts.pop();
    }

    let mut keyword_only = false;
    let mut bare_star = false;
    let mut seen: Vec<&str> = Vec::new();

    for (position, part) in parts.iter().enumerate() {
        if params.kwarg.is_some() {
            return Err(ParseError::new("arguments cannot follow '**' parameter", line));
        }
        match *part {
            [] => return Err(ParseError::new("invalid syntax in parameter list", line)),
            [star] if star.is_operator("*") => {
                if keyword_only {
                    return Err(ParseError::new("'*' argument may appear only once", line));
                }
                if position + 1 == parts.len() {
                    return Err(ParseError::new("named arguments must follow bare *", line));
                }
                keyword_only = true;
                bare_star = true;
            }
            [star, name] if star.is_operator("*") && name.kind == TokenKind::Identifier => {
                if keyword_only {
                    return Err(ParseError::new("'*' argument may appear only once", line));
                }
                params.vararg = Some(declare(&mut seen, name.lexeme, line)?);
                keyword_only = true;
            }
            [stars, name] if stars.is_operator("**") && name.kind == TokenKind::Identifier => {
                params.kwarg = Some(declare(&mut seen, name.lexeme, line)?);
            }
            [name, rest @ ..] if name.kind == TokenKind::Identifier => {
                let default = match rest {
                    [] => None,
                    [assign, value @ ..] if assign.kind == TokenKind::Assign && !value.is_empty() => {
                        Some(parse_expression(value)?)
                    }
                    _ => {
                        return Err(ParseError::new(
                            format!("invalid parameter '{}'", name.lexeme),
                            line,
                        ));
                    }
                };
                let name = declare(&mut seen, name.lexeme, line)?;
                if keyword_only {
                    params.keyword_only.push((name, default));
                } else {
                    match default {
                        Some(default) => params.defaults.push(default),
                        None if !params.defaults.is_empty() => {
                            return Err(ParseError::new(
                                "non-default argument follows default argument",
                                line,
                            ));
                        }
                        None => {}
                    }
                    params.positional.push(name);
                }
            }
            _ => return Err(ParseError::new("invalid syntax in parameter list", line)),
        }
    }

    if bare_star && params.keyword_only.is_empty() {
        return Err(ParseError::new("named arguments must follow bare *", line));
    }
    Ok(params)
}

fn declare<'a>(seen: &mut Vec<&'a str>, name: &'a str, line: usize) -> Result<String, ParseError> {
    if seen.contains(&name) {
        return Err(ParseError::new(
            format!("duplicate argument '{name}' in function definition"),
            line,
        ));
    }
    seen.push(name);
    Ok(name.to_string())
}

fn parse_class_header(header: &[Token<'_>], line: usize) -> Result<String, ParseError> {
    match header {
        [name] if name.kind == TokenKind::Identifier => Ok(name.lexeme.to_string()),
        [name, open, close]
            if name.kind == TokenKind::Identifier
                && open.kind == TokenKind::LParen
                && close.kind == TokenKind::RParen =>
        {
            Ok(name.lexeme.to_string())
        }
        [name, open, ..] if name.kind == TokenKind::Identifier && open.kind == TokenKind::LParen => {
            Err(ParseError::new(
                format!("class '{}' cannot declare base classes", name.lexeme),
                line,
            ))
        }
        _ => Err(ParseError::new(
            "invalid class header, expected 'class NAME:'",
            line,
        )),
    }
}

/// Parses `;`-separated simple statements from one line or inline suite.
fn parse_simple_statements(
    tokens: &[Token<'_>],
    line: usize,
) -> Result<Vec<Statement>, ParseError> {
    split_top_level(tokens, |token| token.kind == TokenKind::Semicolon)
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(|part| parse_simple_statement(part, line))
        .collect()
}

fn parse_simple_statement(tokens: &[Token<'_>], line: usize) -> Result<Statement, ParseError> {
    let first = &tokens[0];
    if first.kind == TokenKind::Keyword {
        match first.lexeme {
            "return" => {
                let rest = &tokens[1..];
                return if rest.is_empty() {
                    Ok(Statement::Return(None))
                } else {
                    parse_expression(rest).map(|value| Statement::Return(Some(value)))
                };
            }
            "pass" if tokens.len() == 1 => return Ok(Statement::Pass),
            "pass" => {
                return Err(ParseError::new("invalid syntax after 'pass'", line));
            }
            "nonlocal" => return parse_nonlocal(&tokens[1..], line),
            word if COMPOUND_KEYWORDS.contains(&word) => {
                return Err(ParseError::new(
                    format!("invalid syntax: '{word}' cannot appear in a simple statement"),
                    line,
                ));
            }
            _ => {}
        }
    }

    if let Some(split) = find_top_level(tokens, |token| token.kind == TokenKind::AugAssign) {
        let operator = &tokens[split];
        let symbol = &operator.lexeme[..operator.lexeme.len() - 1];
        let op = BinaryOperator::from_symbol(symbol).ok_or_else(|| {
            ParseError::new(format!("unknown operator '{}'", operator.lexeme), line)
        })?;
        let target = parse_expression(&tokens[..split])?;
        if !matches!(
            target,
            Expression::Identifier(_) | Expression::Attribute { .. } | Expression::Subscript { .. }
        ) {
            return Err(ParseError::new(
                "cannot assign to expression in augmented assignment",
                line,
            ));
        }
        let value = parse_expression(&tokens[split + 1..])?;
        return Ok(Statement::AugAssign { target, op, value });
    }

    let parts = split_top_level(tokens, |token| token.kind == TokenKind::Assign);
    let Some((value, targets)) = parts.split_last() else {
        return Err(ParseError::new("invalid syntax", line));
    };
    if targets.is_empty() {
        return parse_expression(tokens).map(Statement::Expr);
    }
    let targets = targets
        .iter()
        .map(|target| parse_target(target, line))
        .collect::<Result<Vec<_>, _>>()?;
    if value.is_empty() {
        return Err(ParseError::new("expected a value after '='", line));
    }
    Ok(Statement::Assign {
        targets,
        value: parse_expression(value)?,
    })
}

fn parse_target(tokens: &[Token<'_>], line: usize) -> Result<Expression, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::new("expected an assignment target", line));
    }
    let target = parse_expression(tokens)?;
    if !target.is_assignable() {
        return Err(ParseError::new("cannot assign to expression", line));
    }
    Ok(target)
}

fn parse_nonlocal(tokens: &[Token<'_>], line: usize) -> Result<Statement, ParseError> {
    let mut names = Vec::new();
    for part in split_top_level(tokens, |token| token.kind == TokenKind::Comma) {
        match part {
            [name] if name.kind == TokenKind::Identifier => names.push(name.lexeme.to_string()),
            _ => {
                return Err(ParseError::new(
                    "expected identifiers after 'nonlocal'",
                    line,
                ));
            }
        }
    }
    Ok(Statement::Nonlocal(names))
}
