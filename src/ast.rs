//! Syntax tree shared by the parser and the tree-walking interpreter.
//!
//! The parser builds these nodes once; the interpreter walks them directly and
//! never mutates them.

use std::fmt;
use std::rc::Rc;

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    None,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// `a and b and c`; always holds at least two values.
    BoolOp {
        op: BoolOperator,
        values: Vec<Expression>,
    },
    /// Chained comparison `left op1 c1 op2 c2 ...`.
    Compare {
        left: Box<Expression>,
        comparisons: Vec<(CompareOperator, Expression)>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
        keywords: Vec<(String, Expression)>,
    },
    Attribute {
        object: Box<Expression>,
        name: String,
    },
    Subscript {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    Slice {
        lower: Option<Box<Expression>>,
        upper: Option<Box<Expression>>,
        step: Option<Box<Expression>>,
    },
    List(Vec<Expression>),
    Tuple(Vec<Expression>),
    Dict(Vec<(Expression, Expression)>),
    Set(Vec<Expression>),
}

impl Expression {
    pub fn is_assignable(&self) -> bool {
        match self {
            Expression::Identifier(_)
            | Expression::Attribute { .. }
            | Expression::Subscript { .. } => true,
            Expression::Tuple(elements) | Expression::List(elements) => {
                elements.iter().all(Expression::is_assignable)
            }
            _ => false,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            "//" => Some(Self::FloorDiv),
            "%" => Some(Self::Mod),
            "**" => Some(Self::Pow),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CompareOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
}

impl CompareOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(Self::Eq),
            "!=" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::LtE),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::GtE),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

/// Parameter list of a `def`.
///
/// `defaults` is aligned to the *last* `defaults.len()` names of `positional`.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Parameters {
    pub positional: Vec<String>,
    pub defaults: Vec<Expression>,
    pub vararg: Option<String>,
    pub keyword_only: Vec<(String, Option<Expression>)>,
    pub kwarg: Option<String>,
}

impl Parameters {
    /// Default expression for the positional parameter at `index`, if it
    /// falls within the defaulted suffix.
    pub fn default_for(&self, index: usize) -> Option<&Expression> {
        let first_defaulted = self.positional.len() - self.defaults.len();
        index
            .checked_sub(first_defaulted)
            .and_then(|offset| self.defaults.get(offset))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.positional
            .iter()
            .map(String::as_str)
            .chain(self.vararg.as_deref())
            .chain(self.keyword_only.iter().map(|(name, _)| name.as_str()))
            .chain(self.kwarg.as_deref())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Parameters,
    pub body: Vec<Statement>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Expr(Expression),
    /// `a = b = value`; every target receives the same value, left to right.
    Assign {
        targets: Vec<Expression>,
        value: Expression,
    },
    AugAssign {
        target: Expression,
        op: BinaryOperator,
        value: Expression,
    },
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    For {
        target: Expression,
        iterable: Expression,
        body: Vec<Statement>,
    },
    FunctionDef(Rc<FunctionDef>),
    Return(Option<Expression>),
    ClassDef {
        name: String,
        body: Vec<Statement>,
    },
    Pass,
    Nonlocal(Vec<String>),
}

impl Statement {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Expr(_) => "expression",
            Statement::Assign { .. } => "assignment",
            Statement::AugAssign { .. } => "augmented assignment",
            Statement::If { .. } => "if",
            Statement::While { .. } => "while",
            Statement::For { .. } => "for",
            Statement::FunctionDef(_) => "def",
            Statement::Return(_) => "return",
            Statement::ClassDef { .. } => "class",
            Statement::Pass => "pass",
            Statement::Nonlocal(_) => "nonlocal",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub statements: Vec<Statement>,
}
