use std::rc::Rc;

use tracing::{debug, warn};

use crate::ast::{BinaryOperator, BoolOperator, Expression, FunctionDef, Literal, Statement};
use crate::runtime::class::{ClassValue, get_attribute, set_attribute};
use crate::runtime::dict::DictObject;
use crate::runtime::error::{ErrorKind, RuntimeError};
use crate::runtime::function::FunctionValue;
use crate::runtime::ops;
use crate::runtime::sequence;
use crate::runtime::value::{SliceValue, Value};

use super::environment::Environment;
use super::{Interpreter, Scope};

/// Outcome of executing a statement.
///
/// `Return` unwinds through every enclosing block of the current call;
/// `Continue` carries the statement's own value.
pub(super) enum ExecResult {
    Continue(Value),
    Return(Value),
}

impl Interpreter {
    pub(super) fn exec_block(&mut self, body: &[Statement]) -> Result<ExecResult, RuntimeError> {
        let mut last = Value::None;
        for statement in body {
            match self.exec_statement(statement)? {
                ExecResult::Continue(value) => last = value,
                ExecResult::Return(value) => return Ok(ExecResult::Return(value)),
            }
        }
        Ok(ExecResult::Continue(last))
    }

    pub(super) fn exec_statement(
        &mut self,
        statement: &Statement,
    ) -> Result<ExecResult, RuntimeError> {
        let value = match statement {
            Statement::Expr(expr) => self.eval(expr)?,
            Statement::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
                value
            }
            Statement::AugAssign { target, op, value } => {
                self.exec_aug_assign(target, *op, value)?
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let body = if self.eval(condition)?.is_truthy() {
                    then_body
                } else {
                    else_body
                };
                return self.exec_block(body);
            }
            Statement::While { condition, body } => {
                let mut iterations = 0;
                let mut last = Value::None;
                while self.eval(condition)?.is_truthy() {
                    iterations += 1;
                    self.check_loop_ceiling(iterations)?;
                    match self.exec_block(body)? {
                        ExecResult::Continue(value) => last = value,
                        ret @ ExecResult::Return(_) => return Ok(ret),
                    }
                }
                last
            }
            Statement::For {
                target,
                iterable,
                body,
            } => {
                let items = sequence::iterate(&self.eval(iterable)?)?;
                let mut last = Value::None;
                for (index, item) in items.enumerate() {
                    self.check_loop_ceiling(index + 1)?;
                    self.assign(target, item)?;
                    match self.exec_block(body)? {
                        ExecResult::Continue(value) => last = value,
                        ret @ ExecResult::Return(_) => return Ok(ret),
                    }
                }
                last
            }
            Statement::FunctionDef(def) => self.define_function(def),
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(ExecResult::Return(value));
            }
            Statement::ClassDef { name, body } => self.define_class(name, body)?,
            Statement::Pass => Value::None,
            Statement::Nonlocal(names) => {
                for name in names {
                    if !self.environment.defined_in_enclosing(name) {
                        return Err(RuntimeError::NonlocalNotFound { name: name.clone() });
                    }
                }
                Value::None
            }
        };
        Ok(ExecResult::Continue(value))
    }

    fn check_loop_ceiling(&self, iterations: usize) -> Result<(), RuntimeError> {
        let limit = self.config.max_loop_iterations;
        if iterations > limit {
            warn!(limit, "loop iteration ceiling reached");
            return Err(RuntimeError::LoopLimitExceeded { limit });
        }
        Ok(())
    }

    fn assign(&mut self, target: &Expression, value: Value) -> Result<(), RuntimeError> {
        match target {
            Expression::Identifier(name) => {
                self.environment.assign(name, value);
                Ok(())
            }
            Expression::Tuple(targets) | Expression::List(targets) => {
                let mut items = sequence::iterate(&value)?;
                let mut values = Vec::with_capacity(targets.len());
                for _ in targets {
                    match items.next() {
                        Some(item) => values.push(item),
                        None => {
                            return Err(RuntimeError::NotEnoughValues {
                                expected: targets.len(),
                                got: values.len(),
                            });
                        }
                    }
                }
                if items.next().is_some() {
                    return Err(RuntimeError::TooManyValues {
                        expected: targets.len(),
                    });
                }
                for (target, value) in targets.iter().zip(values) {
                    self.assign(target, value)?;
                }
                Ok(())
            }
            Expression::Subscript { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                sequence::set_item(&object, &index, value)
            }
            Expression::Attribute { object, name } => {
                let object = self.eval(object)?;
                set_attribute(&object, name, value)
            }
            _ => Err(RuntimeError::Native {
                kind: ErrorKind::SyntaxError,
                message: "cannot assign to expression".to_string(),
            }),
        }
    }

    /// Reads the target once, combines, and writes back through the same
    /// receiver and index.
    fn exec_aug_assign(
        &mut self,
        target: &Expression,
        op: BinaryOperator,
        operand: &Expression,
    ) -> Result<Value, RuntimeError> {
        match target {
            Expression::Identifier(name) => {
                let current = self.lookup(name)?;
                let operand = self.eval(operand)?;
                let result = ops::augmented_op(op, &current, &operand)?;
                self.environment.assign(name, result.clone());
                Ok(result)
            }
            Expression::Subscript { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                let current = sequence::get_item(&object, &index)?;
                let operand = self.eval(operand)?;
                let result = ops::augmented_op(op, &current, &operand)?;
                sequence::set_item(&object, &index, result.clone())?;
                Ok(result)
            }
            Expression::Attribute { object, name } => {
                let object = self.eval(object)?;
                let current = get_attribute(&object, name)?;
                let operand = self.eval(operand)?;
                let result = ops::augmented_op(op, &current, &operand)?;
                set_attribute(&object, name, result.clone())?;
                Ok(result)
            }
            _ => Err(RuntimeError::Native {
                kind: ErrorKind::SyntaxError,
                message: "illegal expression for augmented assignment".to_string(),
            }),
        }
    }

    /// Captures the visible scopes, then binds the function both in the
    /// function table and in the innermost frame.
    fn define_function(&mut self, def: &Rc<FunctionDef>) -> Value {
        let function = Rc::new(FunctionValue::new(def.clone(), self.environment.snapshot()));
        debug!(
            function = %def.name,
            captured_frames = function.closure.len(),
            "defined function"
        );
        self.functions.insert(def.name.clone(), function.clone());
        let value = Value::Function(function);
        self.environment.assign(&def.name, value.clone());
        value
    }

    /// Runs a class body in its own namespace frame. Methods capture the
    /// scopes around the class, not the class namespace itself.
    fn define_class(&mut self, name: &str, body: &[Statement]) -> Result<Value, RuntimeError> {
        let closure = self.environment.snapshot();
        let outer = self
            .environment
            .replace(Environment::for_call(Rc::clone(&closure)));
        let populated = self.populate_class(name, body, &closure);
        let namespace = self.environment.replace(outer).into_local();
        populated?;

        debug!(class = name, attributes = namespace.len(), "defined class");
        let value = Value::Class(Rc::new(ClassValue::new(name.to_string(), namespace)));
        self.environment.assign(name, value.clone());
        Ok(value)
    }

    fn populate_class(
        &mut self,
        name: &str,
        body: &[Statement],
        closure: &Rc<[Scope]>,
    ) -> Result<(), RuntimeError> {
        for statement in body {
            match statement {
                Statement::FunctionDef(def) => {
                    let method = FunctionValue::new(def.clone(), Rc::clone(closure));
                    self.environment
                        .assign(&def.name, Value::Function(Rc::new(method)));
                }
                Statement::Assign { targets, value }
                    if targets
                        .iter()
                        .all(|target| matches!(target, Expression::Identifier(_))) =>
                {
                    let value = self.eval(value)?;
                    for target in targets {
                        self.assign(target, value.clone())?;
                    }
                }
                Statement::Pass => {}
                other => {
                    return Err(RuntimeError::UnsupportedClassStatement {
                        class: name.to_string(),
                        statement: other.kind_name(),
                    });
                }
            }
        }
        Ok(())
    }

    pub(super) fn eval(&mut self, expr: &Expression) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Literal(literal) => Ok(match literal {
                Literal::Integer(value) => Value::Int(*value),
                Literal::Float(value) => Value::Float(*value),
                Literal::String(value) => Value::str(value),
                Literal::Boolean(value) => Value::Bool(*value),
                Literal::None => Value::None,
            }),
            Expression::Identifier(name) => self.lookup(name),
            Expression::UnaryOp { op, operand } => {
                let operand = self.eval(operand)?;
                ops::unary_op(*op, &operand)
            }
            Expression::BinaryOp { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary_op(*op, &left, &right)
            }
            Expression::BoolOp { op, values } => {
                let mut last = Value::None;
                for value in values {
                    last = self.eval(value)?;
                    let decided = match op {
                        BoolOperator::And => !last.is_truthy(),
                        BoolOperator::Or => last.is_truthy(),
                    };
                    if decided {
                        break;
                    }
                }
                Ok(last)
            }
            Expression::Compare { left, comparisons } => {
                let mut left = self.eval(left)?;
                for (op, right) in comparisons {
                    let right = self.eval(right)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expression::Call {
                callee,
                args,
                keywords,
            } => self.eval_call(callee, args, keywords),
            Expression::Attribute { object, name } => {
                let object = self.eval(object)?;
                get_attribute(&object, name)
            }
            Expression::Subscript { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                sequence::get_item(&object, &index)
            }
            Expression::Slice { lower, upper, step } => Ok(Value::Slice(SliceValue {
                lower: self.eval_slice_bound(lower.as_deref())?,
                upper: self.eval_slice_bound(upper.as_deref())?,
                step: self.eval_slice_bound(step.as_deref())?,
            })),
            Expression::List(elements) => Ok(Value::list(self.eval_all(elements)?)),
            Expression::Tuple(elements) => Ok(Value::tuple(self.eval_all(elements)?)),
            Expression::Dict(pairs) => {
                let mut dict = DictObject::new();
                for (key, value) in pairs {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    dict.insert(key, value)?;
                }
                Ok(Value::dict(dict))
            }
            Expression::Set(elements) => {
                let members = self.eval_all(elements)?;
                Ok(Value::set(DictObject::from_members(members)?))
            }
        }
    }

    pub(super) fn eval_all(&mut self, exprs: &[Expression]) -> Result<Vec<Value>, RuntimeError> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    fn eval_slice_bound(&mut self, bound: Option<&Expression>) -> Result<Option<i64>, RuntimeError> {
        let Some(bound) = bound else {
            return Ok(None);
        };
        match self.eval(bound)? {
            Value::None => Ok(None),
            value => value.as_int().map(Some).ok_or_else(|| {
                RuntimeError::invalid_argument(format!(
                    "slice indices must be integers or None, not {}",
                    value.type_name()
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::interpreter::{Interpreter, InterpreterConfig, InterpreterError};
    use crate::runtime::error::ErrorKind;
    use crate::runtime::value::Value;

    fn run(source: &str) -> Result<Value, InterpreterError> {
        Interpreter::capturing(InterpreterConfig::default()).evaluate(source)
    }

    #[test]
    fn bool_ops_return_the_deciding_operand() {
        assert_eq!(run("0 or 'x'").expect("or"), Value::str("x"));
        assert_eq!(run("1 and 0.0").expect("and"), Value::Float(0.0));
        assert_eq!(run("[] and 1/0").expect("short").repr(), "[]");
        assert_eq!(run("'' or 0 or None").expect("all falsy"), Value::None);
    }

    #[test]
    fn chained_comparison_stops_at_the_first_failure() {
        let source = indoc! {"
            calls = []
            def probe(v):
                calls.append(v)
                return v
            result = probe(1) < probe(0) < probe(5)
            (result, calls)
        "};
        assert_eq!(run(source).expect("chain").repr(), "(False, [1, 0])");
        assert_eq!(run("1 < 2 <= 2 != 3").expect("chain"), Value::Bool(true));
    }

    #[test]
    fn class_bodies_accept_defs_assignments_and_pass() {
        let source = indoc! {"
            class Counter:
                start = 10
                step = start // 5
                pass
                def bump(self):
                    self.value = getattr(self, 'value', self.start) + self.step
                    return self.value
            c = Counter()
            c.bump()
            c.bump()
        "};
        assert_eq!(run(source).expect("class"), Value::Int(14));
    }

    #[test]
    fn class_bodies_reject_other_statements() {
        let source = indoc! {"
            class Broken:
                while False:
                    pass
        "};
        let error = run(source).expect_err("unsupported");
        assert_eq!(error.kind(), ErrorKind::NotSupported);
        assert_eq!(
            error.to_string(),
            "NotSupported: 'while' statement is not supported in the body of class 'Broken'"
        );
        let error = run("class Broken:\n    x[0] = 1").expect_err("subscript target");
        assert_eq!(error.kind(), ErrorKind::NotSupported);
    }

    #[test]
    fn constructor_runs_init_with_the_instance() {
        let source = indoc! {"
            class Point:
                def __init__(self, x, *, y=0):
                    self.x = x
                    self.y = y
                def norm1(self):
                    return abs(self.x) + abs(self.y)
            p = Point(-3, y=4)
            p.x += 1
            (p.x, p.norm1())
        "};
        assert_eq!(run(source).expect("point").repr(), "(-2, 6)");

        let error = run("class Empty:\n    pass\nEmpty().missing").expect_err("no attr");
        assert_eq!(
            error.to_string(),
            "AttributeError: 'Empty' object has no attribute 'missing'"
        );
    }

    #[test]
    fn slices_evaluate_with_optional_bounds() {
        assert_eq!(run("'interpreter'[::-3]").expect("slice"), Value::str("rern"));
        assert_eq!(run("[0, 1, 2, 3, 4][1:None:2]").expect("slice").repr(), "[1, 3]");
        let error = run("[1][1.5:]").expect_err("float bound");
        assert_eq!(error.kind(), ErrorKind::TypeError);
        let error = run("[1, 2][::0]").expect_err("zero step");
        assert_eq!(error.kind(), ErrorKind::ValueError);
    }

    #[test]
    fn literal_containers() {
        assert_eq!(
            run("{'a': [1, 2], 'b': (3,), 'c': {4, 4, 5}}").expect("literal").repr(),
            "{'a': [1, 2], 'b': (3,), 'c': {4, 5}}"
        );
        let error = run("{[1]: 2}").expect_err("unhashable");
        assert_eq!(error.to_string(), "TypeError: unhashable type: 'list'");
    }

    #[test]
    fn for_over_a_string_and_a_range_with_step() {
        let source = indoc! {"
            letters = []
            for ch in 'abc':
                letters.append(ch.upper())
            evens = []
            for n in range(10, 0, -4):
                evens.append(n)
            (letters, evens)
        "};
        assert_eq!(
            run(source).expect("loops").repr(),
            "(['A', 'B', 'C'], [10, 6, 2])"
        );
    }
}
