//! Calling convention for every callable value.
//!
//! User functions bind their parameters in two steps. [`ArgumentPlan`]
//! matches the call's arguments to parameter slots without evaluating
//! anything; the interpreter then evaluates every default inside the callee's
//! still-empty frame and only afterwards binds the slots. Named arguments
//! bind keyword-only parameters and the `**` catch-all, never positional
//! ones. A parameter that received nothing and has
//! no default stays [`Slot::Missing`] in the plan and is bound to `None`.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::ast::{Expression, FunctionDef};
use crate::runtime::class::{ClassValue, InstanceValue};
use crate::runtime::dict::DictObject;
use crate::runtime::error::RuntimeError;
use crate::runtime::function::{BoundMethod, FunctionValue};
use crate::runtime::value::Value;

use super::Interpreter;
use super::environment::Environment;
use super::runtime::ExecResult;
use super::stack::ensure_sufficient_stack;

#[derive(Debug)]
pub(super) enum Slot<'f> {
    Supplied(Value),
    Default(&'f Expression),
    Missing,
}

/// Parameter name to slot, in binding order: positional, variadic,
/// keyword-only, catch-all keyword.
#[derive(Debug)]
pub(super) struct ArgumentPlan<'f> {
    pub(super) slots: Vec<(&'f str, Slot<'f>)>,
}

impl<'f> ArgumentPlan<'f> {
    pub(super) fn new(
        def: &'f FunctionDef,
        args: Vec<Value>,
        mut keywords: Vec<(String, Value)>,
    ) -> Result<Self, RuntimeError> {
        let params = &def.params;
        let mut slots = Vec::with_capacity(params.names().count());
        let mut args = args.into_iter();

        for (index, name) in params.positional.iter().enumerate() {
            let slot = match args.next() {
                Some(value) => Slot::Supplied(value),
                None => params
                    .default_for(index)
                    .map_or(Slot::Missing, Slot::Default),
            };
            slots.push((name.as_str(), slot));
        }

        let extra: Vec<Value> = args.collect();
        match &params.vararg {
            Some(name) => slots.push((name.as_str(), Slot::Supplied(Value::tuple(extra)))),
            None if !extra.is_empty() => {
                debug!(
                    function = %def.name,
                    dropped = extra.len(),
                    "ignoring excess positional arguments"
                );
            }
            None => {}
        }

        for (name, default) in &params.keyword_only {
            let slot = match take_keyword(&mut keywords, name) {
                Some(value) => Slot::Supplied(value),
                None => default.as_ref().map_or(Slot::Missing, Slot::Default),
            };
            slots.push((name.as_str(), slot));
        }

        match &params.kwarg {
            Some(name) => {
                let mut rest = DictObject::new();
                for (key, value) in keywords {
                    rest.insert(Value::str(&key), value)?;
                }
                slots.push((name.as_str(), Slot::Supplied(Value::dict(rest))));
            }
            None if !keywords.is_empty() => {
                return Err(RuntimeError::UnexpectedKeywords {
                    function: def.name.clone(),
                    keys: keywords.into_iter().map(|(key, _)| key).collect(),
                });
            }
            None => {}
        }

        Ok(Self { slots })
    }

    pub(super) fn missing(&self) -> impl Iterator<Item = &'f str> + '_ {
        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Missing))
            .map(|(name, _)| *name)
    }
}

fn take_keyword(keywords: &mut Vec<(String, Value)>, name: &str) -> Option<Value> {
    let position = keywords.iter().position(|(key, _)| key == name)?;
    Some(keywords.remove(position).1)
}

impl Interpreter {
    pub(super) fn eval_call(
        &mut self,
        callee: &Expression,
        args: &[Expression],
        keywords: &[(String, Expression)],
    ) -> Result<Value, RuntimeError> {
        let callee = self.eval(callee)?;
        let args = self.eval_all(args)?;
        let mut evaluated = Vec::with_capacity(keywords.len());
        for (name, value) in keywords {
            evaluated.push((name.clone(), self.eval(value)?));
        }
        self.call_value(callee, args, evaluated)
    }

    pub(super) fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(function) => self.call_function(&function, args, keywords),
            Value::Builtin(builtin) => builtin.call(args, keywords, &mut self.output),
            Value::Native(native) => {
                reject_keywords(&native.name, &keywords)?;
                native.call(&args)
            }
            Value::BoundMethod(method) => match method.as_ref() {
                BoundMethod::Function { receiver, function } => {
                    self.call_function(function, prepend(receiver, args), keywords)
                }
                BoundMethod::Builtin { receiver, method } => {
                    reject_keywords(method.name(), &keywords)?;
                    method.call(receiver, args)
                }
            },
            Value::Class(class) => self.instantiate(&class, args, keywords),
            other => Err(RuntimeError::NotCallable {
                type_name: other.type_name(),
            }),
        }
    }

    /// Runs a user function in a fresh environment built from its closure.
    /// The caller's environment and the depth counter are restored on every
    /// exit path.
    fn call_function(
        &mut self,
        function: &Rc<FunctionValue>,
        args: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        self.depth += 1;
        let limit = self.config.max_recursion_depth;
        if self.depth > limit {
            self.depth -= 1;
            warn!(function = function.name(), limit, "recursion ceiling reached");
            return Err(RuntimeError::RecursionLimitExceeded { limit });
        }
        debug!(function = function.name(), depth = self.depth, "calling function");

        let caller = self
            .environment
            .replace(Environment::for_call(function.closure.clone()));
        let result = ensure_sufficient_stack(|| self.run_body(function, args, keywords));
        self.environment = caller;
        self.depth -= 1;
        result
    }

    fn run_body(
        &mut self,
        function: &FunctionValue,
        args: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let plan = ArgumentPlan::new(&function.def, args, keywords)?;
        for name in plan.missing() {
            debug!(
                function = function.name(),
                parameter = name,
                "parameter not supplied, binding None"
            );
        }
        let mut bindings = Vec::with_capacity(plan.slots.len());
        for (name, slot) in plan.slots {
            let value = match slot {
                Slot::Supplied(value) => value,
                Slot::Default(expr) => self.eval(expr)?,
                Slot::Missing => Value::None,
            };
            bindings.push((name, value));
        }
        for (name, value) in bindings {
            self.environment.assign(name, value);
        }

        match self.exec_block(&function.def.body)? {
            ExecResult::Continue(_) => Ok(Value::None),
            ExecResult::Return(value) => Ok(value),
        }
    }

    fn instantiate(
        &mut self,
        class: &Rc<ClassValue>,
        args: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let instance = Value::Instance(Rc::new(InstanceValue::new(class.clone())));
        match class.lookup("__init__") {
            Some(Value::Function(init)) => {
                self.call_function(&init, prepend(&instance, args), keywords)?;
            }
            Some(other) => {
                self.call_value(other, prepend(&instance, args), keywords)?;
            }
            None if !args.is_empty() || !keywords.is_empty() => {
                return Err(RuntimeError::invalid_argument(format!(
                    "{}() takes no arguments",
                    class.name
                )));
            }
            None => {}
        }
        debug!(class = %class.name, "created instance");
        Ok(instance)
    }
}

fn prepend(receiver: &Value, args: Vec<Value>) -> Vec<Value> {
    let mut full = Vec::with_capacity(args.len() + 1);
    full.push(receiver.clone());
    full.extend(args);
    full
}

fn reject_keywords(function: &str, keywords: &[(String, Value)]) -> Result<(), RuntimeError> {
    if keywords.is_empty() {
        return Ok(());
    }
    Err(RuntimeError::KeywordsNotAccepted {
        function: function.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::interpreter::{InterpreterConfig, InterpreterError};
    use crate::parser::parse_program;
    use crate::runtime::error::ErrorKind;

    fn function_def(source: &str) -> Rc<FunctionDef> {
        let program = parse_program(source).expect("parse");
        match program.statements.into_iter().next() {
            Some(crate::ast::Statement::FunctionDef(def)) => def,
            other => panic!("expected a def, got {other:?}"),
        }
    }

    fn slot_names<'f>(plan: &ArgumentPlan<'f>) -> Vec<(&'f str, &'static str)> {
        plan.slots
            .iter()
            .map(|(name, slot)| {
                let kind = match slot {
                    Slot::Supplied(_) => "supplied",
                    Slot::Default(_) => "default",
                    Slot::Missing => "missing",
                };
                (*name, kind)
            })
            .collect()
    }

    fn run(source: &str) -> Result<Value, InterpreterError> {
        Interpreter::capturing(InterpreterConfig::default()).evaluate(source)
    }

    #[test]
    fn plan_marks_absent_parameters_explicitly() {
        let def = function_def("def f(a, b, c=1, *rest, flag, level=2, **extra):\n    pass");
        let plan = ArgumentPlan::new(
            &def,
            vec![Value::Int(1)],
            vec![("level".to_string(), Value::Int(5))],
        )
        .expect("plan");
        assert_eq!(
            slot_names(&plan),
            vec![
                ("a", "supplied"),
                ("b", "missing"),
                ("c", "default"),
                ("rest", "supplied"),
                ("flag", "missing"),
                ("level", "supplied"),
                ("extra", "supplied"),
            ]
        );
        assert_eq!(plan.missing().collect::<Vec<_>>(), vec!["b", "flag"]);
    }

    #[test]
    fn plan_rejects_unexpected_keywords() {
        let def = function_def("def f(a):\n    pass");
        let error = ArgumentPlan::new(
            &def,
            vec![],
            vec![
                ("x".to_string(), Value::None),
                ("y".to_string(), Value::None),
            ],
        )
        .expect_err("unexpected");
        assert_eq!(
            error.to_string(),
            "f() got unexpected keyword arguments: 'x', 'y'"
        );
    }

    #[test]
    fn named_arguments_never_bind_positional_parameters() {
        let def = function_def("def f(a):\n    pass");
        let error = ArgumentPlan::new(&def, vec![], vec![("a".to_string(), Value::Int(1))])
            .expect_err("positional by name");
        assert_eq!(error.to_string(), "f() got unexpected keyword arguments: 'a'");

        let error = run("def f(a):\n    return a\nf(a=1)").expect_err("positional by name");
        assert_eq!(error.kind(), ErrorKind::TypeError);
    }

    #[test]
    fn missing_positionals_bind_none() {
        let source = indoc! {"
            def f(a, b):
                return b == None
            f(1)
        "};
        assert_eq!(run(source).expect("permissive"), Value::Bool(true));
    }

    #[test]
    fn defaults_are_evaluated_at_call_time() {
        let source = indoc! {"
            log = []
            def f(n=len(log)):
                return n
            first = f()
            log.append(1)
            (first, f(), f(5))
        "};
        assert_eq!(run(source).expect("defaults").repr(), "(0, 1, 5)");
    }

    #[test]
    fn defaults_do_not_see_sibling_parameters() {
        let source = indoc! {"
            a = 100
            def f(a, b=a * 2):
                return b
            f(3)
        "};
        assert_eq!(run(source).expect("defaults"), Value::Int(200));
    }

    #[test]
    fn varargs_and_keyword_parameters() {
        let source = indoc! {"
            def f(a, *rest, sep='-', **options):
                return (a, rest, sep, options)
            f(1, 2, 3, sep='+', x=1, y=2)
        "};
        assert_eq!(
            run(source).expect("call").repr(),
            "(1, (2, 3), '+', {'x': 1, 'y': 2})"
        );

        let error = run("def g(a):\n    return a\ng(1, z=2)").expect_err("kw");
        assert_eq!(error.kind(), ErrorKind::TypeError);
        assert_eq!(
            error.to_string(),
            "TypeError: g() got unexpected keyword arguments: 'z'"
        );
    }

    #[test]
    fn excess_positionals_without_varargs_are_dropped() {
        assert_eq!(
            run("def f(a):\n    return a\nf(1, 2, 3)").expect("drop"),
            Value::Int(1)
        );
    }

    #[test]
    fn return_unwinds_nested_blocks() {
        let source = indoc! {"
            def find(items, wanted):
                for i in range(len(items)):
                    while True:
                        if items[i] == wanted:
                            return i
                        return -1
                return None
            (find([5, 6, 7], 5), find([5, 6, 7], 9))
        "};
        assert_eq!(run(source).expect("find").repr(), "(0, -1)");
    }

    #[test]
    fn recursion_through_the_function_table() {
        let source = indoc! {"
            def fact(n):
                if n <= 1:
                    return 1
                return n * fact(n - 1)
            fact(20)
        "};
        assert_eq!(run(source).expect("fact"), Value::Int(2_432_902_008_176_640_000));
    }

    #[test]
    fn environment_and_depth_recover_after_errors() {
        let mut interpreter = Interpreter::capturing(InterpreterConfig::default());
        interpreter.evaluate("x = 'global'").expect("setup");
        let source = indoc! {"
            def boom(x):
                return x / 0
            boom(1)
        "};
        let error = interpreter.evaluate(source).expect_err("division");
        assert_eq!(error.kind(), ErrorKind::ZeroDivisionError);
        assert_eq!(interpreter.depth, 0);
        assert_eq!(interpreter.evaluate("x").expect("restored"), Value::str("global"));
    }

    #[test]
    fn builtin_methods_reject_keywords() {
        let error = run("[].append(x=1)").expect_err("keywords");
        assert_eq!(
            error.to_string(),
            "TypeError: append() does not accept keyword arguments"
        );
    }

    #[test]
    fn classes_without_init_take_no_arguments() {
        let error = run("class A:\n    pass\nA(1)").expect_err("args");
        assert_eq!(error.to_string(), "TypeError: A() takes no arguments");
    }
}
