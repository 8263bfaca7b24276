//! Builtin functions and the fixed method set of builtin containers.

use std::io::{self, Write};

use crate::ast::CompareOperator;
use crate::runtime::class::{get_attribute, set_attribute};
use crate::runtime::dict::DictObject;
use crate::runtime::error::{ErrorKind, RuntimeError};
use crate::runtime::ops;
use crate::runtime::sequence;
use crate::runtime::value::{Number, RangeValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Print,
    Len,
    Sum,
    Range,
    Int,
    Float,
    Bool,
    Str,
    List,
    Dict,
    Set,
    Tuple,
    Getattr,
    Setattr,
    Abs,
    Max,
    Min,
}

impl BuiltinFunction {
    pub const ALL: [BuiltinFunction; 17] = [
        Self::Print,
        Self::Len,
        Self::Sum,
        Self::Range,
        Self::Int,
        Self::Float,
        Self::Bool,
        Self::Str,
        Self::List,
        Self::Dict,
        Self::Set,
        Self::Tuple,
        Self::Getattr,
        Self::Setattr,
        Self::Abs,
        Self::Max,
        Self::Min,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Len => "len",
            Self::Sum => "sum",
            Self::Range => "range",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Set => "set",
            Self::Tuple => "tuple",
            Self::Getattr => "getattr",
            Self::Setattr => "setattr",
            Self::Abs => "abs",
            Self::Max => "max",
            Self::Min => "min",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn call(
        self,
        args: Vec<Value>,
        keywords: Vec<(String, Value)>,
        output: &mut Output,
    ) -> Result<Value, RuntimeError> {
        match self {
            Self::Print => print(args, keywords, output),
            Self::Dict => dict(args, keywords),
            _ if !keywords.is_empty() => Err(RuntimeError::KeywordsNotAccepted {
                function: self.name().to_string(),
            }),
            Self::Len => {
                let [value] = exact(self, args)?;
                i64::try_from(sequence::len(&value)?)
                    .map(Value::Int)
                    .map_err(|_| RuntimeError::Overflow { operation: "len" })
            }
            Self::Sum => sum(args),
            Self::Range => range(args),
            Self::Int => int(args),
            Self::Float => float(args),
            Self::Bool => {
                RuntimeError::expect_arity("bool", 0, 1, args.len())?;
                Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
            }
            Self::Str => {
                RuntimeError::expect_arity("str", 0, 1, args.len())?;
                Ok(Value::str(
                    &args.first().map(Value::to_output).unwrap_or_default(),
                ))
            }
            Self::List => {
                RuntimeError::expect_arity("list", 0, 1, args.len())?;
                let items = match args.first() {
                    Some(iterable) => sequence::collect(iterable)?,
                    None => Vec::new(),
                };
                Ok(Value::list(items))
            }
            Self::Tuple => {
                RuntimeError::expect_arity("tuple", 0, 1, args.len())?;
                match args.into_iter().next() {
                    Some(tuple @ Value::Tuple(_)) => Ok(tuple),
                    Some(iterable) => Ok(Value::tuple(sequence::collect(&iterable)?)),
                    None => Ok(Value::tuple(Vec::new())),
                }
            }
            Self::Set => {
                RuntimeError::expect_arity("set", 0, 1, args.len())?;
                let members = match args.first() {
                    Some(iterable) => sequence::collect(iterable)?,
                    None => Vec::new(),
                };
                Ok(Value::set(DictObject::from_members(members)?))
            }
            Self::Getattr => {
                RuntimeError::expect_arity("getattr", 2, 3, args.len())?;
                let name = attribute_name("getattr", &args[1])?;
                match (get_attribute(&args[0], name), args.get(2)) {
                    (Ok(value), _) => Ok(value),
                    (Err(RuntimeError::UnknownAttribute { .. }), Some(default)) => {
                        Ok(default.clone())
                    }
                    (Err(error), _) => Err(error),
                }
            }
            Self::Setattr => {
                let [object, name, value] = exact(self, args)?;
                set_attribute(&object, attribute_name("setattr", &name)?, value)?;
                Ok(Value::None)
            }
            Self::Abs => {
                let [value] = exact(self, args)?;
                match value.as_number() {
                    Some(Number::Int(number)) => number
                        .checked_abs()
                        .map(Value::Int)
                        .ok_or(RuntimeError::Overflow { operation: "abs" }),
                    Some(Number::Float(number)) => Ok(Value::Float(number.abs())),
                    None => Err(RuntimeError::invalid_argument(format!(
                        "bad operand type for abs(): '{}'",
                        value.type_name()
                    ))),
                }
            }
            Self::Max => extremum(self, args, CompareOperator::Gt),
            Self::Min => extremum(self, args, CompareOperator::Lt),
        }
    }
}

/// Destination of `print`.
#[derive(Debug)]
pub enum Output {
    Stdout,
    Captured(String),
}

impl Output {
    pub fn write(&mut self, text: &str) -> Result<(), RuntimeError> {
        match self {
            Output::Stdout => write_flushed(&mut io::stdout().lock(), text),
            Output::Captured(buffer) => {
                buffer.push_str(text);
                Ok(())
            }
        }
    }

    /// Returns and clears captured text; always empty for stdout.
    pub fn take(&mut self) -> String {
        match self {
            Output::Stdout => String::new(),
            Output::Captured(buffer) => std::mem::take(buffer),
        }
    }
}

fn write_flushed(writer: &mut impl Write, text: &str) -> Result<(), RuntimeError> {
    writer
        .write_all(text.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|error| RuntimeError::OutputFailed {
            message: error.to_string(),
        })
}

fn exact<const N: usize>(
    builtin: BuiltinFunction,
    args: Vec<Value>,
) -> Result<[Value; N], RuntimeError> {
    RuntimeError::expect_arity(builtin.name(), N, N, args.len())?;
    <[Value; N]>::try_from(args).map_err(|args| {
        RuntimeError::invalid_argument(format!(
            "{}() takes {N} arguments ({} given)",
            builtin.name(),
            args.len()
        ))
    })
}

fn text_option(
    function: &str,
    name: &str,
    value: Option<Value>,
    default: &str,
) -> Result<String, RuntimeError> {
    match value {
        None | Some(Value::None) => Ok(default.to_string()),
        Some(Value::Str(text)) => Ok(text.to_string()),
        Some(other) => Err(RuntimeError::invalid_argument(format!(
            "{function}() {name} must be None or a string, not {}",
            other.type_name()
        ))),
    }
}

fn print(
    args: Vec<Value>,
    keywords: Vec<(String, Value)>,
    output: &mut Output,
) -> Result<Value, RuntimeError> {
    let mut sep = None;
    let mut end = None;
    for (name, value) in keywords {
        match name.as_str() {
            "sep" => sep = Some(value),
            "end" => end = Some(value),
            _ => {
                return Err(RuntimeError::invalid_argument(format!(
                    "'{name}' is an invalid keyword argument for print()"
                )));
            }
        }
    }
    let sep = text_option("print", "sep", sep, " ")?;
    let end = text_option("print", "end", end, "\n")?;

    let mut text = args
        .iter()
        .map(Value::to_output)
        .collect::<Vec<_>>()
        .join(&sep);
    text.push_str(&end);
    output.write(&text)?;
    Ok(Value::None)
}

fn dict(args: Vec<Value>, keywords: Vec<(String, Value)>) -> Result<Value, RuntimeError> {
    RuntimeError::expect_arity("dict", 0, 1, args.len())?;
    let mut dict = match args.first() {
        Some(source) => sequence::dict_from(source)?,
        None => DictObject::new(),
    };
    for (name, value) in keywords {
        dict.insert(Value::str(&name), value)?;
    }
    Ok(Value::dict(dict))
}

fn sum(args: Vec<Value>) -> Result<Value, RuntimeError> {
    RuntimeError::expect_arity("sum", 1, 2, args.len())?;
    let mut total = args.get(1).cloned().unwrap_or(Value::Int(0));
    if matches!(total, Value::Str(_)) {
        return Err(RuntimeError::invalid_argument(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }
    for item in sequence::iterate(&args[0])? {
        total = ops::add(&total, &item)?;
    }
    Ok(total)
}

fn integer_argument(function: &str, value: &Value) -> Result<i64, RuntimeError> {
    value.as_int().ok_or_else(|| {
        RuntimeError::invalid_argument(format!(
            "'{}' object cannot be interpreted as an integer (in {function}())",
            value.type_name()
        ))
    })
}

fn range(args: Vec<Value>) -> Result<Value, RuntimeError> {
    RuntimeError::expect_arity("range", 1, 3, args.len())?;
    let bounds = args
        .iter()
        .map(|value| integer_argument("range", value))
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => (0, 0, 1),
    };
    if step == 0 {
        return Err(RuntimeError::invalid_value("range() arg 3 must not be zero"));
    }
    Ok(Value::Range(RangeValue { start, stop, step }))
}

fn int(args: Vec<Value>) -> Result<Value, RuntimeError> {
    RuntimeError::expect_arity("int", 0, 1, args.len())?;
    let Some(value) = args.first() else {
        return Ok(Value::Int(0));
    };
    match value {
        Value::Int(number) => Ok(Value::Int(*number)),
        Value::Bool(flag) => Ok(Value::Int(i64::from(*flag))),
        Value::Float(number) => float_to_int(*number),
        Value::Str(text) => parse_int(text),
        other => Err(RuntimeError::invalid_argument(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn float_to_int(number: f64) -> Result<Value, RuntimeError> {
    if number.is_nan() {
        return Err(RuntimeError::invalid_value("cannot convert float NaN to integer"));
    }
    let truncated = number.trunc();
    if truncated.is_infinite() || truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(RuntimeError::Overflow {
            operation: "int()",
        });
    }
    Ok(Value::Int(truncated as i64))
}

fn parse_int(text: &str) -> Result<Value, RuntimeError> {
    let trimmed = text.trim();
    let digits = trimmed.replace('_', "");
    if let Ok(number) = digits.parse::<i64>() {
        return Ok(Value::Int(number));
    }
    let unsigned = digits.trim_start_matches(['+', '-']);
    if !unsigned.is_empty() && unsigned.chars().all(|c| c.is_ascii_digit()) {
        return Err(RuntimeError::Overflow {
            operation: "int()",
        });
    }
    Err(RuntimeError::invalid_value(format!(
        "invalid literal for int() with base 10: {}",
        Value::str(text).repr()
    )))
}

fn float(args: Vec<Value>) -> Result<Value, RuntimeError> {
    RuntimeError::expect_arity("float", 0, 1, args.len())?;
    let Some(value) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    if let Some(number) = value.as_number() {
        return Ok(Value::Float(number.to_f64()));
    }
    match value {
        Value::Str(text) => text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            RuntimeError::invalid_value(format!(
                "could not convert string to float: {}",
                value.repr()
            ))
        }),
        other => Err(RuntimeError::invalid_argument(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn attribute_name<'v>(function: &str, value: &'v Value) -> Result<&'v str, RuntimeError> {
    value.as_str().ok_or_else(|| {
        RuntimeError::invalid_argument(format!(
            "{function}(): attribute name must be string, not '{}'",
            value.type_name()
        ))
    })
}

/// `max`/`min`: keeps the first item that no later item beats under `op`.
fn extremum(
    builtin: BuiltinFunction,
    args: Vec<Value>,
    op: CompareOperator,
) -> Result<Value, RuntimeError> {
    let candidates = match args.len() {
        0 => {
            return Err(RuntimeError::invalid_argument(format!(
                "{}() expected at least 1 argument, got 0",
                builtin.name()
            )));
        }
        1 => sequence::collect(&args[0])?,
        _ => args,
    };
    let mut candidates = candidates.into_iter();
    let Some(mut best) = candidates.next() else {
        return Err(RuntimeError::invalid_value(format!(
            "{}() arg is an empty sequence",
            builtin.name()
        )));
    };
    for candidate in candidates {
        if ops::compare(op, &candidate, &best)? {
            best = candidate;
        }
    }
    Ok(best)
}

/// Methods available on builtin container values through attribute access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinMethod {
    ListAppend,
    ListPop,
    ListExtend,
    DictKeys,
    DictValues,
    DictItems,
    DictGet,
    StrJoin,
    StrUpper,
    StrLower,
}

impl BuiltinMethod {
    pub fn lookup(receiver: &Value, name: &str) -> Option<Self> {
        let method = match (receiver, name) {
            (Value::List(_), "append") => Self::ListAppend,
            (Value::List(_), "pop") => Self::ListPop,
            (Value::List(_), "extend") => Self::ListExtend,
            (Value::Dict(_), "keys") => Self::DictKeys,
            (Value::Dict(_), "values") => Self::DictValues,
            (Value::Dict(_), "items") => Self::DictItems,
            (Value::Dict(_), "get") => Self::DictGet,
            (Value::Str(_), "join") => Self::StrJoin,
            (Value::Str(_), "upper") => Self::StrUpper,
            (Value::Str(_), "lower") => Self::StrLower,
            _ => return None,
        };
        Some(method)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ListAppend => "append",
            Self::ListPop => "pop",
            Self::ListExtend => "extend",
            Self::DictKeys => "keys",
            Self::DictValues => "values",
            Self::DictItems => "items",
            Self::DictGet => "get",
            Self::StrJoin => "join",
            Self::StrUpper => "upper",
            Self::StrLower => "lower",
        }
    }

    pub fn call(self, receiver: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let name = self.name();
        match (self, receiver) {
            (Self::ListAppend, Value::List(items)) => {
                RuntimeError::expect_arity(name, 1, 1, args.len())?;
                items.borrow_mut().extend(args);
                Ok(Value::None)
            }
            (Self::ListPop, Value::List(items)) => {
                RuntimeError::expect_arity(name, 0, 1, args.len())?;
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err(RuntimeError::Native {
                        kind: ErrorKind::IndexError,
                        message: "pop from empty list".to_string(),
                    });
                }
                let len = items.len() as i64;
                let raw = match args.first() {
                    Some(index) => integer_argument(name, index)?,
                    None => -1,
                };
                let position = if raw < 0 { raw + len } else { raw };
                if !(0..len).contains(&position) {
                    return Err(RuntimeError::IndexOutOfRange { container: "pop" });
                }
                Ok(items.remove(position as usize))
            }
            (Self::ListExtend, Value::List(items)) => {
                RuntimeError::expect_arity(name, 1, 1, args.len())?;
                let extra = sequence::collect(&args[0])?;
                items.borrow_mut().extend(extra);
                Ok(Value::None)
            }
            (Self::DictKeys, Value::Dict(dict)) => {
                RuntimeError::expect_arity(name, 0, 0, args.len())?;
                Ok(Value::list(dict.borrow().keys().cloned().collect()))
            }
            (Self::DictValues, Value::Dict(dict)) => {
                RuntimeError::expect_arity(name, 0, 0, args.len())?;
                Ok(Value::list(dict.borrow().values().cloned().collect()))
            }
            (Self::DictItems, Value::Dict(dict)) => {
                RuntimeError::expect_arity(name, 0, 0, args.len())?;
                let items = dict
                    .borrow()
                    .iter()
                    .map(|(key, value)| Value::tuple(vec![key.clone(), value.clone()]))
                    .collect();
                Ok(Value::list(items))
            }
            (Self::DictGet, Value::Dict(dict)) => {
                RuntimeError::expect_arity(name, 1, 2, args.len())?;
                let found = dict.borrow().get(&args[0])?;
                Ok(found.or_else(|| args.get(1).cloned()).unwrap_or(Value::None))
            }
            (Self::StrJoin, Value::Str(separator)) => {
                RuntimeError::expect_arity(name, 1, 1, args.len())?;
                let mut parts = Vec::new();
                for (position, item) in sequence::iterate(&args[0])?.enumerate() {
                    match item {
                        Value::Str(text) => parts.push(text),
                        other => {
                            return Err(RuntimeError::invalid_argument(format!(
                                "sequence item {position}: expected str instance, {} found",
                                other.type_name()
                            )));
                        }
                    }
                }
                let joined = parts
                    .iter()
                    .map(|part| part.as_ref())
                    .collect::<Vec<&str>>()
                    .join(separator);
                Ok(Value::str(&joined))
            }
            (Self::StrUpper, Value::Str(text)) => {
                RuntimeError::expect_arity(name, 0, 0, args.len())?;
                Ok(Value::str(&text.to_uppercase()))
            }
            (Self::StrLower, Value::Str(text)) => {
                RuntimeError::expect_arity(name, 0, 0, args.len())?;
                Ok(Value::str(&text.to_lowercase()))
            }
            (method, other) => Err(RuntimeError::UnknownAttribute {
                type_name: other.type_name(),
                attribute: method.name().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(builtin: BuiltinFunction, args: Vec<Value>) -> Result<Value, RuntimeError> {
        builtin.call(args, Vec::new(), &mut Output::Captured(String::new()))
    }

    #[test]
    fn resolves_every_builtin_by_name() {
        for builtin in BuiltinFunction::ALL {
            assert_eq!(BuiltinFunction::from_name(builtin.name()), Some(builtin));
        }
        assert_eq!(BuiltinFunction::from_name("type"), None);
    }

    #[test]
    fn print_honours_sep_and_end() {
        let mut output = Output::Captured(String::new());
        BuiltinFunction::Print
            .call(
                vec![Value::Int(1), Value::str("a"), Value::Float(2.0)],
                vec![
                    ("sep".to_string(), Value::str("-")),
                    ("end".to_string(), Value::str("!")),
                ],
                &mut output,
            )
            .expect("print");
        BuiltinFunction::Print
            .call(vec![], vec![], &mut output)
            .expect("print");
        assert_eq!(output.take(), "1-a-2.0!\n");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_are_reported() {
        let error = write_flushed(&mut ClosedPipe, "text").expect_err("closed pipe");
        assert_eq!(error.kind(), ErrorKind::OSError);
        assert!(error.to_string().starts_with("failed to write output: "));

        let mut buffer = Vec::new();
        write_flushed(&mut buffer, "ok").expect("vec writer");
        assert_eq!(buffer, b"ok");
    }

    #[test]
    fn conversions() {
        assert_eq!(
            call(BuiltinFunction::Int, vec![Value::str(" 42 ")]).expect("int"),
            Value::Int(42)
        );
        assert_eq!(
            call(BuiltinFunction::Int, vec![Value::Float(-3.9)]).expect("int"),
            Value::Int(-3)
        );
        let error = call(BuiltinFunction::Int, vec![Value::str("x")]).expect_err("bad literal");
        assert_eq!(
            error.to_string(),
            "invalid literal for int() with base 10: 'x'"
        );
        assert_eq!(
            call(BuiltinFunction::Float, vec![Value::str("2.5")]).expect("float"),
            Value::Float(2.5)
        );
        assert_eq!(
            call(BuiltinFunction::Str, vec![Value::Float(1.0)]).expect("str"),
            Value::str("1.0")
        );
        assert_eq!(
            call(BuiltinFunction::Bool, vec![Value::list(vec![])]).expect("bool"),
            Value::Bool(false)
        );
    }

    #[test]
    fn aggregates() {
        let numbers = Value::list(vec![Value::Int(3), Value::Int(9), Value::Int(1)]);
        assert_eq!(
            call(BuiltinFunction::Sum, vec![numbers.clone()]).expect("sum"),
            Value::Int(13)
        );
        assert_eq!(
            call(BuiltinFunction::Max, vec![numbers.clone()]).expect("max"),
            Value::Int(9)
        );
        assert_eq!(
            call(BuiltinFunction::Min, vec![Value::Int(4), Value::Float(2.5)]).expect("min"),
            Value::Float(2.5)
        );
        let error = call(BuiltinFunction::Max, vec![Value::list(vec![])]).expect_err("empty");
        assert_eq!(error.kind(), ErrorKind::ValueError);
        assert_eq!(
            call(BuiltinFunction::Abs, vec![Value::Int(-5)]).expect("abs"),
            Value::Int(5)
        );
    }

    #[test]
    fn range_is_lazy_and_validated() {
        let range = call(BuiltinFunction::Range, vec![Value::Int(1), Value::Int(10), Value::Int(3)])
            .expect("range");
        assert_eq!(range.repr(), "range(1, 10, 3)");
        assert_eq!(
            call(BuiltinFunction::List, vec![range]).expect("list").repr(),
            "[1, 4, 7]"
        );
        let error = call(BuiltinFunction::Range, vec![Value::Int(1), Value::Int(2), Value::Int(0)])
            .expect_err("zero step");
        assert_eq!(error.kind(), ErrorKind::ValueError);
    }

    #[test]
    fn range_length_at_the_integer_extremes() {
        let range = call(
            BuiltinFunction::Range,
            vec![Value::Int(0), Value::Int(-10), Value::Int(i64::MIN)],
        )
        .expect("range");
        assert_eq!(
            call(BuiltinFunction::Len, vec![range]).expect("len"),
            Value::Int(1)
        );

        let range = call(BuiltinFunction::Range, vec![Value::Int(i64::MIN), Value::Int(i64::MAX)])
            .expect("range");
        let error = call(BuiltinFunction::Len, vec![range]).expect_err("too long");
        assert_eq!(error.kind(), ErrorKind::OverflowError);
    }

    #[test]
    fn keywords_are_rejected_where_unsupported() {
        let error = BuiltinFunction::Len
            .call(
                vec![Value::str("ab")],
                vec![("x".to_string(), Value::None)],
                &mut Output::Captured(String::new()),
            )
            .expect_err("keywords");
        assert_eq!(error.kind(), ErrorKind::TypeError);
    }

    #[test]
    fn container_methods() {
        let list = Value::list(vec![Value::Int(1)]);
        BuiltinMethod::ListAppend
            .call(&list, vec![Value::Int(2)])
            .expect("append");
        assert_eq!(
            BuiltinMethod::ListPop.call(&list, vec![]).expect("pop"),
            Value::Int(2)
        );
        let joined = BuiltinMethod::StrJoin
            .call(
                &Value::str(", "),
                vec![Value::list(vec![Value::str("a"), Value::str("b")])],
            )
            .expect("join");
        assert_eq!(joined, Value::str("a, b"));

        let dict = Value::dict(
            DictObject::from_entries(vec![(Value::str("k"), Value::Int(1))]).expect("dict"),
        );
        assert_eq!(
            BuiltinMethod::DictGet
                .call(&dict, vec![Value::str("missing"), Value::Int(0)])
                .expect("get"),
            Value::Int(0)
        );
        assert_eq!(
            BuiltinMethod::DictItems.call(&dict, vec![]).expect("items").repr(),
            "[('k', 1)]"
        );
    }
}
