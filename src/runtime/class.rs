//! Minimal classes: a named attribute table and instances with their own
//! fields. There are no base classes and no descriptor protocol.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::builtins::BuiltinMethod;
use crate::runtime::error::RuntimeError;
use crate::runtime::function::BoundMethod;
use crate::runtime::value::Value;

#[derive(Debug)]
pub struct ClassValue {
    pub name: String,
    pub attributes: RefCell<FxHashMap<String, Value>>,
}

impl ClassValue {
    pub fn new(name: String, attributes: FxHashMap<String, Value>) -> Self {
        Self {
            name,
            attributes: RefCell::new(attributes),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.attributes.borrow().get(name).cloned()
    }
}

#[derive(Debug)]
pub struct InstanceValue {
    pub class: Rc<ClassValue>,
    pub fields: RefCell<FxHashMap<String, Value>>,
}

impl InstanceValue {
    pub fn new(class: Rc<ClassValue>) -> Self {
        Self {
            class,
            fields: RefCell::new(FxHashMap::default()),
        }
    }
}

/// Reads `object.name`.
///
/// Instances check their own fields first, then the class table; functions
/// found on the class come back bound to the instance. Builtin containers
/// expose their fixed method set as bound methods.
pub fn get_attribute(object: &Value, name: &str) -> Result<Value, RuntimeError> {
    let found = match object {
        Value::Instance(instance) => {
            let field = instance.fields.borrow().get(name).cloned();
            match field {
                Some(value) => Some(value),
                None => instance.class.lookup(name).map(|value| match value {
                    Value::Function(function) => {
                        Value::BoundMethod(Rc::new(BoundMethod::Function {
                            receiver: object.clone(),
                            function,
                        }))
                    }
                    other => other,
                }),
            }
        }
        Value::Class(class) => class.lookup(name),
        other => BuiltinMethod::lookup(other, name).map(|method| {
            Value::BoundMethod(Rc::new(BoundMethod::Builtin {
                receiver: other.clone(),
                method,
            }))
        }),
    };
    found.ok_or_else(|| RuntimeError::UnknownAttribute {
        type_name: object.type_name(),
        attribute: name.to_string(),
    })
}

/// Writes `object.name = value`; only instances and classes carry writable
/// attributes.
pub fn set_attribute(object: &Value, name: &str, value: Value) -> Result<(), RuntimeError> {
    match object {
        Value::Instance(instance) => {
            instance.fields.borrow_mut().insert(name.to_string(), value);
            Ok(())
        }
        Value::Class(class) => {
            class.attributes.borrow_mut().insert(name.to_string(), value);
            Ok(())
        }
        other => Err(RuntimeError::ReadOnlyAttribute {
            type_name: other.type_name(),
            attribute: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_class() -> Rc<ClassValue> {
        let mut attributes = FxHashMap::default();
        attributes.insert("dims".to_string(), Value::Int(2));
        Rc::new(ClassValue::new("Point".to_string(), attributes))
    }

    #[test]
    fn instance_fields_shadow_class_attributes() {
        let class = point_class();
        let instance = Value::Instance(Rc::new(InstanceValue::new(class.clone())));
        assert_eq!(
            get_attribute(&instance, "dims").expect("class attribute"),
            Value::Int(2)
        );
        set_attribute(&instance, "dims", Value::Int(3)).expect("instance write");
        assert_eq!(
            get_attribute(&instance, "dims").expect("own field"),
            Value::Int(3)
        );
        assert_eq!(
            get_attribute(&Value::Class(class), "dims").expect("class unchanged"),
            Value::Int(2)
        );
    }

    #[test]
    fn missing_attribute_names_the_attribute() {
        let instance = Value::Instance(Rc::new(InstanceValue::new(point_class())));
        let error = get_attribute(&instance, "z").expect_err("missing");
        assert_eq!(error.to_string(), "'Point' object has no attribute 'z'");
    }

    #[test]
    fn scalars_reject_attribute_writes() {
        let error = set_attribute(&Value::Int(1), "x", Value::None).expect_err("read-only");
        assert!(error.to_string().contains("'int'"));
    }

    #[test]
    fn builtin_methods_bind_their_receiver() {
        let list = Value::list(vec![]);
        let method = get_attribute(&list, "append").expect("list.append");
        assert_eq!(method.repr(), "<bound method list.append>");
    }
}
