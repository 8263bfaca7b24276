use std::iter;
use std::mem;
use std::rc::Rc;

use crate::runtime::value::Value;

use super::Scope;

/// Scope chain of the code currently executing.
///
/// `enclosing` holds the frames visible from the innermost one, outermost
/// first; at top level it is empty and `local` is the global scope. Inside a
/// call, `enclosing` is the callee's captured closure and `local` is the
/// fresh frame for its parameters. Enclosing frames are never written, so
/// closures and the calls made through them share one copy.
#[derive(Debug, Default)]
pub(super) struct Environment {
    enclosing: Rc<[Scope]>,
    local: Scope,
}

impl Environment {
    pub(super) fn for_call(closure: Rc<[Scope]>) -> Self {
        Self {
            enclosing: closure,
            local: Scope::default(),
        }
    }

    pub(super) fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.local.get(name) {
            return Some(value.clone());
        }
        self.enclosing
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    /// Binds `name` in the innermost frame; outer frames are never written.
    pub(super) fn assign(&mut self, name: &str, value: Value) {
        self.local.insert(name.to_string(), value);
    }

    pub(super) fn defined_in_enclosing(&self, name: &str) -> bool {
        self.enclosing.iter().any(|scope| scope.contains_key(name))
    }

    /// Copies every visible frame for a closure created at this point.
    pub(super) fn snapshot(&self) -> Rc<[Scope]> {
        self.enclosing
            .iter()
            .cloned()
            .chain(iter::once(self.local.clone()))
            .collect()
    }

    pub(super) fn replace(&mut self, other: Environment) -> Environment {
        mem::replace(self, other)
    }

    pub(super) fn into_local(self) -> Scope {
        self.local
    }

    pub(super) fn globals(&self) -> &Scope {
        self.enclosing.first().unwrap_or(&self.local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_prefers_the_innermost_frame() {
        let mut outer = Environment::default();
        outer.assign("x", Value::Int(1));
        outer.assign("y", Value::Int(2));

        let mut inner = Environment::for_call(outer.snapshot());
        inner.assign("x", Value::Int(10));

        assert_eq!(inner.lookup("x"), Some(Value::Int(10)));
        assert_eq!(inner.lookup("y"), Some(Value::Int(2)));
        assert_eq!(inner.lookup("z"), None);
        assert!(inner.defined_in_enclosing("y"));
        assert!(!inner.defined_in_enclosing("z"));
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let mut outer = Environment::default();
        outer.assign("x", Value::Int(1));
        let closure = outer.snapshot();
        outer.assign("x", Value::Int(2));

        let inner = Environment::for_call(closure);
        assert_eq!(inner.lookup("x"), Some(Value::Int(1)));
        assert_eq!(outer.globals().get("x"), Some(&Value::Int(2)));
    }
}
