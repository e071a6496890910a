use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::ast::Value;
use crate::builtinops::get_builtin_ops;

/// One binding scope
#[derive(Default)]
struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Env>,
}

/// Shared handle to an environment frame and, through it, the whole chain
///
/// Cloning an `Env` clones the handle, not the bindings: a closure that captures
/// an `Env` sees every later `set` made through any other handle to that frame.
#[derive(Clone, Default)]
pub struct Env(Rc<RefCell<Frame>>);

impl Env {
    /// Create a root frame with no bindings
    pub fn new() -> Self {
        Env::default()
    }

    /// Create the global frame with every primitive operation installed
    pub fn global() -> Self {
        let env = Env::new();
        for op in get_builtin_ops() {
            env.define(op.name, Value::PrimOp(op));
        }
        env
    }

    /// Create a fresh, empty frame whose enclosing frame is `self`
    pub fn extend(&self) -> Self {
        Env(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    /// Create a fresh frame enclosed by `self` holding the given bindings
    ///
    /// A name that appears twice keeps the value bound last.
    pub fn extend_with<I>(&self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let env = self.extend();
        env.0.borrow_mut().bindings.extend(bindings);
        env
    }

    /// Bind `name` in this frame, replacing any previous binding here
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Look up `name` along the chain without creating anything
    pub fn get(&self, name: &str) -> Option<Value> {
        self.find(name).map(|(_, value)| value)
    }

    /// Look up `name` along the chain, binding it to `()` in the root frame on a miss
    pub fn lookup(&self, name: &str) -> Value {
        match self.find(name) {
            Some((_, value)) => value,
            None => {
                debug!(name, "auto-vivifying unbound variable");
                self.root().define(name, Value::Nil);
                Value::Nil
            }
        }
    }

    /// Overwrite `name` in the innermost frame that binds it, or bind it in the root frame
    pub fn assign(&self, name: &str, value: Value) {
        let target = match self.find(name) {
            Some((frame, _)) => frame,
            None => {
                debug!(name, "creating global binding on assignment");
                self.root()
            }
        };
        target.define(name, value);
    }

    /// Whether this frame itself (not its ancestors) binds `name`
    #[cfg(test)]
    fn binds_locally(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }

    /// Whether two handles refer to the same frame
    #[cfg(test)]
    fn same_frame(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of frames from this one up to and including the root
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut frame = self.parent();
        while let Some(env) = frame {
            depth += 1;
            frame = env.parent();
        }
        depth
    }

    fn parent(&self) -> Option<Env> {
        self.0.borrow().parent.clone()
    }

    fn root(&self) -> Env {
        let mut frame = self.clone();
        while let Some(parent) = frame.parent() {
            frame = parent;
        }
        frame
    }

    /// Search phase shared by lookup and assignment: the frame that binds
    /// `name` together with its current value
    fn find(&self, name: &str) -> Option<(Env, Value)> {
        let mut frame = self.clone();
        loop {
            let parent = {
                let inner = frame.0.borrow();
                if let Some(value) = inner.bindings.get(name) {
                    let value = value.clone();
                    drop(inner);
                    return Some((frame, value));
                }
                inner.parent.clone()
            };
            frame = parent?;
        }
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Frames can be reachable from their own bindings, so only names are shown.
        let inner = self.0.borrow();
        let mut names: Vec<&String> = inner.bindings.keys().collect();
        names.sort();
        f.debug_struct("Env")
            .field("bindings", &names)
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outward() {
        let root = Env::new();
        root.define("x", Value::Number(1));
        let child = root.extend();
        let grandchild = child.extend();
        assert_eq!(grandchild.lookup("x"), Value::Number(1));

        child.define("x", Value::Number(2));
        assert_eq!(grandchild.lookup("x"), Value::Number(2));
        assert_eq!(root.lookup("x"), Value::Number(1));
    }

    #[test]
    fn test_lookup_miss_binds_nil_in_root() {
        let root = Env::new();
        let child = root.extend();
        assert_eq!(child.get("ghost"), None);
        assert_eq!(child.lookup("ghost"), Value::Nil);
        assert!(root.binds_locally("ghost"));
        assert!(!child.binds_locally("ghost"));
        assert_eq!(child.get("ghost"), Some(Value::Nil));
    }

    #[test]
    fn test_assign_overwrites_innermost_binding() {
        let root = Env::new();
        root.define("x", Value::Number(1));
        let child = root.extend();
        child.define("x", Value::Number(2));
        let grandchild = child.extend();

        grandchild.assign("x", Value::Number(3));
        assert_eq!(child.get("x"), Some(Value::Number(3)));
        assert_eq!(root.get("x"), Some(Value::Number(1)));
        assert!(!grandchild.binds_locally("x"));
    }

    #[test]
    fn test_assign_miss_binds_in_root() {
        let root = Env::new();
        let child = root.extend().extend();
        child.assign("y", Value::symbol("hello"));
        assert!(root.binds_locally("y"));
        assert_eq!(root.get("y"), Some(Value::symbol("hello")));
    }

    #[test]
    fn test_handles_share_frames() {
        let root = Env::new();
        let alias = root.clone();
        alias.define("z", Value::Number(9));
        assert_eq!(root.get("z"), Some(Value::Number(9)));
        assert!(root.same_frame(&alias));
        assert!(!root.same_frame(&root.extend()));
    }

    #[test]
    fn test_extend_with_last_binding_wins() {
        let root = Env::new();
        let frame = root.extend_with(vec![
            ("a".to_string(), Value::Number(1)),
            ("a".to_string(), Value::Number(2)),
        ]);
        assert_eq!(frame.get("a"), Some(Value::Number(2)));
        assert_eq!(frame.depth(), 2);
    }

    #[test]
    fn test_global_has_primitives() {
        let global = Env::global();
        for name in ["+", "-", "*", "/", "<", ">", "=", "cons", "car", "cdr", "print"] {
            assert!(
                matches!(global.get(name), Some(Value::PrimOp(op)) if op.name == name),
                "missing primitive {name}"
            );
        }
        assert_eq!(global.depth(), 1);
    }
}
