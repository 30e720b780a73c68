use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::ModelRef;

/// A type-erased, shareable variable value.
pub type Variable = Rc<dyn Any>;

enum Scope {
    Basic,
    /// Misses fall back to `parent`; writes stay local.
    Hierarchical { parent: Context },
    /// Reads fall back to `input` until the variable is touched locally.
    Safe { input: Context },
    /// Like `Safe`, but `outputs` are read and written straight through to `input`.
    SafeOutput {
        input: Context,
        outputs: BTreeSet<String>,
    },
}

struct ContextInner {
    scope: Scope,
    variables: RefCell<BTreeMap<String, Variable>>,
    trees: RefCell<BTreeMap<String, ModelRef>>,
    shadowed: RefCell<BTreeSet<String>>,
    detached: Cell<bool>,
}

/// Shared variable store handed down the execution tree.
///
/// Cloning a `Context` clones the handle, not the variables: every task that
/// receives the same handle sees the same store. Decorators that need
/// isolation substitute one of the derived contexts ([`Context::hierarchical`],
/// [`Context::safe`], [`Context::safe_output`]).
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_scope(Scope::Basic)
    }

    /// A child context that falls back to `parent` for variables and named trees it lacks.
    pub fn hierarchical(parent: &Context) -> Self {
        Self::with_scope(Scope::Hierarchical {
            parent: parent.clone(),
        })
    }

    /// A context that can read `input` but never modifies it.
    pub fn safe(input: &Context) -> Self {
        Self::with_scope(Scope::Safe {
            input: input.clone(),
        })
    }

    /// A safe context whose `outputs` variables are written through to `input`.
    pub fn safe_output<I, S>(input: &Context, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_scope(Scope::SafeOutput {
            input: input.clone(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        })
    }

    fn with_scope(scope: Scope) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                scope,
                variables: RefCell::new(BTreeMap::new()),
                trees: RefCell::new(BTreeMap::new()),
                shadowed: RefCell::new(BTreeSet::new()),
                detached: Cell::new(false),
            }),
        }
    }

    /// Whether both handles point at the same store.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Context reads of `name` are forwarded to, if any.
    fn fallback(&self, name: &str) -> Option<&Context> {
        match &self.inner.scope {
            Scope::Basic => None,
            Scope::Hierarchical { parent } => Some(parent),
            Scope::Safe { input } | Scope::SafeOutput { input, .. } => {
                if self.inner.detached.get() || self.inner.shadowed.borrow().contains(name) {
                    None
                } else {
                    Some(input)
                }
            }
        }
    }

    /// Context writes of `name` are forwarded to instead of the local store.
    fn write_through(&self, name: &str) -> Option<&Context> {
        match &self.inner.scope {
            Scope::SafeOutput { input, outputs } if outputs.contains(name) => Some(input),
            _ => None,
        }
    }

    pub fn get_variable(&self, name: &str) -> Option<Variable> {
        if let Some(target) = self.write_through(name) {
            return target.get_variable(name);
        }
        if let Some(value) = self.inner.variables.borrow().get(name) {
            return Some(value.clone());
        }
        self.fallback(name)?.get_variable(name)
    }

    /// Typed read. Panics if the stored value has a different type.
    pub fn get<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        let value = self.get_variable(name)?;
        let typed = value.downcast_ref::<T>().unwrap_or_else(|| {
            panic!("context type mismatch for variable '{name}' (stored type differs from requested)")
        });
        Some(typed.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_variable(name).is_some()
    }

    /// Store `value` under `name`. Returns whether the name was already visible.
    pub fn set_variable<T: 'static>(&self, name: impl Into<String>, value: T) -> bool {
        self.set_shared(name, Rc::new(value))
    }

    /// Store an already type-erased value. Returns whether the name was already visible.
    pub fn set_shared(&self, name: impl Into<String>, value: Variable) -> bool {
        let name = name.into();
        if let Some(target) = self.write_through(&name) {
            return target.set_shared(name, value);
        }
        let existed = self.contains(&name);
        if matches!(
            self.inner.scope,
            Scope::Safe { .. } | Scope::SafeOutput { .. }
        ) {
            self.inner.shadowed.borrow_mut().insert(name.clone());
        }
        self.inner.variables.borrow_mut().insert(name, value);
        existed
    }

    /// Remove `name` from this context. Returns whether it was visible before.
    ///
    /// Hierarchical contexts only clear their own layer, so a parent's value may
    /// become visible again. Safe contexts hide the input's value from then on.
    pub fn clear_variable(&self, name: &str) -> bool {
        if let Some(target) = self.write_through(name) {
            return target.clear_variable(name);
        }
        let existed = self.contains(name);
        self.inner.variables.borrow_mut().remove(name);
        if matches!(
            self.inner.scope,
            Scope::Safe { .. } | Scope::SafeOutput { .. }
        ) {
            self.inner.shadowed.borrow_mut().insert(name.to_string());
        }
        existed
    }

    /// Drop every local variable. Safe contexts also stop reading their input.
    pub fn clear(&self) {
        self.inner.variables.borrow_mut().clear();
        if matches!(
            self.inner.scope,
            Scope::Safe { .. } | Scope::SafeOutput { .. }
        ) {
            self.inner.detached.set(true);
        }
    }

    pub fn set_named_tree(&self, name: impl Into<String>, tree: ModelRef) -> bool {
        self.inner
            .trees
            .borrow_mut()
            .insert(name.into(), tree)
            .is_some()
    }

    pub fn get_named_tree(&self, name: &str) -> Option<ModelRef> {
        if let Some(tree) = self.inner.trees.borrow().get(name) {
            return Some(tree.clone());
        }
        match &self.inner.scope {
            Scope::Basic => None,
            Scope::Hierarchical { parent } => parent.get_named_tree(name),
            Scope::Safe { input } | Scope::SafeOutput { input, .. } => input.get_named_tree(name),
        }
    }

    /// Names of the variables stored in this layer (fallbacks excluded).
    pub fn local_names(&self) -> Vec<String> {
        self.inner.variables.borrow().keys().cloned().collect()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scope = match &self.inner.scope {
            Scope::Basic => "basic",
            Scope::Hierarchical { .. } => "hierarchical",
            Scope::Safe { .. } => "safe",
            Scope::SafeOutput { .. } => "safe-output",
        };
        f.debug_struct("Context")
            .field("scope", &scope)
            .field("variables", &self.local_names())
            .finish()
    }
}
