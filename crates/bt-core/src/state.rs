use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::Variable;

/// Opaque per-position state persisted by the executor across task re-creation.
///
/// Task implementations decide which names they write; readers only need
/// [`TaskState::get_state_variable`] or its typed form [`TaskState::get`].
#[derive(Clone, Default)]
pub struct TaskState {
    values: BTreeMap<String, Variable>,
}

impl TaskState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for the common single-variable state.
    pub fn with<T: 'static>(name: impl Into<String>, value: T) -> Self {
        let mut state = Self::new();
        state.set_state_variable(name, value);
        state
    }

    pub fn get_state_variable(&self, name: &str) -> Option<&dyn Any> {
        self.values.get(name).map(|v| v.as_ref())
    }

    pub fn set_state_variable<T: 'static>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Rc::new(value));
    }

    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        let value = self.values.get(name)?;
        value.downcast_ref::<T>().or_else(|| {
            panic!("task state type mismatch for variable '{name}' (stored type differs from requested)")
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
