use std::fmt;
use std::rc::Rc;

use crate::leaf::{Condition, LeafFactory};
use crate::{Context, Position, Status};

pub type ModelRef = Rc<ModelTask>;

/// How a parallel combines the results of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParallelPolicy {
    /// Succeeds when every child succeeds; fails on the first failure.
    Sequence,
    /// Succeeds on the first success; fails when every child fails.
    Selector,
}

/// Name linking a perform-interruption leaf to its interrupter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterrupterId(pub String);

impl From<&str> for InterrupterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for InterrupterId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for InterrupterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node catalogue of the conceptual tree.
#[derive(Clone)]
pub enum ModelKind {
    // Composites.
    Sequence,
    Selector,
    RandomSequence,
    RandomSelector,
    Parallel(ParallelPolicy),
    StaticPriorityList,
    DynamicPriorityList,

    // Decorators (exactly one child).
    Inverter,
    Succeeder,
    Limit { max_runs: u32 },
    Repeat,
    UntilFail,
    HierarchicalContextManager,
    SafeContextManager,
    SafeOutputContextManager { outputs: Vec<String> },
    Interrupter { id: InterrupterId },

    // Leaves.
    Success,
    Failure,
    Wait { ticks: u32 },
    SubtreeLookup { name: String },
    VariableRenamer { from: String, to: String },
    PerformInterruption { target: InterrupterId, desired: Status },
    Action { name: String, factory: Rc<dyn LeafFactory> },
    Condition { name: String, factory: Rc<dyn LeafFactory> },
}

impl ModelKind {
    pub fn label(&self) -> &str {
        match self {
            ModelKind::Sequence => "sequence",
            ModelKind::Selector => "selector",
            ModelKind::RandomSequence => "random-sequence",
            ModelKind::RandomSelector => "random-selector",
            ModelKind::Parallel(ParallelPolicy::Sequence) => "parallel(sequence)",
            ModelKind::Parallel(ParallelPolicy::Selector) => "parallel(selector)",
            ModelKind::StaticPriorityList => "static-priority-list",
            ModelKind::DynamicPriorityList => "dynamic-priority-list",
            ModelKind::Inverter => "inverter",
            ModelKind::Succeeder => "succeeder",
            ModelKind::Limit { .. } => "limit",
            ModelKind::Repeat => "repeat",
            ModelKind::UntilFail => "until-fail",
            ModelKind::HierarchicalContextManager => "hierarchical-context",
            ModelKind::SafeContextManager => "safe-context",
            ModelKind::SafeOutputContextManager { .. } => "safe-output-context",
            ModelKind::Interrupter { .. } => "interrupter",
            ModelKind::Success => "success",
            ModelKind::Failure => "failure",
            ModelKind::Wait { .. } => "wait",
            ModelKind::SubtreeLookup { .. } => "subtree-lookup",
            ModelKind::VariableRenamer { .. } => "variable-renamer",
            ModelKind::PerformInterruption { .. } => "perform-interruption",
            ModelKind::Action { name, .. } | ModelKind::Condition { name, .. } => name,
        }
    }
}

impl fmt::Debug for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable node of a conceptual behaviour tree.
///
/// Trees are assembled bottom-up from the constructors below and shared as
/// [`ModelRef`]. Any node may carry a guard, but only priority lists
/// evaluate guards of their children.
#[derive(Clone, Debug)]
pub struct ModelTask {
    kind: ModelKind,
    children: Vec<ModelRef>,
    guard: Option<ModelRef>,
}

impl ModelTask {
    pub fn new(kind: ModelKind, children: Vec<ModelRef>) -> ModelRef {
        Rc::new(Self {
            kind,
            children,
            guard: None,
        })
    }

    fn leaf(kind: ModelKind) -> ModelRef {
        Self::new(kind, Vec::new())
    }

    fn decorator(kind: ModelKind, child: ModelRef) -> ModelRef {
        Self::new(kind, vec![child])
    }

    pub fn sequence(children: Vec<ModelRef>) -> ModelRef {
        Self::new(ModelKind::Sequence, children)
    }

    pub fn selector(children: Vec<ModelRef>) -> ModelRef {
        Self::new(ModelKind::Selector, children)
    }

    pub fn random_sequence(children: Vec<ModelRef>) -> ModelRef {
        Self::new(ModelKind::RandomSequence, children)
    }

    pub fn random_selector(children: Vec<ModelRef>) -> ModelRef {
        Self::new(ModelKind::RandomSelector, children)
    }

    pub fn parallel(policy: ParallelPolicy, children: Vec<ModelRef>) -> ModelRef {
        Self::new(ModelKind::Parallel(policy), children)
    }

    pub fn static_priority_list(children: Vec<ModelRef>) -> ModelRef {
        Self::new(ModelKind::StaticPriorityList, children)
    }

    pub fn dynamic_priority_list(children: Vec<ModelRef>) -> ModelRef {
        Self::new(ModelKind::DynamicPriorityList, children)
    }

    pub fn inverter(child: ModelRef) -> ModelRef {
        Self::decorator(ModelKind::Inverter, child)
    }

    pub fn succeeder(child: ModelRef) -> ModelRef {
        Self::decorator(ModelKind::Succeeder, child)
    }

    pub fn limit(max_runs: u32, child: ModelRef) -> ModelRef {
        Self::decorator(ModelKind::Limit { max_runs }, child)
    }

    pub fn repeat(child: ModelRef) -> ModelRef {
        Self::decorator(ModelKind::Repeat, child)
    }

    pub fn until_fail(child: ModelRef) -> ModelRef {
        Self::decorator(ModelKind::UntilFail, child)
    }

    pub fn hierarchical_context(child: ModelRef) -> ModelRef {
        Self::decorator(ModelKind::HierarchicalContextManager, child)
    }

    pub fn safe_context(child: ModelRef) -> ModelRef {
        Self::decorator(ModelKind::SafeContextManager, child)
    }

    pub fn safe_output_context<I, S>(outputs: I, child: ModelRef) -> ModelRef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let outputs = outputs.into_iter().map(Into::into).collect();
        Self::decorator(ModelKind::SafeOutputContextManager { outputs }, child)
    }

    pub fn interrupter(id: impl Into<InterrupterId>, child: ModelRef) -> ModelRef {
        Self::decorator(ModelKind::Interrupter { id: id.into() }, child)
    }

    pub fn success() -> ModelRef {
        Self::leaf(ModelKind::Success)
    }

    pub fn failure() -> ModelRef {
        Self::leaf(ModelKind::Failure)
    }

    pub fn wait(ticks: u32) -> ModelRef {
        Self::leaf(ModelKind::Wait { ticks })
    }

    pub fn subtree_lookup(name: impl Into<String>) -> ModelRef {
        Self::leaf(ModelKind::SubtreeLookup { name: name.into() })
    }

    pub fn variable_renamer(from: impl Into<String>, to: impl Into<String>) -> ModelRef {
        Self::leaf(ModelKind::VariableRenamer {
            from: from.into(),
            to: to.into(),
        })
    }

    pub fn perform_interruption(target: impl Into<InterrupterId>, desired: Status) -> ModelRef {
        Self::leaf(ModelKind::PerformInterruption {
            target: target.into(),
            desired,
        })
    }

    pub fn action(name: impl Into<String>, factory: Rc<dyn LeafFactory>) -> ModelRef {
        Self::leaf(ModelKind::Action {
            name: name.into(),
            factory,
        })
    }

    pub fn condition(name: impl Into<String>, factory: Rc<dyn LeafFactory>) -> ModelRef {
        Self::leaf(ModelKind::Condition {
            name: name.into(),
            factory,
        })
    }

    /// Condition leaf backed by a plain predicate over the context.
    pub fn condition_fn(
        name: impl Into<String>,
        predicate: impl Fn(&Context) -> bool + 'static,
    ) -> ModelRef {
        Self::condition(name, Condition::factory(predicate))
    }

    /// Copy of `task` carrying `guard`.
    pub fn guarded(task: &ModelRef, guard: ModelRef) -> ModelRef {
        Rc::new(Self {
            kind: task.kind.clone(),
            children: task.children.clone(),
            guard: Some(guard),
        })
    }

    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }

    pub fn children(&self) -> &[ModelRef] {
        &self.children
    }

    pub fn guard(&self) -> Option<&ModelRef> {
        self.guard.as_ref()
    }

    pub fn label(&self) -> &str {
        self.kind.label()
    }

    /// The node reached by following `position` from this node.
    pub fn find(&self, position: &Position) -> Option<&ModelTask> {
        position
            .moves()
            .iter()
            .try_fold(self, |node, &m| node.children.get(m).map(|c| c.as_ref()))
    }

    /// Visit every node (guards excluded) in depth-first pre-order with its position.
    pub fn walk(&self, mut visit: impl FnMut(&Position, &ModelTask)) {
        fn go(node: &ModelTask, at: &Position, visit: &mut dyn FnMut(&Position, &ModelTask)) {
            visit(at, node);
            for (i, child) in node.children.iter().enumerate() {
                go(child, &at.child(i), visit);
            }
        }
        go(self, &Position::root(), &mut visit);
    }

    /// Number of nodes in the tree, guards excluded.
    pub fn size(&self) -> usize {
        let mut n = 0;
        self.walk(|_, _| n += 1);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_follows_child_indices() {
        let tree = ModelTask::sequence(vec![
            ModelTask::success(),
            ModelTask::selector(vec![ModelTask::failure(), ModelTask::wait(3)]),
        ]);

        let found = tree.find(&Position::from_moves(vec![1, 1])).map(|n| n.label());
        assert_eq!(found, Some("wait"));
        assert!(tree.find(&Position::from_moves(vec![2])).is_none());
        assert_eq!(tree.size(), 5);
    }

    #[test]
    fn guarded_copy_keeps_children() {
        let body = ModelTask::inverter(ModelTask::success());
        let guarded = ModelTask::guarded(&body, ModelTask::failure());
        assert_eq!(guarded.children().len(), 1);
        assert!(guarded.guard().is_some());
        assert!(body.guard().is_none());
    }
}
