use bt_core::{ModelRef, ParallelPolicy, Result, Status};

use crate::arena::TaskId;
use crate::executor::{BtExecutor, TaskList};
use crate::task::Behaviour;

/// Runs every child at once and combines their results per [`ParallelPolicy`].
pub(crate) struct ParallelTask {
    policy: ParallelPolicy,
    children: Vec<ModelRef>,
    spawned: Vec<TaskId>,
}

impl ParallelTask {
    pub fn new(policy: ParallelPolicy, children: Vec<ModelRef>) -> Self {
        Self {
            policy,
            children,
            spawned: Vec::new(),
        }
    }

    /// Status that ends the parallel as soon as one child reaches it.
    fn decisive(&self) -> Status {
        match self.policy {
            ParallelPolicy::Sequence => Status::Failure,
            ParallelPolicy::Selector => Status::Success,
        }
    }

    fn terminate_all(&self, exec: &mut BtExecutor) -> Result<()> {
        for &child in &self.spawned {
            if exec.task(child).is_some() {
                exec.terminate_task(child)?;
            }
        }
        Ok(())
    }
}

impl Behaviour for ParallelTask {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        if self.children.is_empty() {
            exec.request_insertion_into_list(TaskList::Tickable, me);
            return Ok(());
        }
        for (index, model) in self.children.iter().enumerate() {
            let child = exec.spawn_child(me, model.clone(), index)?;
            self.spawned.push(child);
        }
        Ok(())
    }

    fn tick(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<Status> {
        let decisive = self.decisive();
        let mut running = false;
        for &child in &self.spawned {
            let status = match exec.status_of(child) {
                Status::Terminated => Status::Failure,
                Status::Uninitialized => Status::Running,
                other => other,
            };
            if status == decisive {
                self.terminate_all(exec)?;
                return Ok(decisive);
            }
            running |= status == Status::Running;
        }

        if running {
            Ok(Status::Running)
        } else {
            // Every child finished with the non-decisive status (or there were none).
            Ok(decisive.inverted())
        }
    }

    fn terminate(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        self.terminate_all(exec)
    }
}
