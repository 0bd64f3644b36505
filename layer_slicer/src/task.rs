/// Cooperative unit of work that is polled once per tick (a frame, a loop
/// iteration) until it reports completion.
pub trait Task {
    /// Does one step of work. Returns true once the task has completed.
    fn poll(&mut self) -> bool;
}

/// Polls a set of tasks, dropping each once it completes.
#[derive(Default)]
pub struct TaskManager {
    tasks: Vec<Box<dyn Task>>,
}

impl TaskManager {
    pub fn add(&mut self, task: impl Task + 'static) {
        self.tasks.push(Box::new(task));
    }

    /// Polls every task once, in the order they were added.
    pub fn tick(&mut self) {
        self.tasks.retain_mut(|task| !task.poll());
    }

    /// Ticks until no tasks are left, returning the number of ticks.
    pub fn run_until_idle(&mut self) -> usize {
        let mut ticks = 0;
        while !self.tasks.is_empty() {
            self.tick();
            ticks += 1;
        }

        ticks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    struct Countdown {
        left: u32,
        log: Rc<RefCell<Vec<&'static str>>>,
        name: &'static str,
    }

    impl Task for Countdown {
        fn poll(&mut self) -> bool {
            self.log.borrow_mut().push(self.name);
            self.left -= 1;
            self.left == 0
        }
    }

    #[test]
    fn polls_in_order_until_done() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tasks = TaskManager::default();
        tasks.add(Countdown {
            left: 2,
            log: log.clone(),
            name: "a",
        });
        tasks.add(Countdown {
            left: 1,
            log: log.clone(),
            name: "b",
        });

        tasks.tick();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks.run_until_idle(), 1);
        assert!(tasks.is_empty());
        assert_eq!(*log.borrow(), ["a", "b", "a"]);
    }
}
