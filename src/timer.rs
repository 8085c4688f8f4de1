use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce()>;

/// Cloneable handle over a single-threaded deferred task queue.
///
/// Every continuation in this crate is dispatched through a `Timer` instead
/// of being invoked inline, which is what keeps handler invocation
/// asynchronous relative to the call that registered it. Tasks run in due
/// order, ties broken by insertion order.
///
/// Dispatch granularity is this queue, a coarse macrotask approximation
/// rather than a zero-latency microtask queue, so cross-promise interleaving
/// follows queue order.
pub struct Timer {
    queue: Rc<RefCell<Queue>>,
}

struct Queue {
    entries: BinaryHeap<Reverse<Entry>>,
    seq: u64,
}

struct Entry {
    due: Instant,
    seq: u64,
    task: Task,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

impl Clone for Timer {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

enum Pace {
    Dispatch(Task),
    Sleep(Duration),
    Done,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            queue: Rc::new(RefCell::new(Queue {
                entries: BinaryHeap::new(),
                seq: 0,
            })),
        }
    }

    /// Schedules `task` at zero delay.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.defer_after(Duration::ZERO, task);
    }

    /// Schedules `task` to run once at least `delay` has elapsed.
    pub fn defer_after(&self, delay: Duration, task: impl FnOnce() + 'static) {
        let mut queue = self.queue.borrow_mut();
        let seq = queue.seq;
        queue.seq += 1;
        queue.entries.push(Reverse(Entry {
            due: Instant::now() + delay,
            seq,
            task: Box::new(task),
        }));
    }

    /// True when no task is scheduled.
    pub fn is_idle(&self) -> bool {
        self.queue.borrow().entries.is_empty()
    }

    /// The dispatch loop: runs every scheduled task in due order, sleeping
    /// until the next deadline, and returns once the queue is empty. Tasks
    /// may schedule further tasks.
    pub fn run(&self) {
        loop {
            let pace = {
                let mut queue = self.queue.borrow_mut();
                match queue.entries.pop() {
                    None => Pace::Done,
                    Some(Reverse(entry)) => {
                        let now = Instant::now();
                        if entry.due <= now {
                            Pace::Dispatch(entry.task)
                        } else {
                            let wait = entry.due - now;
                            queue.entries.push(Reverse(entry));
                            Pace::Sleep(wait)
                        }
                    }
                }
            };
            match pace {
                Pace::Dispatch(task) => task(),
                Pace::Sleep(wait) => thread::sleep(wait),
                Pace::Done => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_tasks_run_in_insertion_order() {
        let timer = Timer::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for n in 0..4 {
            let log = seen.clone();
            timer.defer(move || log.borrow_mut().push(n));
        }
        timer.run();
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn delayed_tasks_run_in_due_order() {
        let timer = Timer::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let late = seen.clone();
        timer.defer_after(Duration::from_millis(30), move || {
            late.borrow_mut().push("late")
        });
        let early = seen.clone();
        timer.defer_after(Duration::from_millis(5), move || {
            early.borrow_mut().push("early")
        });
        timer.run();
        assert_eq!(*seen.borrow(), vec!["early", "late"]);
    }

    #[test]
    fn tasks_may_schedule_further_tasks() {
        let timer = Timer::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let outer = seen.clone();
        let again = timer.clone();
        timer.defer(move || {
            outer.borrow_mut().push(1);
            let inner = outer.clone();
            again.defer(move || inner.borrow_mut().push(2));
        });
        timer.run();
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert!(timer.is_idle());
    }
}
