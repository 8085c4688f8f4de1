use std::cell::RefCell;
use std::mem;
use std::rc::Rc;
use std::task::Waker;

use crate::timer::Timer;

/// Externally observable lifecycle stage of a promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Fulfilled,
    Rejected,
}

/// A queued continuation pair. Exactly one branch runs, after settlement.
pub(crate) struct Reaction<T, E> {
    pub(crate) on_fulfilled: Box<dyn FnOnce(T)>,
    pub(crate) on_rejected: Box<dyn FnOnce(E)>,
}

pub(crate) enum State<T, E> {
    Pending(Vec<Reaction<T, E>>),
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> State<T, E> {
    pub(crate) fn status(&self) -> Status {
        match self {
            State::Pending(_) => Status::Pending,
            State::Fulfilled(_) => Status::Fulfilled,
            State::Rejected(_) => Status::Rejected,
        }
    }
}

pub(crate) struct Inner<T, E> {
    pub(crate) state: State<T, E>,
    pub(crate) wakers: Vec<Waker>,
}

impl<T, E> Inner<T, E> {
    pub(crate) fn new() -> Self {
        Inner {
            state: State::Pending(Vec::new()),
            wakers: Vec::new(),
        }
    }
}

/// Settle handle for one promise.
///
/// Cloneable; the first `resolve` or `reject` across all clones wins and
/// every later call is a no-op. Settling is the only way a promise leaves
/// the pending state.
pub struct Settler<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
    timer: Timer,
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            timer: self.timer.clone(),
        }
    }
}

impl<T, E> Settler<T, E> {
    pub(crate) fn new(inner: Rc<RefCell<Inner<T, E>>>, timer: Timer) -> Self {
        Self { inner, timer }
    }
}

impl<T, E> Settler<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Settles the promise as fulfilled with `value`.
    pub fn resolve(&self, value: T) {
        self.settle(Ok(value));
    }

    /// Settles the promise as rejected with `reason`.
    pub fn reject(&self, reason: E) {
        self.settle(Err(reason));
    }

    fn settle(&self, outcome: Result<T, E>) {
        let reactions = {
            let mut inner = self.inner.borrow_mut();
            let reactions = match &mut inner.state {
                State::Pending(queue) => mem::take(queue),
                _ => return,
            };
            inner.state = match &outcome {
                Ok(value) => State::Fulfilled(value.clone()),
                Err(reason) => State::Rejected(reason.clone()),
            };
            for waker in inner.wakers.drain(..) {
                waker.wake();
            }
            reactions
        };
        if reactions.is_empty() {
            return;
        }
        // A single flush task per settlement keeps per-promise FIFO order.
        self.timer.defer(move || {
            for reaction in reactions {
                match &outcome {
                    Ok(value) => (reaction.on_fulfilled)(value.clone()),
                    Err(reason) => (reaction.on_rejected)(reason.clone()),
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::{Promise, Reason, Status, Step, Timer};

    #[test]
    fn first_settlement_wins() {
        let timer = Timer::new();
        let (promise, settler) = Promise::<i32, Reason>::parts(&timer);
        settler.resolve(1);
        settler.reject(Reason::from("late"));
        settler.resolve(2);
        assert_eq!(promise.status(), Status::Fulfilled);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        promise.then(move |value| {
            log.borrow_mut().push(value);
            Step::Value(value)
        });
        timer.run();
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn settlement_is_visible_synchronously() {
        let timer = Timer::new();
        let (promise, settler) = Promise::<&'static str, Reason>::parts(&timer);
        assert_eq!(promise.status(), Status::Pending);
        settler.reject(Reason::from("nope"));
        assert_eq!(promise.status(), Status::Rejected);
    }

    #[test]
    fn every_clone_of_a_settler_hits_the_same_cell() {
        let timer = Timer::new();
        let (promise, settler) = Promise::<i32, Reason>::parts(&timer);
        let other = settler.clone();
        other.resolve(7);
        settler.resolve(8);
        assert_eq!(promise.status(), Status::Fulfilled);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        promise.then(move |value| {
            log.borrow_mut().push(value);
            Step::Value(value)
        });
        timer.run();
        assert_eq!(*seen.borrow(), vec![7]);
    }
}
