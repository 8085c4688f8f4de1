use std::cell::RefCell;
use std::rc::Rc;

use crate::state::{Inner, Reaction, Settler, State, Status};
use crate::timer::Timer;

/// A deferred value: the eventual result of an operation that has not yet
/// completed.
///
/// A promise settles exactly once, to fulfilled or rejected, and never
/// changes again. Cloning yields another handle to the same underlying
/// cell; [`Promise::then`] and friends derive new, distinct promises.
///
/// `T` and `E` are `Clone` because every registered continuation and every
/// [`Waiter`](crate::Waiter) receives its own copy of the settled payload.
pub struct Promise<T, E> {
    pub(crate) inner: Rc<RefCell<Inner<T, E>>>,
    pub(crate) timer: Timer,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            timer: self.timer.clone(),
        }
    }
}

/// What a handler produced: a plain value, a further promise whose outcome
/// should be adopted, or a fault that rejects the derived promise.
pub enum Step<T, E> {
    Value(T),
    Chain(Promise<T, E>),
    Fault(E),
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Creates a pending promise together with its settle handle.
    pub fn parts(timer: &Timer) -> (Self, Settler<T, E>) {
        let inner = Rc::new(RefCell::new(Inner::new()));
        let promise = Promise {
            inner: inner.clone(),
            timer: timer.clone(),
        };
        let settler = Settler::new(inner, timer.clone());
        (promise, settler)
    }

    /// Creates a promise and synchronously runs `executor` with its settle
    /// handle. An `Err` return rejects the promise, unless the executor
    /// already settled it.
    pub fn new<X>(timer: &Timer, executor: X) -> Self
    where
        X: FnOnce(Settler<T, E>) -> Result<(), E>,
    {
        let (promise, settler) = Self::parts(timer);
        if let Err(reason) = executor(settler.clone()) {
            settler.reject(reason);
        }
        promise
    }

    /// Current lifecycle stage.
    pub fn status(&self) -> Status {
        self.inner.borrow().state.status()
    }

    /// Registers a fulfillment handler and returns the derived promise.
    /// Rejections propagate to the derived promise unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use deferral::{Promise, Reason, Step, Timer};
    /// use std::{cell::RefCell, rc::Rc};
    ///
    /// let timer = Timer::new();
    /// let seen = Rc::new(RefCell::new(Vec::new()));
    /// let log = seen.clone();
    /// Promise::<i32, Reason>::resolve(&timer, Step::Value(2))
    ///     .then(|n| Step::Value(n * 10))
    ///     .then(move |n| {
    ///         log.borrow_mut().push(n);
    ///         Step::Value(n)
    ///     });
    /// timer.run();
    /// assert_eq!(*seen.borrow(), vec![20]);
    /// ```
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Step<U, E> + 'static,
    {
        self.then_catch(on_fulfilled, Step::Fault)
    }

    /// Registers both handlers and returns a distinct derived promise.
    ///
    /// Once the receiver settles, the matching handler runs asynchronously
    /// with the settled payload, and the handler's [`Step`] drives the
    /// derived promise: a value fulfills it, a fault rejects it, and a
    /// chained promise hands its eventual outcome over.
    pub fn then_catch<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Step<U, E> + 'static,
        R: FnOnce(E) -> Step<U, E> + 'static,
    {
        let (derived, settler) = Promise::parts(&self.timer);
        let on_fault = settler.clone();
        self.register(Reaction {
            on_fulfilled: Box::new(move |value| follow(settler, on_fulfilled(value))),
            on_rejected: Box::new(move |reason| follow(on_fault, on_rejected(reason))),
        });
        derived
    }

    /// Registers a rejection handler; fulfillment passes through unchanged.
    /// Recovery produces the same value type as the receiver.
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Step<T, E> + 'static,
    {
        self.then_catch(Step::Value, on_rejected)
    }

    /// Queues `reaction` while pending; otherwise defers its matching
    /// branch onto the timer. Either way no handler runs inside the call
    /// that registered it.
    fn register(&self, reaction: Reaction<T, E>) {
        let mut inner = self.inner.borrow_mut();
        match &mut inner.state {
            State::Pending(queue) => queue.push(reaction),
            State::Fulfilled(value) => {
                let value = value.clone();
                self.timer.defer(move || (reaction.on_fulfilled)(value));
            }
            State::Rejected(reason) => {
                let reason = reason.clone();
                self.timer.defer(move || (reaction.on_rejected)(reason));
            }
        }
    }
}

/// Drives a derived promise from a handler's [`Step`]: fulfill with the
/// value, reject with the fault, or adopt a chained promise's eventual
/// outcome by attaching the settle calls as its continuations.
pub(crate) fn follow<T, E>(settler: Settler<T, E>, step: Step<T, E>)
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    match step {
        Step::Value(value) => settler.resolve(value),
        Step::Fault(reason) => settler.reject(reason),
        Step::Chain(promise) => {
            let on_fault = settler.clone();
            promise.then_catch(
                move |value| {
                    settler.resolve(value);
                    Step::Value(())
                },
                move |reason| {
                    on_fault.reject(reason);
                    Step::Value(())
                },
            );
        }
    }
}
