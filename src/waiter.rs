use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::promise::Promise;
use crate::state::{Inner, State};

/// `Future` view of one promise's settlement.
///
/// Resolves with a clone of the settled outcome. Polling while the promise
/// is still pending parks the task's waker; settlement wakes every parked
/// waker, so any number of waiters may observe the same promise. A promise
/// that is never settled leaves its waiters pending forever — drive the
/// [`Timer`](crate::Timer) before or while awaiting.
pub struct Waiter<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

impl<T, E> Clone for Waiter<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// A `Future` that resolves with this promise's outcome.
    pub fn waiter(&self) -> Waiter<T, E> {
        Waiter {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> Future for Waiter<T, E>
where
    T: Clone,
    E: Clone,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.inner.borrow_mut();
        match &inner.state {
            State::Fulfilled(value) => return Poll::Ready(Ok(value.clone())),
            State::Rejected(reason) => return Poll::Ready(Err(reason.clone())),
            State::Pending(_) => {}
        }
        inner.wakers.push(cx.waker().clone());
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use futures::FutureExt;

    use crate::{Promise, Reason, Step, Timer};

    #[test]
    fn pending_then_ready() {
        let timer = Timer::new();
        let (promise, settler) = Promise::<i32, Reason>::parts(&timer);
        let waiter = promise.waiter();
        assert_eq!(waiter.clone().now_or_never(), None);
        settler.resolve(7);
        assert_eq!(block_on(waiter), Ok(7));
    }

    #[test]
    fn rejection_surfaces_as_err() {
        let timer = Timer::new();
        let promise = Promise::<i32, Reason>::reject(&timer, Reason::from("nope"));
        assert_eq!(block_on(promise.waiter()), Err(Reason::from("nope")));
    }

    #[test]
    fn several_waiters_share_one_outcome() {
        let timer = Timer::new();
        let derived =
            Promise::<i32, Reason>::resolve(&timer, Step::Value(3)).then(|n| Step::Value(n + 1));
        let first = derived.waiter();
        let second = derived.waiter();
        timer.run();
        assert_eq!(block_on(first), Ok(4));
        assert_eq!(block_on(second), Ok(4));
    }
}
