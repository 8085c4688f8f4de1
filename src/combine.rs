use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::promise::{follow, Promise, Step};
use crate::timer::Timer;

// The combinators are plain clients of the chaining surface: each one is an
// executor plus `then_catch` registrations on its inputs.
impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// An immediately fulfilled promise for [`Step::Value`], an immediately
    /// rejected one for [`Step::Fault`], or one that adopts (flattens) the
    /// chained promise's eventual outcome for [`Step::Chain`].
    pub fn resolve(timer: &Timer, step: Step<T, E>) -> Self {
        Promise::new(timer, |settler| {
            follow(settler, step);
            Ok(())
        })
    }

    /// An immediately rejected promise carrying `reason` exactly as given.
    pub fn reject(timer: &Timer, reason: E) -> Self {
        Promise::new(timer, |settler| {
            settler.reject(reason);
            Ok(())
        })
    }

    /// Fulfills with every input's value, ordered by input position, once
    /// all inputs fulfill. Rejects with the first rejection's reason;
    /// whatever the remaining inputs do afterwards no longer matters. An
    /// empty input fulfills immediately with an empty vec.
    pub fn all(timer: &Timer, items: Vec<Promise<T, E>>) -> Promise<Vec<T>, E> {
        Promise::new(timer, |settler| {
            if items.is_empty() {
                settler.resolve(Vec::new());
                return Ok(());
            }
            let outstanding = Rc::new(Cell::new(items.len()));
            let gathered = Rc::new(RefCell::new(vec![None; items.len()]));
            for (index, item) in items.iter().enumerate() {
                let outstanding = outstanding.clone();
                let gathered = gathered.clone();
                let on_value = settler.clone();
                let on_fault = settler.clone();
                item.then_catch(
                    move |value| {
                        gathered.borrow_mut()[index] = Some(value);
                        outstanding.set(outstanding.get() - 1);
                        if outstanding.get() == 0 {
                            let values = gathered.borrow_mut().drain(..).flatten().collect();
                            on_value.resolve(values);
                        }
                        Step::Value(())
                    },
                    move |reason| {
                        on_fault.reject(reason);
                        Step::Value(())
                    },
                );
            }
            Ok(())
        })
    }

    /// Settles with whichever input settles first, chronologically; every
    /// later settlement loses to the settle-once guard. An empty input
    /// never settles.
    pub fn race(timer: &Timer, items: Vec<Promise<T, E>>) -> Self {
        Promise::new(timer, |settler| {
            for item in &items {
                let on_value = settler.clone();
                let on_fault = settler.clone();
                item.then_catch(
                    move |value| {
                        on_value.resolve(value);
                        Step::Value(())
                    },
                    move |reason| {
                        on_fault.reject(reason);
                        Step::Value(())
                    },
                );
            }
            Ok(())
        })
    }

    /// After `delay`, behaves as [`Promise::resolve`] over `step`.
    pub fn resolve_delay(timer: &Timer, step: Step<T, E>, delay: Duration) -> Self {
        Promise::new(timer, |settler| {
            timer.defer_after(delay, move || follow(settler, step));
            Ok(())
        })
    }

    /// After `delay`, rejects with `reason` exactly as given.
    pub fn reject_delay(timer: &Timer, reason: E, delay: Duration) -> Self {
        Promise::new(timer, |settler| {
            timer.defer_after(delay, move || settler.reject(reason));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::executor::block_on;

    use crate::{Promise, Reason, Status, Step, Timer};

    #[test]
    fn all_gathers_in_input_order() {
        let timer = Timer::new();
        let slow =
            Promise::<i32, Reason>::resolve_delay(&timer, Step::Value(1), Duration::from_millis(40));
        let fast = Promise::resolve_delay(&timer, Step::Value(2), Duration::from_millis(5));
        let both = Promise::all(&timer, vec![slow, fast]);
        let outcome = both.waiter();
        timer.run();
        assert_eq!(block_on(outcome), Ok(vec![1, 2]));
    }

    #[test]
    fn reject_never_adopts_the_reason() {
        let timer = Timer::new();
        let promise = Promise::<i32, Reason>::reject(&timer, Reason::from("verbatim"));
        assert_eq!(promise.status(), Status::Rejected);
        assert_eq!(block_on(promise.waiter()), Err(Reason::from("verbatim")));
    }

    #[test]
    fn race_of_nothing_stays_pending() {
        let timer = Timer::new();
        let promise = Promise::<i32, Reason>::race(&timer, Vec::new());
        timer.run();
        assert_eq!(promise.status(), Status::Pending);
    }
}
