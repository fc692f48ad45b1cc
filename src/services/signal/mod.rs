// Signal module
// Single-threaded multicast value with replay of the latest value

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

type Observer<T> = Rc<dyn Fn(&T)>;

/// Maps subscription id to handler; ids are handed out in order so
/// observers run in subscription order.
struct SignalInner<T> {
    value: Option<T>,
    next_id: u64,
    observers: BTreeMap<u64, Observer<T>>,
}

/// A value that changes over time and notifies every observer.
///
/// New subscribers immediately receive the latest value. Dropping a
/// [`Subscription`] only detaches that observer.
pub struct Signal<T> {
    inner: Rc<RefCell<SignalInner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                value: None,
                next_id: 0,
                observers: BTreeMap::new(),
            })),
        }
    }

    pub fn with_value(value: T) -> Self {
        let signal = Self::new();
        signal.inner.borrow_mut().value = Some(value);
        signal
    }

    pub fn get(&self) -> Option<T> {
        self.inner.borrow().value.clone()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Stores `value` and notifies observers. Observers may publish or
    /// subscribe re-entrantly; no borrow is held while they run.
    pub fn publish(&self, value: T) {
        let observers: Vec<(u64, Observer<T>)> = {
            let mut inner = self.inner.borrow_mut();
            inner.value = Some(value.clone());
            inner
                .observers
                .iter()
                .map(|(id, observer)| (*id, observer.clone()))
                .collect()
        };
        for (id, observer) in observers {
            // Skip observers detached by an earlier observer in this round.
            let attached = self.inner.borrow().observers.contains_key(&id);
            if attached {
                observer(&value);
            }
        }
    }

    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        let observer: Observer<T> = Rc::new(observer);
        let (id, current) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.insert(id, observer.clone());
            (id, inner.value.clone())
        };
        if let Some(value) = current {
            observer(&value);
        }

        let weak: Weak<RefCell<SignalInner<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let removed = inner.borrow_mut().observers.remove(&id);
                    drop(removed);
                }
            })),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Publishes only when `value` differs from the current one.
    pub fn publish_if_changed(&self, value: T) -> bool {
        let changed = self.inner.borrow().value.as_ref() != Some(&value);
        if changed {
            self.publish(value);
        }
        changed
    }
}

/// Observer registration; dropping it detaches the observer.
#[must_use = "dropping a Subscription detaches its observer"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}
