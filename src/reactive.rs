use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SignalInner<T> {
    value: RwLock<T>,
    observers: Mutex<BTreeMap<u64, Observer<T>>>,
    next_observer: AtomicU64,
}

/// Observable value cell. Writers replace the whole value; observers run once
/// per effective change, after the write lock is released.
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                value: RwLock::new(value),
                observers: Mutex::new(BTreeMap::new()),
                next_observer: AtomicU64::new(1),
            }),
        }
    }

    pub fn get(&self) -> T {
        match self.inner.value.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.inner.value.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// Replaces the value and notifies observers when it changed.
    /// Returns whether a notification happened.
    pub fn set(&self, next: T) -> bool {
        {
            let mut value = match self.inner.value.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if *value == next {
                return false;
            }
            *value = next.clone();
        }
        let observers = self.observers().values().cloned().collect::<Vec<_>>();
        for observer in observers {
            observer(&next);
        }
        true
    }

    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_observer.fetch_add(1, Ordering::SeqCst);
        self.observers().insert(id, Arc::new(observer));
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut observers = match inner.observers.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                observers.remove(&id);
            }
        })
    }

    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    fn observers(&self) -> MutexGuard<'_, BTreeMap<u64, Observer<T>>> {
        match self.inner.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Read-only view handed to the UI layer.
pub struct ReadSignal<T> {
    signal: Signal<T>,
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> ReadSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn get(&self) -> T {
        self.signal.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.signal.subscribe(observer)
    }
}

/// Releases a listener when dropped.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    /// Keeps the listener alive for the rest of the program.
    pub fn detach(mut self) {
        self.release = None;
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Owner of subscriptions tied to a UI lifetime, e.g. one component mount.
#[derive(Default)]
pub struct WatchScope {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl WatchScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adopt(&self, subscription: Subscription) {
        self.subscriptions().push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases everything adopted so far. The scope stays usable.
    pub fn dispose(&self) {
        let drained = std::mem::take(&mut *self.subscriptions());
        drop(drained);
    }

    fn subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        match self.subscriptions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for WatchScope {
    fn drop(&mut self) {
        self.dispose();
    }
}
