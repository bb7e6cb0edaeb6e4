//! Per-thread registry of live contexts
//!
//! Maps an opaque [`ContextHandle`] to the [`DeviceState`] owned by that
//! context. Entries are added by [`Context::new`](super::Context::new) and
//! removed when the context is dropped. Graphics contexts are bound to the
//! thread that created them, so the map is thread-local.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::state::DeviceState;

/// Shared handle to a context's cached state
pub type SharedState = Rc<RefCell<DeviceState>>;

/// Opaque identifier of a device context (typically the window it renders to)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

impl ContextHandle {
    /// Allocate a handle not returned before in this process
    pub fn unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

thread_local! {
    static STATES: RefCell<HashMap<ContextHandle, SharedState>> = RefCell::new(HashMap::new());
}

/// Register the state of a context, replacing any previous entry for `handle`
pub fn register(handle: ContextHandle, state: SharedState) {
    STATES.with(|states| {
        if states.borrow_mut().insert(handle, state).is_some() {
            log::debug!("context {:?} registered twice, replacing previous state", handle);
        }
    });
}

/// Remove the entry for `handle`
pub fn unregister(handle: ContextHandle) {
    STATES.with(|states| {
        states.borrow_mut().remove(&handle);
    });
}

/// Whether `handle` has a registered state
pub fn has_state(handle: ContextHandle) -> bool {
    STATES.with(|states| states.borrow().contains_key(&handle))
}

/// The state registered for `handle`, or `None`
pub fn get_state(handle: ContextHandle) -> Option<SharedState> {
    STATES.with(|states| states.borrow().get(&handle).cloned())
}
