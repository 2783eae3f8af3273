//! Per-instance serialization locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use crate::component::ComponentRef;

/// Async lock per component instance.
///
/// Exactly one command may be mid-flight for a given instance; commands for
/// different instances proceed independently. The workflow engine releases
/// its guard across step-call awaits, so the guard type is owned rather than
/// borrowed.
#[derive(Debug, Default)]
pub(crate) struct LockMap {
    inner: Mutex<HashMap<ComponentRef, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one instance, creating it on first use.
    pub(crate) async fn acquire(&self, component: &ComponentRef) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("lock map poisoned");
            Arc::clone(map.entry(component.clone()).or_default())
        };
        lock.lock_owned().await
    }
}
