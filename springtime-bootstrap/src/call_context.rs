//! Logical call context - named data slots which follow a logical flow of execution rather than a
//! single thread.
//!
//! Inside a [scope] (or [sync_scope]) the slots are local to the task, so they survive `.await`
//! points even when the task moves between threads. A new scope starts with a copy of the slots
//! visible to its creator, which makes data set by a caller visible to the callee, but not the other
//! way around. Outside any scope, slots are local to the current thread.
//!
//! Spawned tasks do not inherit slots on their own - wrap them in a scope:
//!
//! ```
//! use springtime_bootstrap::call_context;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! call_context::scope(async {
//!     call_context::logical_set_data("tenant", Arc::new("acme".to_string()));
//!
//!     let child = tokio::spawn(call_context::scope(async {
//!         call_context::logical_get_data::<String>("tenant")
//!     }));
//!
//!     assert_eq!(child.await.unwrap().as_deref().map(String::as_str), Some("acme"));
//! })
//! .await;
//! # }
//! ```

use fxhash::FxHashMap;
use std::any::Any;
use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

pub type CallContextDataPtr = Arc<dyn Any + Send + Sync>;

type Slots = FxHashMap<String, CallContextDataPtr>;

tokio::task_local! {
    static TASK_CONTEXT: RefCell<Slots>;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Slots> = RefCell::new(Default::default());
}

fn with_context<R, F: FnOnce(&RefCell<Slots>) -> R>(f: F) -> R {
    if TASK_CONTEXT.try_with(|_| ()).is_ok() {
        TASK_CONTEXT.with(f)
    } else {
        THREAD_CONTEXT.with(f)
    }
}

fn snapshot() -> Slots {
    with_context(|slots| slots.borrow().clone())
}

/// Runs given future in a new call context, initialized with a copy of the current one.
pub fn scope<F: Future>(future: F) -> impl Future<Output = F::Output> {
    TASK_CONTEXT.scope(RefCell::new(snapshot()), future)
}

/// Runs given function in a new call context, initialized with a copy of the current one.
pub fn sync_scope<R, F: FnOnce() -> R>(f: F) -> R {
    TASK_CONTEXT.sync_scope(RefCell::new(snapshot()), f)
}

/// Returns data stored under given name, if present and of type `T`.
pub fn logical_get_data<T: Any + Send + Sync>(name: &str) -> Option<Arc<T>> {
    with_context(|slots| slots.borrow().get(name).cloned())
        .and_then(|data| data.downcast::<T>().ok())
}

/// Stores data under given name, replacing any previous value.
pub fn logical_set_data<T: Any + Send + Sync>(name: &str, data: Arc<T>) {
    with_context(|slots| {
        slots
            .borrow_mut()
            .insert(name.to_string(), data as CallContextDataPtr)
    });
}

/// Removes the slot with given name, returning its previous value.
pub fn free_named_data_slot(name: &str) -> Option<CallContextDataPtr> {
    with_context(|slots| slots.borrow_mut().remove(name))
}
