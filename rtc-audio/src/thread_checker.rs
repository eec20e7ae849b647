use std::thread::{self, ThreadId};

/// Remembers the thread an object was created on.
///
/// Used with `debug_assert!` on entry points that are only safe when
/// serialized on the owning thread.
#[derive(Debug)]
pub(crate) struct ThreadChecker {
    owner: ThreadId,
}

impl ThreadChecker {
    pub(crate) fn new() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub(crate) fn called_on_valid_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}
