//! Non-owning back-reference from a plugin instance to its metadata record.
//!
//! A [`PluginInfo`](super::info::PluginInfo) may hold a strong reference to
//! the editor plugin it loaded, so the plugin only keeps a [`Weak`] one. Once
//! the record is dropped the link reads as empty.

use std::fmt;
use std::sync::{Arc, Weak};

/// Weak, auto-clearing link to at most one live `T`
pub struct WeakLink<T> {
    target: Option<Weak<T>>,
}

impl<T> WeakLink<T> {
    pub const fn empty() -> Self {
        Self { target: None }
    }

    /// Current target, or `None` if unset or already destroyed
    pub fn get(&self) -> Option<Arc<T>> {
        self.target.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_linked_to(&self, target: &Arc<T>) -> bool {
        self.target
            .as_ref()
            .is_some_and(|weak| weak.ptr_eq(&Arc::downgrade(target)))
    }

    /// Replace the link. Returns `false` if `target` was already linked.
    pub fn set(&mut self, target: Option<&Arc<T>>) -> bool {
        match target {
            Some(target) if self.is_linked_to(target) => false,
            Some(target) => {
                self.target = Some(Arc::downgrade(target));
                true
            }
            None if self.get().is_none() => {
                self.target = None;
                false
            }
            None => {
                self.target = None;
                true
            }
        }
    }
}

impl<T> Default for WeakLink<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for WeakLink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.target {
            None => "empty",
            Some(weak) if weak.strong_count() == 0 => "cleared",
            Some(_) => "linked",
        };
        f.debug_struct("WeakLink").field("state", &state).finish()
    }
}
