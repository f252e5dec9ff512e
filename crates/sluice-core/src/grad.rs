// Gradient tracking state: scoped enable/disable
//
// Every transform stage runs its kernel with gradient tracking forced to the
// stage's own setting and must hand the caller's state back afterwards, no
// matter how the kernel exits. Instead of an ambient thread-local flag, the
// state lives in an explicit value (anything implementing `GradState`) and is
// flipped through a guard:
//
//   let mut scope = GradGuard::new(&mut ctx, false);
//   kernel(&mut scope)?;      // ctx.grad_enabled() == false in here
//   drop(scope);              // previous state restored, also on `?` or panic
//
// The guard derefs to the wrapped state, so code inside the scope keeps using
// the same context object it was handed.

use std::ops::{Deref, DerefMut};

/// Something that carries a gradient-tracking flag.
pub trait GradState {
    /// Whether operations should currently record gradients.
    fn grad_enabled(&self) -> bool;

    /// Overwrite the flag.
    fn set_grad_enabled(&mut self, enabled: bool);
}

/// Bare gradient-tracking flag, usable on its own when no richer context is
/// around. Defaults to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradMode {
    enabled: bool,
}

impl GradMode {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Default for GradMode {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl GradState for GradMode {
    fn grad_enabled(&self) -> bool {
        self.enabled
    }

    fn set_grad_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Forces a gradient state for its lifetime and restores the previous one on drop.
pub struct GradGuard<'a, S: GradState + ?Sized> {
    state: &'a mut S,
    prev: bool,
}

impl<'a, S: GradState + ?Sized> GradGuard<'a, S> {
    pub fn new(state: &'a mut S, enabled: bool) -> Self {
        let prev = state.grad_enabled();
        state.set_grad_enabled(enabled);
        Self { state, prev }
    }

    /// The state that will be restored when the guard drops.
    pub fn previous(&self) -> bool {
        self.prev
    }
}

impl<S: GradState + ?Sized> Deref for GradGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.state
    }
}

impl<S: GradState + ?Sized> DerefMut for GradGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.state
    }
}

impl<S: GradState + ?Sized> Drop for GradGuard<'_, S> {
    fn drop(&mut self) {
        self.state.set_grad_enabled(self.prev);
    }
}

/// Run `f` with gradient tracking forced to `enabled`, restoring the caller's
/// state on every exit path.
pub fn with_grad_enabled<S, F, T>(state: &mut S, enabled: bool, f: F) -> T
where
    S: GradState + ?Sized,
    F: FnOnce(&mut S) -> T,
{
    let mut guard = GradGuard::new(state, enabled);
    f(&mut *guard)
}
