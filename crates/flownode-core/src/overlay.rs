//! Which hover overlay is visible.
//!
//! At most one node overlay is shown at a time across a diagram. The
//! [`OverlayRegister`] owns the active overlay id and broadcasts changes;
//! each node holds an [`OverlayHandle`] for its own id and derives its
//! visibility as `active == my id`. The register is created by the host
//! and handed to every node, so separate diagrams (and tests) get
//! separate registers.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Listener = Rc<dyn Fn(Option<&str>)>;

#[derive(Default)]
struct Inner {
    active: Option<String>,
    listeners: Vec<(u64, Listener)>,
    next_listener: u64,
}

/// Shared owner of the active overlay id. Clones share state.
#[derive(Clone, Default)]
pub struct OverlayRegister {
    inner: Rc<RefCell<Inner>>,
}

impl fmt::Debug for OverlayRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("OverlayRegister")
            .field("active", &inner.active)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl OverlayRegister {
    /// An empty register with no active overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the visible overlay.
    #[must_use]
    pub fn active(&self) -> Option<String> {
        self.inner.borrow().active.clone()
    }

    /// Whether `id` is the visible overlay.
    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.inner.borrow().active.as_deref() == Some(id)
    }

    /// Make `id` the visible overlay, hiding any other.
    pub fn activate(&self, id: impl Into<String>) {
        self.set(Some(id.into()));
    }

    /// Hide `id` if it is the visible overlay; otherwise do nothing.
    pub fn deactivate(&self, id: &str) {
        if self.is_active(id) {
            self.set(None);
        }
    }

    /// Hide whatever overlay is visible.
    pub fn clear(&self) {
        self.set(None);
    }

    /// Call `listener` with the new active id after every change.
    ///
    /// The listener stays registered until the returned [`Subscription`]
    /// is dropped.
    pub fn subscribe(&self, listener: impl Fn(Option<&str>) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.push((id, Rc::new(listener)));
        Subscription {
            register: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Handle bound to one overlay id.
    #[must_use]
    pub fn handle(&self, id: impl Into<String>) -> OverlayHandle {
        OverlayHandle {
            register: self.clone(),
            id: id.into(),
        }
    }

    fn set(&self, next: Option<String>) {
        let listeners: Vec<Listener> = {
            let mut inner = self.inner.borrow_mut();
            if inner.active == next {
                return;
            }
            inner.active.clone_from(&next);
            inner.listeners.iter().map(|(_, l)| Rc::clone(l)).collect()
        };
        log::trace!("active overlay -> {next:?}");
        // No borrow is held here, so listeners may call back into the
        // register or drop their subscription.
        for listener in listeners {
            listener(next.as_deref());
        }
    }
}

/// Keeps a listener registered; unsubscribes on drop.
pub struct Subscription {
    register: Weak<RefCell<Inner>>,
    id: u64,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.register.upgrade()
            && let Ok(mut inner) = inner.try_borrow_mut()
        {
            inner.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

/// One node's view of the [`OverlayRegister`].
#[derive(Debug, Clone)]
pub struct OverlayHandle {
    register: OverlayRegister,
    id: String,
}

impl OverlayHandle {
    /// This handle's overlay id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Show this overlay (hiding any other).
    pub fn show(&self) {
        self.register.activate(self.id.as_str());
    }

    /// Hide this overlay if it is the one showing.
    pub fn hide(&self) {
        self.register.deactivate(&self.id);
    }

    /// Whether this overlay is the one showing.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.register.is_active(&self.id)
    }

    /// Call `listener` whenever this overlay's visibility flips.
    pub fn subscribe(&self, listener: impl Fn(bool) + 'static) -> Subscription {
        let id = self.id.clone();
        let last = Cell::new(self.is_visible());
        self.register.subscribe(move |active| {
            let visible = active == Some(id.as_str());
            if last.replace(visible) != visible {
                listener(visible);
            }
        })
    }
}
