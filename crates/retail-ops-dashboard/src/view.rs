//! View state with last-write-wins request ordering.
//!
//! When a view's filters change while a request for the old filters is still
//! running, the old response must not overwrite the new one, whatever order
//! they arrive in. Every request takes a [`Ticket`] from the view's
//! [`RequestGuard`]; only the holder of the latest ticket may publish.

use std::fmt;
use std::future::Future;

use parking_lot::{Mutex, RwLock};

/// Proof of which request a response belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    filter_key: String,
}

impl Ticket {
    /// The filter state the request was issued for.
    #[must_use]
    pub fn filter_key(&self) -> &str {
        &self.filter_key
    }
}

/// Hands out tickets and remembers the latest one.
#[derive(Debug, Default)]
pub struct RequestGuard {
    current: Mutex<Option<Ticket>>,
}

impl RequestGuard {
    /// Create a guard with no request issued yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a request made with `filter_key`, superseding every
    /// earlier ticket.
    pub fn begin(&self, filter_key: impl Into<String>) -> Ticket {
        let mut current = self.current.lock();
        let seq = current.as_ref().map_or(0, |t| t.seq + 1);
        let ticket = Ticket {
            seq,
            filter_key: filter_key.into(),
        };
        *current = Some(ticket.clone());
        ticket
    }

    /// Check whether `ticket` is still the latest.
    #[must_use]
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.current.lock().as_ref() == Some(ticket)
    }
}

/// What a view renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState<T> {
    /// A request is in flight. `stale` holds the previous data, if any.
    Loading {
        /// Data from the previous successful request.
        stale: Option<T>,
    },
    /// The request succeeded with data to show.
    Ready(T),
    /// The request succeeded but nothing matched.
    Empty,
    /// The request failed.
    Error(String),
}

impl<T> ViewState<T> {
    /// Data available for display, fresh or stale.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Ready(data) | Self::Loading { stale: Some(data) } => Some(data),
            _ => None,
        }
    }

    /// Check if a request is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

/// State of one view, guarded against out-of-order responses.
pub struct ViewModel<T> {
    guard: RequestGuard,
    state: RwLock<ViewState<T>>,
    is_empty: fn(&T) -> bool,
}

impl<T: fmt::Debug> fmt::Debug for ViewModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("guard", &self.guard)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl<U: Clone> Default for ViewModel<Vec<U>> {
    fn default() -> Self {
        Self::new(Vec::is_empty)
    }
}

impl<T: Clone> ViewModel<T> {
    /// Create a view. `is_empty` decides when a successful result renders as
    /// [`ViewState::Empty`].
    #[must_use]
    pub fn new(is_empty: fn(&T) -> bool) -> Self {
        Self {
            guard: RequestGuard::new(),
            state: RwLock::new(ViewState::Loading { stale: None }),
            is_empty,
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> ViewState<T> {
        self.state.read().clone()
    }

    /// Start a request for `filter_key`. The view switches to loading and
    /// keeps its previous data as stale.
    pub fn begin(&self, filter_key: impl Into<String>) -> Ticket {
        let ticket = self.guard.begin(filter_key);
        let mut state = self.state.write();
        let stale = state.data().cloned();
        *state = ViewState::Loading { stale };
        ticket
    }

    /// Publish the outcome of the request holding `ticket`.
    ///
    /// Returns `false` and leaves the state untouched if a newer request has
    /// been started since.
    pub fn apply<E: fmt::Display>(&self, ticket: &Ticket, result: Result<T, E>) -> bool {
        if !self.guard.is_current(ticket) {
            tracing::debug!(filter = %ticket.filter_key, "Ignoring superseded response");
            return false;
        }

        let next = match result {
            Ok(data) if (self.is_empty)(&data) => ViewState::Empty,
            Ok(data) => ViewState::Ready(data),
            Err(err) => ViewState::Error(err.to_string()),
        };
        *self.state.write() = next;
        true
    }

    /// Run `request` for `filter_key` and publish its outcome if it is still
    /// the latest when it completes.
    pub async fn load<Fut, E>(&self, filter_key: impl Into<String>, request: Fut) -> bool
    where
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let ticket = self.begin(filter_key);
        let result = request.await;
        self.apply(&ticket, result)
    }
}
