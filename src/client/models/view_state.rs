/// Lifecycle of one remotely loaded section of a view.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Errored(String),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            ViewState::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn loaded_mut(&mut self) -> Option<&mut T> {
        match self {
            ViewState::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Errored(e) => Some(e),
            _ => None,
        }
    }
}

/// Identifies one load attempt: its sequence number within the view and the
/// session generation it was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    generation: u64,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Applied,
    /// A newer load was started after this one; the response was dropped.
    Superseded,
    /// The session changed identity while the request was in flight; the response
    /// was dropped and the section cleared.
    SessionChanged,
}

/// A `ViewState` that only accepts the response of its latest request.
#[derive(Debug, Clone)]
pub struct Loadable<T> {
    state: ViewState<T>,
    seq: u64,
    refreshing: bool,
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self { state: ViewState::Idle, seq: 0, refreshing: false }
    }
}

impl<T> Loadable<T> {
    pub fn state(&self) -> &ViewState<T> {
        &self.state
    }

    pub fn value(&self) -> Option<&T> {
        self.state.loaded()
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        self.state.loaded_mut()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Starts a load. Already loaded data stays visible while a refresh runs.
    pub fn begin(&mut self, generation: u64) -> Ticket {
        self.seq += 1;
        if matches!(self.state, ViewState::Loaded(_)) {
            self.refreshing = true;
        } else {
            self.state = ViewState::Loading;
        }
        Ticket { seq: self.seq, generation }
    }

    pub fn complete(&mut self, ticket: Ticket, current_generation: u64, result: Result<T, String>) -> Settled {
        if ticket.seq != self.seq {
            return Settled::Superseded;
        }
        if ticket.generation != current_generation {
            self.reset();
            return Settled::SessionChanged;
        }
        self.refreshing = false;
        self.state = match result {
            Ok(v) => ViewState::Loaded(v),
            Err(e) => ViewState::Errored(e),
        };
        Settled::Applied
    }

    /// Forgets everything and invalidates any request still in flight.
    pub fn reset(&mut self) {
        self.seq += 1;
        self.refreshing = false;
        self.state = ViewState::Idle;
    }
}
