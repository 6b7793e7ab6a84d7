//! Server-issued session identity.

/// Session id and value in effect when a request was dispatched.
///
/// Hand the ticket back to [`SessionState::update_from`] when the response
/// arrives so a reset that happened in between is respected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    id: Option<String>,
    generation: u64,
}

impl SessionTicket {
    /// The session id the request was sent with.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Current conversation session.
///
/// The id is `None` until the server hands one out and is reused on every
/// request after that, until [`SessionState::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    id: Option<String>,
    generation: u64,
}

impl SessionState {
    /// Creates a state with no session.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current session id, if any.
    pub fn current(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Adopts `id` when it is non-empty; otherwise keeps the current id.
    pub fn update(&mut self, id: Option<&str>) {
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            self.id = Some(id.to_string());
        }
    }

    /// Captures the session id and generation for an outgoing request.
    pub fn ticket(&self) -> SessionTicket {
        SessionTicket {
            id: self.id.clone(),
            generation: self.generation,
        }
    }

    /// Returns true if no reset happened since `ticket` was taken.
    pub fn is_current(&self, ticket: &SessionTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Like [`SessionState::update`], but only if no reset happened since
    /// `ticket` was taken.  Returns whether the update was applied.
    pub fn update_from(&mut self, ticket: &SessionTicket, id: Option<&str>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                stale = ?id,
                "discarding session id from a request sent before the session was reset"
            );
            return false;
        }
        self.update(id);
        true
    }

    /// Forgets the current session.
    pub fn reset(&mut self) {
        self.id = None;
        self.generation = self.generation.wrapping_add(1);
    }
}
