/// Request lifecycle of a network loader
///
/// At most one page request is in flight. A trigger that arrives while a
/// request is pending is remembered once; further triggers coalesce into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightState {
    /// No request in flight
    #[default]
    Idle,
    /// One request in flight
    Pending,
    /// One request in flight and exactly one follow-up remembered
    PendingWithFollowup,
    /// Terminal: nothing is issued or applied anymore
    Cancelled,
}

/// What the loader should do with a `load_next_page` trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    /// Issue a request now
    Issue,
    /// A request is pending; a follow-up was remembered
    Queue,
    /// A follow-up was already remembered; this trigger merges into it
    Coalesce,
    /// Cancelled or nothing left to load
    Ignore,
}

/// What the loader should do once the in-flight request settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleDecision {
    /// Back to idle
    Rest,
    /// A follow-up was remembered; run it as a fresh trigger
    Followup,
    /// The loader was cancelled while the request was in flight
    Discard,
}

impl FlightState {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Pending | Self::PendingWithFollowup)
    }

    pub fn is_cancelled(self) -> bool {
        self == Self::Cancelled
    }

    /// Handle a load trigger. `exhausted` is only consulted when idle, so a
    /// trigger during a request is still remembered and re-evaluated later.
    pub fn on_request(&mut self, exhausted: bool) -> RequestDecision {
        match *self {
            Self::Cancelled => RequestDecision::Ignore,
            Self::Pending => {
                *self = Self::PendingWithFollowup;
                RequestDecision::Queue
            }
            Self::PendingWithFollowup => RequestDecision::Coalesce,
            Self::Idle if exhausted => RequestDecision::Ignore,
            Self::Idle => {
                *self = Self::Pending;
                RequestDecision::Issue
            }
        }
    }

    pub fn on_settled(&mut self) -> SettleDecision {
        match *self {
            Self::Cancelled => SettleDecision::Discard,
            Self::PendingWithFollowup => {
                *self = Self::Idle;
                SettleDecision::Followup
            }
            Self::Pending | Self::Idle => {
                *self = Self::Idle;
                SettleDecision::Rest
            }
        }
    }

    /// Returns true if this call moved the state to `Cancelled`.
    pub fn on_cancel(&mut self) -> bool {
        let changed = !self.is_cancelled();
        *self = Self::Cancelled;
        changed
    }
}
