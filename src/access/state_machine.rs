//! Client-facing access state, derived from asynchronous signals.
//!
//! The identity provider's cached "verified" flag can be stale, so the
//! machine reconciles it against a server-authoritative check. The reducer
//! is a pure function over (machine, event) with no provider callbacks
//! involved, which keeps it unit-testable.
//!
//! Precedence: the server verdict, once known, always wins over the
//! provider's cached flag. The cached flag only ever moves the machine
//! toward `AuthenticatedUnverified` on first entry; reaching
//! `AuthenticatedVerified` initially requires server confirmation. After
//! entry, a provider refresh carrying `verified = true` may promote an
//! unverified session, because some providers mutate the cached user object
//! in place, and the machine re-derives state on every event rather than
//! deduplicating on identity.

/// UI-facing access state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessState {
    Unauthenticated,
    AuthenticatingPending,
    AuthenticatedUnverified,
    AuthenticatedVerified,
    /// Rendered by the UI but does not block navigation by itself.
    Error(String),
}

/// Signals feeding the reducer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessEvent {
    /// The identity provider reports a signed-in principal, with its
    /// locally cached verified flag.
    ProviderSignedIn { verified_hint: bool },
    /// The provider fired a change event for what may be the same principal
    /// reference. State is re-derived regardless.
    ProviderRefreshed { verified_hint: bool },
    /// The server reconciliation call answered authoritatively.
    ServerReconciled { verified: bool },
    /// The reconciliation call threw.
    ReconciliationFailed { reason: String },
    SignedOut,
}

/// Access state plus the last known server verdict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessStateMachine {
    state: AccessState,
    server_verified: Option<bool>,
}

impl AccessStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AccessState::Unauthenticated,
            server_verified: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &AccessState {
        &self.state
    }

    /// Pure reducer. Consumes the machine and returns the next one.
    #[must_use]
    pub fn apply(self, event: &AccessEvent) -> Self {
        match event {
            AccessEvent::SignedOut => Self::new(),
            AccessEvent::ReconciliationFailed { reason } => Self {
                state: AccessState::Error(reason.clone()),
                server_verified: self.server_verified,
            },
            AccessEvent::ServerReconciled { verified } => {
                // A verdict with no signed-in principal is a late arrival
                // from a signed-out session; dropping it keeps a future
                // sign-in from inheriting a stale verdict.
                if self.state == AccessState::Unauthenticated {
                    return self;
                }
                Self {
                    state: authenticated_state(*verified),
                    server_verified: Some(*verified),
                }
            }
            AccessEvent::ProviderSignedIn { verified_hint }
            | AccessEvent::ProviderRefreshed { verified_hint } => {
                self.derive_from_provider(*verified_hint)
            }
        }
    }

    /// Re-derive state from a provider signal. Runs on every provider event,
    /// even when the principal reference looks unchanged.
    fn derive_from_provider(self, verified_hint: bool) -> Self {
        let state = match self.server_verified {
            // The server verdict is the most trusted signal available.
            Some(verified) => authenticated_state(verified),
            // No server data yet: the hint is provisional. A false hint
            // settles on unverified; a true hint is not enough to enter
            // the verified state on first arrival.
            None => match (&self.state, verified_hint) {
                (_, false) => AccessState::AuthenticatedUnverified,
                (AccessState::AuthenticatedUnverified, true)
                | (AccessState::AuthenticatedVerified, true) => {
                    AccessState::AuthenticatedVerified
                }
                (_, true) => AccessState::AuthenticatingPending,
            },
        };
        Self {
            state,
            server_verified: self.server_verified,
        }
    }
}

impl Default for AccessStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

const fn authenticated_state(verified: bool) -> AccessState {
    if verified {
        AccessState::AuthenticatedVerified
    } else {
        AccessState::AuthenticatedUnverified
    }
}
