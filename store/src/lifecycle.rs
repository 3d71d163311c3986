//! Request lifecycle tracking.
//!
//! Each collection owns a [`RequestTracker`]. Commands call
//! [`RequestTracker::begin`], which flips the collection into `loading` and
//! issues a [`RequestTicket`]. The ticket rides along inside the effect and
//! comes back on the resolution action, where [`RequestTracker::settle`]
//! decides whether the resolution is applied and performs the
//! succeed/fail transition.
//!
//! There is no in-flight counter: the first resolution to arrive clears
//! `loading` even if other operations on the collection are still pending.

use crate::error::ErrorEnvelope;
use crate::types::CorrelationId;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// `loading` flag and collection-level error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionRequestState {
    /// An operation on the collection is in flight
    pub loading: bool,
    /// Message of the most recently resolved critical failure
    pub error: Option<String>,
}

impl CollectionRequestState {
    /// An operation started
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// An operation finished successfully
    ///
    /// Supersedes any error left by an overlapping operation.
    pub fn succeed(&mut self) {
        self.loading = false;
        self.error = None;
    }

    /// An operation failed
    ///
    /// Validation failures clear `error` (field errors go to the caller);
    /// critical failures set it.
    pub fn fail(&mut self, failure: &ErrorEnvelope) {
        self.loading = false;
        self.error = match failure {
            ErrorEnvelope::Critical(critical) => Some(critical.display_message().to_string()),
            ErrorEnvelope::Validation(_) => None,
        };
    }
}

/// What happens to a resolution that is not the latest issued for its key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Apply every resolution in the order it resumes
    #[default]
    LastResumedWins,
    /// Discard resolutions superseded by a later command with the same key
    LastIssuedWins,
}

impl FromStr for ResolutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-resumed-wins" | "last_resumed_wins" | "legacy" => Ok(Self::LastResumedWins),
            "last-issued-wins" | "last_issued_wins" | "latest" => Ok(Self::LastIssuedWins),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastResumedWins => write!(f, "last-resumed-wins"),
            Self::LastIssuedWins => write!(f, "last-issued-wins"),
        }
    }
}

/// Kind of operation touching a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Load the whole collection
    Fetch,
    /// Create one entity
    Create,
    /// Update one entity
    Update,
    /// Delete one entity
    Delete,
    /// Replace a product's material list
    ReplaceMaterials,
    /// Remove one material from a product
    DeleteMaterial,
}

/// Generation counters are kept per key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    /// Operation kind
    pub kind: OperationKind,
    /// Entity the operation targets, if any
    pub target: Option<String>,
}

impl RequestKey {
    /// Key for an operation on the collection as a whole
    #[must_use]
    pub const fn collection(kind: OperationKind) -> Self {
        Self { kind, target: None }
    }

    /// Key for an operation on one entity
    #[must_use]
    pub fn entity(kind: OperationKind, target: impl fmt::Display) -> Self {
        Self {
            kind,
            target: Some(target.to_string()),
        }
    }
}

/// Identity of one issued request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    /// Caller-supplied correlation ID
    pub correlation_id: CorrelationId,
    /// What the request does
    pub key: RequestKey,
    /// Position among requests issued with the same key, starting at 1
    pub generation: u64,
}

/// Per-collection request state plus generation counters
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    state: CollectionRequestState,
    generations: HashMap<RequestKey, u64>,
}

impl RequestTracker {
    /// Current `loading`/`error` pair
    #[must_use]
    pub const fn state(&self) -> &CollectionRequestState {
        &self.state
    }

    /// Whether an operation is in flight
    #[must_use]
    pub const fn loading(&self) -> bool {
        self.state.loading
    }

    /// Collection-level error message
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    /// Record the start of an operation and issue its ticket
    pub fn begin(&mut self, correlation_id: CorrelationId, key: RequestKey) -> RequestTicket {
        self.state.begin();

        let generation = self.generations.entry(key.clone()).or_insert(0);
        *generation += 1;

        RequestTicket {
            correlation_id,
            key,
            generation: *generation,
        }
    }

    /// Whether `ticket` is the latest issued for its key
    #[must_use]
    pub fn is_latest(&self, ticket: &RequestTicket) -> bool {
        self.generations.get(&ticket.key).copied() == Some(ticket.generation)
    }

    /// Whether a resolution for `ticket` is applied under `policy`
    ///
    /// Creates are always applied since each one produced a distinct entity.
    #[must_use]
    pub fn admits(&self, ticket: &RequestTicket, policy: ResolutionPolicy) -> bool {
        match policy {
            ResolutionPolicy::LastResumedWins => true,
            ResolutionPolicy::LastIssuedWins => {
                ticket.key.kind == OperationKind::Create || self.is_latest(ticket)
            },
        }
    }

    /// Apply the succeed/fail transition for a resolution
    ///
    /// Returns the success value when the caller should mutate the
    /// collection. A resolution rejected by `policy` changes nothing.
    pub fn settle<T>(
        &mut self,
        ticket: &RequestTicket,
        result: Result<T, ErrorEnvelope>,
        policy: ResolutionPolicy,
    ) -> Option<T> {
        if !self.admits(ticket, policy) {
            tracing::debug!(
                correlation_id = %ticket.correlation_id,
                kind = ?ticket.key.kind,
                generation = ticket.generation,
                "Discarding superseded resolution"
            );
            return None;
        }

        match result {
            Ok(value) => {
                self.state.succeed();
                Some(value)
            },
            Err(failure) => {
                if failure.is_validation() {
                    tracing::debug!(
                        correlation_id = %ticket.correlation_id,
                        kind = ?ticket.key.kind,
                        "Request rejected by validation"
                    );
                } else {
                    tracing::warn!(
                        correlation_id = %ticket.correlation_id,
                        kind = ?ticket.key.kind,
                        error = %failure,
                        "Request failed"
                    );
                }
                self.state.fail(&failure);
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CriticalError, ValidationError, CRITICAL_FALLBACK_MESSAGE};
    use proptest::prelude::*;

    fn critical(message: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope::Critical(CriticalError {
            status: Some(500),
            message: message.map(str::to_string),
        })
    }

    fn validation() -> ErrorEnvelope {
        ErrorEnvelope::Validation(ValidationError {
            status: 400,
            title: None,
            detail: None,
            field_errors: Vec::new(),
        })
    }

    #[test]
    fn critical_failure_sets_message_or_fallback() {
        let mut state = CollectionRequestState::default();
        state.begin();
        state.fail(&critical(Some("database offline")));
        assert_eq!(state.error.as_deref(), Some("database offline"));

        state.begin();
        state.fail(&critical(None));
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some(CRITICAL_FALLBACK_MESSAGE));
    }

    #[test]
    fn validation_failure_never_sets_error() {
        let mut state = CollectionRequestState::default();
        state.begin();
        state.fail(&validation());
        assert_eq!(state, CollectionRequestState::default());
    }

    #[test]
    fn first_resolution_clears_loading() {
        let mut tracker = RequestTracker::default();
        let first = tracker.begin(CorrelationId::new(), RequestKey::collection(OperationKind::Fetch));
        let _second = tracker.begin(
            CorrelationId::new(),
            RequestKey::entity(OperationKind::Delete, "m1"),
        );

        let applied = tracker.settle(&first, Ok(()), ResolutionPolicy::LastResumedWins);
        assert_eq!(applied, Some(()));
        // The delete is still in flight
        assert!(!tracker.loading());
    }

    #[test]
    fn overlapping_validation_failure_clears_critical_error() {
        let mut tracker = RequestTracker::default();
        let fetch = tracker.begin(CorrelationId::new(), RequestKey::collection(OperationKind::Fetch));
        let create = tracker.begin(CorrelationId::new(), RequestKey::collection(OperationKind::Create));

        tracker.settle::<()>(&fetch, Err(critical(None)), ResolutionPolicy::LastResumedWins);
        assert_eq!(tracker.error(), Some(CRITICAL_FALLBACK_MESSAGE));

        tracker.settle::<()>(&create, Err(validation()), ResolutionPolicy::LastResumedWins);
        assert_eq!(tracker.error(), None);
        assert!(!tracker.loading());
    }

    #[test]
    fn overlapping_success_clears_critical_error() {
        let mut tracker = RequestTracker::default();
        let delete = tracker.begin(CorrelationId::new(), RequestKey::entity(OperationKind::Delete, "m1"));
        let update = tracker.begin(CorrelationId::new(), RequestKey::entity(OperationKind::Update, "m2"));

        tracker.settle::<()>(&delete, Err(critical(Some("database offline"))), ResolutionPolicy::LastResumedWins);
        assert_eq!(tracker.error(), Some("database offline"));

        assert_eq!(tracker.settle(&update, Ok(()), ResolutionPolicy::LastResumedWins), Some(()));
        assert_eq!(tracker.error(), None);
    }

    #[test]
    fn generations_are_per_key() {
        let mut tracker = RequestTracker::default();
        let fetch = RequestKey::collection(OperationKind::Fetch);
        let update_a = RequestKey::entity(OperationKind::Update, "a");
        let update_b = RequestKey::entity(OperationKind::Update, "b");

        assert_eq!(tracker.begin(CorrelationId::new(), fetch.clone()).generation, 1);
        assert_eq!(tracker.begin(CorrelationId::new(), fetch).generation, 2);
        assert_eq!(tracker.begin(CorrelationId::new(), update_a).generation, 1);
        assert_eq!(tracker.begin(CorrelationId::new(), update_b).generation, 1);
    }

    #[test]
    fn last_issued_wins_discards_superseded_resolution() {
        let mut tracker = RequestTracker::default();
        let key = RequestKey::collection(OperationKind::Fetch);
        let older = tracker.begin(CorrelationId::new(), key.clone());
        let newer = tracker.begin(CorrelationId::new(), key);

        let applied = tracker.settle(&older, Err(critical(None)), ResolutionPolicy::LastIssuedWins);
        assert_eq!(applied, None::<()>);
        // No transition happened
        assert!(tracker.loading());
        assert_eq!(tracker.error(), None);

        let applied = tracker.settle(&newer, Ok(7), ResolutionPolicy::LastIssuedWins);
        assert_eq!(applied, Some(7));
        assert!(!tracker.loading());
    }

    #[test]
    fn creates_are_never_superseded() {
        let mut tracker = RequestTracker::default();
        let key = RequestKey::collection(OperationKind::Create);
        let first = tracker.begin(CorrelationId::new(), key.clone());
        let _second = tracker.begin(CorrelationId::new(), key);

        assert!(!tracker.is_latest(&first));
        assert!(tracker.admits(&first, ResolutionPolicy::LastIssuedWins));
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!("last-issued-wins".parse::<ResolutionPolicy>(), Ok(ResolutionPolicy::LastIssuedWins));
        assert_eq!("LEGACY".parse::<ResolutionPolicy>(), Ok(ResolutionPolicy::LastResumedWins));
        assert!("first-wins".parse::<ResolutionPolicy>().is_err());
        assert_eq!(ResolutionPolicy::LastIssuedWins.to_string(), "last-issued-wins");
    }

    fn any_envelope() -> impl Strategy<Value = Option<ErrorEnvelope>> {
        prop_oneof![
            Just(None),
            Just(Some(validation())),
            proptest::option::of("[a-z ]{0,12}")
                .prop_map(|message| Some(critical(message.as_deref()))),
        ]
    }

    proptest! {
        #[test]
        fn begin_always_resets(loading in any::<bool>(), error in proptest::option::of(".{0,8}")) {
            let mut state = CollectionRequestState { loading, error };
            state.begin();
            prop_assert_eq!(state, CollectionRequestState { loading: true, error: None });
        }

        #[test]
        fn validation_never_sets_error(outcomes in proptest::collection::vec(any_envelope(), 0..16)) {
            let mut state = CollectionRequestState::default();
            for (index, outcome) in outcomes.iter().enumerate() {
                // Odd steps resolve without a fresh begin, like overlapping operations
                if index % 2 == 0 {
                    state.begin();
                }
                match outcome {
                    Some(failure) => state.fail(failure),
                    None => state.succeed(),
                }
                if matches!(outcome, Some(ErrorEnvelope::Validation(_)) | None) {
                    prop_assert_eq!(&state.error, &None);
                }
                prop_assert!(!state.loading);
            }
        }
    }
}
