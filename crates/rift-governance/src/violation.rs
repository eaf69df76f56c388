use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token::StageLevel;

/// Classification of a governance violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    InvalidStageTransition,
    EntropyThresholdFailed,
    AntiReversionBlocked,
    MemoryCorruption,
    SignatureMismatch,
    ContextIntegrityFailed,
    GovernancePolicyBreach,
    /// An authorized downgrade was performed. Not a failure, but always
    /// recorded — overrides are never silent.
    GovernanceOverride,
}

/// Append-only record of a failed validation or policy check.
///
/// Created by the engine whenever a verification or transition check fails
/// (or an override is exercised); never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceViolation {
    pub violation_id: String,
    pub kind: ViolationKind,
    pub token_id: u64,
    /// Stage the operation attempted to reach, when applicable.
    pub attempted_stage: Option<StageLevel>,
    pub current_stage: StageLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Whether a governance override could have permitted the operation.
    pub governance_override_available: bool,
}

impl GovernanceViolation {
    pub fn new(
        kind: ViolationKind,
        token_id: u64,
        current_stage: StageLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_id: uuid::Uuid::new_v4().to_string(),
            kind,
            token_id,
            attempted_stage: None,
            current_stage,
            message: message.into(),
            timestamp: Utc::now(),
            governance_override_available: false,
        }
    }

    pub fn with_attempted_stage(mut self, stage: StageLevel) -> Self {
        self.attempted_stage = Some(stage);
        self
    }

    pub fn with_override_available(mut self, available: bool) -> Self {
        self.governance_override_available = available;
        self
    }
}

/// Filter for querying the violation log.
#[derive(Clone, Debug, Default)]
pub struct ViolationFilter {
    pub token_id: Option<u64>,
    pub kind: Option<ViolationKind>,
}

impl ViolationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token_id: u64) -> Self {
        self.token_id = Some(token_id);
        self
    }

    pub fn with_kind(mut self, kind: ViolationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, violation: &GovernanceViolation) -> bool {
        if let Some(token_id) = self.token_id {
            if violation.token_id != token_id {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if violation.kind != kind {
                return false;
            }
        }
        true
    }
}

/// Append-only violation log. No delete or modify operations exist.
pub struct ViolationLog {
    entries: Vec<GovernanceViolation>,
}

impl ViolationLog {
    /// Initial log capacity.
    pub(crate) const INITIAL_CAPACITY: usize = 32;

    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(Self::INITIAL_CAPACITY),
        }
    }

    pub fn append(&mut self, violation: GovernanceViolation) {
        self.entries.push(violation);
    }

    pub fn query(&self, filter: &ViolationFilter) -> Vec<&GovernanceViolation> {
        self.entries.iter().filter(|v| filter.matches(v)).collect()
    }

    pub fn entries(&self) -> &[GovernanceViolation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ViolationLog {
    fn default() -> Self {
        Self::new()
    }
}
