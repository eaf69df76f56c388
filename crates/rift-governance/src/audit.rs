use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token::StageLevel;
use crate::violation::ViolationKind;

/// Typed audit events. Every state change in the engine emits exactly one.
///
/// This is the structured replacement for diagnostic prints: the log is
/// queryable, so tests and operators assert on events rather than parsing
/// text output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuditEvent {
    EngineCreated {
        policy_name: String,
    },
    TokenCreated {
        token_id: u64,
        stage: StageLevel,
        allocated_bytes: usize,
    },
    StageVerified {
        token_id: u64,
        stage: StageLevel,
        passed: bool,
    },
    TransitionChecked {
        token_id: u64,
        from: StageLevel,
        to: StageLevel,
        allowed: bool,
    },
    OverrideGranted {
        token_id: u64,
        from: StageLevel,
        to: StageLevel,
    },
    FlagsUpdated {
        token_id: u64,
        governance_flags: u32,
    },
    ArtifactSealed {
        token_id: u64,
        stage: StageLevel,
    },
    ProofRecorded {
        token_id: u64,
        equivalence_proven: bool,
    },
    ViolationRecorded {
        token_id: u64,
        kind: ViolationKind,
    },
    EngineShutdown,
}

/// One timestamped audit log entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    pub at: DateTime<Utc>,
    pub event: AuditEvent,
}

/// Append-only audit log owned by the engine.
pub struct AuditLog {
    records: Vec<AuditRecord>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn record(&mut self, event: AuditEvent) {
        self.records.push(AuditRecord {
            at: Utc::now(),
            event,
        });
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Events matching a predicate, in emission order.
    pub fn matching<'a>(
        &'a self,
        predicate: impl Fn(&AuditEvent) -> bool + 'a,
    ) -> impl Iterator<Item = &'a AuditRecord> {
        self.records.iter().filter(move |r| predicate(&r.event))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_in_order() {
        let mut log = AuditLog::new();
        log.record(AuditEvent::EngineCreated {
            policy_name: "p".into(),
        });
        log.record(AuditEvent::EngineShutdown);

        assert_eq!(log.len(), 2);
        assert!(matches!(
            log.records()[0].event,
            AuditEvent::EngineCreated { .. }
        ));
        assert!(matches!(log.records()[1].event, AuditEvent::EngineShutdown));
    }

    #[test]
    fn matching_filters_events() {
        let mut log = AuditLog::new();
        log.record(AuditEvent::StageVerified {
            token_id: 1,
            stage: StageLevel::Basic,
            passed: true,
        });
        log.record(AuditEvent::StageVerified {
            token_id: 1,
            stage: StageLevel::Sealed,
            passed: false,
        });

        let failures: Vec<_> = log
            .matching(|e| matches!(e, AuditEvent::StageVerified { passed: false, .. }))
            .collect();
        assert_eq!(failures.len(), 1);
    }
}
