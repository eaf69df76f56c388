use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rift_equivalence::MinimizationProof;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditLog};
use crate::contract::GovernanceContract;
use crate::error::GovernanceError;
use crate::evidence::{context_checksum, entropy_signature, memory_hash, shannon_entropy};
use crate::sealing::ArtifactSealer;
use crate::token::{MemoryToken, StageLevel};
use crate::transition::{evaluate_transition, TransitionDecision};
use crate::verifier;
use crate::violation::{GovernanceViolation, ViolationKind, ViolationLog};

/// Aggregate root of memory governance.
///
/// Owns the active contract (cloned at creation, immune to later mutation of
/// the caller's copy), the token registry, the violation log, and the audit
/// log. It is the only component that creates tokens or records violations;
/// pipeline stages hold borrowed references to tokens only for the duration
/// of a single verify-or-transition call.
///
/// All mutating operations take `&mut self`: verification and transition on
/// a token are serialized by exclusivity, with no process-wide state — every
/// engine instance (one per test, if need be) is fully independent.
pub struct GovernanceEngine<'a> {
    contract: GovernanceContract,
    registry: Vec<MemoryToken<'a>>,
    violations: ViolationLog,
    audit: AuditLog,
    proofs: HashMap<u64, MinimizationProof>,
    sealer: Option<Arc<dyn ArtifactSealer>>,
    next_token_id: u64,
    active: bool,
    started_at: DateTime<Utc>,
}

impl<'a> GovernanceEngine<'a> {
    /// Initial token registry capacity.
    const REGISTRY_CAPACITY: usize = 64;

    /// Create an engine governed by `contract`.
    ///
    /// The contract is cloned into the engine; structural contract problems
    /// fail fast with no engine created.
    pub fn new(contract: &GovernanceContract) -> Result<Self, GovernanceError> {
        contract.validate()?;

        let mut audit = AuditLog::new();
        audit.record(AuditEvent::EngineCreated {
            policy_name: contract.policy_name.clone(),
        });

        info!(
            policy = %contract.policy_name,
            version = contract.contract_version,
            "Governance engine created"
        );

        Ok(Self {
            contract: contract.clone(),
            registry: Vec::with_capacity(Self::REGISTRY_CAPACITY),
            violations: ViolationLog::new(),
            audit,
            proofs: HashMap::new(),
            sealer: None,
            next_token_id: 1,
            active: true,
            started_at: Utc::now(),
        })
    }

    /// Attach the external sealing collaborator.
    pub fn with_sealer(mut self, sealer: Arc<dyn ArtifactSealer>) -> Self {
        self.sealer = Some(sealer);
        self
    }

    /// Mint a token over a pipeline artifact's byte region.
    ///
    /// The token borrows the region; the engine never copies or frees the
    /// artifact bytes. The returned token is caller-owned and unregistered —
    /// it may be verified standalone or handed to [`register`] for
    /// long-term tracking.
    ///
    /// [`register`]: GovernanceEngine::register
    pub fn token_create(
        &mut self,
        stage_level: StageLevel,
        region: &'a [u8],
    ) -> Result<MemoryToken<'a>, GovernanceError> {
        self.ensure_active()?;

        if region.len() > self.contract.max_memory_allocation {
            return Err(GovernanceError::AllocationExceedsContract {
                requested: region.len(),
                limit: self.contract.max_memory_allocation,
            });
        }

        let token_id = self.next_token_id;
        self.next_token_id += 1;

        let mut token = MemoryToken {
            token_id,
            stage_level,
            memory_hash: 0,
            entropy_signature: 0,
            context_checksum: 0,
            governance_flags: 0,
            region,
            stage_signature: String::new(),
            anti_reversion_lock: false,
            timestamp_created: Utc::now(),
            timestamp_last_verified: None,
        };

        if !region.is_empty() {
            token.memory_hash = memory_hash(region);
            token.entropy_signature = entropy_signature(shannon_entropy(region));
            token.context_checksum = context_checksum(&token);
        }

        self.audit.record(AuditEvent::TokenCreated {
            token_id,
            stage: stage_level,
            allocated_bytes: region.len(),
        });
        info!(
            token_id,
            stage = %stage_level,
            bytes = region.len(),
            "Memory token created"
        );

        Ok(token)
    }

    /// Register a token for long-term tracking. Returns its id.
    pub fn register(&mut self, token: MemoryToken<'a>) -> u64 {
        let token_id = token.token_id;
        debug!(token_id, "Token registered");
        self.registry.push(token);
        token_id
    }

    pub fn token(&self, token_id: u64) -> Option<&MemoryToken<'a>> {
        self.registry.iter().find(|t| t.token_id == token_id)
    }

    /// Record the governance flags a pipeline phase has applied to a
    /// registered token's artifact (e.g. encryption).
    ///
    /// This is the only token mutation available outside verification and
    /// transitions; stage level and the anti-reversion lock never leave
    /// engine authority. The checksum is re-derived and the update audited.
    pub fn set_governance_flags(
        &mut self,
        token_id: u64,
        governance_flags: u32,
    ) -> Result<(), GovernanceError> {
        self.ensure_active()?;
        let idx = self.index_of(token_id)?;

        let token = &mut self.registry[idx];
        token.governance_flags = governance_flags;
        token.context_checksum = context_checksum(token);

        self.audit.record(AuditEvent::FlagsUpdated {
            token_id,
            governance_flags,
        });
        debug!(token_id, governance_flags, "Governance flags updated");
        Ok(())
    }

    pub fn token_count(&self) -> usize {
        self.registry.len()
    }

    /// Record the stage-3 equivalence proof for a token. Required before
    /// the 3→4 transition of a minimized artifact.
    pub fn record_minimization_proof(&mut self, token_id: u64, proof: MinimizationProof) {
        if !proof.equivalence_proven {
            warn!(token_id, "Recorded minimization proof is unproven");
        }
        self.audit.record(AuditEvent::ProofRecorded {
            token_id,
            equivalence_proven: proof.equivalence_proven,
        });
        self.proofs.insert(token_id, proof);
    }

    /// Verify a registered token against the active contract.
    ///
    /// Dispatches to the gate matching the token's declared stage. Failures
    /// append a violation; every attempt, pass or fail, is audited.
    pub fn verify_token(&mut self, token_id: u64) -> Result<bool, GovernanceError> {
        self.ensure_active()?;
        let idx = self.index_of(token_id)?;

        let result = {
            let contract = &self.contract;
            verifier::verify(&mut self.registry[idx], contract)
        };
        let stage = self.registry[idx].stage_level;

        match result {
            Ok(()) => {
                self.audit.record(AuditEvent::StageVerified {
                    token_id,
                    stage,
                    passed: true,
                });
                Ok(true)
            }
            Err(failure) => {
                self.record_violation(
                    GovernanceViolation::new(failure.kind, token_id, stage, failure.message),
                );
                self.audit.record(AuditEvent::StageVerified {
                    token_id,
                    stage,
                    passed: false,
                });
                Ok(false)
            }
        }
    }

    /// Verify a caller-owned (unregistered) token. Same gates, same logging.
    pub fn verify(&mut self, token: &mut MemoryToken<'_>) -> Result<bool, GovernanceError> {
        self.ensure_active()?;
        let token_id = token.token_id;
        let stage = token.stage_level;

        match verifier::verify(token, &self.contract) {
            Ok(()) => {
                self.audit.record(AuditEvent::StageVerified {
                    token_id,
                    stage,
                    passed: true,
                });
                Ok(true)
            }
            Err(failure) => {
                self.record_violation(
                    GovernanceViolation::new(failure.kind, token_id, stage, failure.message),
                );
                self.audit.record(AuditEvent::StageVerified {
                    token_id,
                    stage,
                    passed: false,
                });
                Ok(false)
            }
        }
    }

    /// Request a stage change for a registered token.
    ///
    /// Permitted forward transitions re-stamp the token's stage, re-derive
    /// its checksum, seal it (when a sealer is attached), and — on reaching
    /// stage 5 under an anti-reversion contract — set the lock. Permitted
    /// downgrades are recorded as explicit overrides, never silently.
    pub fn request_transition(
        &mut self,
        token_id: u64,
        target: StageLevel,
        governance_mode: bool,
    ) -> Result<TransitionDecision, GovernanceError> {
        self.ensure_active()?;
        let idx = self.index_of(token_id)?;

        let decision = evaluate_transition(
            &self.registry[idx],
            target,
            governance_mode,
            &self.contract,
            self.proofs.get(&token_id),
        );
        let from = self.registry[idx].stage_level;

        self.audit.record(AuditEvent::TransitionChecked {
            token_id,
            from,
            to: target,
            allowed: decision.is_allowed(),
        });

        match &decision {
            TransitionDecision::Allow => {
                self.apply_transition(idx, target)?;
            }
            TransitionDecision::AllowWithOverride => {
                self.record_violation(
                    GovernanceViolation::new(
                        ViolationKind::GovernanceOverride,
                        token_id,
                        from,
                        format!("governance override: stage {} -> {}", from, target),
                    )
                    .with_attempted_stage(target)
                    .with_override_available(true),
                );
                self.audit.record(AuditEvent::OverrideGranted {
                    token_id,
                    from,
                    to: target,
                });
                self.apply_transition(idx, target)?;
            }
            TransitionDecision::Deny {
                kind,
                message,
                override_available,
            } => {
                self.record_violation(
                    GovernanceViolation::new(*kind, token_id, from, message.clone())
                        .with_attempted_stage(target)
                        .with_override_available(*override_available),
                );
            }
        }

        Ok(decision)
    }

    /// Seal a registered token's artifact via the external signer.
    pub fn seal_token(&mut self, token_id: u64) -> Result<(), GovernanceError> {
        self.ensure_active()?;
        let sealer = self
            .sealer
            .clone()
            .ok_or(GovernanceError::SealerUnavailable)?;
        let idx = self.index_of(token_id)?;

        let token = &mut self.registry[idx];
        token.stage_signature = sealer.sign(token.region)?;
        let stage = token.stage_level;

        self.audit.record(AuditEvent::ArtifactSealed {
            token_id,
            stage,
        });
        info!(token_id, stage = %stage, "Artifact sealed");
        Ok(())
    }

    /// Check a registered token's seal against its artifact bytes.
    pub fn verify_seal(&self, token_id: u64) -> Result<bool, GovernanceError> {
        let sealer = self
            .sealer
            .as_ref()
            .ok_or(GovernanceError::SealerUnavailable)?;
        let token = self
            .token(token_id)
            .ok_or(GovernanceError::TokenNotRegistered(token_id))?;
        Ok(sealer.verify(token.region, &token.stage_signature))
    }

    /// Stop accepting governance operations. Logs remain queryable.
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.audit.record(AuditEvent::EngineShutdown);
        info!(
            tokens = self.registry.len(),
            violations = self.violations.len(),
            "Governance engine shut down"
        );
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn contract(&self) -> &GovernanceContract {
        &self.contract
    }

    pub fn violations(&self) -> &ViolationLog {
        &self.violations
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn ensure_active(&self) -> Result<(), GovernanceError> {
        if self.active {
            Ok(())
        } else {
            Err(GovernanceError::EngineInactive)
        }
    }

    fn index_of(&self, token_id: u64) -> Result<usize, GovernanceError> {
        self.registry
            .iter()
            .position(|t| t.token_id == token_id)
            .ok_or(GovernanceError::TokenNotRegistered(token_id))
    }

    fn record_violation(&mut self, violation: GovernanceViolation) {
        warn!(
            token_id = violation.token_id,
            kind = ?violation.kind,
            reason = %violation.message,
            "Governance violation recorded"
        );
        self.audit.record(AuditEvent::ViolationRecorded {
            token_id: violation.token_id,
            kind: violation.kind,
        });
        self.violations.append(violation);
    }

    /// Apply a permitted stage change in place.
    ///
    /// The checksum binds the stage level, so it is re-derived after the
    /// stage stamp; otherwise the very next verification would report the
    /// token corrupted.
    fn apply_transition(&mut self, idx: usize, target: StageLevel) -> Result<(), GovernanceError> {
        let enforce_anti_reversion = self.contract.enforce_anti_reversion;
        let sealer = self.sealer.clone();

        let token = &mut self.registry[idx];
        token.stage_level = target;

        if target == StageLevel::FullySealed && enforce_anti_reversion {
            token.anti_reversion_lock = true;
        }

        let mut sealed = false;
        if target >= StageLevel::Sealed {
            if let Some(sealer) = sealer {
                token.stage_signature = sealer.sign(token.region)?;
                sealed = true;
            }
        }

        token.context_checksum = context_checksum(token);
        let token_id = token.token_id;

        info!(token_id, stage = %target, "Stage transition applied");
        if sealed {
            self.audit.record(AuditEvent::ArtifactSealed {
                token_id,
                stage: target,
            });
        }
        Ok(())
    }
}
