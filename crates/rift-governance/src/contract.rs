use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::token::StageLevel;

/// Bit flags naming the legal stage transitions. The ladder is contract
/// data so a future stage-2 gate can be added without redesigning the FSM.
pub mod transitions {
    pub const ALLOW_0_TO_1: u32 = 0x01;
    pub const ALLOW_1_TO_3: u32 = 0x02;
    pub const ALLOW_3_TO_4: u32 = 0x04;
    pub const ALLOW_4_TO_5: u32 = 0x08;
    /// The contract permits explicit governance-authorized downgrades.
    pub const GOVERNANCE_OVERRIDE: u32 = 0x80;

    pub const ALL_FORWARD: u32 = ALLOW_0_TO_1 | ALLOW_1_TO_3 | ALLOW_3_TO_4 | ALLOW_4_TO_5;
}

/// Declarative governance policy. Immutable after load.
///
/// One contract is active per engine instance; the engine clones it at
/// creation so later mutation of the caller's copy cannot affect in-flight
/// validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceContract {
    pub contract_version: u32,
    pub minimum_security_level: u32,
    /// Hash of the policy document this contract was loaded from.
    pub governance_policy_hash: u64,
    pub policy_name: String,
    /// Ceiling on any single governed allocation, in bytes.
    pub max_memory_allocation: usize,
    /// Bitmask of legal stage edges (see [`transitions`]).
    pub allowed_stage_transitions: u32,
    /// When set, tokens reaching stage 5 acquire the anti-reversion lock.
    pub enforce_anti_reversion: bool,
    /// Minimum entropy for stage 3, in hundredths of a bit per byte.
    pub entropy_threshold_percent: u32,
}

impl GovernanceContract {
    pub fn builder(policy_name: impl Into<String>) -> GovernanceContractBuilder {
        GovernanceContractBuilder::new(policy_name)
    }

    /// Load a contract from a JSON policy document.
    pub fn from_json(document: &str) -> Result<Self, GovernanceError> {
        let contract: Self = serde_json::from_str(document)?;
        contract.validate()?;
        Ok(contract)
    }

    /// Structural validation, run once at engine creation.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.policy_name.is_empty() {
            return Err(GovernanceError::InvalidContract(
                "policy_name must not be empty".into(),
            ));
        }
        if self.max_memory_allocation == 0 {
            return Err(GovernanceError::InvalidContract(
                "max_memory_allocation must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Whether the contract's edge mask permits `from` → `to`.
    ///
    /// Only the four ladder edges can ever be permitted; anything else is
    /// false regardless of the mask.
    pub fn allows_transition(&self, from: StageLevel, to: StageLevel) -> bool {
        let required = match (from, to) {
            (StageLevel::Basic, StageLevel::Sealed) => transitions::ALLOW_0_TO_1,
            (StageLevel::Sealed, StageLevel::Minimized) => transitions::ALLOW_1_TO_3,
            (StageLevel::Minimized, StageLevel::Hardened) => transitions::ALLOW_3_TO_4,
            (StageLevel::Hardened, StageLevel::FullySealed) => transitions::ALLOW_4_TO_5,
            _ => return false,
        };
        self.allowed_stage_transitions & required != 0
    }

    /// Whether this contract admits explicit governance-authorized downgrades.
    pub fn allows_governance_override(&self) -> bool {
        self.allowed_stage_transitions & transitions::GOVERNANCE_OVERRIDE != 0
    }
}

impl Default for GovernanceContract {
    fn default() -> Self {
        Self {
            contract_version: 1,
            minimum_security_level: 0,
            governance_policy_hash: 0,
            policy_name: "default-governance-policy".into(),
            max_memory_allocation: 64 * 1024 * 1024,
            allowed_stage_transitions: transitions::ALL_FORWARD
                | transitions::GOVERNANCE_OVERRIDE,
            enforce_anti_reversion: true,
            entropy_threshold_percent: 0,
        }
    }
}

/// Builder for [`GovernanceContract`].
pub struct GovernanceContractBuilder {
    contract: GovernanceContract,
}

impl GovernanceContractBuilder {
    pub fn new(policy_name: impl Into<String>) -> Self {
        Self {
            contract: GovernanceContract {
                policy_name: policy_name.into(),
                ..GovernanceContract::default()
            },
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.contract.contract_version = version;
        self
    }

    pub fn minimum_security_level(mut self, level: u32) -> Self {
        self.contract.minimum_security_level = level;
        self
    }

    pub fn policy_hash(mut self, hash: u64) -> Self {
        self.contract.governance_policy_hash = hash;
        self
    }

    pub fn max_memory_allocation(mut self, bytes: usize) -> Self {
        self.contract.max_memory_allocation = bytes;
        self
    }

    pub fn allowed_stage_transitions(mut self, mask: u32) -> Self {
        self.contract.allowed_stage_transitions = mask;
        self
    }

    pub fn enforce_anti_reversion(mut self, enforce: bool) -> Self {
        self.contract.enforce_anti_reversion = enforce;
        self
    }

    pub fn entropy_threshold_percent(mut self, percent: u32) -> Self {
        self.contract.entropy_threshold_percent = percent;
        self
    }

    pub fn build(self) -> Result<GovernanceContract, GovernanceError> {
        self.contract.validate()?;
        Ok(self.contract)
    }
}
