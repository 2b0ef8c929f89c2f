//! Gate stack: independent advisory and blocking rules.
//!
//! Each gate reads a shared, read-only [`GateContext`] and returns one
//! [`GateVerdict`]. Gates never see each other's output; combining verdicts
//! is the classifier's job.

pub mod anti_chase;
pub mod breadth;
pub mod climax;
pub mod cluster_heat;
pub mod context;
pub mod correlation;
pub mod early_bird;
pub mod earnings;
pub mod laggard;
pub mod momentum;
pub mod pyramid;
pub mod reentry;
pub mod registry;
pub mod swap;
pub mod whipsaw;

pub use anti_chase::AntiChaseGate;
pub use breadth::{sample_breadth_universe, BreadthGate, BreadthReading};
pub use climax::{ClimaxAction, ClimaxGate};
pub use cluster_heat::ClusterHeatGate;
pub use context::{GateContext, GateSubject, MarketGateInputs, PositionMarket};
pub use correlation::{CorrelationGate, CorrelationTable};
pub use early_bird::EarlyBirdGate;
pub use earnings::EarningsGate;
pub use laggard::{DeadMoneyGate, LaggardGate};
pub use momentum::MomentumExpansionGate;
pub use pyramid::PyramidAddGate;
pub use reentry::ReentryGate;
pub use registry::GateRegistry;
pub use swap::{HeldForSwap, SwapAdvisor, SwapKind, SwapSuggestion};
pub use whipsaw::WhipsawGate;

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a gate is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateScope {
    Candidate,
    Position,
    Portfolio,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Advisory {
    /// Multiply suggested shares by this factor.
    SizeScalar(f64),
    DemoteWatch,
    /// Strong momentum without a confirmed trend; may be promoted to READY.
    EarlyBird,
    TrimLaggard,
    DeadMoney,
    /// Blow-off top: trim this fraction of the position.
    TrimClimax(f64),
    /// Blow-off top: move the stop up to this level.
    TightenStop(f64),
    /// Pyramid add number `n` has triggered.
    AddUnit(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CapOverride {
    MaxPositions(u32),
    MaxOpenRiskPct(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GateEffect {
    Pass,
    NotApplicable,
    /// Required inputs were missing. Never a pass or a fail.
    NotEvaluated,
    Block,
    Advisory(Advisory),
    CapOverride(CapOverride),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub gate: String,
    pub passed: bool,
    pub effect: GateEffect,
    pub reason: String,
}

impl GateVerdict {
    fn with(gate: &str, effect: GateEffect, reason: impl Into<String>) -> Self {
        Self {
            gate: gate.to_string(),
            passed: !matches!(effect, GateEffect::Block),
            effect,
            reason: reason.into(),
        }
    }

    pub fn pass(gate: &str, reason: impl Into<String>) -> Self {
        Self::with(gate, GateEffect::Pass, reason)
    }

    pub fn not_applicable(gate: &str, reason: impl Into<String>) -> Self {
        Self::with(gate, GateEffect::NotApplicable, reason)
    }

    pub fn not_evaluated(gate: &str, reason: impl Into<String>) -> Self {
        Self::with(gate, GateEffect::NotEvaluated, reason)
    }

    pub fn block(gate: &str, reason: impl Into<String>) -> Self {
        Self::with(gate, GateEffect::Block, reason)
    }

    pub fn advisory(gate: &str, advisory: Advisory, reason: impl Into<String>) -> Self {
        Self::with(gate, GateEffect::Advisory(advisory), reason)
    }

    pub fn cap_override(gate: &str, cap: CapOverride, reason: impl Into<String>) -> Self {
        Self::with(gate, GateEffect::CapOverride(cap), reason)
    }

    pub fn is_block(&self) -> bool {
        matches!(self.effect, GateEffect::Block)
    }

    pub fn is_demotion(&self) -> bool {
        matches!(self.effect, GateEffect::Advisory(Advisory::DemoteWatch))
    }

    pub fn is_early_bird(&self) -> bool {
        matches!(self.effect, GateEffect::Advisory(Advisory::EarlyBird))
    }

    pub fn size_scalar(&self) -> Option<f64> {
        match self.effect {
            GateEffect::Advisory(Advisory::SizeScalar(s)) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for GateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.gate, self.reason)
    }
}

/// A single rule in the gate stack.
pub trait Gate: Send + Sync {
    /// Stable name used for enable/disable and reporting.
    fn name(&self) -> &'static str;

    fn scope(&self) -> GateScope {
        GateScope::Candidate
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict;
}
