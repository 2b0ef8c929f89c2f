use super::{
    AntiChaseGate, BreadthGate, ClimaxGate, ClusterHeatGate, CorrelationGate, DeadMoneyGate,
    EarlyBirdGate, EarningsGate, Gate, GateContext, GateScope, GateVerdict, LaggardGate,
    MomentumExpansionGate, PyramidAddGate, ReentryGate, WhipsawGate,
};

struct Entry {
    gate: Box<dyn Gate>,
    enabled: bool,
}

/// Ordered set of gates, each toggled by name.
#[derive(Default)]
pub struct GateRegistry {
    entries: Vec<Entry>,
}

impl GateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in gate with default thresholds, all enabled.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CorrelationGate::default()));
        registry.register(Box::new(ClusterHeatGate::default()));
        registry.register(Box::new(WhipsawGate::default()));
        registry.register(Box::new(EarningsGate::default()));
        registry.register(Box::new(AntiChaseGate::default()));
        registry.register(Box::new(ReentryGate::default()));
        registry.register(Box::new(EarlyBirdGate::default()));
        registry.register(Box::new(LaggardGate::default()));
        registry.register(Box::new(DeadMoneyGate::default()));
        registry.register(Box::new(ClimaxGate::default()));
        registry.register(Box::new(PyramidAddGate::default()));
        registry.register(Box::new(BreadthGate::default()));
        registry.register(Box::new(MomentumExpansionGate::default()));
        registry
    }

    /// Add a gate, replacing any existing gate with the same name.
    pub fn register(&mut self, gate: Box<dyn Gate>) {
        let name = gate.name();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.gate.name() == name) {
            entry.gate = gate;
        } else {
            self.entries.push(Entry { gate, enabled: true });
        }
    }

    /// Returns false when no gate has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.gate.name() == name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn enable(&mut self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    pub fn disable(&mut self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    /// Enable exactly the named gates. Unknown names are returned.
    pub fn enable_only<'n>(&mut self, names: &[&'n str]) -> Vec<&'n str> {
        for entry in &mut self.entries {
            entry.enabled = names.contains(&entry.gate.name());
        }
        names
            .iter()
            .copied()
            .filter(|n| !self.contains(n))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.gate.name() == name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.enabled && e.gate.name() == name)
    }

    /// List all registered gate names in evaluation order
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.gate.name()).collect()
    }

    /// Run every enabled gate of the given scope against `ctx`.
    pub fn evaluate(&self, scope: GateScope, ctx: &GateContext<'_>) -> Vec<GateVerdict> {
        self.entries
            .iter()
            .filter(|e| e.enabled && e.gate.scope() == scope)
            .map(|e| e.gate.evaluate(ctx))
            .collect()
    }
}

impl std::fmt::Debug for GateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (e.gate.name(), e.enabled)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::test_support::*;
    use crate::gates::GateSubject;

    #[test]
    fn standard_registers_all_gates() {
        let registry = GateRegistry::standard();
        assert_eq!(registry.names().len(), 13);
        assert!(registry.is_enabled("whipsaw"));
        assert!(registry.is_enabled("climax"));
    }

    #[test]
    fn disabled_gates_are_skipped() {
        let mut registry = GateRegistry::standard();
        let f = Fixture::new(day(2024, 6, 3));
        let c = candidate("NVDA", "SEMIS");
        let ctx = f.ctx(GateSubject::Candidate(&c));
        let before = registry.evaluate(GateScope::Candidate, &ctx).len();
        assert!(registry.disable("earnings"));
        let after = registry.evaluate(GateScope::Candidate, &ctx);
        assert_eq!(after.len(), before - 1);
        assert!(after.iter().all(|v| v.gate != "earnings"));
        assert!(!registry.disable("nope"));
    }

    #[test]
    fn scope_filters_gates() {
        let registry = GateRegistry::standard();
        let f = Fixture::new(day(2024, 6, 3));
        let verdicts = registry.evaluate(GateScope::Portfolio, &f.ctx(GateSubject::Portfolio));
        let names: Vec<_> = verdicts.iter().map(|v| v.gate.as_str()).collect();
        assert_eq!(names, vec!["breadth", "momentum_expansion"]);
    }

    #[test]
    fn position_scope_runs_position_reviews() {
        let registry = GateRegistry::standard();
        let f = Fixture::new(day(2024, 6, 3));
        let p = open_position("NVDA", "SEMIS", day(2024, 5, 1));
        let m = crate::gates::PositionMarket {
            price: 101.0,
            ..Default::default()
        };
        let verdicts = registry.evaluate(
            GateScope::Position,
            &f.ctx(GateSubject::Position {
                position: &p,
                market: &m,
            }),
        );
        let names: Vec<_> = verdicts.iter().map(|v| v.gate.as_str()).collect();
        assert_eq!(names, vec!["laggard", "dead_money", "climax", "pyramid_add"]);
    }

    #[test]
    fn enable_only_reports_unknown_names() {
        let mut registry = GateRegistry::standard();
        let unknown = registry.enable_only(&["whipsaw", "bogus"]);
        assert_eq!(unknown, vec!["bogus"]);
        assert!(registry.is_enabled("whipsaw"));
        assert!(!registry.is_enabled("earnings"));
    }
}
