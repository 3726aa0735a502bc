//! Inference rules (CR1-CR6) and their shared indexes

mod bottom;
mod intersection;
mod nominal;
mod subclass_role;
mod superclass_role;
mod told;

pub use bottom::BottomPropagationRule;
pub use intersection::IntersectionRule;
pub use nominal::{NominalChainRule, NominalState, RelationGraph};
pub use subclass_role::SubclassRoleExpansionRule;
pub use superclass_role::SuperclassRoleExpansionRule;
pub use told::ToldSubsumptionRule;

use crate::model::{Axiom, ConceptExpression, ConceptId, ConceptInterner, Symbol};
use crate::normalizer::NormalizedOntology;
use crate::{ElError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The six completion rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum RuleKind {
    /// CR1
    Told,
    /// CR2
    Intersection,
    /// CR3
    SubclassRole,
    /// CR4
    SuperclassRole,
    /// CR5
    Bottom,
    /// CR6
    Nominal,
}

impl RuleKind {
    pub const ALL: [RuleKind; 6] = [
        RuleKind::Told,
        RuleKind::Intersection,
        RuleKind::SubclassRole,
        RuleKind::SuperclassRole,
        RuleKind::Bottom,
        RuleKind::Nominal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RuleKind::Told => "CR1",
            RuleKind::Intersection => "CR2",
            RuleKind::SubclassRole => "CR3",
            RuleKind::SuperclassRole => "CR4",
            RuleKind::Bottom => "CR5",
            RuleKind::Nominal => "CR6",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Shape of a normalized axiom as seen by the rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxiomShape {
    /// X ⊑ Y, Y basic or ⊥
    Subsumption { sub: ConceptId, sup: ConceptId },
    /// X ⊑ ∃r.Y
    Link { sub: ConceptId, role: Symbol, filler: ConceptId },
    /// C1 ⊓ C2 ⊑ D
    Conjunction { left: ConceptId, right: ConceptId, sup: ConceptId },
    /// ∃r.C ⊑ D
    RoleRestriction { role: Symbol, filler: ConceptId, sup: ConceptId },
    /// Not in normal form
    Other,
}

impl AxiomShape {
    pub fn of(axiom: Axiom, interner: &ConceptInterner) -> Self {
        let sub = interner.get(axiom.sub_class);
        let sup = interner.get(axiom.super_class);

        match (sub, sup) {
            (sub, sup) if sub.is_basic() && sup.is_basic_or_bottom() => AxiomShape::Subsumption {
                sub: axiom.sub_class,
                sup: axiom.super_class,
            },
            (sub, ConceptExpression::Existential(role, filler))
                if sub.is_basic() && interner.is_basic(filler) =>
            {
                AxiomShape::Link {
                    sub: axiom.sub_class,
                    role,
                    filler,
                }
            }
            (ConceptExpression::Intersection(left, right), sup)
                if sup.is_basic_or_bottom() && interner.is_basic(left) && interner.is_basic(right) =>
            {
                AxiomShape::Conjunction {
                    left,
                    right,
                    sup: axiom.super_class,
                }
            }
            (ConceptExpression::Existential(role, filler), sup)
                if sup.is_basic_or_bottom() && interner.is_basic(filler) =>
            {
                AxiomShape::RoleRestriction {
                    role,
                    filler,
                    sup: axiom.super_class,
                }
            }
            _ => AxiomShape::Other,
        }
    }
}

/// Rule-private state of one context, created by [`InferenceRule::new_state`]
#[derive(Debug, Clone)]
pub enum RuleState {
    /// CR1, CR3: everything lives in the shared index
    Stateless,
    /// CR2: subsumers seen so far
    Intersection { subsumers: HashSet<ConceptId> },
    /// CR4: subsumers of the filler that occur in some ∃r.Y ⊑ D, and incoming links
    SuperclassRole {
        subsumers: Vec<ConceptId>,
        predecessors: Vec<(ConceptId, Symbol)>,
    },
    /// CR5: whether the filler is unsatisfiable, and incoming links
    Bottom {
        unsatisfiable: bool,
        predecessors: Vec<ConceptId>,
    },
    /// CR6
    Nominal(NominalState),
}

/// A completion rule: shared index, routing, context factory and derivation.
///
/// `register` and `register_entity` run single-threaded before saturation;
/// everything else only reads the index and may be called from any worker.
pub trait InferenceRule: Send + Sync {
    fn kind(&self) -> RuleKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn description(&self) -> &'static str;

    /// Fold a normalized axiom into the shared index
    fn register(&mut self, axiom: Axiom, interner: &ConceptInterner);

    /// Observe a signature entity
    fn register_entity(&mut self, _entity: ConceptId, _interner: &ConceptInterner) {}

    /// Whether `entity` owns a context of this rule
    fn has_context(&self, _entity: ConceptId, _interner: &ConceptInterner) -> bool {
        true
    }

    /// Context factory
    fn new_state(&self) -> RuleState;

    /// Entities whose context of this rule has to see `axiom`
    fn route(&self, axiom: Axiom, interner: &ConceptInterner, targets: &mut Vec<ConceptId>);

    /// Derive the conclusions of `axiom` inside the context of `entity`
    fn compute(
        &self,
        entity: ConceptId,
        state: &mut RuleState,
        axiom: Axiom,
        interner: &ConceptInterner,
        conclusions: &mut Vec<Axiom>,
    ) -> Result<()>;
}

pub(crate) fn contract_violation(
    kind: RuleKind,
    entity: ConceptId,
    axiom: Axiom,
    interner: &ConceptInterner,
) -> ElError {
    ElError::ContractViolation(format!(
        "{} context of {} cannot process {}",
        kind,
        interner.render(entity),
        interner.render_axiom(axiom)
    ))
}

/// Ordered rule registry. Indexes are filled here, then frozen for saturation.
pub struct RuleRegistry {
    rules: Vec<Box<dyn InferenceRule>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register_rule(Box::new(ToldSubsumptionRule::default()));
        registry.register_rule(Box::new(IntersectionRule::default()));
        registry.register_rule(Box::new(SubclassRoleExpansionRule::default()));
        registry.register_rule(Box::new(SuperclassRoleExpansionRule::default()));
        registry.register_rule(Box::new(BottomPropagationRule::default()));
        registry.register_rule(Box::new(NominalChainRule::default()));
        registry
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn register_rule(&mut self, rule: Box<dyn InferenceRule>) {
        self.rules.push(rule);
    }

    /// Registration phase: feed the signature and every axiom to every rule
    pub fn register_ontology(&mut self, normalized: &NormalizedOntology, interner: &ConceptInterner) {
        for rule in &mut self.rules {
            for &entity in normalized.entities() {
                rule.register_entity(entity, interner);
            }
            for &axiom in normalized.axioms() {
                rule.register(axiom, interner);
            }
        }
    }

    pub fn rules(&self) -> &[Box<dyn InferenceRule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order() {
        let registry = RuleRegistry::default();
        let kinds: Vec<RuleKind> = registry.rules().iter().map(|rule| rule.kind()).collect();
        assert_eq!(kinds, RuleKind::ALL.to_vec());
        assert_eq!(registry.rules()[3].name(), "CR4");
    }

    #[test]
    fn test_axiom_shapes() {
        let mut interner = ConceptInterner::new();
        let a = interner.class("A");
        let b = interner.class("B");
        let a_and_b = interner.intersection(a, b);
        let some_a = interner.some("r", a);
        let deep = interner.some("r", some_a);
        let r = interner.find_symbol("r").unwrap();

        assert_eq!(
            AxiomShape::of(Axiom::new(a, ConceptId::BOTTOM), &interner),
            AxiomShape::Subsumption { sub: a, sup: ConceptId::BOTTOM }
        );
        assert_eq!(
            AxiomShape::of(Axiom::new(b, some_a), &interner),
            AxiomShape::Link { sub: b, role: r, filler: a }
        );
        assert_eq!(
            AxiomShape::of(Axiom::new(a_and_b, a), &interner),
            AxiomShape::Conjunction { left: a, right: b, sup: a }
        );
        assert_eq!(
            AxiomShape::of(Axiom::new(some_a, b), &interner),
            AxiomShape::RoleRestriction { role: r, filler: a, sup: b }
        );
        assert_eq!(AxiomShape::of(Axiom::new(b, deep), &interner), AxiomShape::Other);
    }
}
