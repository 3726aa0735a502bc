//! CR2: intersection elimination

use super::{contract_violation, AxiomShape, InferenceRule, RuleKind, RuleState};
use crate::model::{Axiom, ConceptId, ConceptInterner};
use crate::Result;
use std::collections::{HashMap, HashSet};

/// X ⊑ C1, X ⊑ C2, told C1 ⊓ C2 ⊑ D ⇒ X ⊑ D
///
/// Every conjunction is indexed under both operands, so whichever operand
/// reaches the context last fires the rule.
#[derive(Debug, Default)]
pub struct IntersectionRule {
    conjunctions: HashMap<ConceptId, HashMap<ConceptId, Vec<ConceptId>>>,
}

impl IntersectionRule {
    fn index(&mut self, operand: ConceptId, partner: ConceptId, sup: ConceptId) {
        self.conjunctions
            .entry(operand)
            .or_default()
            .entry(partner)
            .or_default()
            .push(sup);
    }
}

impl InferenceRule for IntersectionRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Intersection
    }

    fn description(&self) -> &'static str {
        "Intersection: X ⊑ C1, X ⊑ C2 and C1 ⊓ C2 ⊑ D entail X ⊑ D"
    }

    fn register(&mut self, axiom: Axiom, interner: &ConceptInterner) {
        if let AxiomShape::Conjunction { left, right, sup } = AxiomShape::of(axiom, interner) {
            self.index(left, right, sup);
            if left != right {
                self.index(right, left, sup);
            }
        }
    }

    fn new_state(&self) -> RuleState {
        RuleState::Intersection {
            subsumers: HashSet::new(),
        }
    }

    fn route(&self, axiom: Axiom, interner: &ConceptInterner, targets: &mut Vec<ConceptId>) {
        if let AxiomShape::Subsumption { sub, .. } = AxiomShape::of(axiom, interner) {
            targets.push(sub);
        }
    }

    fn compute(
        &self,
        entity: ConceptId,
        state: &mut RuleState,
        axiom: Axiom,
        interner: &ConceptInterner,
        conclusions: &mut Vec<Axiom>,
    ) -> Result<()> {
        let (RuleState::Intersection { subsumers }, AxiomShape::Subsumption { sub, sup }) =
            (state, AxiomShape::of(axiom, interner))
        else {
            return Err(contract_violation(self.kind(), entity, axiom, interner));
        };
        if sub != entity {
            return Err(contract_violation(self.kind(), entity, axiom, interner));
        }

        subsumers.insert(sup);
        if let Some(partners) = self.conjunctions.get(&sup) {
            for (partner, supers) in partners {
                if subsumers.contains(partner) {
                    conclusions.extend(supers.iter().map(|&conclusion| Axiom::new(entity, conclusion)));
                }
            }
        }
        Ok(())
    }
}
