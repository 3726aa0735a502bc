//! CR1: told subsumption

use super::{contract_violation, AxiomShape, InferenceRule, RuleKind, RuleState};
use crate::model::{Axiom, ConceptId, ConceptInterner};
use crate::Result;
use std::collections::HashMap;

/// X ⊑ Y, told Y ⊑ Z ⇒ X ⊑ Z
#[derive(Debug, Default)]
pub struct ToldSubsumptionRule {
    told: HashMap<ConceptId, Vec<ConceptId>>,
}

impl InferenceRule for ToldSubsumptionRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Told
    }

    fn description(&self) -> &'static str {
        "Told subsumption: X ⊑ Y and Y ⊑ Z entail X ⊑ Z"
    }

    fn register(&mut self, axiom: Axiom, interner: &ConceptInterner) {
        if let AxiomShape::Subsumption { sub, sup } = AxiomShape::of(axiom, interner) {
            if sub != sup {
                self.told.entry(sub).or_default().push(sup);
            }
        }
    }

    fn new_state(&self) -> RuleState {
        RuleState::Stateless
    }

    fn route(&self, axiom: Axiom, interner: &ConceptInterner, targets: &mut Vec<ConceptId>) {
        if let AxiomShape::Subsumption { sub, .. } = AxiomShape::of(axiom, interner) {
            targets.push(sub);
        }
    }

    fn compute(
        &self,
        entity: ConceptId,
        _state: &mut RuleState,
        axiom: Axiom,
        interner: &ConceptInterner,
        conclusions: &mut Vec<Axiom>,
    ) -> Result<()> {
        match AxiomShape::of(axiom, interner) {
            AxiomShape::Subsumption { sub, sup } if sub == entity => {
                if let Some(supers) = self.told.get(&sup) {
                    conclusions.extend(supers.iter().map(|&told| Axiom::new(entity, told)));
                }
                Ok(())
            }
            _ => Err(contract_violation(self.kind(), entity, axiom, interner)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_told_chain_step() {
        let mut interner = ConceptInterner::new();
        let a = interner.class("A");
        let b = interner.class("B");
        let c = interner.class("C");
        let x = interner.class("X");

        let mut rule = ToldSubsumptionRule::default();
        rule.register(Axiom::new(b, c), &interner);
        rule.register(Axiom::new(a, b), &interner);

        let mut state = rule.new_state();
        let mut conclusions = Vec::new();
        rule.compute(x, &mut state, Axiom::new(x, b), &interner, &mut conclusions).unwrap();

        assert_eq!(conclusions, vec![Axiom::new(x, c)]);
    }

    #[test]
    fn test_foreign_axiom_is_contract_violation() {
        let mut interner = ConceptInterner::new();
        let a = interner.class("A");
        let b = interner.class("B");

        let rule = ToldSubsumptionRule::default();
        let mut state = rule.new_state();
        let mut conclusions = Vec::new();
        let result = rule.compute(a, &mut state, Axiom::new(b, a), &interner, &mut conclusions);

        assert!(matches!(result, Err(crate::ElError::ContractViolation(_))));
    }
}
