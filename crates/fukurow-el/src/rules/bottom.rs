//! CR5: bottom propagation

use super::{contract_violation, AxiomShape, InferenceRule, RuleKind, RuleState};
use crate::model::{Axiom, ConceptId, ConceptInterner};
use crate::Result;

/// X ⊑ ∃r.Y, Y ⊑ ⊥ ⇒ X ⊑ ⊥
#[derive(Debug, Default)]
pub struct BottomPropagationRule;

impl InferenceRule for BottomPropagationRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Bottom
    }

    fn description(&self) -> &'static str {
        "Bottom propagation: X ⊑ ∃r.Y and Y ⊑ ⊥ entail X ⊑ ⊥"
    }

    fn register(&mut self, _axiom: Axiom, _interner: &ConceptInterner) {}

    fn new_state(&self) -> RuleState {
        RuleState::Bottom {
            unsatisfiable: false,
            predecessors: Vec::new(),
        }
    }

    fn route(&self, axiom: Axiom, interner: &ConceptInterner, targets: &mut Vec<ConceptId>) {
        match AxiomShape::of(axiom, interner) {
            AxiomShape::Subsumption { sub, sup } if sup == ConceptId::BOTTOM => targets.push(sub),
            AxiomShape::Link { filler, .. } => targets.push(filler),
            _ => {}
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
        let RuleState::Bottom { unsatisfiable, predecessors } = state else {
            return Err(contract_violation(self.kind(), entity, axiom, interner));
        };

        match AxiomShape::of(axiom, interner) {
            AxiomShape::Subsumption { sub, sup } if sub == entity && sup == ConceptId::BOTTOM => {
                if !*unsatisfiable {
                    *unsatisfiable = true;
                    conclusions.extend(
                        predecessors
                            .iter()
                            .map(|&predecessor| Axiom::new(predecessor, ConceptId::BOTTOM)),
                    );
                }
                Ok(())
            }
            AxiomShape::Link { sub, filler, .. } if filler == entity => {
                predecessors.push(sub);
                if *unsatisfiable {
                    conclusions.push(Axiom::new(sub, ConceptId::BOTTOM));
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
    fn test_propagates_in_either_order() {
        let mut interner = ConceptInterner::new();
        let x = interner.class("X");
        let z = interner.class("Z");
        let y = interner.class("Y");
        let link = interner.some("r", y);

        let rule = BottomPropagationRule;
        let mut state = rule.new_state();
        let mut conclusions = Vec::new();

        rule.compute(y, &mut state, Axiom::new(x, link), &interner, &mut conclusions).unwrap();
        rule.compute(y, &mut state, Axiom::new(y, ConceptId::BOTTOM), &interner, &mut conclusions).unwrap();
        rule.compute(y, &mut state, Axiom::new(z, link), &interner, &mut conclusions).unwrap();

        assert_eq!(
            conclusions,
            vec![Axiom::new(x, ConceptId::BOTTOM), Axiom::new(z, ConceptId::BOTTOM)]
        );
    }

    #[test]
    fn test_routes_only_bottom_subsumptions() {
        let mut interner = ConceptInterner::new();
        let x = interner.class("X");
        let y = interner.class("Y");

        let mut targets = Vec::new();
        BottomPropagationRule.route(Axiom::new(x, y), &interner, &mut targets);
        assert!(targets.is_empty());
        BottomPropagationRule.route(Axiom::new(x, ConceptId::BOTTOM), &interner, &mut targets);
        assert_eq!(targets, vec![x]);
    }
}
