//! CR3: subclass role expansion

use super::{contract_violation, AxiomShape, InferenceRule, RuleKind, RuleState};
use crate::model::{Axiom, ConceptId, ConceptInterner};
use crate::Result;
use std::collections::HashMap;

/// X ⊑ Y, told Y ⊑ ∃r.C ⇒ X ⊑ ∃r.C
#[derive(Debug, Default)]
pub struct SubclassRoleExpansionRule {
    restrictions: HashMap<ConceptId, Vec<ConceptId>>,
}

impl InferenceRule for SubclassRoleExpansionRule {
    fn kind(&self) -> RuleKind {
        RuleKind::SubclassRole
    }

    fn description(&self) -> &'static str {
        "Role expansion: X ⊑ Y and Y ⊑ ∃r.C entail X ⊑ ∃r.C"
    }

    fn register(&mut self, axiom: Axiom, interner: &ConceptInterner) {
        if let AxiomShape::Link { sub, .. } = AxiomShape::of(axiom, interner) {
            self.restrictions.entry(sub).or_default().push(axiom.super_class);
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
                if let Some(restrictions) = self.restrictions.get(&sup) {
                    conclusions.extend(
                        restrictions
                            .iter()
                            .map(|&restriction| Axiom::new(entity, restriction)),
                    );
                }
                Ok(())
            }
            _ => Err(contract_violation(self.kind(), entity, axiom, interner)),
        }
    }
}
