//! CR4: superclass role expansion, applied at the filler

use super::{contract_violation, AxiomShape, InferenceRule, RuleKind, RuleState};
use crate::model::{Axiom, ConceptId, ConceptInterner, Symbol};
use crate::Result;
use std::collections::HashMap;

/// X ⊑ ∃r.Y, Y ⊑ Y', told ∃r.Y' ⊑ D ⇒ X ⊑ D
///
/// Contexts are keyed by the filler Y: they collect the links pointing at Y
/// and the subsumers of Y, and join the two against the index.
#[derive(Debug, Default)]
pub struct SuperclassRoleExpansionRule {
    restrictions: HashMap<Symbol, HashMap<ConceptId, Vec<ConceptId>>>,
    filler_roles: HashMap<ConceptId, Vec<Symbol>>,
}

impl SuperclassRoleExpansionRule {
    fn conclusions_for(&self, role: Symbol, filler: ConceptId) -> Option<&Vec<ConceptId>> {
        self.restrictions.get(&role)?.get(&filler)
    }
}

impl InferenceRule for SuperclassRoleExpansionRule {
    fn kind(&self) -> RuleKind {
        RuleKind::SuperclassRole
    }

    fn description(&self) -> &'static str {
        "Role restriction: X ⊑ ∃r.Y, Y ⊑ Y' and ∃r.Y' ⊑ D entail X ⊑ D"
    }

    fn register(&mut self, axiom: Axiom, interner: &ConceptInterner) {
        if let AxiomShape::RoleRestriction { role, filler, sup } = AxiomShape::of(axiom, interner) {
            self.restrictions
                .entry(role)
                .or_default()
                .entry(filler)
                .or_default()
                .push(sup);
            let roles = self.filler_roles.entry(filler).or_default();
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
    }

    fn new_state(&self) -> RuleState {
        RuleState::SuperclassRole {
            subsumers: Vec::new(),
            predecessors: Vec::new(),
        }
    }

    fn route(&self, axiom: Axiom, interner: &ConceptInterner, targets: &mut Vec<ConceptId>) {
        match AxiomShape::of(axiom, interner) {
            AxiomShape::Subsumption { sub, .. } => targets.push(sub),
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
        let RuleState::SuperclassRole { subsumers, predecessors } = state else {
            return Err(contract_violation(self.kind(), entity, axiom, interner));
        };

        match AxiomShape::of(axiom, interner) {
            AxiomShape::Subsumption { sub, sup } if sub == entity => {
                if !self.filler_roles.contains_key(&sup) {
                    return Ok(());
                }
                subsumers.push(sup);
                for &(predecessor, role) in predecessors.iter() {
                    if let Some(supers) = self.conclusions_for(role, sup) {
                        conclusions.extend(supers.iter().map(|&d| Axiom::new(predecessor, d)));
                    }
                }
                Ok(())
            }
            AxiomShape::Link { sub, role, filler } if filler == entity => {
                predecessors.push((sub, role));
                for &subsumer in subsumers.iter() {
                    if let Some(supers) = self.conclusions_for(role, subsumer) {
                        conclusions.extend(supers.iter().map(|&d| Axiom::new(sub, d)));
                    }
                }
                Ok(())
            }
            _ => Err(contract_violation(self.kind(), entity, axiom, interner)),
        }
    }
}
