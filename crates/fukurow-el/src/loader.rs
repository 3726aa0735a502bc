//! オントロジーローダー (JSON)

use crate::model::{ConceptId, Entity, Ontology};
use crate::{ElError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Ontology loader trait
pub trait OntologyLoader {
    fn load_from_str(&self, input: &str) -> Result<Ontology>;

    fn load_from_path(&self, path: &Path) -> Result<Ontology> {
        let input = std::fs::read_to_string(path)?;
        self.load_from_str(&input)
    }
}

/// Serialized class expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassExpressionDocument {
    Thing,
    Nothing,
    Class(String),
    ObjectOneOf(String),
    ObjectIntersectionOf(Vec<ClassExpressionDocument>),
    ObjectSomeValuesFrom {
        property: String,
        filler: Box<ClassExpressionDocument>,
    },
}

/// Serialized axiom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxiomDocument {
    SubClassOf {
        sub: ClassExpressionDocument,
        sup: ClassExpressionDocument,
    },
    EquivalentClasses(Vec<ClassExpressionDocument>),
    DisjointClasses(Vec<ClassExpressionDocument>),
    ClassAssertion {
        class: ClassExpressionDocument,
        individual: String,
    },
    ObjectPropertyAssertion {
        property: String,
        subject: String,
        object: String,
    },
}

/// Top-level JSON document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyDocument {
    #[serde(default)]
    pub iri: Option<String>,
    #[serde(default)]
    pub declarations: Vec<Entity>,
    #[serde(default)]
    pub axioms: Vec<AxiomDocument>,
}

impl OntologyDocument {
    /// Build an ontology from the document
    pub fn into_ontology(self) -> Result<Ontology> {
        let mut ontology = match self.iri {
            Some(iri) => Ontology::with_iri(iri),
            None => Ontology::new(),
        };

        for entity in &self.declarations {
            ontology.declare(entity)?;
        }
        for axiom in &self.axioms {
            add_axiom(&mut ontology, axiom)?;
        }

        debug!(
            "Loaded ontology: {} statements, {} classes, {} individuals, {} roles",
            ontology.statements().len(),
            ontology.classes().len(),
            ontology.individuals().len(),
            ontology.roles().len()
        );
        Ok(ontology)
    }
}

/// Loader for the JSON document format
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOntologyLoader;

impl OntologyLoader for JsonOntologyLoader {
    fn load_from_str(&self, input: &str) -> Result<Ontology> {
        let document: OntologyDocument = serde_json::from_str(input)?;
        document.into_ontology()
    }
}

fn add_axiom(ontology: &mut Ontology, axiom: &AxiomDocument) -> Result<()> {
    match axiom {
        AxiomDocument::SubClassOf { sub, sup } => {
            let sub = concept(ontology, sub)?;
            let sup = concept(ontology, sup)?;
            ontology.add_sub_class_of(sub, sup);
        }
        AxiomDocument::EquivalentClasses(operands) => {
            if operands.len() < 2 {
                return Err(ElError::LoaderError(format!(
                    "EquivalentClasses needs at least two operands, got {}",
                    operands.len()
                )));
            }
            let classes = operands
                .iter()
                .map(|operand| concept(ontology, operand))
                .collect::<Result<Vec<_>>>()?;
            ontology.add_equivalent_classes(classes);
        }
        AxiomDocument::DisjointClasses(operands) => {
            let classes = operands
                .iter()
                .map(|operand| concept(ontology, operand))
                .collect::<Result<Vec<_>>>()?;
            for (i, &left) in classes.iter().enumerate() {
                for &right in &classes[i + 1..] {
                    let both = ontology.and(left, right);
                    ontology.add_sub_class_of(both, ConceptId::BOTTOM);
                }
            }
        }
        AxiomDocument::ClassAssertion { class, individual } => {
            let class = concept(ontology, class)?;
            let nominal = ontology.nominal(individual);
            ontology.add_sub_class_of(nominal, class);
        }
        AxiomDocument::ObjectPropertyAssertion {
            property,
            subject,
            object,
        } => {
            let subject = ontology.nominal(subject);
            let object = ontology.nominal(object);
            let some = ontology.some(property, object);
            ontology.add_sub_class_of(subject, some);
        }
    }
    Ok(())
}

fn concept(ontology: &mut Ontology, expression: &ClassExpressionDocument) -> Result<ConceptId> {
    match expression {
        ClassExpressionDocument::Thing => Ok(ConceptId::TOP),
        ClassExpressionDocument::Nothing => Ok(ConceptId::BOTTOM),
        ClassExpressionDocument::Class(name) => Ok(ontology.class(name)),
        ClassExpressionDocument::ObjectOneOf(individual) => Ok(ontology.nominal(individual)),
        ClassExpressionDocument::ObjectIntersectionOf(operands) => {
            let operands = operands
                .iter()
                .map(|operand| concept(ontology, operand))
                .collect::<Result<Vec<_>>>()?;
            ontology
                .interner_mut()
                .intersection_of(&operands)
                .ok_or_else(|| ElError::LoaderError("empty ObjectIntersectionOf".to_string()))
        }
        ClassExpressionDocument::ObjectSomeValuesFrom { property, filler } => {
            let filler = concept(ontology, filler)?;
            Ok(ontology.some(property, filler))
        }
    }
}
