//! EL++ 推論エンジン
//!
//! このクレートは EL++ の帰結ベース包含推論を提供します:
//! - 正規化 (normal forms NF1-NF4)
//! - 並列飽和 (completion rules CR1-CR6)
//! - クラス階層 (taxonomy) の構築

pub mod config;
pub mod context;
pub mod loader;
pub mod manager;
pub mod model;
pub mod normalizer;
pub mod reasoner;
pub mod rules;
pub mod saturation;
pub mod taxonomy;

pub use config::ReasonerConfig;
pub use loader::{JsonOntologyLoader, OntologyDocument, OntologyLoader};
pub use model::{Axiom, ConceptExpression, ConceptId, ConceptInterner, Entity, Ontology, Statement, Symbol};
pub use normalizer::{normalize_ontology, NormalForm, NormalizedOntology, Normalizer};
pub use reasoner::{Classification, ElReasoner, ReasoningStats};
pub use rules::{InferenceRule, RuleKind, RuleRegistry};
pub use saturation::{Closure, SaturationEngine, SaturationStats};
pub use taxonomy::{Taxonomy, TaxonomyBuilder, TaxonomyNode};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElError {
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Unsupported entity type: {0}")]
    UnsupportedEntityType(String),

    #[error("Context already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Loader error: {0}")]
    LoaderError(String),

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ElError>;

#[cfg(test)]
mod tests {
    use super::*;

    mod model_tests {
        use super::*;

        #[test]
        fn test_top_and_bottom_preinterned() {
            let interner = ConceptInterner::new();
            assert_eq!(interner.get(ConceptId::TOP), ConceptExpression::Top);
            assert_eq!(interner.get(ConceptId::BOTTOM), ConceptExpression::Bottom);
            assert_eq!(interner.len(), 2);
        }

        #[test]
        fn test_hash_consing() {
            let mut interner = ConceptInterner::new();
            let a = interner.class("A");
            let some_a = interner.some("r", a);

            assert_eq!(interner.class("A"), a);
            assert_eq!(interner.some("r", a), some_a);
            assert_ne!(interner.nominal("A"), a);
            assert_eq!(interner.render(some_a), "ObjectSomeValuesFrom(r A)");
        }

        #[test]
        fn test_intersection_folds_right() {
            let mut interner = ConceptInterner::new();
            let a = interner.class("A");
            let b = interner.class("B");
            let c = interner.class("C");
            let folded = interner.intersection_of(&[a, b, c]).unwrap();
            let b_and_c = interner.intersection(b, c);

            assert_eq!(interner.get(folded), ConceptExpression::Intersection(a, b_and_c));
            assert_eq!(interner.intersection_of(&[]), None);
            assert_eq!(interner.intersection_of(&[a]), Some(a));
        }

        #[test]
        fn test_fresh_names_are_stable_and_hidden() {
            let mut interner = ConceptInterner::new();
            let a = interner.class("A");
            let b = interner.class("B");
            let fresh = interner.fresh_class(a, b);

            assert_eq!(interner.fresh_class(a, b), fresh);
            assert_ne!(interner.fresh_class(b, a), fresh);
            assert!(interner.is_generated(fresh));
            assert!(!interner.is_named_class(fresh));
            assert!(interner.is_named_class(a));
            assert!(interner.render(fresh).starts_with("#GENERATED"));
        }

        #[test]
        fn test_equivalence_becomes_chain() {
            let mut ontology = Ontology::new();
            let a = ontology.class("A");
            let b = ontology.class("B");
            let c = ontology.class("C");
            ontology.add_equivalent_classes(vec![a, b, c]);

            assert_eq!(
                ontology.inclusions(),
                vec![Axiom::new(a, b), Axiom::new(b, a), Axiom::new(b, c), Axiom::new(c, b)]
            );
        }

        #[test]
        fn test_signature_collection() {
            let mut ontology = Ontology::new();
            let a = ontology.class("A");
            let io = ontology.nominal("io");
            let some_io = ontology.some("r", io);
            ontology.add_sub_class_of(a, some_io);

            assert_eq!(ontology.classes().len(), 1);
            assert_eq!(ontology.individuals().len(), 1);
            assert_eq!(ontology.roles().len(), 1);
            assert_eq!(ontology.signature().collect::<Vec<_>>(), vec![a, io]);
        }

        #[test]
        fn test_unsupported_entity_type() {
            let mut ontology = Ontology::new();
            let result = ontology.declare(&Entity::DataProperty("hasAge".to_string()));
            assert!(matches!(result, Err(ElError::UnsupportedEntityType(_))));
            assert!(ontology.declare(&Entity::ObjectProperty("r".to_string())).is_ok());
        }
    }

    mod loader_tests {
        use super::*;

        const DOCUMENT: &str = r#"{
            "iri": "http://example.org/onto",
            "declarations": [{"Class": "A"}, {"NamedIndividual": "io"}, {"ObjectProperty": "r"}],
            "axioms": [
                {"SubClassOf": {"sub": {"Class": "A"}, "sup": {"ObjectSomeValuesFrom": {"property": "r", "filler": {"Class": "C"}}}}},
                {"EquivalentClasses": [{"Class": "A"}, {"ObjectIntersectionOf": [{"Class": "B"}, {"Class": "C"}]}]},
                {"DisjointClasses": [{"Class": "A"}, {"Class": "D"}]},
                {"ClassAssertion": {"class": {"Class": "C"}, "individual": "io"}},
                {"ObjectPropertyAssertion": {"property": "r", "subject": "io", "object": "jo"}},
                {"SubClassOf": {"sub": "Nothing", "sup": "Thing"}}
            ]
        }"#;

        #[test]
        fn test_load_document() {
            let ontology = JsonOntologyLoader.load_from_str(DOCUMENT).unwrap();
            let interner = ontology.interner();
            let a = interner.find_class("A").unwrap();
            let d = interner.find_class("D").unwrap();
            let io = interner.find_nominal("io").unwrap();
            let jo = interner.find_nominal("jo").unwrap();
            let c = interner.find_class("C").unwrap();

            assert_eq!(ontology.iri.as_deref(), Some("http://example.org/onto"));
            assert_eq!(ontology.statements().len(), 6);
            assert_eq!(ontology.classes().len(), 4);
            assert_eq!(ontology.individuals().len(), 2);

            let inclusions = ontology.inclusions();
            let a_and_d = interner
                .lookup(&ConceptExpression::Intersection(a, d))
                .unwrap();
            assert!(inclusions.contains(&Axiom::new(a_and_d, ConceptId::BOTTOM)));
            assert!(inclusions.contains(&Axiom::new(io, c)));
            let r = interner.find_symbol("r").unwrap();
            let some_jo = interner.lookup(&ConceptExpression::Existential(r, jo)).unwrap();
            assert!(inclusions.contains(&Axiom::new(io, some_jo)));
        }

        #[test]
        fn test_malformed_json() {
            let result = JsonOntologyLoader.load_from_str("{\"axioms\": [");
            assert!(matches!(result, Err(ElError::Json(_))));
        }

        #[test]
        fn test_empty_intersection_rejected() {
            let input = r#"{"axioms": [{"SubClassOf": {"sub": {"ObjectIntersectionOf": []}, "sup": "Thing"}}]}"#;
            let result = JsonOntologyLoader.load_from_str(input);
            assert!(matches!(result, Err(ElError::LoaderError(_))));
        }

        #[test]
        fn test_short_equivalence_rejected() {
            let input = r#"{"axioms": [{"EquivalentClasses": [{"Class": "A"}]}]}"#;
            let result = JsonOntologyLoader.load_from_str(input);
            assert!(matches!(result, Err(ElError::LoaderError(_))));
        }

        #[test]
        fn test_datatype_declaration_rejected() {
            let input = r#"{"declarations": [{"Datatype": "xsd:int"}]}"#;
            let result = JsonOntologyLoader.load_from_str(input);
            assert!(matches!(result, Err(ElError::UnsupportedEntityType(_))));
        }

        #[test]
        fn test_missing_file() {
            let result = JsonOntologyLoader.load_from_path(std::path::Path::new("/nonexistent/onto.json"));
            assert!(matches!(result, Err(ElError::Io(_))));
        }
    }
}
