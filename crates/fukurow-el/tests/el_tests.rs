use anyhow::Result;
use fukurow_el::normalizer::{classify, NormalForm};
use fukurow_el::*;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn names(classification: &Classification, nodes: Vec<&TaxonomyNode>) -> Vec<String> {
    let mut names: Vec<String> = nodes
        .into_iter()
        .flat_map(|node| node.members().iter().copied())
        .map(|concept| classification.interner().render(concept))
        .collect();
    names.sort();
    names
}

/// A ⊑ B ⊓ ∃r.C, B ⊓ ∃r.B ⊑ C ⊓ D, C ⊑ ∃r.A ⊓ B, ∃r.∃r.B ⊓ D ⊑ ∃r.(A ⊓ B),
/// {io} ⊑ C, D ⊑ ∃r.(A ⊓ C)
fn worked_ontology() -> Ontology {
    let mut ontology = Ontology::with_iri("http://example.org/worked");
    let a = ontology.class("A");
    let b = ontology.class("B");
    let c = ontology.class("C");
    let d = ontology.class("D");
    let io = ontology.nominal("io");

    let some_c = ontology.some("r", c);
    let some_b = ontology.some("r", b);
    let some_a = ontology.some("r", a);
    let some_some_b = ontology.some("r", some_b);
    let a_and_b = ontology.and(a, b);
    let a_and_c = ontology.and(a, c);
    let some_a_and_b = ontology.some("r", a_and_b);
    let some_a_and_c = ontology.some("r", a_and_c);

    let b_and_some_c = ontology.and(b, some_c);
    ontology.add_sub_class_of(a, b_and_some_c);
    let b_and_some_b = ontology.and(b, some_b);
    let c_and_d = ontology.and(c, d);
    ontology.add_sub_class_of(b_and_some_b, c_and_d);
    let some_a_and_b_plain = ontology.and(some_a, b);
    ontology.add_sub_class_of(c, some_a_and_b_plain);
    let lhs = ontology.and(some_some_b, d);
    ontology.add_sub_class_of(lhs, some_a_and_b);
    ontology.add_sub_class_of(io, c);
    ontology.add_sub_class_of(d, some_a_and_c);
    ontology
}

#[test]
fn test_worked_scenario_normalization() {
    init_tracing();
    let mut ontology = worked_ontology();
    let normalized = normalize_ontology(&mut ontology);
    let interner = ontology.interner();

    assert!(!normalized.is_empty());
    for &axiom in normalized.axioms() {
        assert_eq!(classify(interner, axiom), NormalForm::Canonical);
        assert!(interner.depth(axiom.sub_class) <= 1);
        assert!(interner.depth(axiom.super_class) <= 1);
    }
    assert!(normalized.stats().fresh_names > 0);
}

#[test]
fn test_worked_scenario_classification() -> Result<()> {
    init_tracing();
    let mut ontology = worked_ontology();
    let classification = ElReasoner::new(ReasonerConfig::sequential()).classify(&mut ontology)?;
    let interner = classification.interner();
    let a = interner.find_class("A").unwrap();
    let b = interner.find_class("B").unwrap();
    let c = interner.find_class("C").unwrap();
    let d = interner.find_class("D").unwrap();
    let io = interner.find_nominal("io").unwrap();

    let closure = classification.closure();
    assert!(closure.contains(&Axiom::new(a, c)));
    assert!(closure.contains(&Axiom::new(a, d)));
    assert!(closure.contains(&Axiom::new(c, d)));
    assert!(closure.contains(&Axiom::new(io, d)));
    assert!(!closure.contains(&Axiom::new(b, c)));

    assert_eq!(names(&classification, classification.super_classes(a, true)?), vec!["C"]);
    assert_eq!(names(&classification, classification.super_classes(c, true)?), vec!["B", "D"]);
    assert_eq!(
        names(&classification, classification.sub_classes(c, true)?),
        vec!["A", "ObjectOneOf(io)"]
    );
    assert_eq!(
        names(&classification, classification.sub_classes(ConceptId::TOP, true)?),
        vec!["B", "D"]
    );
    assert_eq!(
        names(&classification, classification.super_classes(ConceptId::BOTTOM, true)?),
        vec!["A", "ObjectOneOf(io)"]
    );
    assert_eq!(
        names(&classification, classification.super_classes(a, false)?),
        vec!["B", "C", "D", "owl:Thing"]
    );
    assert_eq!(classification.equivalent_classes(b)?, &[b]);
    assert!(classification.is_consistent());
    assert!(classification.unsatisfiable_classes().is_empty());
    assert!(classification.is_subsumed_by(io, b)?);
    assert!(!classification.is_subsumed_by(d, c)?);
    Ok(())
}

#[test]
fn test_bottom_propagates_through_existential() -> Result<()> {
    init_tracing();
    let mut ontology = Ontology::new();
    let a = ontology.class("A");
    let b = ontology.class("B");
    let c = ontology.class("C");
    let some_b = ontology.some("r", b);
    ontology.add_sub_class_of(a, some_b);
    ontology.add_sub_class_of(b, ConceptId::BOTTOM);
    ontology.add_sub_class_of(c, a);

    let classification = ElReasoner::new(ReasonerConfig::sequential()).classify(&mut ontology)?;

    assert!(!classification.is_satisfiable(a)?);
    assert!(!classification.is_satisfiable(c)?);
    assert_eq!(classification.unsatisfiable_classes(), vec![a, b, c]);
    assert!(classification.is_subsumed_by(a, c)?);
    assert!(classification.sub_classes(ConceptId::TOP, true)?.iter().all(|node| {
        node.id() == classification.taxonomy().bottom_node().id()
    }));
    assert!(classification.is_consistent());
    Ok(())
}

#[test]
fn test_nominal_merges_concepts() -> Result<()> {
    init_tracing();
    let mut ontology = Ontology::new();
    let a = ontology.class("A");
    let b = ontology.class("B");
    let ia = ontology.nominal("a");
    let ib = ontology.nominal("b");
    let some_a = ontology.some("r", a);
    ontology.add_sub_class_of(a, ia);
    ontology.add_sub_class_of(b, ia);
    ontology.add_sub_class_of(ib, some_a);

    let classification = ElReasoner::new(ReasonerConfig::sequential()).classify(&mut ontology)?;

    assert!(classification.is_subsumed_by(b, a)?);
    assert!(classification.is_subsumed_by(ia, a)?);
    assert!(!classification.is_subsumed_by(a, b)?);
    assert_eq!(classification.equivalent_classes(a)?, &[a, ia]);
    Ok(())
}

#[test]
fn test_parallel_classification_matches_sequential() -> Result<()> {
    init_tracing();
    let mut sequential_ontology = worked_ontology();
    let mut parallel_ontology = worked_ontology();

    let sequential = ElReasoner::new(ReasonerConfig::sequential()).classify(&mut sequential_ontology)?;
    let parallel = ElReasoner::new(ReasonerConfig::with_workers(4)).classify(&mut parallel_ontology)?;

    assert_eq!(sequential.closure().axioms(), parallel.closure().axioms());
    assert_eq!(sequential.taxonomy(), parallel.taxonomy());
    assert_eq!(sequential.inferred_subsumptions(), parallel.inferred_subsumptions());
    Ok(())
}

#[test]
fn test_load_and_classify_json() -> Result<()> {
    init_tracing();
    let input = r#"{
        "iri": "http://example.org/pizza",
        "declarations": [{"Class": "Pizza"}, {"ObjectProperty": "hasTopping"}],
        "axioms": [
            {"SubClassOf": {"sub": {"Class": "Margherita"}, "sup": {"Class": "Pizza"}}},
            {"SubClassOf": {"sub": {"Class": "Margherita"},
                            "sup": {"ObjectSomeValuesFrom": {"property": "hasTopping", "filler": {"Class": "Tomato"}}}}},
            {"EquivalentClasses": [{"Class": "TomatoPizza"},
                {"ObjectIntersectionOf": [{"Class": "Pizza"},
                    {"ObjectSomeValuesFrom": {"property": "hasTopping", "filler": {"Class": "Tomato"}}}]}]},
            {"DisjointClasses": [{"Class": "Pizza"}, {"Class": "Tomato"}]},
            {"ClassAssertion": {"class": {"Class": "Margherita"}, "individual": "myPizza"}}
        ]
    }"#;

    let mut ontology = JsonOntologyLoader.load_from_str(input)?;
    let classification = ElReasoner::default().classify(&mut ontology)?;
    let interner = classification.interner();
    let margherita = interner.find_class("Margherita").unwrap();
    let tomato_pizza = interner.find_class("TomatoPizza").unwrap();
    let pizza = interner.find_class("Pizza").unwrap();
    let my_pizza = interner.find_nominal("myPizza").unwrap();

    assert!(classification.is_subsumed_by(margherita, tomato_pizza)?);
    assert!(classification.is_subsumed_by(tomato_pizza, pizza)?);
    assert!(classification.is_subsumed_by(my_pizza, tomato_pizza)?);
    assert!(classification.is_consistent());
    assert_eq!(
        names(&classification, classification.super_classes(margherita, true)?),
        vec!["TomatoPizza"]
    );
    Ok(())
}

#[test]
fn test_unknown_and_anonymous_queries() -> Result<()> {
    init_tracing();
    let mut ontology = worked_ontology();
    let classification = ElReasoner::new(ReasonerConfig::sequential()).classify(&mut ontology)?;
    let a = classification.interner().find_class("A").unwrap();

    let mut other = ontology.interner().clone();
    let unseen = other.class("Unseen");
    let some_a = other.some("r", a);

    let taxonomy = classification.taxonomy();
    assert!(matches!(
        taxonomy.super_classes(unseen, true, &other),
        Err(ElError::UnknownEntity(_))
    ));
    assert!(matches!(
        taxonomy.super_classes(some_a, true, &other),
        Err(ElError::UnsupportedQuery(_))
    ));
    Ok(())
}
