//! Relationship persistence: directions, properties and endpoint checks

#[path = "testutils/mod.rs"]
mod testutils;

use graphlite_ogm::{
    Db, Direction, Error, Graph, ModelClass, Node, PropertyMap, Relationship, RelationshipDef, Value,
};
use std::collections::HashMap;
use std::sync::Arc;
use testutils::fake_store::FakeStore;
use testutils::{init_logging, record};

fn props(pairs: Vec<(&str, Value)>) -> PropertyMap {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn person() -> Arc<ModelClass> {
    ModelClass::builder("Person")
        .relationship("friends", RelationshipDef::of_type("knows"))
        .relationship(
            "followers",
            RelationshipDef::of_type("follows").direction(Direction::In),
        )
        .relationship(
            "spouse",
            RelationshipDef::of_type("married")
                .direction(Direction::Both)
                .singular(true),
        )
        .build()
}

async fn saved(db: &Db, class: &Arc<ModelClass>, id: &str) -> Node {
    let node = Node::new(class);
    node.set_id(id);
    node.save(db, false).await.unwrap();
    node
}

#[tokio::test]
async fn test_incoming_relationship_points_at_declaring_node() {
    init_logging();
    let store = FakeStore::new();
    let db = Db::new(store.clone());
    let class = person();

    let alice = saved(&db, &class, "alice").await;
    let bob = saved(&db, &class, "bob").await;
    alice
        .set_related("followers", vec![bob.clone()], PropertyMap::new())
        .unwrap();
    alice.save(&db, "followers").await.unwrap();

    let follows = store.relationships("follows");
    assert_eq!(follows.len(), 1);
    assert!(follows[0].goes_from_to(bob.store_id().unwrap(), alice.store_id().unwrap()));
}

#[tokio::test]
async fn test_both_direction_writes_two_edges() {
    let store = FakeStore::new();
    let db = Db::new(store.clone());
    let class = person();

    let alice = saved(&db, &class, "alice").await;
    let bob = saved(&db, &class, "bob").await;
    alice
        .set_related("spouse", vec![bob.clone()], props(vec![("since", Value::from(2015))]))
        .unwrap();
    alice.save(&db, true).await.unwrap();

    let married = store.relationships("married");
    assert_eq!(married.len(), 2);
    let (a, b) = (alice.store_id().unwrap(), bob.store_id().unwrap());
    assert!(married.iter().any(|r| r.goes_from_to(a, b)));
    assert!(married.iter().any(|r| r.goes_from_to(b, a)));
    assert!(married
        .iter()
        .all(|r| r.get_property("since") == Some(&Value::Integer(2015))));
}

#[tokio::test]
async fn test_saved_relationship_is_clean_and_merged_once() {
    let store = FakeStore::new();
    let db = Db::new(store.clone());
    let class = person();

    let alice = saved(&db, &class, "alice").await;
    let bob = saved(&db, &class, "bob").await;
    alice
        .set_related("friends", vec![bob.clone()], props(vec![("since", Value::from(2020))]))
        .unwrap();
    alice.save(&db, true).await.unwrap();

    let friends = alice.related("friends").unwrap();
    let rel = friends.first().unwrap().rel().clone();
    assert!(!rel.is_dirty());
    assert!(rel.store_id().is_some());

    rel.set("since", 2021);
    rel.save(&db).await.unwrap();

    let knows = store.relationships("knows");
    assert_eq!(knows.len(), 1);
    assert_eq!(knows[0].get_property("since"), Some(&Value::Integer(2021)));
    assert_eq!(rel.store_id(), Some(knows[0].identity));
}

#[tokio::test]
async fn test_standalone_relationship_save() {
    let store = FakeStore::new();
    let db = Db::new(store.clone());
    let class = person();

    let alice = saved(&db, &class, "alice").await;
    let bob = saved(&db, &class, "bob").await;

    let def = RelationshipDef::of_type("knows");
    let rel = Relationship::with_properties(&def, props(vec![("weight", Value::from(0.5))]));
    rel.set_endpoints(&alice, &bob);
    rel.save(&db).await.unwrap();

    assert!(!rel.is_new());
    assert_eq!(rel.get("weight"), Some(Value::Float(0.5)));
    assert_eq!(store.relationships("knows").len(), 1);
}

#[tokio::test]
async fn test_missing_endpoints_are_rejected() {
    let store = FakeStore::new();
    let db = Db::new(store.clone());

    let rel = Relationship::new(&RelationshipDef::of_type("knows"));
    let err = rel.save(&db).await.unwrap_err();

    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(
        store.statements(),
        vec!["BEGIN".to_string(), "ROLLBACK".to_string()]
    );
}

#[tokio::test]
async fn test_unsaved_endpoints_are_rejected() {
    let store = FakeStore::new();
    let db = Db::new(store.clone());
    let class = person();

    let alice = saved(&db, &class, "alice").await;
    let stranger = Node::new(&class);
    let rel = Relationship::new(&RelationshipDef::of_type("knows"));
    rel.set_endpoints(&alice, &stranger);

    let err = rel.save(&db).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(ref m) if m == "missing identity"));
    assert!(store.relationships("knows").is_empty());
}

#[tokio::test]
async fn test_edge_to_unknown_node_is_not_found() {
    let store = FakeStore::new();
    let db = Db::new(store.clone());
    let class = person();

    let alice = saved(&db, &class, "alice").await;
    let ghost = Node::new(&class);
    ghost.set_id("ghost");

    let rel = Relationship::new(&RelationshipDef::of_type("knows"));
    rel.set_endpoints(&alice, &ghost);

    let err = rel.save(&db).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

fn pals() -> Arc<ModelClass> {
    ModelClass::builder("Person")
        .relationship(
            "pals",
            RelationshipDef::of_type("knows")
                .lazy_model(pals)
                .direction(Direction::Any),
        )
        .build()
}

#[tokio::test]
async fn test_undirected_edge_keeps_stored_direction_on_save() {
    let store = FakeStore::new();
    let alice = store.seed_node(&["Person"], vec![("id", Value::from("alice"))]);
    let bob = store.seed_node(&["Person"], vec![("id", Value::from("bob"))]);
    let edge = store.seed_relationship("knows", alice.identity, bob.identity);
    let db = Db::new(store.clone());

    let class = pals();
    let records = vec![record(vec![
        ("a", Value::from(alice.clone())),
        ("b", Value::from(bob.clone())),
        ("r", Value::from(edge)),
    ])];
    let graph = Graph::from_records(&records, HashMap::new(), None);
    let alice_node = graph.node_model(alice.identity, &class).unwrap();
    let bob_node = graph.node_model(bob.identity, &class).unwrap();

    let from_alice = alice_node.related("pals").unwrap();
    let from_bob = bob_node.related("pals").unwrap();
    let rel = from_alice.first().unwrap().rel().clone();
    assert!(rel.ptr_eq(from_bob.first().unwrap().rel()));
    assert!(rel.start().unwrap().ptr_eq(&alice_node));
    assert!(rel.end().unwrap().ptr_eq(&bob_node));

    rel.set("since", 2019);
    alice_node.save(&db, "pals").await.unwrap();

    let knows = store.relationships("knows");
    assert_eq!(knows.len(), 1);
    assert!(knows[0].goes_from_to(alice.identity, bob.identity));
    assert_eq!(knows[0].get_property("since"), Some(&Value::Integer(2019)));
}
