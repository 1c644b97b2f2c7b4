//! Related-node expansion through `with`, end to end

#[path = "testutils/mod.rs"]
mod testutils;

use graphlite_ogm::{
    Db, Direction, Error, Filter, ModelClass, QueryOptions, RelationshipDef, Value, WithSpec,
};
use std::sync::Arc;
use testutils::scripted_driver::ScriptedDriver;
use testutils::{init_logging, raw_node, raw_rel, record};

fn person() -> Arc<ModelClass> {
    ModelClass::builder("Person")
        .relationship("friends", RelationshipDef::of_type("knows").lazy_model(person))
        .relationship(
            "employer",
            RelationshipDef::of_type("works_for")
                .lazy_model(company)
                .direction(Direction::Out)
                .singular(true),
        )
        .build()
}

fn company() -> Arc<ModelClass> {
    ModelClass::builder("Company").build()
}

fn alice_with_friends() -> Vec<graphlite_ogm::Record> {
    vec![record(vec![
        ("n", Value::from(raw_node(1, "Person", "alice"))),
        (
            "n_friends_col",
            Value::List(vec![
                Value::from(raw_node(2, "Person", "bob")),
                Value::from(raw_node(3, "Person", "carol")),
            ]),
        ),
        (
            "n_r_friends_col",
            Value::List(vec![
                Value::from(raw_rel(10, "knows", 1, 2).with_property("since", 2019)),
                Value::from(raw_rel(11, "knows", 1, 3)),
            ]),
        ),
    ])]
}

#[tokio::test]
async fn test_get_with_expansion_resolves_related() {
    init_logging();
    let driver = ScriptedDriver::new();
    driver.push(alice_with_friends());
    let db = Db::new(driver.clone());

    let alice = db
        .get(&person(), "alice", QueryOptions::new().with("friends"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        driver.queries(),
        vec!["MATCH (n:Person)\n\
              WHERE n.id = $n_id\n\
              OPTIONAL MATCH (n)-[n_r_friends:knows]->(n_friends:Person)\n\
              WITH n, COLLECT(n_friends) AS n_friends_col, COLLECT(n_r_friends) AS n_r_friends_col\n\
              RETURN n, n_friends_col, n_r_friends_col\n\
              LIMIT 1\n"
            .to_string()]
    );

    let friends = alice.related("friends").unwrap();
    assert_eq!(friends.len(), 2);

    let mut ids: Vec<String> = friends.iter().filter_map(|f| f.node().id()).collect();
    ids.sort();
    assert_eq!(ids, vec!["bob".to_string(), "carol".to_string()]);

    let mut rel_ids: Vec<i64> = friends.iter().filter_map(|f| f.rel().store_id()).collect();
    rel_ids.sort();
    assert_eq!(rel_ids, vec![10, 11]);

    let graph = alice.graph().unwrap();
    for friend in friends.iter() {
        assert_eq!(friend.node().class().name(), "Person");
        assert!(friend.rel().start().unwrap().ptr_eq(&alice));
        assert!(Arc::ptr_eq(&friend.node().graph().unwrap(), &graph));
    }

    let bob = friends
        .iter()
        .find(|f| f.node().id().as_deref() == Some("bob"))
        .unwrap();
    assert_eq!(bob.rel().get("since"), Some(Value::Integer(2019)));
}

#[tokio::test]
async fn test_nested_expansion_resolves_two_levels() {
    let driver = ScriptedDriver::new();
    driver.push(vec![record(vec![
        ("n", Value::from(raw_node(1, "Person", "alice"))),
        ("n_friends_col", Value::List(vec![Value::from(raw_node(2, "Person", "bob"))])),
        ("n_r_friends_col", Value::List(vec![Value::from(raw_rel(10, "knows", 1, 2))])),
        (
            "n_friends_employer_col",
            Value::List(vec![Value::List(vec![Value::from(raw_node(4, "Company", "acme"))])]),
        ),
        (
            "n_friends_r_employer_col",
            Value::List(vec![Value::List(vec![Value::from(raw_rel(12, "works_for", 2, 4))])]),
        ),
    ])]);
    let db = Db::new(driver.clone());

    let alice = db
        .get(&person(), "alice", QueryOptions::new().with("friends.employer"))
        .await
        .unwrap()
        .unwrap();

    let query = &driver.queries()[0];
    assert!(query.contains(
        "OPTIONAL MATCH (n_friends)-[n_friends_r_employer:works_for]->(n_friends_employer:Company)\n"
    ));
    assert!(query.ends_with(
        "RETURN n, n_friends_col, n_r_friends_col, n_friends_employer_col, n_friends_r_employer_col\nLIMIT 1\n"
    ));

    let friends = alice.related("friends").unwrap();
    assert!(!friends.is_singular());

    let bob = friends.first().unwrap().node().clone();
    let employer = bob.related("employer").unwrap();
    let acme = employer.one().unwrap();
    assert_eq!(acme.node().id().as_deref(), Some("acme"));
    assert_eq!(acme.node().class().name(), "Company");

    assert!(alice.related("employer").unwrap().one().is_none());
}

#[tokio::test]
async fn test_expansion_filter_is_sent_as_parameter() {
    let driver = ScriptedDriver::new();
    let db = Db::new(driver.clone());

    let spec = WithSpec::new().filter("friends", Filter::new().eq("active", true));
    let found = db
        .find(&person(), "alice", QueryOptions::new().with(spec))
        .await
        .unwrap();
    assert!(found.is_empty());

    assert!(driver.queries()[0].contains(
        "OPTIONAL MATCH (n)-[n_r_friends:knows]->(n_friends:Person)\nWHERE n_friends.active = $n_friends_active\n"
    ));
    let params = driver.last_params().unwrap();
    assert_eq!(params.get("n_friends_active"), Some(&Value::from(true)));
    assert_eq!(params.get("n_id"), Some(&Value::from("alice")));
}

#[tokio::test]
async fn test_unknown_expansion_is_rejected_before_running() {
    let driver = ScriptedDriver::new();
    let db = Db::new(driver.clone());

    let err = db
        .find(&person(), "alice", QueryOptions::new().with("enemies"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(driver.queries().is_empty());
}

#[tokio::test]
async fn test_fetch_related_into_existing_graph() {
    init_logging();
    let driver = ScriptedDriver::new();
    driver.push(vec![record(vec![("n", Value::from(raw_node(1, "Person", "alice")))])]);
    driver.push(alice_with_friends());
    let db = Db::new(driver.clone());

    let mut alice = db
        .get(&person(), "alice", QueryOptions::new())
        .await
        .unwrap()
        .unwrap();
    let graph = alice.graph().unwrap();
    assert!(alice.related("friends").unwrap().is_empty());

    let fetched = alice.fetch_related(&db, "friends").await.unwrap();

    assert_eq!(fetched.get("friends").map(|r| r.len()), Some(2));
    assert_eq!(alice.related("friends").unwrap().len(), 2);
    assert!(Arc::ptr_eq(&alice.graph().unwrap(), &graph));
    assert_eq!(graph.node_count(), 3);
    assert_eq!(
        driver.queries()[1],
        "MATCH (n:Person)\n\
         WHERE n.id = $n_id\n\
         OPTIONAL MATCH (n)-[n_r_friends:knows]->(n_friends:Person)\n\
         WITH n, COLLECT(n_friends) AS n_friends_col, COLLECT(n_r_friends) AS n_r_friends_col\n\
         RETURN n, n_friends_col, n_r_friends_col\n"
    );
}

#[tokio::test]
async fn test_fetch_related_needs_identity() {
    let driver = ScriptedDriver::new();
    let db = Db::new(driver.clone());

    let mut stranger = graphlite_ogm::Node::new(&person());
    let err = stranger.fetch_related(&db, "friends").await.unwrap_err();

    assert!(matches!(err, Error::InvalidState(_)));
    assert!(driver.queries().is_empty());
}
