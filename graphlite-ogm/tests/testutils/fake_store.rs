//! In-memory store for lifecycle and query tests
//!
//! Understands only the statement shapes the mapper generates:
//! node upserts, edge merges, detach deletes, label changes, simple
//! MATCH/WHERE/RETURN finds and counts, merges, and index/constraint
//! statements. Anything else fails with a `FakeStore.Unsupported` code.
//!
//! Transactions work on a snapshot of the data that replaces the store's
//! data on commit and is discarded on rollback.

use async_trait::async_trait;
use graphlite_ogm::{
    Driver, DriverTransaction, Params, PropertyMap, RawNode, RawRelationship, Record, StoreError,
    StoreId, Value,
};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CONSTRAINT_VIOLATION: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";

#[derive(Debug, Clone, Default)]
pub struct StoreData {
    pub nodes: BTreeMap<StoreId, RawNode>,
    pub relationships: BTreeMap<StoreId, RawRelationship>,
    next_identity: StoreId,
}

fn unsupported(query: &str) -> StoreError {
    StoreError::with_code("FakeStore.Unsupported", format!("cannot run: {}", query))
}

fn param<'a>(params: &'a Params, name: &str) -> Result<&'a Value, StoreError> {
    params
        .get(name)
        .ok_or_else(|| StoreError::with_code("Neo.ClientError.Statement.ParameterMissing", name))
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid test pattern")
}

fn merge_properties(target: &mut PropertyMap, map: &Value) {
    if let Some(map) = map.as_map() {
        for (key, value) in map {
            if value.is_null() {
                target.remove(key);
            } else {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

impl StoreData {
    fn allocate(&mut self) -> StoreId {
        self.next_identity += 1;
        self.next_identity
    }

    pub fn create_node(&mut self, labels: &[&str], properties: Vec<(&str, Value)>) -> RawNode {
        let mut node = RawNode::new(self.allocate());
        for label in labels {
            node = node.with_label(*label);
        }
        for (key, value) in properties {
            node = node.with_property(key, value);
        }
        self.nodes.insert(node.identity, node.clone());
        node
    }

    pub fn create_relationship(&mut self, rel_type: &str, start: StoreId, end: StoreId) -> RawRelationship {
        let rel = RawRelationship::new(self.allocate(), rel_type, start, end);
        self.relationships.insert(rel.identity, rel.clone());
        rel
    }

    pub fn find_node(&self, label: &str, id: &Value) -> Option<StoreId> {
        self.nodes
            .values()
            .find(|n| n.has_label(label) && n.get_property("id") == Some(id))
            .map(|n| n.identity)
    }

    fn update_node<F: FnOnce(&mut RawNode)>(&mut self, identity: StoreId, f: F) -> Option<RawNode> {
        let node = self.nodes.get_mut(&identity)?;
        f(node);
        Some(node.clone())
    }

    pub fn execute(&mut self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        if query.starts_with("MERGE (n:") && query.contains("{id: $id})\n") {
            return self.upsert_node(query, params);
        }
        if query.starts_with("MERGE (") {
            return self.merge_node(query, params);
        }
        if query.starts_with("MATCH (start:") {
            return self.merge_edge(query, params);
        }
        if query.ends_with("DETACH DELETE n") {
            return self.detach_delete(query, params);
        }
        if query.contains("\nSET n:") || query.contains("\nREMOVE n:") {
            return self.change_labels(query, params);
        }
        if query.starts_with("MATCH (") {
            return self.find(query, params);
        }
        Err(unsupported(query))
    }

    fn upsert_node(&mut self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        let re = regex(r"^MERGE \(n:(\w+) \{id: \$id\}\)\n(?:SET n:([\w:]+)\n)?SET n \+= \$properties\nRETURN n$");
        let caps = re.captures(query).ok_or_else(|| unsupported(query))?;
        let base = caps[1].to_string();
        let labels: Vec<String> = caps
            .get(2)
            .map(|m| m.as_str().split(':').map(str::to_string).collect())
            .unwrap_or_default();

        let id = param(params, "id")?.clone();
        let properties = param(params, "properties")?.clone();

        let identity = match self.find_node(&base, &id) {
            Some(identity) => identity,
            None => self
                .create_node(&[base.as_str()], vec![("id", id.clone())])
                .identity,
        };
        let node = self
            .update_node(identity, |node| {
                for label in &labels {
                    if !node.has_label(label) {
                        node.labels.push(label.clone());
                    }
                }
                merge_properties(&mut node.properties, &properties);
            })
            .ok_or_else(|| unsupported(query))?;

        Ok(vec![Record::from_pairs(vec![("n", Value::Node(node))])])
    }

    fn merge_node(&mut self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        let re = regex(r"^MERGE \((\w+):([\w:]+)(?: \{([^}]*)\})?\)\nON CREATE SET \w+\.id = \$id\n");
        let caps = re.captures(query).ok_or_else(|| unsupported(query))?;
        let variable = caps[1].to_string();
        let labels: Vec<String> = caps[2].split(':').map(str::to_string).collect();

        let criteria = param(params, "criteria")?.clone();
        let criteria_map = criteria.as_map().cloned().unwrap_or_default();

        let existing = self
            .nodes
            .values()
            .find(|n| {
                labels.iter().all(|l| n.has_label(l))
                    && criteria_map
                        .iter()
                        .all(|(k, v)| n.get_property(k) == Some(v))
            })
            .map(|n| n.identity);

        let identity = match existing {
            Some(identity) => identity,
            None => {
                let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
                let id = param(params, "id")?.clone();
                self.create_node(&label_refs, vec![("id", id)]).identity
            }
        };

        let mut sets = Vec::new();
        for line in query.lines() {
            if let Some(rest) = line.strip_prefix(&format!("SET {} += $", variable)) {
                sets.push(param(params, rest)?.clone());
            }
        }
        let node = self
            .update_node(identity, |node| {
                for map in &sets {
                    merge_properties(&mut node.properties, map);
                }
            })
            .ok_or_else(|| unsupported(query))?;

        Ok(vec![Record::from_pairs(vec![(variable, Value::Node(node))])])
    }

    fn merge_edge(&mut self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        let re = regex(
            r"^MATCH \(start:(\w+) \{id: \$start\}\), \(end:(\w+) \{id: \$end\}\)\nMERGE \(start\)(<?)-\[r:(\w+)\]-(>?)\(end\)\n(MERGE \(end\)-\[r_2:\w+\]->\(start\)\n)?",
        );
        let caps = re.captures(query).ok_or_else(|| unsupported(query))?;

        let start = self.find_node(&caps[1], param(params, "start")?);
        let end = self.find_node(&caps[2], param(params, "end")?);
        let (Some(start), Some(end)) = (start, end) else {
            return Ok(Vec::new());
        };
        let rel_type = caps[4].to_string();
        let reversed = &caps[3] == "<";
        let both = caps.get(6).is_some();
        let properties = param(params, "properties")?.clone();

        let (from, to) = if reversed { (end, start) } else { (start, end) };
        let rel = self.merge_relationship(&rel_type, from, to, &properties);
        if both {
            self.merge_relationship(&rel_type, to, from, &properties);
        }

        Ok(vec![Record::from_pairs(vec![("r", Value::Relationship(rel))])])
    }

    fn merge_relationship(&mut self, rel_type: &str, start: StoreId, end: StoreId, properties: &Value) -> RawRelationship {
        let existing = self
            .relationships
            .values()
            .find(|r| r.rel_type == rel_type && r.goes_from_to(start, end))
            .map(|r| r.identity);
        let identity = match existing {
            Some(identity) => identity,
            None => self.create_relationship(rel_type, start, end).identity,
        };

        let rel = self
            .relationships
            .get_mut(&identity)
            .expect("relationship just merged");
        merge_properties(&mut rel.properties, properties);
        rel.clone()
    }

    fn detach_delete(&mut self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        let re = regex(r"^MATCH \(n:(\w+)\)\nWHERE n\.id = \$id\nDETACH DELETE n$");
        let caps = re.captures(query).ok_or_else(|| unsupported(query))?;
        if let Some(identity) = self.find_node(&caps[1], param(params, "id")?) {
            self.nodes.remove(&identity);
            self.relationships
                .retain(|_, r| r.start != identity && r.end != identity);
        }
        Ok(Vec::new())
    }

    fn change_labels(&mut self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        let re = regex(r"^MATCH \(n:(\w+)\)\nWHERE n\.id = \$id((?:\n(?:SET|REMOVE) n:\w+)+)$");
        let caps = re.captures(query).ok_or_else(|| unsupported(query))?;
        let Some(identity) = self.find_node(&caps[1], param(params, "id")?) else {
            return Ok(Vec::new());
        };

        let changes: Vec<(bool, String)> = caps[2]
            .lines()
            .filter(|l| !l.is_empty())
            .filter_map(|line| {
                line.strip_prefix("SET n:")
                    .map(|l| (true, l.to_string()))
                    .or_else(|| line.strip_prefix("REMOVE n:").map(|l| (false, l.to_string())))
            })
            .collect();

        self.update_node(identity, |node| {
            for (add, label) in changes {
                if add {
                    if !node.has_label(&label) {
                        node.labels.push(label);
                    }
                } else {
                    node.labels.retain(|l| *l != label);
                }
            }
        });
        Ok(Vec::new())
    }

    fn find(&mut self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        let re = regex(
            r"^MATCH \((\w+):([\w:]+)\)\n(?:WHERE (.+?)\n)?RETURN (.+)\n(?:ORDER BY .+\n)?(?:SKIP (\d+)\n)?(?:LIMIT (\d+)\n)?$",
        );
        let query_flat = query.replace("\nAND ", " AND ");
        let caps = re.captures(&query_flat).ok_or_else(|| unsupported(query))?;
        let variable = caps[1].to_string();
        let labels: Vec<String> = caps[2].split(':').map(str::to_string).collect();

        let mut conditions = Vec::new();
        if let Some(where_clause) = caps.get(3) {
            let eq = regex(&format!(r"^{}\.(\w+) = \$(\w+)$", variable));
            let in_list = regex(&format!(r"^{}\.(\w+) IN \[(.*)\]$", variable));
            let identity = regex(&format!(r"^id\({}\) = \$(\w+)$", variable));

            for condition in where_clause.as_str().split(" AND ") {
                if let Some(c) = identity.captures(condition) {
                    conditions.push(("$id".to_string(), vec![param(params, &c[1])?.clone()]));
                } else if let Some(c) = eq.captures(condition) {
                    conditions.push((c[1].to_string(), vec![param(params, &c[2])?.clone()]));
                } else if let Some(c) = in_list.captures(condition) {
                    let mut values = Vec::new();
                    for name in c[2].split(", ").filter(|n| !n.is_empty()) {
                        values.push(param(params, name.trim_start_matches('$'))?.clone());
                    }
                    conditions.push((c[1].to_string(), values));
                } else {
                    return Err(unsupported(query));
                }
            }
        }

        let matches: Vec<RawNode> = self
            .nodes
            .values()
            .filter(|n| labels.iter().all(|l| n.has_label(l)))
            .filter(|n| {
                conditions.iter().all(|(key, values)| {
                    if key == "$id" {
                        values.contains(&Value::Integer(n.identity))
                    } else {
                        n.get_property(key).map_or(false, |v| values.contains(v))
                    }
                })
            })
            .cloned()
            .collect();

        let returning = caps[4].to_string();
        if returning.starts_with("count(distinct(") {
            let total = Value::Integer(matches.len() as i64);
            return Ok(vec![Record::from_pairs(vec![("total", total)])]);
        }
        if returning != variable {
            return Err(unsupported(query));
        }

        let skip = caps.get(5).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let limit = caps
            .get(6)
            .map_or(usize::MAX, |m| m.as_str().parse().unwrap_or(usize::MAX));
        Ok(matches
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|n| Record::from_pairs(vec![(variable.clone(), Value::Node(n))]))
            .collect())
    }
}

#[derive(Default)]
struct Schema {
    indexes: Vec<(String, String)>,
    uniques: Vec<(String, String)>,
}

impl Schema {
    fn handles(query: &str) -> bool {
        query.starts_with("CREATE INDEX")
            || query.starts_with("DROP INDEX")
            || query.starts_with("CREATE CONSTRAINT")
            || query.starts_with("DROP CONSTRAINT")
            || query.starts_with("CALL db.indexes()")
    }

    fn execute(&mut self, query: &str) -> Result<Vec<Record>, StoreError> {
        if query.starts_with("CALL db.indexes()") {
            return Ok(self
                .indexes
                .iter()
                .map(|(label, property)| {
                    Record::from_pairs(vec![(
                        "description",
                        Value::from(format!("INDEX ON :{}({})", label, property)),
                    )])
                })
                .collect());
        }

        let re = regex(r"[:(]\w*:?`(\w+)`\)?(?: ASSERT \w+)?[.(]`(\w+)`");
        let caps = re.captures(query).ok_or_else(|| unsupported(query))?;
        let entry = (caps[1].to_string(), caps[2].to_string());
        let target = if query.contains("INDEX") {
            &mut self.indexes
        } else {
            &mut self.uniques
        };

        if query.starts_with("CREATE") {
            if !target.contains(&entry) {
                target.push(entry);
            }
        } else {
            target.retain(|e| *e != entry);
        }
        Ok(Vec::new())
    }
}

struct Inner {
    data: Mutex<StoreData>,
    schema: Mutex<Schema>,
    statements: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
}

/// Shared handle to the in-memory store
#[derive(Clone)]
pub struct FakeStore {
    inner: Arc<Inner>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                data: Mutex::new(StoreData::default()),
                schema: Mutex::new(Schema::default()),
                statements: Mutex::new(Vec::new()),
                fail_on: Mutex::new(None),
            }),
        }
    }

    /// Fail every later statement containing `fragment` with a constraint violation
    pub fn fail_on(&self, fragment: &str) {
        *self.inner.fail_on.lock() = Some(fragment.to_string());
    }

    pub fn statements(&self) -> Vec<String> {
        self.inner.statements.lock().clone()
    }

    pub fn clear_statements(&self) {
        self.inner.statements.lock().clear();
    }

    pub fn data(&self) -> StoreData {
        self.inner.data.lock().clone()
    }

    pub fn seed_node(&self, labels: &[&str], properties: Vec<(&str, Value)>) -> RawNode {
        self.inner.data.lock().create_node(labels, properties)
    }

    pub fn seed_relationship(&self, rel_type: &str, start: StoreId, end: StoreId) -> RawRelationship {
        self.inner
            .data
            .lock()
            .create_relationship(rel_type, start, end)
    }

    /// Node carrying stable id `id`, under any label
    pub fn node(&self, id: &str) -> Option<RawNode> {
        let id = Value::from(id);
        self.inner
            .data
            .lock()
            .nodes
            .values()
            .find(|n| n.get_property("id") == Some(&id))
            .cloned()
    }

    pub fn node_count(&self) -> usize {
        self.inner.data.lock().nodes.len()
    }

    pub fn relationships(&self, rel_type: &str) -> Vec<RawRelationship> {
        self.inner
            .data
            .lock()
            .relationships
            .values()
            .filter(|r| r.rel_type == rel_type)
            .cloned()
            .collect()
    }

    pub fn indexes(&self) -> Vec<(String, String)> {
        self.inner.schema.lock().indexes.clone()
    }

    pub fn uniques(&self) -> Vec<(String, String)> {
        self.inner.schema.lock().uniques.clone()
    }

    fn log(&self, statement: &str) {
        self.inner.statements.lock().push(statement.to_string());
    }

    fn check(&self, query: &str) -> Result<(), StoreError> {
        let fail_on = self.inner.fail_on.lock().clone();
        match fail_on {
            Some(fragment) if query.contains(&fragment) => Err(StoreError::with_code(
                CONSTRAINT_VIOLATION,
                format!("statement rejected: {}", fragment),
            )),
            _ => Ok(()),
        }
    }

    fn execute(&self, data: &mut StoreData, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        self.log(query);
        self.check(query)?;
        if Schema::handles(query) {
            return self.inner.schema.lock().execute(query);
        }
        data.execute(query, params)
    }
}

#[async_trait]
impl Driver for FakeStore {
    async fn run(&self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        let mut data = self.inner.data.lock().clone();
        let result = self.execute(&mut data, query, params);
        if result.is_ok() {
            *self.inner.data.lock() = data;
        }
        result
    }

    async fn begin(&self) -> Result<Box<dyn DriverTransaction>, StoreError> {
        self.log("BEGIN");
        Ok(Box::new(FakeTransaction {
            store: self.clone(),
            working: self.inner.data.lock().clone(),
        }))
    }
}

struct FakeTransaction {
    store: FakeStore,
    working: StoreData,
}

#[async_trait]
impl DriverTransaction for FakeTransaction {
    async fn run(&mut self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        self.store.execute(&mut self.working, query, params)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.store.log("COMMIT");
        *self.store.inner.data.lock() = self.working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.store.log("ROLLBACK");
        Ok(())
    }
}
