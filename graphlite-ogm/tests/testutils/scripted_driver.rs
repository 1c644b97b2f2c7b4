//! Driver that replays queued responses
//!
//! Every statement, auto-commit or transactional, takes the next queued
//! response; an empty queue answers with no records. Transaction
//! boundaries show up in the statement log as BEGIN, COMMIT and ROLLBACK.

use async_trait::async_trait;
use graphlite_ogm::{Driver, DriverTransaction, Params, Record, StoreError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

type Response = Result<Vec<Record>, StoreError>;

#[derive(Default)]
struct Script {
    responses: VecDeque<Response>,
    calls: Vec<(String, Params)>,
}

#[derive(Clone, Default)]
pub struct ScriptedDriver {
    script: Arc<Mutex<Script>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the records of the next statement
    pub fn push(&self, records: Vec<Record>) {
        self.script.lock().responses.push_back(Ok(records));
    }

    /// Make the next statement fail
    pub fn push_error(&self, error: StoreError) {
        self.script.lock().responses.push_back(Err(error));
    }

    /// Every statement seen so far, with transaction markers
    pub fn queries(&self) -> Vec<String> {
        self.script
            .lock()
            .calls
            .iter()
            .map(|(q, _)| q.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<(String, Params)> {
        self.script.lock().calls.clone()
    }

    /// Parameters of the last statement
    pub fn last_params(&self) -> Option<Params> {
        self.script
            .lock()
            .calls
            .iter()
            .rev()
            .find(|(q, _)| !matches!(q.as_str(), "BEGIN" | "COMMIT" | "ROLLBACK"))
            .map(|(_, p)| p.clone())
    }

    fn mark(&self, marker: &str) {
        self.script
            .lock()
            .calls
            .push((marker.to_string(), Params::new()));
    }

    fn next(&self, query: &str, params: &Params) -> Response {
        let mut script = self.script.lock();
        script.calls.push((query.to_string(), params.clone()));
        script.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn run(&self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        self.next(query, params)
    }

    async fn begin(&self) -> Result<Box<dyn DriverTransaction>, StoreError> {
        self.mark("BEGIN");
        Ok(Box::new(ScriptedTransaction {
            driver: self.clone(),
        }))
    }
}

struct ScriptedTransaction {
    driver: ScriptedDriver,
}

#[async_trait]
impl DriverTransaction for ScriptedTransaction {
    async fn run(&mut self, query: &str, params: &Params) -> Result<Vec<Record>, StoreError> {
        self.driver.next(query, params)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.driver.mark("COMMIT");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.driver.mark("ROLLBACK");
        Ok(())
    }
}
