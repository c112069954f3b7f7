//! Mock implementations for testing

use crate::domain::models::{StoredResult, TermDefinition};
use crate::error::{AppError, Result};
use crate::ports::knowledge::KnowledgePort;
use crate::ports::storage::StoragePort;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock storage implementation for testing
#[derive(Clone, Default)]
pub struct MockStorage {
    results: Arc<Mutex<HashMap<(String, String), StoredResult>>>,
    offline: Arc<Mutex<bool>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    /// Make `ping` fail from now on
    pub fn set_offline(&self) {
        *self.offline.lock().unwrap() = true;
    }
}

#[async_trait]
impl StoragePort for MockStorage {
    async fn save_result(&self, result: &StoredResult) -> Result<()> {
        let key = (result.owner_uid.clone(), result.session_id.clone());
        let mut results = self.results.lock().unwrap();
        let mut stored = result.clone();
        if let Some(existing) = results.get(&key) {
            stored.created_at = existing.created_at;
        }
        results.insert(key, stored);
        Ok(())
    }

    async fn get_result(&self, owner_uid: &str, session_id: &str) -> Result<Option<StoredResult>> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(&(owner_uid.to_string(), session_id.to_string()))
            .cloned())
    }

    async fn list_results(&self, owner_uid: &str, limit: Option<i32>) -> Result<Vec<StoredResult>> {
        let results = self.results.lock().unwrap();
        let mut list: Vec<_> = results
            .values()
            .filter(|r| r.owner_uid == owner_uid)
            .cloned()
            .collect();
        list.sort_by_key(|r| -r.updated_at);

        // Mirrors SQLite, where a negative LIMIT means no limit
        if let Some(limit) = limit.filter(|l| *l >= 0) {
            list.truncate(limit as usize);
        }
        Ok(list)
    }

    async fn delete_result(&self, owner_uid: &str, session_id: &str) -> Result<bool> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .remove(&(owner_uid.to_string(), session_id.to_string()))
            .is_some())
    }

    async fn ping(&self) -> Result<()> {
        if *self.offline.lock().unwrap() {
            return Err(AppError::Other("storage offline".to_string()));
        }
        Ok(())
    }
}

/// Knowledge base backed by a fixed list of definitions
#[derive(Clone, Default)]
pub struct StaticKnowledge {
    definitions: Vec<TermDefinition>,
    lookups: Arc<Mutex<Vec<Vec<String>>>>,
}

impl StaticKnowledge {
    pub fn new(definitions: Vec<(&str, &str)>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .map(|(term, definition)| TermDefinition {
                    term: term.to_string(),
                    definition: definition.to_string(),
                })
                .collect(),
            lookups: Arc::default(),
        }
    }

    /// Term lists received so far, in call order
    pub fn lookups(&self) -> Vec<Vec<String>> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgePort for StaticKnowledge {
    async fn lookup_terms(&self, terms: &[String]) -> Result<Vec<TermDefinition>> {
        self.lookups.lock().unwrap().push(terms.to_vec());
        Ok(self
            .definitions
            .iter()
            .filter(|d| {
                let term = d.term.to_lowercase();
                terms.iter().any(|t| term.contains(t.as_str()))
            })
            .cloned()
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}
