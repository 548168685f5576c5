use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use log::*;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::ids::{Entity, Id};
use crate::persistence::{Filter, Storage, StorageError};

/// An in-process stand-in for the back-office API. Records are kept as JSON
/// so that they round-trip through serde exactly as they would over HTTP.
#[derive(Debug, Default)]
pub struct MemStorage {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: BTreeMap<&'static str, BTreeMap<String, Value>>,
    next_id: u64,
    failures: VecDeque<(u16, Option<String>)>,
    requests: Vec<String>,
}

impl MemStorage {
    pub fn new() -> Self {
        MemStorage::default()
    }

    /// Makes the next request, whatever it is, fail with `status`.
    pub fn fail_next(&self, status: u16, message: Option<&str>) {
        self.lock()
            .failures
            .push_back((status, message.map(str::to_string)));
    }

    /// Requests seen so far, as `METHOD collection`.
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    pub fn len<D: Entity>(&self) -> usize {
        self.lock()
            .collections
            .get(D::PREFIX)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin<D: Entity>(&self, method: &str) -> Result<MutexGuard<Inner>, StorageError> {
        let mut inner = self.lock();
        inner.requests.push(format!("{} {}", method, D::PREFIX));
        if let Some((status, message)) = inner.failures.pop_front() {
            debug!("Injected failure for {} {}: {}", method, D::PREFIX, status);
            return Err(StorageError::Status { status, message });
        }
        Ok(inner)
    }
}

impl Inner {
    fn insert<D: Serialize + Entity>(&mut self, document: &D) -> Result<Value, StorageError> {
        self.next_id += 1;
        let id = format!("{:024x}", self.next_id);
        let mut json = serde_json::to_value(document).map_err(StorageError::Decode)?;
        match json.as_object_mut() {
            Some(map) => {
                map.insert("_id".to_string(), Value::String(id.clone()));
            }
            None => return Err(bad_request("record must be a JSON object")),
        }
        self.collections
            .entry(D::PREFIX)
            .or_default()
            .insert(id, json.clone());
        Ok(json)
    }
}

fn not_found() -> StorageError {
    StorageError::Status {
        status: 404,
        message: Some("Not found".to_string()),
    }
}

fn bad_request(message: &str) -> StorageError {
    StorageError::Status {
        status: 400,
        message: Some(message.to_string()),
    }
}

fn matches(doc: &Value, filter: &Filter) -> bool {
    filter.pairs().all(|(k, v)| match doc.get(k) {
        Some(Value::String(s)) => s == v,
        Some(Value::Array(items)) => items.iter().any(|i| i.as_str() == Some(v)),
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == v,
    })
}

impl Storage for MemStorage {
    fn list<D: DeserializeOwned + Entity>(&self, filter: &Filter) -> Result<Vec<D>, StorageError> {
        let inner = self.begin::<D>("GET")?;
        inner
            .collections
            .get(D::PREFIX)
            .into_iter()
            .flat_map(|c| c.values())
            .filter(|doc| matches(doc, filter))
            .map(|doc| serde_json::from_value(doc.clone()).map_err(StorageError::Decode))
            .collect()
    }

    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>, StorageError> {
        let inner = self.begin::<D>("GET")?;
        inner
            .collections
            .get(D::PREFIX)
            .and_then(|c| c.get(id.as_str()))
            .map(|doc| serde_json::from_value(doc.clone()).map_err(StorageError::Decode))
            .transpose()
    }

    fn create<D: Serialize + DeserializeOwned + Entity>(
        &self,
        document: &D,
    ) -> Result<D, StorageError> {
        let mut inner = self.begin::<D>("POST")?;
        let stored = inner.insert(document)?;
        serde_json::from_value(stored).map_err(StorageError::Decode)
    }

    fn update<D: Serialize + Entity>(&self, id: &Id<D>, document: &D) -> Result<(), StorageError> {
        let mut inner = self.begin::<D>("PUT")?;
        let slot = inner
            .collections
            .get_mut(D::PREFIX)
            .and_then(|c| c.get_mut(id.as_str()))
            .ok_or_else(not_found)?;
        let mut json = serde_json::to_value(document).map_err(StorageError::Decode)?;
        let map = json
            .as_object_mut()
            .ok_or_else(|| bad_request("record must be a JSON object"))?;
        map.insert("_id".to_string(), Value::String(id.as_str().to_string()));
        *slot = json;
        Ok(())
    }

    fn delete<D: Entity>(&self, id: &Id<D>) -> Result<(), StorageError> {
        let mut inner = self.begin::<D>("DELETE")?;
        inner
            .collections
            .get_mut(D::PREFIX)
            .and_then(|c| c.remove(id.as_str()))
            .map(|_| ())
            .ok_or_else(not_found)
    }

    fn upload<D: Serialize + Entity>(&self, documents: &[D]) -> Result<(), StorageError> {
        let mut inner = self.begin::<D>("UPLOAD")?;
        for doc in documents {
            inner.insert(doc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::documents::{DocMeta, HasMeta};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct City {
        #[serde(flatten)]
        meta: DocMeta<City>,
        name: String,
        state: String,
    }
    crate::entity!(City, "cities");

    fn city(name: &str, state: &str) -> City {
        City {
            meta: DocMeta::default(),
            name: name.into(),
            state: state.into(),
        }
    }

    #[test]
    fn create_assigns_ids() {
        env_logger::try_init().unwrap_or_default();
        let store = MemStorage::new();
        let a = store.create(&city("Pune", "MH")).expect("create");
        let b = store.create(&city("Goa", "GA")).expect("create");
        assert!(a.id().is_some());
        assert_ne!(a.id(), b.id());
        assert_eq!(store.len::<City>(), 2);
    }

    #[test]
    fn list_applies_filters() {
        let store = MemStorage::new();
        store.create(&city("Pune", "MH")).expect("create");
        store.create(&city("Mumbai", "MH")).expect("create");
        store.create(&city("Goa", "GA")).expect("create");

        let mh = store
            .list::<City>(&Filter::by("state", "MH"))
            .expect("list");
        let names = mh.into_iter().map(|c| c.name).collect::<Vec<_>>();
        assert_eq!(names, vec!["Pune".to_string(), "Mumbai".to_string()]);
    }

    #[test]
    fn update_and_delete_missing_records_are_not_found() {
        let store = MemStorage::new();
        let id = "nope".parse::<Id<City>>().expect("id");
        let err = store.update(&id, &city("X", "Y")).expect_err("update");
        assert_eq!(err.server_message(), Some("Not found"));
        let err = store.delete(&id).expect_err("delete");
        assert_eq!(err.server_message(), Some("Not found"));
    }

    #[test]
    fn update_replaces_the_record() {
        let store = MemStorage::new();
        let saved = store.create(&city("Bombay", "MH")).expect("create");
        let id = saved.id().cloned().expect("id");
        store.update(&id, &city("Mumbai", "MH")).expect("update");
        let loaded = store.load(&id).expect("load").expect("present");
        assert_eq!(loaded.name, "Mumbai");
        assert_eq!(loaded.id(), Some(&id));
    }

    #[test]
    fn injected_failures_apply_once() {
        let store = MemStorage::new();
        store.fail_next(500, Some("database down"));
        let err = store.list::<City>(&Filter::all()).expect_err("list");
        assert_eq!(err.server_message(), Some("database down"));
        assert!(store.list::<City>(&Filter::all()).is_ok());
        assert_eq!(store.requests(), vec!["GET cities", "GET cities"]);
    }
}
