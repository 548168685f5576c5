use err_derive::Error;
use serde::{de::DeserializeOwned, Serialize};

use crate::ids::{Entity, Id};

#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend answered, but not with success. `message` is whatever
    /// explanation the backend gave, if any.
    #[error(display = "backend responded {}: {:?}", status, message)]
    Status { status: u16, message: Option<String> },
    #[error(display = "request failed: {}", _0)]
    Transport(#[error(source)] reqwest::Error),
    #[error(display = "could not decode response: {}", _0)]
    Decode(#[error(source)] serde_json::Error),
    #[error(display = "invalid backend url: {}", _0)]
    Url(#[error(source)] url::ParseError),
}

impl StorageError {
    /// The explanation offered by the backend, when there is one worth
    /// showing to a person.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            StorageError::Status {
                message: Some(m), ..
            } if !m.trim().is_empty() => Some(m.as_str()),
            _ => None,
        }
    }
}

/// Query-string predicates applied to a collection listing, eg:
/// `restaurants?cityId=...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pairs: Vec<(String, String)>,
}

impl Filter {
    pub fn all() -> Self {
        Filter::default()
    }

    pub fn by<V: ToString>(key: &str, value: V) -> Self {
        Filter::all().and(key, value)
    }

    pub fn and<V: ToString>(mut self, key: &str, value: V) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// One request, one response; nothing is cached or retried.
pub trait Storage {
    fn list<D: DeserializeOwned + Entity>(&self, filter: &Filter) -> Result<Vec<D>, StorageError>;
    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>, StorageError>;
    /// Returns the record as stored, with its assigned id.
    fn create<D: Serialize + DeserializeOwned + Entity>(
        &self,
        document: &D,
    ) -> Result<D, StorageError>;
    fn update<D: Serialize + Entity>(&self, id: &Id<D>, document: &D) -> Result<(), StorageError>;
    fn delete<D: Entity>(&self, id: &Id<D>) -> Result<(), StorageError>;
    /// Hands a batch of already-parsed rows to the collection's bulk import.
    fn upload<D: Serialize + Entity>(&self, documents: &[D]) -> Result<(), StorageError>;
}
