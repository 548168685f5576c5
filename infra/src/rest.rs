use std::time::Duration;

use log::*;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::ids::{Entity, Id};
use crate::persistence::{Filter, Storage, StorageError};

/// `Storage` over the back-office JSON API, eg: `http://localhost:4040/api/`.
#[derive(Debug, Clone)]
pub struct RestStorage {
    base: Url,
    client: Client,
    token: Option<String>,
}

impl RestStorage {
    pub fn new(base: &str, timeout: Option<Duration>) -> Result<Self, StorageError> {
        let base = Self::normalise_base(base)?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(StorageError::Transport)?;
        debug!("Rest storage at {}", base);
        Ok(RestStorage {
            base,
            client,
            token: None,
        })
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    // `Url::join` drops the last segment of a base without a trailing slash.
    fn normalise_base(base: &str) -> Result<Url, StorageError> {
        let mut base = base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base).map_err(StorageError::Url)
    }

    fn collection_url<D: Entity>(&self, filter: &Filter) -> Result<Url, StorageError> {
        let mut url = self.base.join(D::PREFIX).map_err(StorageError::Url)?;
        if !filter.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in filter.pairs() {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn document_url<D: Entity>(&self, suffix: &str) -> Result<Url, StorageError> {
        self.base
            .join(&format!("{}/{}", D::PREFIX, suffix))
            .map_err(StorageError::Url)
    }

    fn send(&self, req: RequestBuilder) -> Result<Response, StorageError> {
        let req = match self.token.as_ref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let resp = req.send().map_err(|e| {
            warn!("Request failed: {}", e);
            StorageError::Transport(e)
        })?;
        Self::check(resp)
    }

    fn check(resp: Response) -> Result<Response, StorageError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let url = resp.url().clone();
        let message = resp.text().ok().and_then(|body| extract_message(&body));
        warn!("{} answered {}: {:?}", url, status, message);
        Err(StorageError::Status {
            status: status.as_u16(),
            message,
        })
    }

    fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, StorageError> {
        let body = resp.text().map_err(StorageError::Transport)?;
        trace!("Response body: {}", body);
        serde_json::from_str(&body).map_err(StorageError::Decode)
    }
}

/// Pulls a human-readable explanation out of an error response body. The
/// backend answers either `{"message": ...}`, `{"error": ...}` or plain text.
pub fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => ["message", "error"]
            .iter()
            .filter_map(|k| map.get(*k))
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty()),
        Ok(serde_json::Value::String(s)) => Some(s),
        Ok(_) => None,
        Err(_) if body.starts_with('<') => None,
        Err(_) => Some(body.to_string()),
    }
}

impl Storage for RestStorage {
    fn list<D: DeserializeOwned + Entity>(&self, filter: &Filter) -> Result<Vec<D>, StorageError> {
        let url = self.collection_url::<D>(filter)?;
        debug!("GET {}", url);
        let resp = self.send(self.client.get(url))?;
        Self::decode(resp)
    }

    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>, StorageError> {
        let url = self.document_url::<D>(id.as_str())?;
        debug!("GET {}", url);
        match self.send(self.client.get(url)) {
            Ok(resp) => Self::decode(resp).map(Some),
            Err(StorageError::Status { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn create<D: Serialize + DeserializeOwned + Entity>(
        &self,
        document: &D,
    ) -> Result<D, StorageError> {
        let url = self.collection_url::<D>(&Filter::all())?;
        debug!("POST {}", url);
        let resp = self.send(self.client.post(url).json(document))?;
        Self::decode(resp)
    }

    fn update<D: Serialize + Entity>(&self, id: &Id<D>, document: &D) -> Result<(), StorageError> {
        let url = self.document_url::<D>(id.as_str())?;
        debug!("PUT {}", url);
        self.send(self.client.put(url).json(document))?;
        Ok(())
    }

    fn delete<D: Entity>(&self, id: &Id<D>) -> Result<(), StorageError> {
        let url = self.document_url::<D>(id.as_str())?;
        debug!("DELETE {}", url);
        self.send(self.client.delete(url))?;
        Ok(())
    }

    fn upload<D: Serialize + Entity>(&self, documents: &[D]) -> Result<(), StorageError> {
        let url = self.document_url::<D>("upload")?;
        debug!("POST {} ({} rows)", url, documents.len());
        self.send(self.client.post(url).json(documents))?;
        Ok(())
    }
}
