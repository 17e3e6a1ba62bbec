use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, Response};
use shared::{
    domain::{EntryId, ExerciseKind},
    error::ApiError,
    protocol::{CreateEntryRequest, Entry, EntryFields},
};
use tracing::{debug, warn};
use url::Url;

use crate::{credentials::CredentialProvider, error::ClientError, grouping::sort_newest_first};

/// The remote CRUD API that persists entries, one collection per exercise.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn fetch_entries(&self, kind: &ExerciseKind) -> Result<Vec<Entry>, ClientError>;
    async fn create_entry(
        &self,
        kind: &ExerciseKind,
        fields: EntryFields,
    ) -> Result<Entry, ClientError>;
    async fn delete_entry(&self, kind: &ExerciseKind, id: &EntryId) -> Result<(), ClientError>;
}

pub struct HttpEntryStore {
    http: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpEntryStore {
    pub fn new(
        base_url: Url,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        if base_url.cannot_be_a_base() {
            return Err(ClientError::validation(format!(
                "entry store url {base_url} cannot carry a path"
            )));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    fn endpoint(&self, kind: &ExerciseKind, id: Option<&EntryId>) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ClientError::validation(format!("entry store url {} cannot carry a path", self.base_url))
            })?;
            segments.pop_if_empty().push("entries").push(kind.as_ref());
            if let Some(id) = id {
                segments.push(id.as_ref());
            }
        }
        Ok(url)
    }

    async fn token(&self) -> Result<String, ClientError> {
        self.credentials
            .bearer_token()
            .await
            .ok_or(ClientError::AuthMissing)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ApiError>(&text).ok();
    let fallback = if text.trim().is_empty() {
        status.to_string()
    } else {
        text
    };
    warn!(status = status.as_u16(), "entry store: request rejected");
    Err(ClientError::server(status.as_u16(), body, fallback))
}

#[async_trait]
impl EntryStore for HttpEntryStore {
    async fn fetch_entries(&self, kind: &ExerciseKind) -> Result<Vec<Entry>, ClientError> {
        let token = self.token().await?;
        let url = self.endpoint(kind, None)?;
        debug!(exercise = %kind, %url, "entry store: fetch");
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let entries = ensure_success(response).await?.json().await?;
        Ok(entries)
    }

    async fn create_entry(
        &self,
        kind: &ExerciseKind,
        fields: EntryFields,
    ) -> Result<Entry, ClientError> {
        let token = self.token().await?;
        let url = self.endpoint(kind, None)?;
        debug!(exercise = %kind, fields = fields.len(), "entry store: create");
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&CreateEntryRequest { fields })
            .send()
            .await?;
        let entry = ensure_success(response).await?.json().await?;
        Ok(entry)
    }

    async fn delete_entry(&self, kind: &ExerciseKind, id: &EntryId) -> Result<(), ClientError> {
        let token = self.token().await?;
        let url = self.endpoint(kind, Some(id))?;
        debug!(exercise = %kind, entry_id = %id, "entry store: delete");
        let response = self.http.delete(url).bearer_auth(token).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Result of fetching several exercise collections at once.
#[derive(Debug, Clone)]
pub struct MultiKindSnapshot {
    pub results: Vec<(ExerciseKind, Result<Vec<Entry>, ClientError>)>,
}

impl MultiKindSnapshot {
    /// Entries for `kind`, or an empty slice if that fetch failed.
    pub fn entries(&self, kind: &ExerciseKind) -> &[Entry] {
        self.results
            .iter()
            .find(|(candidate, _)| candidate == kind)
            .and_then(|(_, result)| result.as_ref().ok())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ExerciseKind, &ClientError)> {
        self.results
            .iter()
            .filter_map(|(kind, result)| result.as_ref().err().map(|err| (kind, err)))
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Fetches every kind concurrently and waits for all of them to settle.
/// One failed fetch does not discard the others.
pub async fn load_kinds(store: &dyn EntryStore, kinds: &[ExerciseKind]) -> MultiKindSnapshot {
    let fetches = kinds.iter().map(|kind| async move {
        let result = store.fetch_entries(kind).await.map(|mut entries| {
            sort_newest_first(&mut entries);
            entries
        });
        if let Err(err) = &result {
            warn!(exercise = %kind, error = %err, "entry store: parallel fetch failed");
        }
        (kind.clone(), result)
    });
    MultiKindSnapshot {
        results: join_all(fetches).await,
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
