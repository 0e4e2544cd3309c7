//! REST client for the public creature catalog API.

use std::time::Duration;

use async_trait::async_trait;
use bestiary_core::{BestiaryConfig, CreatureDetail, FetchError, NamedResource, ResourceList};
use bestiary_storage::RecordFetcher;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ClientError;

/// `GET /type/{name}` payload; only the member list is kept.
#[derive(Debug, Deserialize)]
struct TypeMembers {
    pokemon: Vec<TypeMember>,
}

#[derive(Debug, Deserialize)]
struct TypeMember {
    pokemon: NamedResource,
}

/// `GET /type` payload.
#[derive(Debug, Deserialize)]
struct TypeIndex {
    results: Vec<NamedResource>,
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &BestiaryConfig) -> Result<Self, ClientError> {
        Self::with_base_url(&config.api_base_url, config.request_timeout())
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One page of the creature listing.
    pub async fn list(&self, limit: usize, offset: usize) -> Result<ResourceList, FetchError> {
        self.get_json(&format!("/pokemon?limit={limit}&offset={offset}"))
            .await
    }

    pub async fn detail(&self, id_or_name: &str) -> Result<CreatureDetail, FetchError> {
        let key = id_or_name.trim().to_lowercase();
        self.get_json(&format!("/pokemon/{key}")).await
    }

    /// All type names the API knows, including pseudo-types.
    pub async fn types(&self) -> Result<Vec<NamedResource>, FetchError> {
        let index: TypeIndex = self.get_json("/type").await?;
        Ok(index.results)
    }

    /// Every creature of one type, in API order.
    pub async fn by_type(&self, name: &str) -> Result<Vec<NamedResource>, FetchError> {
        let members: TypeMembers = self.get_json(&format!("/type/{name}")).await?;
        Ok(members.pokemon.into_iter().map(|m| m.pokemon).collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                resource: path.trim_start_matches('/').to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::InvalidResponse {
                url,
                reason: e.to_string(),
            })
    }
}

/// Fetches creature details keyed by id or name.
#[async_trait]
impl RecordFetcher<CreatureDetail> for RestClient {
    type Error = FetchError;

    async fn fetch(&self, id: &str) -> Result<CreatureDetail, FetchError> {
        self.detail(id).await
    }
}
