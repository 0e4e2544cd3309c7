//! Where catalog data comes from.

use async_trait::async_trait;
use bestiary_core::{CreatureDetail, FetchError, NamedResource, ResourceList};

use crate::api_client::RestClient;

/// Remote catalog operations the [`Catalog`](crate::catalog::Catalog) builds on.
///
/// Implemented by [`RestClient`]; tests substitute an in-memory table.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list(&self, limit: usize, offset: usize) -> Result<ResourceList, FetchError>;

    async fn detail(&self, id_or_name: &str) -> Result<CreatureDetail, FetchError>;

    async fn types(&self) -> Result<Vec<NamedResource>, FetchError>;

    async fn by_type(&self, name: &str) -> Result<Vec<NamedResource>, FetchError>;
}

#[async_trait]
impl CatalogSource for RestClient {
    async fn list(&self, limit: usize, offset: usize) -> Result<ResourceList, FetchError> {
        RestClient::list(self, limit, offset).await
    }

    async fn detail(&self, id_or_name: &str) -> Result<CreatureDetail, FetchError> {
        RestClient::detail(self, id_or_name).await
    }

    async fn types(&self) -> Result<Vec<NamedResource>, FetchError> {
        RestClient::types(self).await
    }

    async fn by_type(&self, name: &str) -> Result<Vec<NamedResource>, FetchError> {
        RestClient::by_type(self, name).await
    }
}
