//! Contract of the remote `nameResolver` GraphQL query.
//!
//! Only the data types live here: the request variables, the response shape,
//! and [`NameResolver`], the seam a client implementation plugs into. This
//! crate does not ship such a client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://index.globalnames.org/api/graphql";

pub const NAME_RESOLVER_QUERY: &str = r#"query($names: [name!]!, $sources: [Int!]!) {
  nameResolver(names: $names, dataSourceIds: $sources) {
    responses {
      total
      suppliedInput
      results {
        name { value }
        dataSource { id title }
        vernaculars { name language }
      }
    }
  }
}"#;

#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, request: &ResolveRequest) -> Result<ResolveResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameInput {
    pub value: String,
}

/// Variables of [`NAME_RESOLVER_QUERY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub names: Vec<NameInput>,
    pub sources: Vec<i32>,
}

impl ResolveRequest {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(|value| NameInput {
                    value: value.into(),
                })
                .collect(),
            sources: vec![],
        }
    }

    pub fn sources(mut self, sources: impl IntoIterator<Item = i32>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    /// Request body: `{"query": ..., "variables": {...}}`.
    pub fn to_graphql(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "query": NAME_RESOLVER_QUERY,
            "variables": serde_json::to_value(self)?,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceRef {
    pub id: i32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vernacular {
    pub name: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedName {
    pub name: NameInput,
    pub data_source: DataSourceRef,
    #[serde(default)]
    pub vernaculars: Vec<Vernacular>,
}

/// Matches for one supplied name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameResponse {
    pub total: u32,
    pub supplied_input: String,
    #[serde(default)]
    pub results: Vec<ResolvedName>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub responses: Vec<NameResponse>,
}

/// A matched name with the vernacular names of all its matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameVernaculars {
    pub name: String,
    pub vernaculars: Vec<Vernacular>,
}

impl ResolveResponse {
    /// Parses a GraphQL response body, failing on a non-empty `errors` list.
    pub fn from_graphql(body: &str) -> Result<Self> {
        let envelope: GraphqlEnvelope = serde_json::from_str(body)?;

        if let Some(error) = envelope.errors.first() {
            return Err(Error::Resolver(error.message.to_owned()));
        }

        envelope
            .data
            .map(|data| data.name_resolver)
            .ok_or_else(|| Error::Resolver("response has no data".to_owned()))
    }

    /// Walks the matches, skipping names that matched nothing. The name
    /// reported is the one of the last match.
    pub fn vernaculars(&self) -> Vec<NameVernaculars> {
        self.responses
            .iter()
            .filter(|response| response.total > 0)
            .filter_map(|response| {
                let name = response.results.last()?.name.value.to_owned();
                let vernaculars = response
                    .results
                    .iter()
                    .flat_map(|result| result.vernaculars.iter().cloned())
                    .collect();

                Some(NameVernaculars { name, vernaculars })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct GraphqlEnvelope {
    data: Option<GraphqlData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlData {
    name_resolver: ResolveResponse,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}
