use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::RequestBuilder;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::database_path;
use super::request_timer::RequestTimer;
use super::AdminApi;
use super::ApiEnvelope;
use super::CollectionOptions;
use super::DatabaseProperties;
use super::InsertedDocument;
use super::RawResponse;
use crate::constants::COLLECTION_API;
use crate::constants::CURRENT_DATABASE_API;
use crate::constants::DATABASE_API;
use crate::constants::DOCUMENT_API;
use crate::constants::ROUTING_RELOAD_PATH;
use crate::ClientConfig;
use crate::ClusterConfig;
use crate::HttpError;
use crate::Result;
use crate::SetupError;

/// [`AdminApi`] over HTTP.
///
/// Redirects are not followed so their status and `Location` header stay
/// observable through [`AdminApi::raw_get`].
#[derive(Clone)]
pub struct HttpAdminClient {
    pub(super) http: reqwest::Client,
    pub(super) config: ClientConfig,
}

impl Debug for HttpAdminClient {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("HttpAdminClient")
            .field("endpoint", &self.config.endpoint)
            .field("username", &self.config.username)
            .finish()
    }
}

struct Answer {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: String,
}

impl HttpAdminClient {
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn url(
        &self,
        path: &str,
    ) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
    ) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        if self.config.username.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.config.username, Some(&self.config.password))
        }
    }

    async fn send(
        &self,
        method: &'static str,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<Answer> {
        let _timer = RequestTimer::new(method, path);

        let response = builder.send().await.map_err(|source| HttpError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await.map_err(|source| HttpError::Transport {
            path: path.to_string(),
            source,
        })?;

        debug!("[:HttpAdminClient] {method} {path} -> {}", status.as_u16());
        Ok(Answer { status, headers, body })
    }

    fn unexpected(
        method: &'static str,
        path: &str,
        answer: Answer,
    ) -> crate::Error {
        HttpError::Status {
            method,
            path: path.to_string(),
            status: answer.status.as_u16(),
            body: answer.body,
        }
        .into()
    }

    fn decode<T: DeserializeOwned>(
        path: &str,
        body: &str,
    ) -> Result<T> {
        serde_json::from_str(body).map_err(|e| {
            HttpError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl AdminApi for HttpAdminClient {
    async fn create_database(
        &self,
        name: &str,
        config: Option<ClusterConfig>,
    ) -> Result<()> {
        let body = match config {
            Some(config) => json!({ "name": name, "options": config }),
            None => json!({ "name": name }),
        };
        let answer = self
            .send("POST", DATABASE_API, self.request(Method::POST, DATABASE_API).json(&body))
            .await?;

        match answer.status {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            StatusCode::CONFLICT => Err(SetupError::AlreadyExists { name: name.to_string() }.into()),
            _ => Err(Self::unexpected("POST", DATABASE_API, answer)),
        }
    }

    async fn drop_database(
        &self,
        name: &str,
    ) -> Result<()> {
        let path = format!("{DATABASE_API}/{name}");
        let answer = self.send("DELETE", &path, self.request(Method::DELETE, &path)).await?;

        match answer.status {
            StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
            StatusCode::NOT_FOUND => Err(HttpError::NotFound {
                resource: format!("database {name}"),
            }
            .into()),
            _ => Err(Self::unexpected("DELETE", &path, answer)),
        }
    }

    async fn database_properties(
        &self,
        database: &str,
    ) -> Result<DatabaseProperties> {
        let path = database_path(database, CURRENT_DATABASE_API);
        let answer = self.send("GET", &path, self.request(Method::GET, &path)).await?;

        match answer.status {
            StatusCode::OK => {
                let envelope: ApiEnvelope<DatabaseProperties> = Self::decode(&path, &answer.body)?;
                Ok(envelope.result)
            }
            StatusCode::NOT_FOUND => Err(HttpError::NotFound {
                resource: format!("database {database}"),
            }
            .into()),
            _ => Err(Self::unexpected("GET", &path, answer)),
        }
    }

    async fn create_collection(
        &self,
        database: &str,
        options: CollectionOptions,
    ) -> Result<()> {
        let path = database_path(database, COLLECTION_API);
        let answer = self
            .send("POST", &path, self.request(Method::POST, &path).json(&options))
            .await?;

        match answer.status {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            StatusCode::CONFLICT => Err(HttpError::Conflict {
                resource: format!("collection {}", options.name),
            }
            .into()),
            _ => Err(Self::unexpected("POST", &path, answer)),
        }
    }

    async fn drop_collection(
        &self,
        database: &str,
        name: &str,
        is_system: bool,
    ) -> Result<()> {
        let path = database_path(database, &format!("{COLLECTION_API}/{name}"));
        let builder = self
            .request(Method::DELETE, &path)
            .query(&[("isSystem", is_system)]);
        let answer = self.send("DELETE", &path, builder).await?;

        match answer.status {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(HttpError::NotFound {
                resource: format!("collection {name}"),
            }
            .into()),
            _ => Err(Self::unexpected("DELETE", &path, answer)),
        }
    }

    async fn insert_document(
        &self,
        database: &str,
        collection: &str,
        body: serde_json::Value,
    ) -> Result<InsertedDocument> {
        let path = database_path(database, DOCUMENT_API);
        let builder = self
            .request(Method::POST, &path)
            .query(&[("collection", collection)])
            .json(&body);
        let answer = self.send("POST", &path, builder).await?;

        match answer.status {
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                let mut document: InsertedDocument = Self::decode(&path, &answer.body)?;
                document.status = answer.status.as_u16();
                Ok(document)
            }
            StatusCode::NOT_FOUND => Err(HttpError::NotFound {
                resource: format!("collection {collection}"),
            }
            .into()),
            _ => Err(Self::unexpected("POST", &path, answer)),
        }
    }

    async fn remove_document(
        &self,
        database: &str,
        id: &str,
    ) -> Result<()> {
        let path = database_path(database, &format!("{DOCUMENT_API}/{id}"));
        let answer = self.send("DELETE", &path, self.request(Method::DELETE, &path)).await?;

        match answer.status {
            StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
            StatusCode::NOT_FOUND => Err(HttpError::NotFound {
                resource: format!("document {id}"),
            }
            .into()),
            _ => Err(Self::unexpected("DELETE", &path, answer)),
        }
    }

    async fn trigger_routing_reload(
        &self,
        database: &str,
    ) -> Result<()> {
        let path = database_path(database, ROUTING_RELOAD_PATH);
        let answer = self.send("GET", &path, self.request(Method::GET, &path)).await?;

        if answer.status.is_success() {
            Ok(())
        } else {
            Err(Self::unexpected("GET", &path, answer))
        }
    }

    async fn raw_get(
        &self,
        path: &str,
        headers: Vec<(String, String)>,
    ) -> Result<RawResponse> {
        let mut builder = self.request(Method::GET, path);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let answer = self.send("GET", path, builder).await?;

        Ok(RawResponse {
            status: answer.status.as_u16(),
            headers: answer.headers,
            body: answer.body,
        })
    }
}
