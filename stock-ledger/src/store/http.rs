//! HTTP 文档存储 - 远程 REST 后端
//!
//! | Operation | Request |
//! |-----------|---------|
//! | get | `GET {base}/{collection}/{id}` |
//! | list | `GET {base}/{collection}` → `{ id: document, ... }` |
//! | set | `PUT {base}/{collection}/{id}` |
//! | update | `PATCH {base}/{collection}/{id}` (shallow merge) |
//! | delete | `DELETE {base}/{collection}/{id}` |
//!
//! Connection failures and 5xx map to [`StoreError::Unavailable`], 404 to
//! [`StoreError::NotFound`].

use super::{Document, DocumentStore, StoreError, StoreResult};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    /// 存储服务地址
    base_url: Url,
    token: Option<String>,
}

impl HttpDocumentStore {
    /// Build a client; `timeout` bounds every single request
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        let base_url: String = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| StoreError::Unavailable(format!("invalid store URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Unavailable(format!("invalid store URL {base_url}")));
        }

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// 设置认证令牌
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Collection and id are pushed as escaped path segments
    fn url(&self, collection: &str, id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(collection);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        collection: &str,
        id: Option<&str>,
        body: Option<&Document>,
    ) -> StoreResult<reqwest::Response> {
        let mut request = self.client.request(method, self.url(collection, id));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::not_found(collection, id.unwrap_or_default()),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                StoreError::InvalidDocument(text)
            }
            _ => StoreError::Unavailable(format!("{status}: {text}")),
        })
    }
}

fn map_transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Unavailable(format!("request timed out: {err}"))
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

/// Parse a list response: either an `{id: doc}` object or an array of docs with `id`
fn parse_list(body: Value) -> StoreResult<Vec<(String, Document)>> {
    let mut docs: Vec<(String, Document)> = match body {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|doc| {
                let id = doc.get("id").and_then(Value::as_str)?.to_string();
                Some((id, doc))
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(StoreError::InvalidDocument(format!(
                "unexpected list response: {other}"
            )));
        }
    };
    docs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(docs)
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Document> {
        let response = self.send(Method::GET, collection, Some(id), None).await?;
        let doc: Value = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
        if doc.is_null() {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(doc)
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Document)>> {
        let response = self.send(Method::GET, collection, None, None).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
        parse_list(body)
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        self.send(Method::PUT, collection, Some(id), Some(&doc)).await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, partial: Document) -> StoreResult<()> {
        if !partial.is_object() {
            return Err(StoreError::InvalidDocument(
                "partial update must be a JSON object".into(),
            ));
        }
        self.send(Method::PATCH, collection, Some(id), Some(&partial))
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.send(Method::DELETE, collection, Some(id), None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_building_trims_slash() {
        let store = HttpDocumentStore::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(store.base_url(), "http://localhost:8080");
        assert_eq!(store.url("products", Some("p1")).as_str(), "http://localhost:8080/products/p1");
        assert_eq!(store.url("stores", None).as_str(), "http://localhost:8080/stores");

        let nested = HttpDocumentStore::new("http://localhost:8080/api/v1", Duration::from_secs(1)).unwrap();
        assert_eq!(nested.url("stores", Some("s1")).as_str(), "http://localhost:8080/api/v1/stores/s1");
    }

    #[test]
    fn test_ids_are_escaped() {
        let store = HttpDocumentStore::new("http://localhost:8080", Duration::from_secs(1)).unwrap();
        let url = store.url("products", Some("a/b?c#d"));
        assert_eq!(url.as_str(), "http://localhost:8080/products/a%2Fb%3Fc%23d");
        assert_eq!(url.path_segments().unwrap().count(), 2);
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(HttpDocumentStore::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpDocumentStore::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_parse_list_object_and_array() {
        let docs = parse_list(json!({"b": {"n": 2}, "a": {"n": 1}})).unwrap();
        assert_eq!(docs[0].0, "a");
        assert_eq!(docs[1].0, "b");

        let docs = parse_list(json!([{"id": "x", "n": 1}, {"n": 2}])).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "x");

        assert!(parse_list(Value::Null).unwrap().is_empty());
        assert!(parse_list(json!(42)).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // 端口 9 (discard) 本地通常无人监听
        let store = HttpDocumentStore::new("http://127.0.0.1:9", Duration::from_millis(300)).unwrap();
        let err = store.get("products", "p1").await.unwrap_err();
        assert!(err.is_transient());
    }
}
