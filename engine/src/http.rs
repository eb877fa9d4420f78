//! HTTP client for the Tote document server.

use crate::{
    error::Result,
    remote::{Document, DocumentStore},
    ClientConfig, Error, UserId,
};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

/// Body returned by the document server.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentResponse {
    data: Document,
}

/// [`DocumentStore`] backed by `GET`/`PATCH /users/{user_id}`.
#[derive(Debug, Clone)]
pub struct HttpDocuments {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpDocuments {
    /// Build a client from configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let base = Url::parse(&config.remote_url)
            .map_err(|e| Error::InvalidConfig(format!("remote url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "remote url cannot be a base: {}",
                config.remote_url
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            base,
            token: config.auth_token.clone(),
        })
    }

    fn document_url(&self, user: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["users", user]);
        }
        url
    }

    fn request(&self, method: reqwest::Method, user: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.document_url(user));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn transport(err: reqwest::Error) -> Error {
    Error::Transport(err.to_string())
}

impl DocumentStore for HttpDocuments {
    async fn fetch_document(&self, user: &UserId) -> Result<Option<Document>> {
        let response = self
            .request(reqwest::Method::GET, user)
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: DocumentResponse = response
            .error_for_status()
            .map_err(transport)?
            .json()
            .await
            .map_err(|e| Error::MalformedData(e.to_string()))?;

        Ok(Some(body.data))
    }

    async fn merge_document(&self, user: &UserId, fields: Document) -> Result<()> {
        self.request(reqwest::Method::PATCH, user)
            .json(&fields)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;

        tracing::debug!(user = %user, "Merged remote document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_url_encodes_user() {
        let docs = HttpDocuments::from_config(&ClientConfig::new("http://localhost:3000/api/"))
            .unwrap();
        let url = docs.document_url("a b/c");
        assert_eq!(url.as_str(), "http://localhost:3000/api/users/a%20b%2Fc");
    }

    #[test]
    fn rejects_bad_url() {
        let result = HttpDocuments::from_config(&ClientConfig::new("not a url"));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        let result = HttpDocuments::from_config(&ClientConfig::new("mailto:shop@example.com"));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
