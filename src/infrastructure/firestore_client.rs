use crate::domain::models::{DayKey, DayStatus};
use crate::infrastructure::config::FirebaseConfig;
use crate::infrastructure::document_mapper::{
    FirestoreDocument, FirestoreErrorEnvelope, day_field_path, encode_day_status,
};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1/";
const DEFAULT_DATABASE: &str = "(default)";

/// Location of the single document that holds every tracked day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    pub collection: String,
    pub document_id: String,
}

#[async_trait]
pub trait DocumentStoreClient: Send + Sync {
    /// Reads the document; `None` when it has never been written.
    async fn get_document(&self) -> Result<Option<FirestoreDocument>, InfraError>;

    /// Sets `days.<key>` without touching sibling keys, creating the document
    /// when needed.
    async fn merge_day(&self, key: DayKey, status: DayStatus) -> Result<(), InfraError>;

    /// Removes `days.<key>`. Fails with [`InfraError::DocumentMissing`] when
    /// the document does not exist.
    async fn delete_day(&self, key: DayKey) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFirestoreClient {
    client: Client,
    api_key: String,
    document_url: Url,
}

impl ReqwestFirestoreClient {
    pub fn new(config: &FirebaseConfig, location: &DocumentLocation) -> Result<Self, InfraError> {
        Self::with_base_url(FIRESTORE_API_BASE, config, location)
    }

    pub fn with_base_url(
        base_url: &str,
        config: &FirebaseConfig,
        location: &DocumentLocation,
    ) -> Result<Self, InfraError> {
        Self::ensure_non_empty(&config.api_key, "api key")?;
        Self::ensure_non_empty(&config.project_id, "project id")?;
        Ok(Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            document_url: Self::document_endpoint(base_url, &config.project_id, location)?,
        })
    }

    pub fn document_url(&self) -> &Url {
        &self.document_url
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::InvalidConfig(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn document_endpoint(
        base_url: &str,
        project_id: &str,
        location: &DocumentLocation,
    ) -> Result<Url, InfraError> {
        let mut url = Url::parse(base_url).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid firestore api base url: {error}"))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("firestore api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("projects");
            segments.push(project_id.trim());
            segments.push("databases");
            segments.push(DEFAULT_DATABASE);
            segments.push("documents");
            segments.push(location.collection.trim());
            segments.push(location.document_id.trim());
        }
        Ok(url)
    }

    fn remote_error(status: StatusCode, body: &str) -> InfraError {
        let detail = serde_json::from_str::<FirestoreErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error)
            .and_then(|error| error.message)
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty());
        let message = match detail {
            Some(detail) => format!("http {}: {detail}", status.as_u16()),
            None if body.trim().is_empty() => format!("http {}", status.as_u16()),
            None => format!("http {}; body={body}", status.as_u16()),
        };
        InfraError::Remote(message)
    }

    fn is_missing_document(status: StatusCode, body: &str) -> bool {
        if status == StatusCode::NOT_FOUND {
            return true;
        }
        serde_json::from_str::<FirestoreErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error)
            .and_then(|error| error.status)
            .is_some_and(|status| status == "NOT_FOUND" || status == "FAILED_PRECONDITION")
    }
}

#[async_trait]
impl DocumentStoreClient for ReqwestFirestoreClient {
    async fn get_document(&self) -> Result<Option<FirestoreDocument>, InfraError> {
        let response = self
            .client
            .get(self.document_url.clone())
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("failed reading day document: {error}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Network(format!("failed reading day document response: {error}"))
        })?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::remote_error(status, &body));
        }

        let parsed: FirestoreDocument = serde_json::from_str(&body).map_err(|error| {
            InfraError::Remote(format!("invalid day document payload: {error}"))
        })?;
        Ok(Some(parsed))
    }

    async fn merge_day(&self, key: DayKey, status: DayStatus) -> Result<(), InfraError> {
        let field_path = day_field_path(key);
        let response = self
            .client
            .patch(self.document_url.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("updateMask.fieldPaths", field_path.as_str()),
            ])
            .json(&encode_day_status(key, status))
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("failed writing day {key}: {error}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Network(format!("failed reading write response for day {key}: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::remote_error(status, &body));
        }
        Ok(())
    }

    async fn delete_day(&self, key: DayKey) -> Result<(), InfraError> {
        let field_path = day_field_path(key);
        // Masked field absent from the body means "delete it".
        let response = self
            .client
            .patch(self.document_url.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("updateMask.fieldPaths", field_path.as_str()),
                ("currentDocument.exists", "true"),
            ])
            .json(&FirestoreDocument::default())
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("failed clearing day {key}: {error}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Network(format!("failed reading clear response for day {key}: {error}"))
        })?;

        if status.is_success() {
            return Ok(());
        }
        if Self::is_missing_document(status, &body) {
            return Err(InfraError::DocumentMissing);
        }
        Err(Self::remote_error(status, &body))
    }
}
