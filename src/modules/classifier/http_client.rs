use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ClassificationOutcome, Classifier};
use crate::core::error::{AppError, Result};

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    description: &'a str,
    image_urls: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Client for the external classification service
pub struct HttpClassifier {
    http_client: Client,
    url: String,
}

impl HttpClassifier {
    /// Create a client whose calls give up after `timeout`
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: url.to_string(),
        })
    }

    async fn request(
        &self,
        description: &str,
        image_urls: &[String],
    ) -> std::result::Result<ClassifyResponse, String> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&ClassifyRequest {
                description,
                image_urls,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    "classifier timed out".to_string()
                } else {
                    format!("could not reach classifier: {}", e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("classifier returned status {}", status));
        }

        response
            .json::<ClassifyResponse>()
            .await
            .map_err(|e| format!("malformed classifier response: {}", e))
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, description: &str, image_urls: &[String]) -> ClassificationOutcome {
        tracing::debug!(
            "Calling classifier at {} with {} image(s)",
            self.url,
            image_urls.len()
        );

        let body = match self.request(description, image_urls).await {
            Ok(body) => body,
            Err(reason) => {
                tracing::warn!("Classification unavailable: {}", reason);
                return ClassificationOutcome::Unavailable(reason);
            }
        };

        match body.category.map(|c| c.trim().to_string()) {
            Some(category) if !category.is_empty() => {
                match body.confidence {
                    Some(confidence) => tracing::info!(
                        "Classifier answered '{}' (confidence {:.2})",
                        category,
                        confidence
                    ),
                    None => tracing::info!("Classifier answered '{}'", category),
                }
                ClassificationOutcome::Classified(category)
            }
            _ => {
                tracing::warn!("Classifier response did not include a category");
                ClassificationOutcome::Unavailable("missing category".to_string())
            }
        }
    }
}
