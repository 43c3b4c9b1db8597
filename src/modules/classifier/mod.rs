//! Report classification
//!
//! A [`Classifier`] turns a report description and its image URLs into a
//! category name. Failures never propagate: they surface as
//! [`ClassificationOutcome::Unavailable`] and the caller stores the pending
//! sentinel instead.

mod http_client;
mod keyword;

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::config::{ClassifierConfig, ClassifierMode};
use crate::core::error::Result;
use crate::shared::constants::CLASSIFICATION_PENDING;

pub use http_client::HttpClassifier;
pub use keyword::KeywordClassifier;

/// Result of asking a classifier for a category
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    Classified(String),
    /// The classifier could not answer; carries the reason for logging
    Unavailable(String),
}

impl ClassificationOutcome {
    /// Category to store: the classifier's answer or the pending sentinel
    pub fn category(&self) -> &str {
        match self {
            ClassificationOutcome::Classified(category) => category,
            ClassificationOutcome::Unavailable(_) => CLASSIFICATION_PENDING,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, description: &str, image_urls: &[String]) -> ClassificationOutcome;
}

/// Build the classifier selected by configuration
pub fn from_config(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>> {
    match config.mode {
        ClassifierMode::Remote => {
            tracing::info!("Using remote classifier at {}", config.url);
            Ok(Arc::new(HttpClassifier::new(&config.url, config.timeout)?))
        }
        ClassifierMode::Keyword => {
            tracing::info!("Using local keyword classifier");
            Ok(Arc::new(KeywordClassifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_category() {
        assert_eq!(
            ClassificationOutcome::Classified("Pothole".into()).category(),
            "Pothole"
        );
        assert_eq!(
            ClassificationOutcome::Unavailable("timeout".into()).category(),
            "Classification Pending"
        );
    }
}
