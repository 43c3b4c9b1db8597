use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use super::{ClassificationOutcome, Classifier};

const GENERAL_INQUIRY: &str = "General Inquiry";

lazy_static! {
    /// Ordered rules; the first match wins
    static ref RULES: Vec<(Regex, &'static str)> = vec![
        (rule(&["pothole", "hole", "crack", "road damage"]), "Pothole"),
        (rule(&["light", "lamp", "bulb", "streetlight"]), "Streetlight Outage"),
        (rule(&["garbage", "trash", "waste", "bin"]), "Waste Management"),
        (rule(&["tree", "branch", "overgrown"]), "Fallen Tree / Landscaping"),
    ];
}

/// Case-insensitive substring alternation over literal keywords
fn rule(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){}", alternation)).unwrap()
}

/// Offline classifier that matches description keywords.
///
/// Never unavailable: unmatched descriptions fall into "General Inquiry".
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn categorize(description: &str) -> &'static str {
        RULES
            .iter()
            .find(|(pattern, _)| pattern.is_match(description))
            .map(|(_, category)| *category)
            .unwrap_or(GENERAL_INQUIRY)
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, description: &str, _image_urls: &[String]) -> ClassificationOutcome {
        ClassificationOutcome::Classified(Self::categorize(description).to_string())
    }
}
