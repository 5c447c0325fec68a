// src/extract/paywall.rs

/// Case-insensitive marker-phrase matcher.
#[derive(Debug, Clone)]
pub struct PaywallDetector {
    markers: Vec<String>,
}

impl PaywallDetector {
    pub fn new<S: AsRef<str>>(markers: &[S]) -> Self {
        Self {
            markers: markers
                .iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn is_paywalled(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.markers.iter().any(|m| haystack.contains(m.as_str()))
    }
}

impl Default for PaywallDetector {
    fn default() -> Self {
        Self::new(crate::config::extractor::DEFAULT_PAYWALL_MARKERS)
    }
}
