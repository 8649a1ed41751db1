//! Failure-phrase classifier for script output

/// Phrases that mark a deployment as failed even when the tool exits 0
pub const DEFAULT_FAILURE_PHRASES: [&str; 2] = ["deploy failed", "there were errors"];

/// Case-insensitive substring matcher over output lines
#[derive(Debug, Clone)]
pub struct FailureClassifier {
    phrases: Vec<String>,
}

impl FailureClassifier {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    /// Returns the matched phrase, if any
    pub fn classify(&self, line: &str) -> Option<&str> {
        let line = line.to_lowercase();
        self.phrases
            .iter()
            .find(|phrase| line.contains(phrase.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, line: &str) -> bool {
        self.classify(line).is_some()
    }
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_PHRASES)
    }
}
