//! Class label resolution.

use std::path::Path;

use anyhow::{bail, Context, Result};

/// Environment variable consulted for the label list when no flag is given.
pub const LABELS_ENV: &str = "CLASSCAST_LABELS";

/// The ordered set of class labels a model scores against.
///
/// Labels are sorted after parsing so positions are reproducible no matter
/// how the list was written down. Position `i` of a model's score vector
/// belongs to label `i`, and the model's output width must equal `len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Resolves a label spec: the path of a label file if one exists at
    /// that location, otherwise an inline comma-separated list.
    ///
    /// # Errors
    ///
    /// Returns an error if the value yields no labels, contains duplicates,
    /// or names a file that cannot be read.
    pub fn resolve(spec: &str) -> Result<Self> {
        let path = Path::new(spec);
        if path.is_file() {
            Self::from_file(path)
        } else {
            Self::from_inline(spec)
        }
    }

    /// Parses an inline comma-separated label list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or contains duplicates.
    pub fn from_inline(list: &str) -> Result<Self> {
        Self::from_raw(list.split(',').map(str::to_owned).collect())
    }

    /// Reads labels from a file: either a single line of comma-separated
    /// labels, or one label per line. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, yields no labels, or
    /// contains duplicates.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read label file: {}", path.display()))?;

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let raw: Vec<String> = match lines.as_slice() {
            [single] => single.split(',').map(str::to_owned).collect(),
            many => many.iter().map(|l| (*l).to_owned()).collect(),
        };

        Self::from_raw(raw).with_context(|| format!("Invalid label file: {}", path.display()))
    }

    fn from_raw(raw: Vec<String>) -> Result<Self> {
        let mut labels: Vec<String> = raw
            .into_iter()
            .map(|l| l.trim().to_owned())
            .filter(|l| !l.is_empty())
            .collect();

        if labels.is_empty() {
            bail!("no labels found");
        }

        labels.sort();

        // Duplicate labels would collide as JSON object keys.
        if let Some(pair) = labels.windows(2).find(|w| w[0] == w[1]) {
            bail!("duplicate label: {}", pair[0]);
        }

        Ok(Self { labels })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}
