//! Classification results in wire form.

use anyhow::{bail, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::labels::LabelSet;

/// One classification result: labels mapped to confidence scores.
///
/// Entries are held in descending score order and the JSON form preserves
/// that order, so the best label always comes first. Ties keep label order,
/// which is alphabetical because [`LabelSet`] sorts its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    entries: Vec<(String, f32)>,
}

impl Prediction {
    /// Pairs a model's score vector with its labels, best score first.
    ///
    /// `top_k` keeps only the `k` best entries when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the score vector length does not match the label
    /// count.
    pub fn from_scores(labels: &LabelSet, scores: &[f32], top_k: Option<usize>) -> Result<Self> {
        if scores.len() != labels.len() {
            bail!(
                "model produced {} scores for {} labels",
                scores.len(),
                labels.len()
            );
        }

        let mut entries: Vec<(String, f32)> = labels
            .iter()
            .zip(scores)
            .map(|(label, score)| (label.to_owned(), *score))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));

        if let Some(k) = top_k {
            entries.truncate(k);
        }

        Ok(Self { entries })
    }

    /// The best label and its score, unless `top_k` was zero.
    #[must_use]
    pub fn best(&self) -> Option<(&str, f32)> {
        self.entries.first().map(|(l, s)| (l.as_str(), *s))
    }

    /// Iterates entries in descending score order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the result as a JSON object, best label first.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

impl Serialize for Prediction {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, score) in &self.entries {
            map.serialize_entry(label, score)?;
        }
        map.end()
    }
}
