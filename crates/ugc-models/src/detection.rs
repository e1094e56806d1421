//! Detection types and the clothing/accessory filter-and-rank policy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::rect::PixelRect;

/// Labels considered relevant to fashion/UGC content.
///
/// Closed configuration set; matched exactly (case-sensitive) against the
/// detection model's COCO label vocabulary.
pub const ALLOWED_LABELS: &[&str] = &[
    "person",
    "handbag",
    "backpack",
    "umbrella",
    "tie",
    "suitcase",
    "shoe",
    "cell phone",
    "bottle",
    "sports ball",
    "book",
    "skateboard",
];

/// A labeled, scored region from one inference pass.
///
/// Detections are not persisted across inference calls; a new pass replaces
/// the previous set wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Model vocabulary label (e.g. "person", "handbag")
    pub label: String,
    /// Confidence in [0, 1]
    pub score: f32,
    /// Bounding box in source-image pixels
    pub bbox: PixelRect,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f32, bbox: PixelRect) -> Self {
        Self {
            label: label.into(),
            score,
            bbox,
        }
    }

    /// Whether this detection's label is on the allow-list.
    pub fn is_relevant(&self) -> bool {
        ALLOWED_LABELS.contains(&self.label.as_str())
    }
}

/// Filter raw detections to the allow-list and rank by confidence.
///
/// The sort is stable and descending, so equal scores keep the detector's
/// original order. An empty input yields an empty output.
pub fn filter_and_rank(raw: &[Detection]) -> Vec<Detection> {
    let mut relevant: Vec<Detection> = raw
        .iter()
        .filter(|d| d.is_relevant())
        .cloned()
        .collect();

    relevant.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    relevant
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, score: f32) -> Detection {
        Detection::new(label, score, PixelRect::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_excludes_labels_off_the_list() {
        let out = filter_and_rank(&[det("car", 0.9)]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_ranks_descending_by_score() {
        let out = filter_and_rank(&[det("shoe", 0.4), det("bottle", 0.8)]);
        assert_eq!(out[0].label, "bottle");
        assert_eq!(out[1].label, "shoe");
    }

    #[test]
    fn test_stable_on_ties() {
        let out = filter_and_rank(&[det("tie", 0.5), det("book", 0.5), det("person", 0.5)]);
        let labels: Vec<_> = out.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["tie", "book", "person"]);
    }

    #[test]
    fn test_idempotent() {
        let raw = vec![
            det("car", 0.95),
            det("shoe", 0.4),
            det("person", 0.9),
            det("bottle", 0.4),
        ];
        let once = filter_and_rank(&raw);
        let twice = filter_and_rank(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        assert!(filter_and_rank(&[]).is_empty());
    }

    #[test]
    fn test_case_sensitive_match() {
        assert!(filter_and_rank(&[det("Person", 0.9)]).is_empty());
    }

    #[test]
    fn test_input_not_mutated() {
        let raw = vec![det("person", 0.1), det("shoe", 0.9)];
        let snapshot = raw.clone();
        let _ = filter_and_rank(&raw);
        assert_eq!(raw, snapshot);
    }
}
