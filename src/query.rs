use crate::keywords::KeywordSet;
use serde_json::{json, Value};

pub const LABELS_FIELD: &str = "labels";
pub const MAX_RESULTS: usize = 100;

/// Disjunctive label match: a photo qualifies when any keyword is one of its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelQuery {
    pub keywords: Vec<String>,
    pub minimum_should_match: usize,
    pub size: usize,
}

impl LabelQuery {
    /// `None` for an empty keyword set; there is nothing to match against.
    pub fn from_keywords(keywords: &KeywordSet) -> Option<Self> {
        if keywords.is_empty() {
            return None;
        }
        Some(Self {
            keywords: keywords.iter().cloned().collect(),
            minimum_should_match: 1,
            size: MAX_RESULTS,
        })
    }

    pub fn to_dsl(&self) -> Value {
        let should: Vec<Value> = self
            .keywords
            .iter()
            .map(|keyword| {
                json!({
                    "match": {
                        LABELS_FIELD: { "query": keyword, "operator": "or" }
                    }
                })
            })
            .collect();

        json!({
            "query": {
                "bool": {
                    "should": should,
                    "minimum_should_match": self.minimum_should_match
                }
            },
            "size": self.size
        })
    }
}
