//! # Query Evaluation Module
//!
//! ## Purpose
//! Evaluates free-text queries and structured filter rules against an
//! inverted-index snapshot, producing a scored candidate set.
//!
//! ## Input/Output Specification
//! - **Input**: Free text, boolean filter rules, an index snapshot
//! - **Output**: Candidate document ids with raw scores, deterministic order
//! - **Semantics**: AND-intersection across query words; conditions over
//!   metadata; both present ⇒ both must hold
//!
//! ## Key Features
//! - Closed, validated condition set (`MalformedQuery` caught at the
//!   boundary, not deep inside evaluation)
//! - Word-overlap scoring with recency-then-id tie-break
//! - Pure read over an immutable snapshot; no locking

use crate::errors::{Result, SearchError};
use crate::index::InvertedIndex;
use crate::text_processing::TextNormalizer;
use crate::DocumentId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One atomic predicate over document metadata. Constructed only through
/// validated paths; unknown field/operator combinations never reach
/// evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchCondition {
    /// Title contains the given text (normalized substring match)
    TitleContains(String),
    /// Court name equals the given text (normalized equality)
    CourtEquals(String),
    /// Year falls within the inclusive range
    YearBetween { from: i32, to: i32 },
    /// Summary contains the given text (normalized substring match)
    SummaryContains(String),
}

/// Untyped field/operator/value triple as it arrives over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCondition {
    pub field: String,
    pub operator: String,
    pub value: serde_json::Value,
}

impl SearchCondition {
    /// Map an untyped triple onto the closed condition set. The operator
    /// vocabulary is enumerated per field; anything else is `MalformedQuery`.
    pub fn from_raw(raw: &RawCondition) -> Result<Self> {
        let text_value = || -> Result<String> {
            raw.value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| SearchError::MalformedQuery {
                    details: format!("field '{}' expects a string value", raw.field),
                })
        };

        match (raw.field.as_str(), raw.operator.as_str()) {
            ("title", "contains") => Ok(SearchCondition::TitleContains(text_value()?)),
            ("court", "equals") => Ok(SearchCondition::CourtEquals(text_value()?)),
            ("summary", "contains") => Ok(SearchCondition::SummaryContains(text_value()?)),
            ("year", "between") => {
                let range = raw.value.as_array().ok_or_else(|| SearchError::MalformedQuery {
                    details: "year between expects a [from, to] array".to_string(),
                })?;
                let bound = |i: usize| -> Result<i32> {
                    range
                        .get(i)
                        .and_then(|v| v.as_i64())
                        .map(|v| v as i32)
                        .ok_or_else(|| SearchError::MalformedQuery {
                            details: "year bounds must be integers".to_string(),
                        })
                };
                let (from, to) = (bound(0)?, bound(1)?);
                if from > to {
                    return Err(SearchError::MalformedQuery {
                        details: format!("empty year range {}..{}", from, to),
                    });
                }
                Ok(SearchCondition::YearBetween { from, to })
            }
            ("year", "equals") => {
                let year = raw.value.as_i64().ok_or_else(|| SearchError::MalformedQuery {
                    details: "year equals expects an integer".to_string(),
                })? as i32;
                Ok(SearchCondition::YearBetween {
                    from: year,
                    to: year,
                })
            }
            (field, operator) => Err(SearchError::MalformedQuery {
                details: format!("unsupported condition: {} {}", field, operator),
            }),
        }
    }

    fn matches(&self, summary: &crate::DocumentSummary, normalizer: &TextNormalizer) -> bool {
        match self {
            SearchCondition::TitleContains(text) => normalizer
                .normalize_word(&summary.title)
                .contains(&normalizer.normalize_word(text)),
            SearchCondition::CourtEquals(text) => {
                normalizer.normalize_word(summary.court.trim())
                    == normalizer.normalize_word(text.trim())
            }
            SearchCondition::YearBetween { from, to } => {
                (*from..=*to).contains(&summary.year)
            }
            SearchCondition::SummaryContains(text) => normalizer
                .normalize_word(&summary.summary)
                .contains(&normalizer.normalize_word(text)),
        }
    }
}

/// Boolean combination mode for a condition set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    /// All conditions must hold (intersection)
    AllOf,
    /// Any condition suffices (union)
    AnyOf,
}

/// A boolean combination of atomic conditions. An empty condition set
/// matches the full corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRules {
    pub combinator: Combinator,
    pub conditions: Vec<SearchCondition>,
}

/// Wire shape of filter rules before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFilterRules {
    pub combinator: String,
    #[serde(default)]
    pub conditions: Vec<RawCondition>,
}

impl FilterRules {
    pub fn all_of(conditions: Vec<SearchCondition>) -> Self {
        Self {
            combinator: Combinator::AllOf,
            conditions,
        }
    }

    pub fn any_of(conditions: Vec<SearchCondition>) -> Self {
        Self {
            combinator: Combinator::AnyOf,
            conditions,
        }
    }

    /// Validate an untyped rule set at the boundary.
    pub fn from_raw(raw: &RawFilterRules) -> Result<Self> {
        let combinator = match raw.combinator.as_str() {
            "all_of" => Combinator::AllOf,
            "any_of" => Combinator::AnyOf,
            other => {
                return Err(SearchError::MalformedQuery {
                    details: format!("unknown combinator '{}'", other),
                })
            }
        };

        let conditions = raw
            .conditions
            .iter()
            .map(SearchCondition::from_raw)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            combinator,
            conditions,
        })
    }

    fn matches(&self, summary: &crate::DocumentSummary, normalizer: &TextNormalizer) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        match self.combinator {
            Combinator::AllOf => self
                .conditions
                .iter()
                .all(|c| c.matches(summary, normalizer)),
            Combinator::AnyOf => self
                .conditions
                .iter()
                .any(|c| c.matches(summary, normalizer)),
        }
    }
}

/// A candidate document with its raw score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub id: DocumentId,
    pub score: f32,
}

/// Evaluates queries against one immutable index snapshot.
pub struct QueryEvaluator<'a> {
    index: &'a InvertedIndex,
    normalizer: &'a TextNormalizer,
}

impl<'a> QueryEvaluator<'a> {
    pub fn new(index: &'a InvertedIndex, normalizer: &'a TextNormalizer) -> Self {
        Self { index, normalizer }
    }

    /// Distinct normalized query words, in query order.
    pub fn query_words(&self, free_text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.normalizer
            .tokenize(free_text)
            .into_iter()
            .filter(|w| seen.insert(w.clone()))
            .collect()
    }

    /// Evaluate free text and/or filter rules into a scored, ordered
    /// candidate list. Empty input yields an empty result, never the whole
    /// corpus.
    pub fn evaluate(
        &self,
        free_text: Option<&str>,
        rules: Option<&FilterRules>,
    ) -> Vec<ScoredCandidate> {
        let query_words = free_text
            .map(|t| self.query_words(t))
            .filter(|words| !words.is_empty());

        let text_candidates = query_words.as_ref().map(|words| self.intersect_postings(words));
        let condition_candidates = rules.map(|r| self.filter_by_conditions(r));

        let candidates: HashSet<DocumentId> = match (text_candidates, condition_candidates) {
            (Some(text), Some(cond)) => text.intersection(&cond).cloned().collect(),
            (Some(text), None) => text,
            (None, Some(cond)) => cond,
            (None, None) => return Vec::new(),
        };

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|id| {
                let score = query_words
                    .as_deref()
                    .map(|words| self.word_overlap_score(&id, words))
                    .unwrap_or(0.0);
                ScoredCandidate { id, score }
            })
            .collect();

        self.rank(&mut scored);
        scored
    }

    /// AND-intersection of per-word posting sets. Any word absent from the
    /// index empties the candidate set; that is a result, not an error.
    fn intersect_postings(&self, words: &[String]) -> HashSet<DocumentId> {
        let mut iter = words.iter();
        let mut acc: HashSet<DocumentId> = match iter.next().and_then(|w| self.index.postings(w)) {
            Some(postings) => postings.clone(),
            None => return HashSet::new(),
        };

        for word in iter {
            match self.index.postings(word) {
                Some(postings) => acc.retain(|id| postings.contains(id)),
                None => return HashSet::new(),
            }
            if acc.is_empty() {
                break;
            }
        }

        acc
    }

    fn filter_by_conditions(&self, rules: &FilterRules) -> HashSet<DocumentId> {
        self.index
            .document_summaries
            .iter()
            .filter(|(_, summary)| rules.matches(summary, self.normalizer))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Count of distinct query words present in the document.
    fn word_overlap_score(&self, id: &str, words: &[String]) -> f32 {
        words
            .iter()
            .filter(|w| {
                self.index
                    .postings(w)
                    .map(|p| p.contains(id))
                    .unwrap_or(false)
            })
            .count() as f32
    }

    /// Descending score; ties broken by more recent year, then ascending id
    /// for determinism.
    fn rank(&self, scored: &mut [ScoredCandidate]) {
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let year = |c: &ScoredCandidate| {
                        self.index.summary(&c.id).map(|s| s.year).unwrap_or(i32::MIN)
                    };
                    year(b).cmp(&year(a))
                })
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use crate::config::Config;
    use crate::{CorpusFingerprint, Document};
    use chrono::Utc;

    fn build_index(docs: &[Document]) -> (InvertedIndex, TextNormalizer) {
        let config = Config::default();
        let builder = IndexBuilder::new(config.text_processing.clone(), &config.index);
        let fingerprint = CorpusFingerprint {
            document_count: docs.len(),
            last_modified: Utc::now(),
        };
        let index = builder.build(docs, fingerprint);
        (index, TextNormalizer::new(config.text_processing))
    }

    fn doc(id: &str, court: &str, year: i32, text: &str) -> Document {
        Document {
            id: id.to_string(),
            title: format!("פסק דין {}", id),
            court: court.to_string(),
            year,
            full_text: text.to_string(),
            summary: String::new(),
        }
    }

    fn corpus() -> Vec<Document> {
        vec![
            doc("1", "בית דין ירושלים", 2015, "שור שנגח את הפרה"),
            doc("2", "בית דין חיפה", 2018, "חמור שנגח חמור"),
            doc("3", "בית דין ירושלים", 2011, "המוכר פרה לחברו"),
        ]
    }

    #[test]
    fn and_semantics_across_words() {
        let (index, normalizer) = build_index(&corpus());
        let eval = QueryEvaluator::new(&index, &normalizer);

        let a: HashSet<_> = eval
            .evaluate(Some("שור"), None)
            .into_iter()
            .map(|c| c.id)
            .collect();
        let b: HashSet<_> = eval
            .evaluate(Some("הפרה"), None)
            .into_iter()
            .map(|c| c.id)
            .collect();
        let both: HashSet<_> = eval
            .evaluate(Some("שור הפרה"), None)
            .into_iter()
            .map(|c| c.id)
            .collect();

        let expected: HashSet<_> = a.intersection(&b).cloned().collect();
        assert_eq!(both, expected);
        assert_eq!(both, HashSet::from(["1".to_string()]));
    }

    #[test]
    fn absent_word_yields_empty_not_error() {
        let (index, normalizer) = build_index(&corpus());
        let eval = QueryEvaluator::new(&index, &normalizer);
        assert!(eval.evaluate(Some("שור גמל"), None).is_empty());
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let (index, normalizer) = build_index(&corpus());
        let eval = QueryEvaluator::new(&index, &normalizer);
        assert!(eval.evaluate(None, None).is_empty());
        assert!(eval.evaluate(Some("  ...  "), None).is_empty());
    }

    #[test]
    fn empty_condition_set_matches_full_corpus() {
        let (index, normalizer) = build_index(&corpus());
        let eval = QueryEvaluator::new(&index, &normalizer);
        let rules = FilterRules::all_of(vec![]);
        assert_eq!(eval.evaluate(None, Some(&rules)).len(), 3);
    }

    #[test]
    fn conditions_intersect_with_free_text() {
        let (index, normalizer) = build_index(&corpus());
        let eval = QueryEvaluator::new(&index, &normalizer);
        let rules = FilterRules::all_of(vec![SearchCondition::CourtEquals(
            "בית דין ירושלים".to_string(),
        )]);

        let ids: Vec<_> = eval
            .evaluate(Some("שנגח"), Some(&rules))
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["1".to_string()]);
    }

    #[test]
    fn any_of_unions_conditions() {
        let (index, normalizer) = build_index(&corpus());
        let eval = QueryEvaluator::new(&index, &normalizer);
        let rules = FilterRules::any_of(vec![
            SearchCondition::YearBetween {
                from: 2018,
                to: 2020,
            },
            SearchCondition::YearBetween {
                from: 2010,
                to: 2012,
            },
        ]);

        let ids: HashSet<_> = eval
            .evaluate(None, Some(&rules))
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, HashSet::from(["2".to_string(), "3".to_string()]));
    }

    #[test]
    fn ties_break_by_recency_then_id() {
        let (index, normalizer) = build_index(&corpus());
        let eval = QueryEvaluator::new(&index, &normalizer);

        // All three match the empty condition set with score 0.0
        let rules = FilterRules::all_of(vec![]);
        let ids: Vec<_> = eval
            .evaluate(None, Some(&rules))
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(
            ids,
            vec!["2".to_string(), "1".to_string(), "3".to_string()]
        );
    }

    #[test]
    fn score_counts_distinct_query_words() {
        let docs = vec![
            doc("1", "בית דין ירושלים", 2010, "שור ועוד שור"),
            doc("2", "בית דין ירושלים", 2020, "שור שנגח את הפרה"),
        ];
        let (index, normalizer) = build_index(&docs);
        let eval = QueryEvaluator::new(&index, &normalizer);

        // Doc 1 lacks הפרה and is excluded by the AND intersection; the
        // surviving candidate scores one point per distinct query word,
        // with repeated words counted once
        let scored = eval.evaluate(Some("שור הפרה שור"), None);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].id, "2");
        assert_eq!(scored[0].score, 2.0);
    }

    #[test]
    fn malformed_condition_rejected_at_boundary() {
        let raw = RawCondition {
            field: "judge".to_string(),
            operator: "contains".to_string(),
            value: serde_json::json!("כהן"),
        };
        assert!(matches!(
            SearchCondition::from_raw(&raw),
            Err(SearchError::MalformedQuery { .. })
        ));

        let raw = RawFilterRules {
            combinator: "most_of".to_string(),
            conditions: vec![],
        };
        assert!(matches!(
            FilterRules::from_raw(&raw),
            Err(SearchError::MalformedQuery { .. })
        ));
    }

    #[test]
    fn year_equals_maps_to_degenerate_range() {
        let raw = RawCondition {
            field: "year".to_string(),
            operator: "equals".to_string(),
            value: serde_json::json!(2015),
        };
        assert_eq!(
            SearchCondition::from_raw(&raw).unwrap(),
            SearchCondition::YearBetween {
                from: 2015,
                to: 2015
            }
        );
    }

    #[test]
    fn title_condition_is_diacritic_insensitive() {
        let mut docs = corpus();
        docs[0].title = "שׁוֹר הַמּוּעָד".to_string();
        let (index, normalizer) = build_index(&docs);
        let eval = QueryEvaluator::new(&index, &normalizer);
        let rules = FilterRules::all_of(vec![SearchCondition::TitleContains("שור".to_string())]);
        let ids: Vec<_> = eval
            .evaluate(None, Some(&rules))
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["1".to_string()]);
    }
}
