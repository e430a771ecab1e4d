//! Keyword batches under the per-request keyword cap.

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Default per-request keyword cap.
pub const DEFAULT_BATCH_CAP: usize = 5;
/// Keyword count above which combining kicks in.
pub const DEFAULT_COMBINE_THRESHOLD: usize = 20;
/// Combined terms stay shorter than this many characters.
pub const DEFAULT_COMBINED_TERM_MAX_LEN: usize = 100;
/// Joins keywords into a single disjunction term.
pub const COMBINE_SEPARATOR: &str = " + ";

/// How the benchmark term is chosen when batching is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkMode {
    /// The first keyword. A flat benchmark is fatal.
    #[default]
    #[serde(alias = "fixed")]
    First,
    /// Ranked against a popular reference term. A flat benchmark is a warning.
    Adaptive,
}

impl BenchmarkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkMode::First => "first",
            BenchmarkMode::Adaptive => "adaptive",
        }
    }
}

impl std::str::FromStr for BenchmarkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "fixed" => Ok(BenchmarkMode::First),
            "adaptive" => Ok(BenchmarkMode::Adaptive),
            other => Err(format!(
                "unknown benchmark mode '{other}' (expected first or adaptive)"
            )),
        }
    }
}

/// Output of batch planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    /// `None` when every keyword fits in one request.
    pub benchmark: Option<String>,
    /// Request keyword lists. With a benchmark, each one starts with it.
    pub batches: Vec<Vec<String>>,
}

impl BatchPlan {
    /// Keywords in table column order: benchmark first, then each batch's
    /// remaining terms.
    pub fn column_order(&self) -> Vec<String> {
        match &self.benchmark {
            None => self.batches.concat(),
            Some(b) => std::iter::once(b.clone())
                .chain(
                    self.batches
                        .iter()
                        .flat_map(|batch| batch.iter().skip(1).cloned()),
                )
                .collect(),
        }
    }
}

/// Reject empty lists, blank terms and duplicates.
pub fn validate_keywords(keywords: &[String]) -> Result<(), IndexError> {
    if keywords.is_empty() {
        return Err(IndexError::InvalidPlan("keyword list is empty".into()));
    }
    for (i, keyword) in keywords.iter().enumerate() {
        if keyword.trim().is_empty() {
            return Err(IndexError::InvalidPlan(format!(
                "keyword #{} is blank",
                i + 1
            )));
        }
        if keywords[..i].contains(keyword) {
            return Err(IndexError::InvalidPlan(format!(
                "duplicate keyword '{keyword}'"
            )));
        }
    }
    Ok(())
}

pub fn needs_benchmark(keyword_count: usize, batch_cap: usize) -> bool {
    keyword_count > batch_cap
}

/// Split `keywords` into requests of at most `batch_cap` terms.
///
/// When the list fits in one request there is no benchmark. Otherwise the
/// benchmark (`benchmark`, or the first keyword) leads every batch and the
/// remaining terms fill the other `batch_cap - 1` slots in order.
pub fn plan_batches(
    keywords: &[String],
    batch_cap: usize,
    benchmark: Option<&str>,
) -> Result<BatchPlan, IndexError> {
    validate_keywords(keywords)?;
    if batch_cap == 0 {
        return Err(IndexError::InvalidPlan("batch cap must be positive".into()));
    }
    if !needs_benchmark(keywords.len(), batch_cap) {
        return Ok(BatchPlan {
            benchmark: None,
            batches: vec![keywords.to_vec()],
        });
    }
    if batch_cap < 2 {
        return Err(IndexError::InvalidPlan(
            "batch cap must leave room for the benchmark and one keyword".into(),
        ));
    }

    let benchmark = benchmark.unwrap_or(&keywords[0]);
    if !keywords.iter().any(|k| k == benchmark) {
        return Err(IndexError::InvalidPlan(format!(
            "benchmark '{benchmark}' is not one of the keywords"
        )));
    }
    let rest: Vec<String> = keywords
        .iter()
        .filter(|k| k.as_str() != benchmark)
        .cloned()
        .collect();

    Ok(BatchPlan {
        benchmark: Some(benchmark.to_string()),
        batches: chunk_with_lead(benchmark, &rest, batch_cap),
    })
}

/// Chunk `rest` into groups of `batch_cap - 1`, each prefixed with `lead`.
pub fn chunk_with_lead(lead: &str, rest: &[String], batch_cap: usize) -> Vec<Vec<String>> {
    let size = batch_cap.saturating_sub(1).max(1);
    rest.chunks(size)
        .map(|chunk| {
            let mut batch = Vec::with_capacity(chunk.len() + 1);
            batch.push(lead.to_string());
            batch.extend_from_slice(chunk);
            batch
        })
        .collect()
}

/// Greedily merge keywords into `a + b + c` terms shorter than `max_len`
/// characters. A keyword already at or over the limit stays on its own.
pub fn combine_keywords(keywords: &[String], max_len: usize) -> Vec<String> {
    let mut combined = Vec::new();
    let mut current = String::new();
    for keyword in keywords {
        if current.is_empty() {
            current = keyword.clone();
            continue;
        }
        let candidate = format!("{current}{COMBINE_SEPARATOR}{keyword}");
        if candidate.chars().count() < max_len {
            current = candidate;
        } else {
            combined.push(std::mem::replace(&mut current, keyword.clone()));
        }
    }
    if !current.is_empty() {
        combined.push(current);
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kws(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("k{i}")).collect()
    }

    #[test]
    fn fits_in_one_batch_without_benchmark() {
        let plan = plan_batches(&kws(5), 5, None).unwrap();
        assert_eq!(plan.benchmark, None);
        assert_eq!(plan.batches, vec![kws(5)]);
    }

    #[test]
    fn seven_keywords_cap_five_gives_two_batches() {
        let plan = plan_batches(&kws(7), 5, None).unwrap();
        assert_eq!(plan.benchmark.as_deref(), Some("k1"));
        assert_eq!(plan.batches.len(), 2);
        assert_eq!(plan.batches[0], vec!["k1", "k2", "k3", "k4", "k5"]);
        assert_eq!(plan.batches[1], vec!["k1", "k6", "k7"]);
    }

    #[test]
    fn chosen_benchmark_moves_to_front() {
        let plan = plan_batches(&kws(6), 3, Some("k4")).unwrap();
        assert_eq!(plan.benchmark.as_deref(), Some("k4"));
        assert!(plan.batches.iter().all(|b| b[0] == "k4"));
        assert_eq!(plan.column_order(), vec!["k4", "k1", "k2", "k3", "k5", "k6"]);
    }

    #[test]
    fn unknown_benchmark_is_rejected() {
        assert!(plan_batches(&kws(7), 5, Some("zzz")).is_err());
    }

    #[test]
    fn duplicates_and_blanks_are_rejected() {
        let dup = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert!(matches!(
            plan_batches(&dup, 5, None),
            Err(IndexError::InvalidPlan(_))
        ));
        assert!(validate_keywords(&["a".to_string(), "  ".to_string()]).is_err());
        assert!(validate_keywords(&[]).is_err());
    }

    #[test]
    fn cap_of_one_cannot_batch() {
        assert!(plan_batches(&kws(3), 1, None).is_err());
    }

    #[test]
    fn combine_keeps_terms_short_and_keeps_the_tail() {
        let words: Vec<String> = (0..30).map(|i| format!("keyword{i:02}")).collect();
        let combined = combine_keywords(&words, 40);
        assert!(combined.iter().all(|t| t.chars().count() < 40));
        let flattened: Vec<&str> = combined
            .iter()
            .flat_map(|t| t.split(COMBINE_SEPARATOR))
            .collect();
        assert_eq!(flattened.len(), 30);
        assert_eq!(*flattened.last().unwrap(), "keyword29");
    }

    #[test]
    fn combine_leaves_long_keyword_alone() {
        let words = vec!["x".repeat(120), "y".to_string()];
        let combined = combine_keywords(&words, 100);
        assert_eq!(combined, words);
    }
}
