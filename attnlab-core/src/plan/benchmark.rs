//! Adaptive benchmark selection.
//!
//! Every candidate is queried next to a popular reference term so that all
//! candidates share a scale. The benchmark is the candidate that is non-zero
//! in the most calendar years, ties broken by the higher overall mean.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::keywords::chunk_with_lead;
use crate::data::{CallSite, InterestSource, Pacer};
use crate::domain::{DateWindow, KeywordTable};
use crate::error::IndexError;
use crate::fetch::complete_table;

/// Reference term used to put candidates on a common scale.
pub fn reference_term(language: &str) -> Result<&'static str, IndexError> {
    match language.trim().to_ascii_lowercase().as_str() {
        "en" => Ok("football"),
        "es" => Ok("fútbol"),
        other => Err(IndexError::UnsupportedLocale(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub keyword: String,
    /// Calendar years whose average interest is non-zero.
    pub nonzero_years: usize,
    /// Mean interest over the whole probe range.
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSelection {
    pub benchmark: String,
    pub reference: String,
    /// Every candidate, best first.
    pub scores: Vec<CandidateScore>,
}

/// Rank every column of `table`, best first. Ties keep column order.
pub fn score_candidates(table: &KeywordTable) -> Vec<CandidateScore> {
    let mut scores: Vec<CandidateScore> = table
        .keywords()
        .iter()
        .zip(table.columns())
        .map(|(keyword, values)| {
            let mut years: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
            for (date, v) in table.dates().iter().zip(values) {
                let entry = years.entry(date.year()).or_insert((0.0, 0));
                entry.0 += v;
                entry.1 += 1;
            }
            let nonzero_years = years
                .values()
                .filter(|(sum, n)| *n > 0 && sum / *n as f64 != 0.0)
                .count();
            CandidateScore {
                keyword: keyword.clone(),
                nonzero_years,
                mean: crate::series::stats::mean(values).unwrap_or(0.0),
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        b.nonzero_years
            .cmp(&a.nonzero_years)
            .then(b.mean.partial_cmp(&a.mean).unwrap_or(std::cmp::Ordering::Equal))
    });
    scores
}

/// Probe the source and pick the benchmark among `keywords`.
///
/// Probes run over the same windows as the main fetch, so they respect the
/// per-request day cap. Windows are concatenated without rescaling: ranking
/// only needs zero/non-zero years and means on the reference term's scale.
pub fn select_benchmark(
    source: &dyn InterestSource,
    pacer: &dyn Pacer,
    keywords: &[String],
    region: &str,
    language: &str,
    windows: &[DateWindow],
    batch_cap: usize,
) -> Result<BenchmarkSelection, IndexError> {
    let reference = reference_term(language)?;
    let candidates: Vec<String> = keywords
        .iter()
        .filter(|k| k.as_str() != reference)
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Err(IndexError::InvalidPlan(
            "no benchmark candidates besides the reference term".into(),
        ));
    }
    let chunks = chunk_with_lead(reference, &candidates, batch_cap);

    let mut probe: Option<KeywordTable> = None;
    for &window in windows {
        let mut joined: Option<KeywordTable> = None;
        for chunk in &chunks {
            pacer.pause(CallSite::Probe);
            let response = source.fetch(chunk, region, window)?;
            let table = complete_table(&response, chunk, window)?;
            joined = Some(match joined {
                None => drop_column(&table, reference),
                Some(acc) => join_columns(&acc, &table, reference),
            });
        }
        if let Some(table) = joined {
            match probe.as_mut() {
                None => probe = Some(table),
                Some(acc) => {
                    acc.extend_after(&table);
                }
            }
        }
    }

    let probe = probe.unwrap_or_else(|| KeywordTable::empty(candidates.clone()));
    let scores = score_candidates(&probe);
    let benchmark = scores
        .first()
        .map(|s| s.keyword.clone())
        .unwrap_or_else(|| candidates[0].clone());

    tracing::info!(
        %benchmark,
        reference,
        candidates = candidates.len(),
        "selected benchmark"
    );
    Ok(BenchmarkSelection {
        benchmark,
        reference: reference.to_string(),
        scores,
    })
}

fn drop_column(table: &KeywordTable, keyword: &str) -> KeywordTable {
    let (keywords, columns): (Vec<String>, Vec<Vec<f64>>) = table
        .keywords()
        .iter()
        .zip(table.columns())
        .filter(|(k, _)| k.as_str() != keyword)
        .map(|(k, c)| (k.clone(), c.clone()))
        .unzip();
    KeywordTable::from_parts(table.dates().to_vec(), keywords, columns)
}

/// Columns of both tables on their shared dates, `skip` excluded from `other`.
fn join_columns(base: &KeywordTable, other: &KeywordTable, skip: &str) -> KeywordTable {
    let shared = base.shared_dates(other);
    let mut joined = base.restrict_to(&shared);
    let other = other.restrict_to(&shared);
    for (keyword, column) in other.keywords().iter().zip(other.columns()) {
        if keyword != skip {
            joined.push_column(keyword.clone(), column.clone());
        }
    }
    joined
}
