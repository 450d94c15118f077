//! Descriptive aggregates over the cleaned dataset
//!
//! Every metric is recomputed in full from the dataset on each call; nothing
//! here is incremental or mutated after construction. Group keys come back
//! in a stable order (alphabetical for text, chronological for months) so
//! rendering is deterministic run to run.

use std::collections::{BTreeMap, HashMap};

use ndarray::Array2;

use crate::data::{CleanedDataset, DealSize};
use crate::rfm::compute_rfm;

/// Names of every aggregate entry a full run produces.
pub const METRIC_NAMES: [&str; 8] = [
    "total_sales",
    "sales_by_country",
    "monthly_trend",
    "top_products",
    "avg_deal_size",
    "price_tiers",
    "rfm_segments",
    "correlation",
];

/// Numeric columns entering the correlation matrix, in order.
const NUMERIC_COLUMNS: [&str; 5] = ["quantity", "price_each", "msrp", "sales", "discount_pct"];

/// MSRP tier edges: a tier covers [lower, upper).
const PRICE_TIERS: [(&str, f64, f64); 4] = [
    ("< 50", 0.0, 50.0),
    ("50-99", 50.0, 100.0),
    ("100-149", 100.0, 150.0),
    ("150+", 150.0, f64::INFINITY),
];

/// One computed metric. `NoData` stands in wherever a metric has nothing to
/// say (empty dataset, empty group), so the renderer never sees an absent or
/// half-built structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Scalar(f64),
    /// Ordered (key, value) pairs.
    Series(Vec<(String, f64)>),
    /// Square symmetric matrix with row/column labels.
    Matrix {
        labels: Vec<String>,
        values: Array2<f64>,
    },
    NoData,
}

impl Aggregate {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Aggregate::NoData)
    }
}

/// Named mapping from metric name to its result table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    entries: BTreeMap<String, Aggregate>,
}

impl AggregateResult {
    pub fn get(&self, name: &str) -> Option<&Aggregate> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Aggregate)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: &str, aggregate: Aggregate) {
        self.entries.insert(name.to_string(), aggregate);
    }
}

/// Compute every metric from the cleaned dataset.
///
/// An empty dataset yields `Aggregate::NoData` for every metric name rather
/// than an error, per the pipeline's failure semantics.
pub fn aggregate(dataset: &CleanedDataset, top_n: usize) -> AggregateResult {
    let mut result = AggregateResult::default();

    if dataset.is_empty() {
        for name in METRIC_NAMES {
            result.insert(name, Aggregate::NoData);
        }
        log::warn!("Empty dataset: all {} metrics report no data", METRIC_NAMES.len());
        return result;
    }

    result.insert("total_sales", total_sales(dataset));
    result.insert("sales_by_country", sales_by_country(dataset));
    result.insert("monthly_trend", monthly_trend(dataset));
    result.insert("top_products", top_products(dataset, top_n));
    result.insert("avg_deal_size", avg_deal_size(dataset));
    result.insert("price_tiers", price_tiers(dataset));
    result.insert("rfm_segments", rfm_segments(dataset));
    result.insert("correlation", correlation(dataset));

    log::info!("Computed {} aggregate metrics", result.len());
    result
}

fn total_sales(dataset: &CleanedDataset) -> Aggregate {
    Aggregate::Scalar(dataset.records.iter().map(|r| r.sales).sum())
}

/// Per-country totals, keys alphabetical.
fn sales_by_country(dataset: &CleanedDataset) -> Aggregate {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for record in &dataset.records {
        *totals.entry(record.country.clone()).or_default() += record.sales;
    }
    Aggregate::Series(totals.into_iter().collect())
}

/// Per-month totals keyed "YYYY-MM"; lexicographic order is chronological.
fn monthly_trend(dataset: &CleanedDataset) -> Aggregate {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for record in &dataset.records {
        *totals.entry(record.month_key()).or_default() += record.sales;
    }
    Aggregate::Series(totals.into_iter().collect())
}

/// Top-N product lines by total sales, descending. Ties break by product
/// line ascending so the cut is deterministic across runs.
fn top_products(dataset: &CleanedDataset, top_n: usize) -> Aggregate {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for record in &dataset.records {
        *totals.entry(record.product_line.as_str()).or_default() += record.sales;
    }

    let mut ranked: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(top_n);
    Aggregate::Series(ranked)
}

/// Mean order-line amount overall and per deal-size bucket. Empty buckets
/// are omitted; the guarded division means no NaN ever escapes.
fn avg_deal_size(dataset: &CleanedDataset) -> Aggregate {
    let mut series = Vec::with_capacity(4);
    if let Some(overall) = mean(dataset.records.iter().map(|r| r.sales)) {
        series.push(("Overall".to_string(), overall));
    }
    for bucket in [DealSize::Small, DealSize::Medium, DealSize::Large] {
        let values = dataset
            .records
            .iter()
            .filter(|r| r.deal_size == bucket)
            .map(|r| r.sales);
        if let Some(avg) = mean(values) {
            series.push((bucket.as_str().to_string(), avg));
        }
    }
    if series.is_empty() {
        Aggregate::NoData
    } else {
        Aggregate::Series(series)
    }
}

/// Sales totals bucketed by MSRP tier, ascending tier order. All tiers are
/// present so chart axes stay stable even when a tier is empty.
fn price_tiers(dataset: &CleanedDataset) -> Aggregate {
    let mut series: Vec<(String, f64)> = PRICE_TIERS
        .iter()
        .map(|(label, _, _)| (label.to_string(), 0.0))
        .collect();
    for record in &dataset.records {
        for (i, (_, lower, upper)) in PRICE_TIERS.iter().enumerate() {
            if record.msrp >= *lower && record.msrp < *upper {
                series[i].1 += record.sales;
                break;
            }
        }
    }
    Aggregate::Series(series)
}

/// Customer counts per RFM segment label, alphabetical.
fn rfm_segments(dataset: &CleanedDataset) -> Aggregate {
    let customers = compute_rfm(dataset);
    if customers.is_empty() {
        return Aggregate::NoData;
    }
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for customer in &customers {
        *counts.entry(customer.segment()).or_default() += 1;
    }
    Aggregate::Series(
        counts
            .into_iter()
            .map(|(k, v)| (k.to_string(), v as f64))
            .collect(),
    )
}

/// Pearson correlation matrix over the numeric columns. Symmetric with unit
/// diagonal; a zero-variance column correlates 0 with everything else.
fn correlation(dataset: &CleanedDataset) -> Aggregate {
    let columns: Vec<Vec<f64>> = vec![
        dataset.records.iter().map(|r| r.quantity as f64).collect(),
        dataset.records.iter().map(|r| r.price_each).collect(),
        dataset.records.iter().map(|r| r.msrp).collect(),
        dataset.records.iter().map(|r| r.sales).collect(),
        dataset.records.iter().map(|r| r.discount_pct).collect(),
    ];

    let n = columns.len();
    let values = Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            1.0
        } else {
            pearson(&columns[i], &columns[j])
        }
    });

    Aggregate::Matrix {
        labels: NUMERIC_COLUMNS.iter().map(|s| s.to_string()).collect(),
        values,
    }
}

/// Pearson correlation coefficient; 0 when either side has zero variance.
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
