//! RFM (Recency, Frequency, Monetary) scoring and segment assignment

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;

use crate::data::CleanedDataset;

/// Per-customer RFM inputs and their 1-5 quantile scores.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRfm {
    pub customer: String,
    /// Days between the customer's last order and the dataset's latest order.
    pub recency_days: i64,
    /// Number of distinct orders.
    pub frequency: usize,
    /// Total spend across all orders.
    pub monetary: f64,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
}

impl CustomerRfm {
    /// Segment label for this customer's combined score.
    pub fn segment(&self) -> &'static str {
        segment_label(self.r_score, self.f_score, self.m_score)
    }
}

/// Compute RFM inputs and quantile scores for every customer.
///
/// Recency is measured against the latest order date in the dataset, so the
/// result depends only on the data, not on the wall clock. Customers come
/// back sorted by name, which keeps downstream output deterministic.
///
/// An empty dataset yields an empty vector.
pub fn compute_rfm(dataset: &CleanedDataset) -> Vec<CustomerRfm> {
    let reference_date = match dataset.records.iter().map(|r| r.order_date).max() {
        Some(date) => date,
        None => return Vec::new(),
    };

    // BTreeMap keeps customer ordering stable across runs.
    let mut per_customer: BTreeMap<&str, (NaiveDateTime, HashSet<u32>, f64)> = BTreeMap::new();
    for record in &dataset.records {
        let entry = per_customer
            .entry(record.customer.as_str())
            .or_insert_with(|| (record.order_date, HashSet::new(), 0.0));
        entry.0 = entry.0.max(record.order_date);
        entry.1.insert(record.order_number);
        entry.2 += record.sales;
    }

    let mut customers: Vec<CustomerRfm> = per_customer
        .into_iter()
        .map(|(name, (last_order, orders, monetary))| CustomerRfm {
            customer: name.to_string(),
            recency_days: (reference_date - last_order).num_days(),
            frequency: orders.len(),
            monetary,
            r_score: 0,
            f_score: 0,
            m_score: 0,
        })
        .collect();

    let recency: Vec<f64> = customers.iter().map(|c| c.recency_days as f64).collect();
    let frequency: Vec<f64> = customers.iter().map(|c| c.frequency as f64).collect();
    let monetary: Vec<f64> = customers.iter().map(|c| c.monetary).collect();

    // Lower recency is better; higher frequency/monetary is better.
    let r_scores = quantile_scores(&recency, false);
    let f_scores = quantile_scores(&frequency, true);
    let m_scores = quantile_scores(&monetary, true);

    for (i, customer) in customers.iter_mut().enumerate() {
        customer.r_score = r_scores[i];
        customer.f_score = f_scores[i];
        customer.m_score = m_scores[i];
    }

    customers
}

/// Bucket each value into a 1-5 score by its quantile rank over the whole
/// slice. Equal values always receive equal scores, and scores are
/// monotonically non-decreasing in the value when `higher_is_better`.
fn quantile_scores(values: &[f64], higher_is_better: bool) -> Vec<u8> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    values
        .iter()
        .map(|v| {
            let below = sorted.partition_point(|x| x < v);
            let score = (below * 5 / n) as u8 + 1;
            let score = score.min(5);
            if higher_is_better {
                score
            } else {
                6 - score
            }
        })
        .collect()
}

/// Fixed lookup from (R, F, M) scores to a segment label. F and M are folded
/// into their rounded mean before the lookup, the usual two-axis RFM grid.
pub fn segment_label(r: u8, f: u8, m: u8) -> &'static str {
    let fm = (f + m).div_ceil(2);
    match (r, fm) {
        (4..=5, 4..=5) => "Champions",
        (4..=5, 2..=3) => "Potential Loyalist",
        (4..=5, _) => "New Customers",
        (3, 4..=5) => "Loyal Customers",
        (3, _) => "Need Attention",
        (2, 3..=5) => "At Risk",
        (_, 1..=2) => "Lost",
        _ => "Hibernating",
    }
}
