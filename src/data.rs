//! Data loading and cleaning: raw CSV -> typed, validated sales records

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use encoding_rs::Encoding;
use serde::{Deserialize, Deserializer};

use crate::error::{LoadError, SchemaError};

/// Expected date format of the ORDERDATE column, e.g. "2/24/2003 0:00".
const ORDER_DATE_FORMAT: &str = "%m/%d/%Y %H:%M";

/// Columns that must be present for cleaning to proceed.
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "ORDERNUMBER",
    "ORDERDATE",
    "QUANTITYORDERED",
    "PRICEEACH",
    "MSRP",
    "SALES",
    "PRODUCTLINE",
    "PRODUCTCODE",
    "CUSTOMERNAME",
    "COUNTRY",
    "STATUS",
    "DEALSIZE",
];

/// Free-text / contact columns that carry no analytical value. They are not
/// parsed into [`SalesRecord`] at all, which is how "dropping" them works.
pub const DISALLOWED_COLUMNS: [&str; 7] = [
    "PHONE",
    "ADDRESSLINE2",
    "POSTALCODE",
    "STATE",
    "TERRITORY",
    "CONTACTLASTNAME",
    "CONTACTFIRSTNAME",
];

/// Deal-size thresholds on the total order amount.
const DEAL_SIZE_MEDIUM_MIN: f64 = 3_000.0;
const DEAL_SIZE_LARGE_MIN: f64 = 7_000.0;

/// Canonical spellings for country names seen in the wild. Left side is the
/// uppercased variant, right side the canonical form.
const COUNTRY_ALIASES: [(&str, &str); 10] = [
    ("USA", "USA"),
    ("U.S.A.", "USA"),
    ("US", "USA"),
    ("UNITED STATES", "USA"),
    ("UNITED STATES OF AMERICA", "USA"),
    ("UK", "UK"),
    ("U.K.", "UK"),
    ("UNITED KINGDOM", "UK"),
    ("GREAT BRITAIN", "UK"),
    ("HOLLAND", "Netherlands"),
];

/// Raw table exactly as decoded from the file: the header row plus every
/// data row as string fields. No typing or validation has happened yet.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Column names as the file claims them.
    pub headers: csv::StringRecord,
    /// Each data row, one string per field.
    pub rows: Vec<csv::StringRecord>,
}

/// Deal-size bucket derived from the total order amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DealSize {
    Small,
    Medium,
    Large,
}

impl DealSize {
    /// Bucket a total order amount. Single source of truth for derivation.
    pub fn from_amount(amount: f64) -> Self {
        if amount > DEAL_SIZE_LARGE_MIN {
            DealSize::Large
        } else if amount >= DEAL_SIZE_MEDIUM_MIN {
            DealSize::Medium
        } else {
            DealSize::Small
        }
    }

    fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "SMALL" => Some(DealSize::Small),
            "MEDIUM" => Some(DealSize::Medium),
            "LARGE" => Some(DealSize::Large),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DealSize::Small => "Small",
            DealSize::Medium => "Medium",
            DealSize::Large => "Large",
        }
    }
}

/// One cleaned, typed sales row. Read-only once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub order_number: u32,
    pub order_date: NaiveDateTime,
    pub product_line: String,
    pub product_code: String,
    pub quantity: u32,
    pub price_each: f64,
    pub msrp: f64,
    /// Total order-line amount. Derived as quantity * price_each when the
    /// source field is missing.
    pub sales: f64,
    pub customer: String,
    pub city: String,
    /// Canonical country name (unmapped values pass through unchanged).
    pub country: String,
    pub deal_size: DealSize,
    pub status: String,
    /// ((MSRP - PRICEEACH) / MSRP) * 100 when MSRP > PRICEEACH, else 0.
    pub discount_pct: f64,
}

impl SalesRecord {
    /// "YYYY-MM" key used for monthly grouping.
    pub fn month_key(&self) -> String {
        self.order_date.format("%Y-%m").to_string()
    }
}

/// Per-category counters for rows discarded or flagged during cleaning.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanStats {
    pub rows_in: usize,
    /// Rows missing an unrecoverable required field (date or numeric).
    pub dropped_missing: usize,
    /// Rows with quantity <= 0.
    pub dropped_nonpositive_qty: usize,
    /// Rows removed as duplicates of an earlier (order, product line) pair.
    pub duplicates_removed: usize,
    /// Countries passed through without a canonical mapping.
    pub unmapped_countries: usize,
}

/// Cleaned dataset: deduplicated, validated records in input order plus the
/// drop counters gathered along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDataset {
    pub records: Vec<SalesRecord>,
    pub stats: CleanStats,
}

impl CleanedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load a raw table from a delimited text file.
///
/// # Arguments
/// * `path` - Path to the CSV file
/// * `encoding_label` - WHATWG encoding label, e.g. "ISO-8859-1" or "utf-8"
///
/// # Returns
/// * `RawTable` with headers and unparsed string rows
pub fn load(path: &Path, encoding_label: &str) -> crate::Result<RawTable> {
    let encoding = Encoding::for_label(encoding_label.as_bytes())
        .ok_or_else(|| LoadError::UnknownEncoding(encoding_label.to_string()))?;

    // Scoped read: the handle is closed before any parsing can fail.
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(LoadError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.name().to_string(),
        }
        .into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }

    if headers.is_empty() || rows.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        }
        .into());
    }

    log::info!("Loaded {} raw rows from {}", rows.len(), path.display());
    Ok(RawTable { headers, rows })
}

/// Untyped view of one row, deserialized by column name. Numeric fields that
/// fail to parse come through as `None` so the row-level policy can decide
/// whether to drop or fill.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "ORDERNUMBER", deserialize_with = "lenient", default)]
    order_number: Option<u32>,
    #[serde(rename = "ORDERDATE", default)]
    order_date: Option<String>,
    #[serde(rename = "QUANTITYORDERED", deserialize_with = "lenient", default)]
    quantity: Option<i64>,
    #[serde(rename = "PRICEEACH", deserialize_with = "lenient", default)]
    price_each: Option<f64>,
    #[serde(rename = "MSRP", deserialize_with = "lenient", default)]
    msrp: Option<f64>,
    #[serde(rename = "SALES", deserialize_with = "lenient", default)]
    sales: Option<f64>,
    #[serde(rename = "PRODUCTLINE", default)]
    product_line: Option<String>,
    #[serde(rename = "PRODUCTCODE", default)]
    product_code: Option<String>,
    #[serde(rename = "CUSTOMERNAME", default)]
    customer: Option<String>,
    #[serde(rename = "CITY", default)]
    city: Option<String>,
    #[serde(rename = "COUNTRY", default)]
    country: Option<String>,
    #[serde(rename = "STATUS", default)]
    status: Option<String>,
    #[serde(rename = "DEALSIZE", default)]
    deal_size: Option<String>,
}

/// Clean a raw table into a typed dataset.
///
/// Steps, in order: header validation, type coercion (unparseable values
/// become missing), missing-value policy (required numeric/date -> drop row;
/// categorical -> fill or re-derive), non-positive quantity drop, duplicate
/// removal by (order number, product line), whitespace normalization, and
/// derivation of country, deal size, and discount percentage.
///
/// Pure function of its input: the same `RawTable` always yields the same
/// `CleanedDataset`.
pub fn clean(table: &RawTable) -> crate::Result<CleanedDataset> {
    let present: HashSet<&str> = table.headers.iter().collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError { missing }.into());
    }

    let mut stats = CleanStats {
        rows_in: table.rows.len(),
        ..CleanStats::default()
    };
    let mut seen: HashSet<(u32, String)> = HashSet::new();
    let mut records = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        // Disallowed columns are dropped here implicitly: RawRecord simply
        // never reads them.
        let raw: RawRecord = match row.deserialize(Some(&table.headers)) {
            Ok(raw) => raw,
            Err(err) => {
                log::debug!("Dropping malformed row: {err}");
                stats.dropped_missing += 1;
                continue;
            }
        };

        let record = match validate_row(raw, &mut stats) {
            Some(record) => record,
            None => continue,
        };

        let key = (record.order_number, record.product_line.clone());
        if !seen.insert(key) {
            stats.duplicates_removed += 1;
            continue;
        }
        records.push(record);
    }

    log::info!(
        "Cleaned {} rows -> {} records ({} missing-field, {} bad-quantity, {} duplicate)",
        stats.rows_in,
        records.len(),
        stats.dropped_missing,
        stats.dropped_nonpositive_qty,
        stats.duplicates_removed,
    );

    Ok(CleanedDataset { records, stats })
}

/// Apply the per-row policy: drop on unrecoverable fields, fill or derive
/// the rest. Returns `None` when the row is dropped (counted in `stats`).
fn validate_row(raw: RawRecord, stats: &mut CleanStats) -> Option<SalesRecord> {
    // Required numerics and date: drop-row when absent or unparseable.
    let order_number = raw.order_number;
    let order_date = raw.order_date.as_deref().and_then(parse_order_date);
    let (order_number, order_date) = match (order_number, order_date) {
        (Some(n), Some(d)) => (n, d),
        _ => {
            stats.dropped_missing += 1;
            return None;
        }
    };

    let quantity = match raw.quantity {
        Some(q) if q > 0 => q as u32,
        Some(_) => {
            stats.dropped_nonpositive_qty += 1;
            return None;
        }
        None => {
            stats.dropped_missing += 1;
            return None;
        }
    };

    let price_each = match raw.price_each {
        Some(p) if p > 0.0 => p,
        _ => {
            stats.dropped_missing += 1;
            return None;
        }
    };

    // SALES is recoverable: derive from quantity * price when missing.
    let sales = match raw.sales {
        Some(s) if s > 0.0 => s,
        _ => quantity as f64 * price_each,
    };

    let msrp = match raw.msrp {
        Some(m) if m > 0.0 => m,
        _ => {
            stats.dropped_missing += 1;
            return None;
        }
    };

    let product_line = squash_spaces(raw.product_line.as_deref().unwrap_or_default());
    let product_code = squash_spaces(raw.product_code.as_deref().unwrap_or_default());
    let customer = squash_spaces(raw.customer.as_deref().unwrap_or_default());
    if product_line.is_empty() || product_code.is_empty() || customer.is_empty() {
        stats.dropped_missing += 1;
        return None;
    }

    // Categorical fields: fill-with-placeholder or re-derive, never drop.
    let city = match squash_spaces(raw.city.as_deref().unwrap_or_default()) {
        s if s.is_empty() => "Unknown".to_string(),
        s => s,
    };
    let status = match squash_spaces(raw.status.as_deref().unwrap_or_default()) {
        s if s.is_empty() => "Unknown".to_string(),
        s => s,
    };
    let country = normalize_country(
        &squash_spaces(raw.country.as_deref().unwrap_or_default()),
        stats,
    );
    let deal_size = raw
        .deal_size
        .as_deref()
        .and_then(DealSize::parse)
        .unwrap_or_else(|| DealSize::from_amount(sales));

    let discount_pct = if msrp > price_each {
        ((msrp - price_each) / msrp) * 100.0
    } else {
        0.0
    };

    Some(SalesRecord {
        order_number,
        order_date,
        product_line,
        product_code,
        quantity,
        price_each,
        msrp,
        sales,
        customer,
        city,
        country,
        deal_size,
        status,
        discount_pct,
    })
}

fn parse_order_date(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, ORDER_DATE_FORMAT)
        .ok()
        .or_else(|| {
            // Some exports strip the time component.
            NaiveDate::parse_from_str(s, "%m/%d/%Y")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Map a country string onto its canonical spelling. Unmapped values pass
/// through unchanged with a warning, never a hard failure.
fn normalize_country(country: &str, stats: &mut CleanStats) -> String {
    if country.is_empty() {
        stats.unmapped_countries += 1;
        return "Unknown".to_string();
    }
    let upper = country.to_ascii_uppercase();
    for (alias, canonical) in COUNTRY_ALIASES {
        if upper == alias {
            return canonical.to_string();
        }
    }
    // Anything spelled out normally (e.g. "France") is already canonical.
    if country.chars().next().is_some_and(|c| c.is_uppercase())
        && country.chars().skip(1).any(|c| c.is_lowercase())
    {
        return country.to_string();
    }
    log::warn!("No canonical mapping for country '{country}', passing through");
    stats.unmapped_countries += 1;
    country.to_string()
}

/// Trim and collapse internal runs of whitespace to single spaces.
fn squash_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a field as `T`, turning empty or unparseable values into `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.and_then(|s| s.trim().parse().ok()))
}
