//! Chart rendering with Plotters, keyed by aggregate name
//!
//! The renderer is a pure consumer: given a named aggregate it draws the
//! corresponding chart type. Unknown names are ignored and `NoData` entries
//! are skipped with a warning, so rendering never fails on content.

use std::fs;
use std::path::{Path, PathBuf};

use plotters::element::Pie;
use plotters::prelude::*;

use crate::aggregate::{Aggregate, AggregateResult};

/// Color palette cycled across bar groups and pie segments
const SERIES_COLORS: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

/// Render every known aggregate into `out_dir` as PNG files.
///
/// # Returns
/// * Paths of the chart files written, in deterministic (name) order
pub fn render_report(result: &AggregateResult, out_dir: &Path) -> crate::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    let mut artifacts = Vec::new();
    for (name, aggregate) in result.iter() {
        if aggregate.is_no_data() {
            log::warn!("Skipping '{name}': no data");
            continue;
        }
        if let Some(path) = render_entry(name, aggregate, out_dir)? {
            log::info!("Chart saved to {}", path.display());
            artifacts.push(path);
        }
    }
    Ok(artifacts)
}

/// Dispatch one named aggregate to its chart type. Returns `None` for
/// entries that produce no file (scalars, unknown names).
fn render_entry(
    name: &str,
    aggregate: &Aggregate,
    out_dir: &Path,
) -> crate::Result<Option<PathBuf>> {
    let path = out_dir.join(format!("{name}.png"));
    match (name, aggregate) {
        ("total_sales", Aggregate::Scalar(total)) => {
            log::info!("Total sales: {total:.2}");
            Ok(None)
        }
        ("monthly_trend", Aggregate::Series(series)) => {
            line_chart(series, "Monthly Sales Trend", "Total sales", &path)?;
            Ok(Some(path))
        }
        ("sales_by_country", Aggregate::Series(series)) => {
            bar_chart(series, "Sales by Country", "Total sales", &path)?;
            Ok(Some(path))
        }
        ("top_products", Aggregate::Series(series)) => {
            bar_chart(series, "Top Products by Sales", "Total sales", &path)?;
            Ok(Some(path))
        }
        ("price_tiers", Aggregate::Series(series)) => {
            bar_chart(series, "Sales by MSRP Tier", "Total sales", &path)?;
            Ok(Some(path))
        }
        ("avg_deal_size", Aggregate::Series(series)) => {
            bar_chart(series, "Average Deal Size", "Average sales", &path)?;
            Ok(Some(path))
        }
        ("rfm_segments", Aggregate::Series(series)) => {
            pie_chart(series, "RFM Customer Segments", &path)?;
            Ok(Some(path))
        }
        ("correlation", Aggregate::Matrix { labels, values }) => {
            heatmap(labels, values, "Correlation Matrix", &path)?;
            Ok(Some(path))
        }
        _ => {
            log::debug!("Ignoring unknown aggregate '{name}'");
            Ok(None)
        }
    }
}

/// Vertical bar chart over an ordered series, one bar per key.
pub fn bar_chart(
    series: &[(String, f64)],
    title: &str,
    y_desc: &str,
    path: &Path,
) -> crate::Result<()> {
    let labels: Vec<&str> = series.iter().map(|(k, _)| k.as_str()).collect();
    let max_value = series.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let y_max = if max_value > 0.0 { max_value * 1.1 } else { 1.0 };
    let n = series.len() as f64;

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(n - 0.5), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(series.len())
        .x_label_formatter(&|x| {
            let i = x.round();
            if i < 0.0 {
                return String::new();
            }
            labels
                .get(i as usize)
                .map(|s| s.to_string())
                .unwrap_or_default()
        })
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, (_, value)) in series.iter().enumerate() {
        let color = &SERIES_COLORS[i % SERIES_COLORS.len()];
        chart.draw_series(std::iter::once(Rectangle::new(
            [(i as f64 - 0.4, 0.0), (i as f64 + 0.4, *value)],
            color.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

pub fn line_chart(
    series: &[(String, f64)],
    title: &str,
    y_desc: &str,
    path: &Path,
) -> crate::Result<()> {
    let labels: Vec<&str> = series.iter().map(|(k, _)| k.as_str()).collect();
    let max_value = series.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let y_max = if max_value > 0.0 { max_value * 1.1 } else { 1.0 };
    let n = series.len() as f64;

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(n - 0.5), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(series.len())
        .x_label_formatter(&|x| {
            let i = x.round();
            if i < 0.0 {
                return String::new();
            }
            labels
                .get(i as usize)
                .map(|s| s.to_string())
                .unwrap_or_default()
        })
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, (_, v))| (i as f64, *v))
        .collect();

    chart.draw_series(LineSeries::new(points.clone(), &SERIES_COLORS[0]))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 4, SERIES_COLORS[0].filled())),
    )?;

    root.present()?;
    Ok(())
}

pub fn pie_chart(series: &[(String, f64)], title: &str, path: &Path) -> crate::Result<()> {
    let sizes: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let labels: Vec<String> = series
        .iter()
        .map(|(k, v)| format!("{k} ({v:.0})"))
        .collect();
    let colors: Vec<RGBColor> = (0..series.len())
        .map(|i| SERIES_COLORS[i % SERIES_COLORS.len()])
        .collect();

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, ("sans-serif", 30))?;

    let center = (400, 290);
    let radius = 220.0;
    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 15).into_font());
    root.draw(&pie)?;

    root.present()?;
    Ok(())
}

/// Correlation heatmap: blue for negative, white for zero, red for positive.
pub fn heatmap(
    labels: &[String],
    values: &ndarray::Array2<f64>,
    title: &str,
    path: &Path,
) -> crate::Result<()> {
    let n = labels.len();

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(70)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..n as f64, 0f64..n as f64)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|x| label_at(labels, *x))
        .y_label_formatter(&|y| label_at(labels, *y))
        .draw()?;

    for i in 0..n {
        for j in 0..n {
            let value = values[[i, j]];
            chart.draw_series(std::iter::once(Rectangle::new(
                [(j as f64, i as f64), (j as f64 + 1.0, i as f64 + 1.0)],
                corr_color(value).filled(),
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                format!("{value:.2}"),
                (j as f64 + 0.35, i as f64 + 0.5),
                ("sans-serif", 14),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

fn label_at(labels: &[String], coord: f64) -> String {
    let i = coord.floor();
    if i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

fn corr_color(value: f64) -> RGBColor {
    let v = value.clamp(-1.0, 1.0);
    if v >= 0.0 {
        let fade = (255.0 * (1.0 - v)) as u8;
        RGBColor(255, fade, fade)
    } else {
        let fade = (255.0 * (1.0 + v)) as u8;
        RGBColor(fade, fade, 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::data::{CleanStats, CleanedDataset, DealSize, SalesRecord};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sample_dataset() -> CleanedDataset {
        let records = (1..=6u32)
            .map(|i| SalesRecord {
                order_number: i,
                order_date: NaiveDate::from_ymd_opt(2003, i, 10)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                product_line: format!("Line {}", i % 3),
                product_code: format!("S10_{i}"),
                quantity: i * 2,
                price_each: 50.0 + i as f64,
                msrp: 40.0 * i as f64,
                sales: 1_000.0 * i as f64,
                customer: format!("Customer {}", i % 4),
                city: "NYC".to_string(),
                country: if i % 2 == 0 { "USA" } else { "France" }.to_string(),
                deal_size: DealSize::from_amount(1_000.0 * i as f64),
                status: "Shipped".to_string(),
                discount_pct: i as f64,
            })
            .collect();
        CleanedDataset {
            records,
            stats: CleanStats::default(),
        }
    }

    #[test]
    fn test_render_report_writes_charts() {
        let result = aggregate(&sample_dataset(), 3);
        let dir = tempdir().unwrap();

        let artifacts = render_report(&result, dir.path()).unwrap();
        // Everything but the scalar produces a file.
        assert_eq!(artifacts.len(), 7);
        for path in &artifacts {
            assert!(path.exists(), "{} missing", path.display());
        }
    }

    #[test]
    fn test_render_report_skips_no_data() {
        let empty = CleanedDataset {
            records: Vec::new(),
            stats: CleanStats::default(),
        };
        let result = aggregate(&empty, 3);
        let dir = tempdir().unwrap();

        let artifacts = render_report(&result, dir.path()).unwrap();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_render_entry_ignores_unknown_name() {
        let dir = tempdir().unwrap();
        let rendered =
            render_entry("bogus_metric", &Aggregate::Scalar(1.0), dir.path()).unwrap();
        assert!(rendered.is_none());

        // Nothing was written for the unrecognized name.
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_bar_chart_single_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bar.png");
        let series = vec![("USA".to_string(), 42.0)];
        bar_chart(&series, "Test", "Sales", &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corr_color_endpoints() {
        assert_eq!(corr_color(1.0), RGBColor(255, 0, 0));
        assert_eq!(corr_color(-1.0), RGBColor(0, 0, 255));
        assert_eq!(corr_color(0.0), RGBColor(255, 255, 255));
    }
}
