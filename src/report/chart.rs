//! SVG profit-curve rendering.
//!
//! One chart per (bid ratio, batch), overlaying a cumulative status curve
//! per move ratio. The SVG is assembled directly; the files are static
//! artifacts meant for a browser or image viewer.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::sim::TrackDayStatus;

use super::json::ReportError;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 540.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 170.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;

const PALETTE: [&str; 6] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
];

/// One curve on a chart, aligned to the shared date axis.
#[derive(Debug, Clone)]
pub struct ProfitSeries {
    pub label: String,
    pub values: Vec<f64>,
}

/// Render one chart as an SVG document.
pub fn render_chart(title: &str, dates: &[NaiveDate], series: &[ProfitSeries]) -> String {
    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let mut min_y = 0.0_f64;
    let mut max_y = 0.0_f64;
    for s in series {
        for &v in &s.values {
            min_y = min_y.min(v);
            max_y = max_y.max(v);
        }
    }
    if (max_y - min_y).abs() < f64::EPSILON {
        max_y = min_y + 1.0;
    }
    let pad = (max_y - min_y) * 0.05;
    min_y -= pad;
    max_y += pad;

    let x_at = |i: usize| {
        let n = dates.len().max(2) - 1;
        MARGIN_LEFT + plot_width * i as f64 / n as f64
    };
    let y_at = |v: f64| MARGIN_TOP + plot_height * (1.0 - (v - min_y) / (max_y - min_y));

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    let _ = write!(
        svg,
        r#"<rect width="{WIDTH}" height="{HEIGHT}" fill="white"/>"#
    );
    let _ = write!(
        svg,
        r#"<text x="{}" y="24" font-family="sans-serif" font-size="16" text-anchor="middle">{title}</text>"#,
        MARGIN_LEFT + plot_width / 2.0
    );

    // horizontal gridlines with y labels
    for tick in 0..=4 {
        let value = min_y + (max_y - min_y) * tick as f64 / 4.0;
        let y = y_at(value);
        let _ = write!(
            svg,
            r#"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{}"/>"#,
            MARGIN_LEFT + plot_width,
            "#ddd"
        );
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="11" text-anchor="end">{value:.0}</text>"#,
            MARGIN_LEFT - 6.0,
            y + 4.0
        );
    }

    // axes
    let _ = write!(
        svg,
        r#"<line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{:.1}" stroke="black"/>"#,
        MARGIN_TOP + plot_height
    );
    let _ = write!(
        svg,
        r#"<line x1="{MARGIN_LEFT}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>"#,
        MARGIN_TOP + plot_height,
        MARGIN_LEFT + plot_width,
        MARGIN_TOP + plot_height
    );

    // first and last date on the x axis
    if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
        let y = MARGIN_TOP + plot_height + 18.0;
        let _ = write!(
            svg,
            r#"<text x="{MARGIN_LEFT}" y="{y:.1}" font-family="sans-serif" font-size="11">{first}</text>"#
        );
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{y:.1}" font-family="sans-serif" font-size="11" text-anchor="end">{last}</text>"#,
            MARGIN_LEFT + plot_width
        );
    }

    for (idx, s) in series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let points: String = s
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| format!("{:.1},{:.1}", x_at(i), y_at(v)))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = write!(
            svg,
            r#"<polyline points="{points}" fill="none" stroke="{color}" stroke-width="1.5"/>"#
        );

        // legend entry
        let ly = MARGIN_TOP + 16.0 * idx as f64;
        let lx = MARGIN_LEFT + plot_width + 14.0;
        let _ = write!(
            svg,
            r#"<rect x="{lx:.1}" y="{:.1}" width="10" height="10" fill="{color}"/>"#,
            ly - 9.0
        );
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{ly:.1}" font-family="sans-serif" font-size="11">{}</text>"#,
            lx + 14.0,
            s.label
        );
    }

    svg.push_str("</svg>");
    svg
}

/// Write one chart per (bid ratio, batch), a profit curve per move ratio.
/// Returns the paths written.
pub fn write_charts(dir: &Path, status: &[TrackDayStatus]) -> Result<Vec<PathBuf>, ReportError> {
    // (bid, batch) -> move -> date -> status
    let mut grouped: BTreeMap<(Decimal, usize), BTreeMap<Decimal, BTreeMap<NaiveDate, f64>>> =
        BTreeMap::new();
    let mut dates: BTreeMap<NaiveDate, ()> = BTreeMap::new();
    for row in status {
        dates.insert(row.date, ());
        grouped
            .entry((row.key.bid_ratio, row.key.batch))
            .or_default()
            .entry(row.key.move_ratio)
            .or_default()
            .insert(row.date, row.status.to_f64().unwrap_or(0.0));
    }
    let dates: Vec<NaiveDate> = dates.into_keys().collect();

    let mut written = Vec::new();
    for ((bid_ratio, batch), curves) in grouped {
        let series: Vec<ProfitSeries> = curves
            .into_iter()
            .map(|(move_ratio, points)| {
                let mut last = 0.0;
                let values = dates
                    .iter()
                    .map(|d| {
                        if let Some(&v) = points.get(d) {
                            last = v;
                        }
                        last
                    })
                    .collect();
                ProfitSeries {
                    label: format!("move {move_ratio}"),
                    values,
                }
            })
            .collect();

        let title = format!("Status, bid ratio {bid_ratio}, batch {batch}");
        let svg = render_chart(&title, &dates, &series);
        let path = dir.join(format!("profit_r{bid_ratio}_b{batch}.svg"));
        std::fs::write(&path, svg)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::TrackKey;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_render_contains_curves_and_legend() {
        let dates = vec![date(2013, 11, 3), date(2013, 11, 4), date(2013, 11, 5)];
        let series = vec![
            ProfitSeries {
                label: "move 0".to_string(),
                values: vec![0.0, 100.0, 250.0],
            },
            ProfitSeries {
                label: "move 0.05".to_string(),
                values: vec![0.0, -20.0, 30.0],
            },
        ];
        let svg = render_chart("Status, bid ratio 1.0, batch 0", &dates, &series);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("move 0.05"));
        assert!(svg.contains("2013-11-03"));
    }

    #[test]
    fn test_render_flat_series_does_not_divide_by_zero() {
        let dates = vec![date(2013, 11, 3)];
        let series = vec![ProfitSeries {
            label: "move 0".to_string(),
            values: vec![0.0],
        }];
        let svg = render_chart("flat", &dates, &series);
        assert!(svg.contains("<polyline"));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_one_file_per_bid_batch() {
        let dir = std::env::temp_dir().join(format!("shortvol-charts-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut rows = Vec::new();
        for day in [date(2013, 11, 3), date(2013, 11, 4)] {
            for bid in [dec!(1.0), dec!(0.5)] {
                for move_ratio in [dec!(0), dec!(0.05)] {
                    rows.push(TrackDayStatus {
                        key: TrackKey::new(move_ratio, bid, 0),
                        date: day,
                        income: dec!(0),
                        expenses: dec!(0),
                        profit: dec!(10),
                        status: dec!(10),
                        open_positions: 0,
                    });
                }
            }
        }

        let written = write_charts(&dir, &rows).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.join("profit_r1.0_b0.svg").exists());
        assert!(dir.join("profit_r0.5_b0.svg").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
