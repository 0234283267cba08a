//! Scorecard charts rendered to in-memory SVG documents.
//!
//! The library never writes charts to disk; callers decide what to do with
//! the returned [`Chart`].

use crate::analyzers::types::ScorecardRow;
use crate::error::{Result, ScorecardError};
use plotters::prelude::*;
use tracing::debug;

const STEELBLUE: RGBColor = RGBColor(70, 130, 180);
const CORAL: RGBColor = RGBColor(255, 127, 80);
const CRIMSON: RGBColor = RGBColor(220, 20, 60);

pub const BAR_CHART_SIZE: (u32, u32) = (1200, 600);
pub const SCATTER_CHART_SIZE: (u32, u32) = (1000, 700);

const FONT: &str = "sans-serif";

/// A rendered chart.
#[derive(Debug, Clone)]
pub struct Chart {
    pub title: String,
    pub size: (u32, u32),
    pub svg: String,
}

struct BarStyle<'a> {
    title: &'a str,
    x_desc: &'a str,
    color: RGBColor,
    decimals: usize,
    highlight: Option<usize>,
}

/// Horizontal bars of delay rate per group, worst at the top.
///
/// With `highlight_worst`, the bar with the highest rate is drawn in red.
pub fn plot_delay_rates(
    scorecard: &[ScorecardRow],
    size: (u32, u32),
    highlight_worst: bool,
) -> Result<Chart> {
    let bars = ascending_bars(scorecard, |r| r.delay_rate_pct);
    let highlight = if highlight_worst { position_of_max(&bars) } else { None };

    render_bars(
        &bars,
        size,
        BarStyle {
            title: "Which Airline Is Most Likely to Make You Late? Delay Rate by Carrier",
            x_desc: "Delay Rate (%)",
            color: STEELBLUE,
            decimals: 1,
            highlight,
        },
    )
}

/// Horizontal bars of cancellation rate per group, worst at the top.
pub fn plot_cancellation_rates(scorecard: &[ScorecardRow], size: (u32, u32)) -> Result<Chart> {
    let bars = ascending_bars(scorecard, |r| r.cancellation_rate_pct);

    render_bars(
        &bars,
        size,
        BarStyle {
            title: "Flight Cancellation Rate by Carrier",
            x_desc: "Cancellation Rate (%)",
            color: CORAL,
            decimals: 2,
            highlight: None,
        },
    )
}

/// Delay rate against cancellation rate, one labelled point per group.
pub fn plot_delay_vs_cancellation(scorecard: &[ScorecardRow], size: (u32, u32)) -> Result<Chart> {
    if scorecard.is_empty() {
        return Err(ScorecardError::Chart("scorecard has no rows to plot".into()));
    }

    let title = "Airline Reliability: Delay Rate vs. Cancellation Rate";
    let x_end = axis_end(scorecard.iter().map(|r| r.delay_rate_pct));
    let y_end = axis_end(scorecard.iter().map(|r| r.cancellation_rate_pct));

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 24))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(0f64..x_end, 0f64..y_end)?;

        chart
            .configure_mesh()
            .x_desc("Delay Rate (%)")
            .y_desc("Cancellation Rate (%)")
            .draw()?;

        chart.draw_series(scorecard.iter().map(|r| {
            EmptyElement::at((r.delay_rate_pct, r.cancellation_rate_pct))
                + Circle::new((0, 0), 10, STEELBLUE.mix(0.6).filled())
                + Circle::new((0, 0), 10, BLACK.stroke_width(2))
                + Text::new(r.group.clone(), (12, -12), (FONT, 12))
        }))?;

        root.present()?;
    }

    debug!(points = scorecard.len(), bytes = svg.len(), "Scatter chart rendered");
    Ok(Chart {
        title: title.to_string(),
        size,
        svg,
    })
}

fn ascending_bars(
    scorecard: &[ScorecardRow],
    value: impl Fn(&ScorecardRow) -> f64,
) -> Vec<(String, f64)> {
    let mut bars: Vec<(String, f64)> = scorecard
        .iter()
        .map(|r| (r.group.clone(), value(r)))
        .collect();
    bars.sort_by(|a, b| a.1.total_cmp(&b.1));
    bars
}

/// Index of the first bar holding the maximum value.
fn position_of_max(bars: &[(String, f64)]) -> Option<usize> {
    let max = bars.iter().map(|(_, v)| *v).reduce(f64::max)?;
    bars.iter().position(|(_, v)| *v == max)
}

/// Upper axis bound leaving room for labels; never zero.
fn axis_end(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(0.0, f64::max);
    if max > 0.0 { max * 1.15 } else { 1.0 }
}

fn render_bars(bars: &[(String, f64)], size: (u32, u32), style: BarStyle<'_>) -> Result<Chart> {
    if bars.is_empty() {
        return Err(ScorecardError::Chart("scorecard has no rows to plot".into()));
    }

    let x_end = axis_end(bars.iter().map(|(_, v)| *v));
    let count = bars.len() as i32;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(style.title, (FONT, 24))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(200)
            .build_cartesian_2d(0f64..x_end, (0..count).into_segmented())?;

        let label = |v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(i) => bars
                .get(*i as usize)
                .map(|(name, _)| name.clone())
                .unwrap_or_default(),
            _ => String::new(),
        };

        chart
            .configure_mesh()
            .disable_y_mesh()
            .x_desc(style.x_desc)
            .y_desc("Airline")
            .y_labels(bars.len())
            .y_label_formatter(&label)
            .draw()?;

        chart.draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
            let color = if style.highlight == Some(i) { CRIMSON } else { style.color };
            let (lo, hi) = (SegmentValue::Exact(i as i32), SegmentValue::Exact(i as i32 + 1));
            Rectangle::new([(0.0, lo), (*v, hi)], color.filled())
        }))?;

        chart.draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
            let (lo, hi) = (SegmentValue::Exact(i as i32), SegmentValue::Exact(i as i32 + 1));
            Rectangle::new([(0.0, lo), (*v, hi)], BLACK.stroke_width(1))
        }))?;

        chart.draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
            Text::new(
                format!("{:.*}%", style.decimals, v),
                (*v + x_end * 0.01, SegmentValue::CenterOf(i as i32)),
                (FONT, 14),
            )
        }))?;

        root.present()?;
    }

    debug!(bars = bars.len(), bytes = svg.len(), "Bar chart rendered");
    Ok(Chart {
        title: style.title.to_string(),
        size,
        svg,
    })
}
