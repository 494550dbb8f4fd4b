use crate::error::{Result, RetrieverError};
use crate::types::SequenceSummary;
use resvg::{tiny_skia, usvg};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use svg::node::element::{Circle, Line, Polyline, Rectangle, Text};
use svg::Document;
use tracing::info;

// 12x6 inches at 100 dpi
const SVG_WIDTH: f64 = 1200.0;
const SVG_HEIGHT: f64 = 600.0;
const PLOT_LEFT: f64 = 90.0;
const PLOT_RIGHT: f64 = SVG_WIDTH - 30.0;
const PLOT_TOP: f64 = 50.0;
const PLOT_BOTTOM: f64 = SVG_HEIGHT - 130.0;

const TICK_FONT_SIZE: f64 = 6.0;
const LABEL_FONT_SIZE: f64 = 14.0;
const TITLE_FONT_SIZE: f64 = 16.0;
const MARKER_RADIUS: f64 = 3.0;
const LINE_COLOR: &str = "#1f77b4";

pub const TITLE: &str = "Sequence Lengths Sorted by Size";
pub const X_LABEL: &str = "Accession";
pub const Y_LABEL: &str = "Sequence Length";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlotFormat {
    Png,
    Svg,
}

impl PlotFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PlotFormat::Png => "png",
            PlotFormat::Svg => "svg",
        }
    }
}

/// Records ordered longest first; ties keep their fetch order.
pub fn sorted_by_length_desc(summaries: &[SequenceSummary]) -> Vec<&SequenceSummary> {
    let mut sorted: Vec<&SequenceSummary> = summaries.iter().collect();
    sorted.sort_by(|a, b| b.length.cmp(&a.length));
    sorted
}

/// Smallest 1/2/5 x 10^n step not below `raw`.
fn nice_step(raw: f64) -> f64 {
    if raw <= 1.0 {
        return 1.0;
    }
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Y axis ticks from zero up to the first tick at or above `max`.
fn y_ticks(max: usize) -> Vec<f64> {
    let step = nice_step(max as f64 / 5.0);
    let top = ((max as f64 / step).ceil() * step).max(step);
    let count = (top / step).round() as usize;
    (0..=count).map(|i| i as f64 * step).collect()
}

fn x_for_slot(slot: usize, slots: usize) -> f64 {
    let width = PLOT_RIGHT - PLOT_LEFT;
    PLOT_LEFT + (slot as f64 + 0.5) * width / slots.max(1) as f64
}

fn y_for_length(length: f64, y_max: f64) -> f64 {
    PLOT_BOTTOM - (length / y_max) * (PLOT_BOTTOM - PLOT_TOP)
}

fn text(content: impl Into<String>, x: f64, y: f64, size: f64) -> Text {
    Text::new(content)
        .set("x", x)
        .set("y", y)
        .set("font-family", "sans-serif")
        .set("font-size", size)
        .set("fill", "#000000")
}

/// Build the length plot as an SVG document.
pub fn render_svg(summaries: &[SequenceSummary]) -> Document {
    let sorted = sorted_by_length_desc(summaries);
    let max_len = sorted.first().map(|s| s.length).unwrap_or(0);
    let ticks = y_ticks(max_len);
    let y_max = ticks.last().copied().unwrap_or(1.0);

    let mut doc = Document::new()
        .set("viewBox", (0, 0, SVG_WIDTH, SVG_HEIGHT))
        .set("width", SVG_WIDTH)
        .set("height", SVG_HEIGHT)
        .add(
            Rectangle::new()
                .set("x", 0)
                .set("y", 0)
                .set("width", SVG_WIDTH)
                .set("height", SVG_HEIGHT)
                .set("fill", "#ffffff"),
        );

    // Y ticks and labels
    for tick in &ticks {
        let y = y_for_length(*tick, y_max);
        doc = doc
            .add(
                Line::new()
                    .set("x1", PLOT_LEFT - 4.0)
                    .set("y1", y)
                    .set("x2", PLOT_LEFT)
                    .set("y2", y)
                    .set("stroke", "#000000")
                    .set("stroke-width", 1),
            )
            .add(
                text(format!("{}", *tick as u64), PLOT_LEFT - 7.0, y + 3.0, 10.0)
                    .set("text-anchor", "end"),
            );
    }

    // X ticks with rotated accession labels
    for (slot, summary) in sorted.iter().enumerate() {
        let x = x_for_slot(slot, sorted.len());
        let label_y = PLOT_BOTTOM + 6.0;
        doc = doc
            .add(
                Line::new()
                    .set("x1", x)
                    .set("y1", PLOT_BOTTOM)
                    .set("x2", x)
                    .set("y2", PLOT_BOTTOM + 3.0)
                    .set("stroke", "#000000")
                    .set("stroke-width", 0.5),
            )
            .add(
                text(summary.accession.clone(), x, label_y, TICK_FONT_SIZE)
                    .set("class", "x-tick")
                    .set("text-anchor", "end")
                    .set("dominant-baseline", "middle")
                    .set("transform", format!("rotate(-90 {x} {label_y})")),
            );
    }

    // Axes frame
    doc = doc.add(
        Rectangle::new()
            .set("x", PLOT_LEFT)
            .set("y", PLOT_TOP)
            .set("width", PLOT_RIGHT - PLOT_LEFT)
            .set("height", PLOT_BOTTOM - PLOT_TOP)
            .set("fill", "none")
            .set("stroke", "#000000")
            .set("stroke-width", 1),
    );

    if !sorted.is_empty() {
        let points: Vec<(f64, f64)> = sorted
            .iter()
            .enumerate()
            .map(|(slot, s)| (x_for_slot(slot, sorted.len()), y_for_length(s.length as f64, y_max)))
            .collect();
        let points_attr = points
            .iter()
            .map(|(x, y)| format!("{x:.2},{y:.2}"))
            .collect::<Vec<_>>()
            .join(" ");
        doc = doc.add(
            Polyline::new()
                .set("points", points_attr)
                .set("fill", "none")
                .set("stroke", LINE_COLOR)
                .set("stroke-width", 1.5),
        );
        for (x, y) in points {
            doc = doc.add(
                Circle::new()
                    .set("cx", x)
                    .set("cy", y)
                    .set("r", MARKER_RADIUS)
                    .set("fill", LINE_COLOR),
            );
        }
    }

    let x_label_y = SVG_HEIGHT - 12.0;
    let y_label_x = 22.0;
    let y_label_y = (PLOT_TOP + PLOT_BOTTOM) / 2.0;
    doc.add(
        text(TITLE, (PLOT_LEFT + PLOT_RIGHT) / 2.0, PLOT_TOP - 18.0, TITLE_FONT_SIZE)
            .set("text-anchor", "middle"),
    )
    .add(
        text(X_LABEL, (PLOT_LEFT + PLOT_RIGHT) / 2.0, x_label_y, LABEL_FONT_SIZE)
            .set("text-anchor", "middle"),
    )
    .add(
        text(Y_LABEL, y_label_x, y_label_y, LABEL_FONT_SIZE)
            .set("text-anchor", "middle")
            .set("transform", format!("rotate(-90 {y_label_x} {y_label_y})")),
    )
}

/// Rasterise an SVG document to PNG bytes.
pub fn rasterize_png(svg_text: &str) -> Result<Vec<u8>> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg_text, &options)
        .map_err(|e| RetrieverError::Plot(format!("invalid SVG: {e}")))?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| RetrieverError::Plot("zero-sized canvas".into()))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
    pixmap
        .encode_png()
        .map_err(|e| RetrieverError::Plot(format!("PNG encoding failed: {e}")))
}

/// Render the plot and write it to `path` in the requested format.
pub fn write_plot<P: AsRef<Path>>(path: P, summaries: &[SequenceSummary], format: PlotFormat) -> Result<()> {
    let path = path.as_ref();
    let svg_text = render_svg(summaries).to_string();
    match format {
        PlotFormat::Svg => fs::write(path, svg_text)?,
        PlotFormat::Png => fs::write(path, rasterize_png(&svg_text)?)?,
    }
    info!(points = summaries.len(), path = %path.display(), "plot written");
    Ok(())
}
