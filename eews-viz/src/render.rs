//! Chart rendering
//!
//! Every chart is drawn from plain shapes on a plotters SVG canvas:
//! - Horizontal bar chart (sample size overview)
//! - Histogram (numeric attributes)
//! - Donut pie (categorical attributes, top categories)
//! - Sunburst (joint distribution of 2-3 attributes), wrapped in an HTML page
//!
//! Angles for the circular charts start at twelve o'clock and run clockwise.

use plotters::coord::Shift;
use plotters::drawing::DrawingArea;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::TextStyle;
use std::f64::consts::{FRAC_PI_2, PI};
use thiserror::Error;

use crate::breakdown::{Hierarchy, HierarchyNode};

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Drawing failed: {0}")]
    Drawing(String),

    #[error("Nothing to draw: {0}")]
    Empty(String),
}

pub type ChartResult<T> = Result<T, ChartError>;

type Canvas<'a> = DrawingArea<SVGBackend<'a>, Shift>;

const FONT: &str = "sans-serif";

/// Qualitative palette for categories, cycled
const PALETTE: [RGBColor; 10] = [
    RGBColor(0x63, 0x6E, 0xFA),
    RGBColor(0xEF, 0x55, 0x3B),
    RGBColor(0x00, 0xCC, 0x96),
    RGBColor(0xAB, 0x63, 0xFA),
    RGBColor(0xFF, 0xA1, 0x5A),
    RGBColor(0x19, 0xD3, 0xF3),
    RGBColor(0xFF, 0x66, 0x92),
    RGBColor(0xB6, 0xE8, 0x80),
    RGBColor(0xFF, 0x97, 0xFF),
    RGBColor(0xFE, 0xCB, 0x52),
];

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const HISTOGRAM_BLUE: RGBColor = RGBColor(0x63, 0x6E, 0xFA);
const AXIS_GREY: RGBColor = RGBColor(120, 120, 120);

fn drawing_error<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Drawing(e.to_string())
}

fn palette(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Blend toward white; `amount` in `[0, 1]`
fn lighten(color: RGBColor, amount: f64) -> RGBColor {
    let blend = |c: u8| (c as f64 + (255.0 - c as f64) * amount).round().min(255.0) as u8;
    RGBColor(blend(color.0), blend(color.1), blend(color.2))
}

/// The SVG backend writes `font-size` as the requested size divided by this
const SVG_FONT_SCALE: f64 = 1.24;

/// `size` is the `font-size` written to the document
fn text_style(size: f64, pos: Pos) -> TextStyle<'static> {
    TextStyle::from((FONT, size * SVG_FONT_SCALE).into_font())
        .color(&BLACK)
        .pos(pos)
}

fn centered() -> Pos {
    Pos::new(HPos::Center, VPos::Center)
}

fn draw_text(canvas: &Canvas, text: &str, at: (i32, i32), size: f64, pos: Pos) -> ChartResult<()> {
    canvas
        .draw(&Text::new(text.to_string(), at, text_style(size, pos)))
        .map_err(drawing_error)
}

/// Draw on a fresh white SVG canvas and return the document
fn render_svg<F>(size: (u32, u32), draw: F) -> ChartResult<String>
where
    F: FnOnce(&Canvas) -> ChartResult<()>,
{
    let mut svg = String::new();
    {
        let canvas = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        canvas.fill(&WHITE).map_err(drawing_error)?;
        draw(&canvas)?;
        canvas.present().map_err(drawing_error)?;
    }
    Ok(svg)
}

fn percent(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / whole as f64)
}

/// Axis tick step giving at most about five ticks
fn tick_step(max: usize) -> usize {
    ((max + 4) / 5).max(1)
}

fn format_edge(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

// ============================================================================
// Circular geometry
// ============================================================================

/// Outline of the ring slice between two radii and two angles
///
/// An inner radius of zero yields a pie wedge.
fn ring_segment(center: (i32, i32), inner: f64, outer: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = (((end - start).abs() / (PI / 90.0)).ceil() as usize).max(1);
    let angle_at = |i: usize| start + (end - start) * i as f64 / steps as f64;

    let mut points: Vec<(i32, i32)> = (0..=steps).map(|i| polar(center, outer, angle_at(i))).collect();
    if inner <= 0.0 {
        points.push(center);
    } else {
        points.extend((0..=steps).rev().map(|i| polar(center, inner, angle_at(i))));
    }
    points
}

fn polar(center: (i32, i32), radius: f64, angle: f64) -> (i32, i32) {
    let screen = angle - FRAC_PI_2;
    (
        center.0 + (radius * screen.cos()).round() as i32,
        center.1 + (radius * screen.sin()).round() as i32,
    )
}

fn draw_segment(
    canvas: &Canvas,
    center: (i32, i32),
    radii: (f64, f64),
    angles: (f64, f64),
    color: RGBColor,
) -> ChartResult<()> {
    let outline = ring_segment(center, radii.0, radii.1, angles.0, angles.1);
    canvas
        .draw(&Polygon::new(outline.clone(), color.filled()))
        .map_err(drawing_error)?;
    let mut closed = outline;
    if let Some(first) = closed.first().copied() {
        closed.push(first);
    }
    canvas
        .draw(&PathElement::new(closed, WHITE.stroke_width(1)))
        .map_err(drawing_error)
}

/// Whether a segment is large enough to carry a text label
fn fits_label(radii: (f64, f64), angles: (f64, f64)) -> bool {
    let arc = (angles.1 - angles.0) * (radii.0 + radii.1) / 2.0;
    arc >= 28.0 && radii.1 - radii.0 >= 24.0
}

// ============================================================================
// Bar chart
// ============================================================================

/// Horizontal bars, drawn bottom-up in the given order
#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub bars: Vec<(String, usize)>,
}

pub fn bar_chart_svg(chart: &BarChart) -> ChartResult<String> {
    if chart.bars.is_empty() {
        return Err(ChartError::Empty(chart.title.clone()));
    }

    const ROW_HEIGHT: i32 = 28;
    const LEFT: i32 = 330;
    const RIGHT: i32 = 960;
    const TOP: i32 = 80;

    let rows = chart.bars.len() as i32;
    let bottom = TOP + rows * ROW_HEIGHT;
    let height = (bottom + 80) as u32;
    let max = chart.bars.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
    let scale = (RIGHT - LEFT) as f64 / max as f64;

    render_svg((1000, height), |canvas| {
        draw_text(canvas, &chart.title, (500, 35), 24.0, centered())?;

        // Last entry on top
        for (i, (label, count)) in chart.bars.iter().rev().enumerate() {
            let y0 = TOP + i as i32 * ROW_HEIGHT + 3;
            let y1 = y0 + ROW_HEIGHT - 6;
            let x1 = LEFT + (*count as f64 * scale).round() as i32;
            canvas
                .draw(&Rectangle::new([(LEFT, y0), (x1.max(LEFT + 1), y1)], SKY_BLUE.filled()))
                .map_err(drawing_error)?;
            draw_text(
                canvas,
                label,
                (LEFT - 8, (y0 + y1) / 2),
                14.0,
                Pos::new(HPos::Right, VPos::Center),
            )?;
            let (anchor, at) = if x1 - LEFT > 50 {
                (HPos::Right, x1 - 6)
            } else {
                (HPos::Left, x1 + 6)
            };
            draw_text(
                canvas,
                &count.to_string(),
                (at, (y0 + y1) / 2),
                13.0,
                Pos::new(anchor, VPos::Center),
            )?;
        }

        canvas
            .draw(&PathElement::new(vec![(LEFT, TOP), (LEFT, bottom)], AXIS_GREY.stroke_width(1)))
            .map_err(drawing_error)?;
        draw_text(canvas, &chart.x_label, ((LEFT + RIGHT) / 2, bottom + 40), 16.0, centered())
    })
}

// ============================================================================
// Histogram
// ============================================================================

/// Equal-width bins over the value range: `(lower, upper, count)`
///
/// The last bin is closed on the right so the maximum is counted.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (low, high) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
    let width = (high - low) / bins as f64;

    let mut counts = vec![0usize; bins];
    for value in values {
        let index = (((value - low) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| (low + width * i as f64, low + width * (i + 1) as f64, count))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Histogram {
    pub title: String,
    pub x_label: String,
    pub values: Vec<f64>,
    pub bins: usize,
}

pub fn histogram_svg(chart: &Histogram) -> ChartResult<String> {
    let bins = histogram_bins(&chart.values, chart.bins);
    if bins.is_empty() {
        return Err(ChartError::Empty(chart.title.clone()));
    }

    const LEFT: i32 = 100;
    const RIGHT: i32 = 940;
    const TOP: i32 = 80;
    const BOTTOM: i32 = 600;

    let max = bins.iter().map(|(_, _, n)| *n).max().unwrap_or(0).max(1);
    let step = tick_step(max);
    let y_top = (max + step - 1) / step * step;
    let y_of = |count: usize| BOTTOM - ((count as f64 / y_top as f64) * (BOTTOM - TOP) as f64).round() as i32;
    let slot = (RIGHT - LEFT) as f64 / bins.len() as f64;

    render_svg((1000, 700), |canvas| {
        draw_text(canvas, &chart.title, (500, 35), 22.0, centered())?;

        for (i, (_, _, count)) in bins.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            // 10% gap between bars
            let x0 = LEFT + (slot * (i as f64 + 0.05)).round() as i32;
            let x1 = LEFT + (slot * (i as f64 + 0.95)).round() as i32;
            canvas
                .draw(&Rectangle::new([(x0, y_of(*count)), (x1, BOTTOM)], HISTOGRAM_BLUE.filled()))
                .map_err(drawing_error)?;
        }

        canvas
            .draw(&PathElement::new(
                vec![(LEFT, TOP), (LEFT, BOTTOM), (RIGHT, BOTTOM)],
                AXIS_GREY.stroke_width(1),
            ))
            .map_err(drawing_error)?;

        for tick in (0..=y_top).step_by(step) {
            draw_text(
                canvas,
                &tick.to_string(),
                (LEFT - 8, y_of(tick)),
                13.0,
                Pos::new(HPos::Right, VPos::Center),
            )?;
        }

        let label_every = (bins.len() / 5).max(1);
        for (i, (low, high, _)) in bins.iter().enumerate() {
            if i % label_every == 0 {
                let x = LEFT + (slot * i as f64).round() as i32;
                draw_text(canvas, &format_edge(*low), (x, BOTTOM + 18), 13.0, centered())?;
            }
            if i + 1 == bins.len() {
                draw_text(canvas, &format_edge(*high), (RIGHT, BOTTOM + 18), 13.0, centered())?;
            }
        }

        draw_text(canvas, &chart.x_label, ((LEFT + RIGHT) / 2, BOTTOM + 55), 16.0, centered())?;
        draw_text(
            canvas,
            "Frequency",
            (30, (TOP + BOTTOM) / 2),
            16.0,
            centered(),
        )
    })
}

// ============================================================================
// Donut pie
// ============================================================================

#[derive(Debug, Clone)]
pub struct DonutChart {
    pub title: String,
    /// Category and count, drawn clockwise in order
    pub slices: Vec<(String, usize)>,
    /// Text in the hole, e.g. `n=120`
    pub centre_label: String,
}

pub fn donut_svg(chart: &DonutChart) -> ChartResult<String> {
    let total: usize = chart.slices.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return Err(ChartError::Empty(chart.title.clone()));
    }

    const CENTER: (i32, i32) = (400, 440);
    const OUTER: f64 = 300.0;
    // 40% hole
    const INNER: f64 = OUTER * 0.4;

    render_svg((1100, 800), |canvas| {
        draw_text(canvas, &chart.title, (550, 40), 24.0, centered())?;

        let mut angle = 0.0;
        for (i, (label, count)) in chart.slices.iter().enumerate() {
            let sweep = 2.0 * PI * *count as f64 / total as f64;
            let angles = (angle, angle + sweep);
            draw_segment(canvas, CENTER, (INNER, OUTER), angles, palette(i))?;

            if fits_label((INNER, OUTER), angles) {
                let (x, y) = polar(CENTER, (INNER + OUTER) / 2.0, angle + sweep / 2.0);
                draw_text(canvas, label, (x, y - 9), 13.0, centered())?;
                draw_text(canvas, &percent(*count, total), (x, y + 9), 13.0, centered())?;
            }

            // Legend
            let y = 110 + i as i32 * 28;
            canvas
                .draw(&Rectangle::new([(760, y - 8), (776, y + 8)], palette(i).filled()))
                .map_err(drawing_error)?;
            draw_text(canvas, label, (786, y), 14.0, Pos::new(HPos::Left, VPos::Center))?;

            angle += sweep;
        }

        draw_text(canvas, "Categories", (760, 80), 15.0, Pos::new(HPos::Left, VPos::Center))?;
        draw_text(canvas, &chart.centre_label, CENTER, 24.0, centered())
    })
}

// ============================================================================
// Sunburst
// ============================================================================

/// Denominator of the percentage shown on leaf segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafPercent {
    OfRoot,
    OfParent,
}

#[derive(Debug, Clone)]
pub struct Sunburst<'a> {
    /// Title without the sample count
    pub title: String,
    pub hierarchy: &'a Hierarchy,
    pub leaf_percent: LeafPercent,
}

impl Sunburst<'_> {
    /// `"{title} (n=N)"`
    pub fn full_title(&self) -> String {
        format!("{} (n={})", self.title, self.hierarchy.total)
    }
}

struct SunburstLayout {
    center: (i32, i32),
    hole: f64,
    ring: f64,
    total: usize,
    leaf_percent: LeafPercent,
}

impl SunburstLayout {
    fn radii(&self, depth: usize) -> (f64, f64) {
        let inner = self.hole + self.ring * depth as f64;
        (inner, inner + self.ring)
    }

    fn draw_level(
        &self,
        canvas: &Canvas,
        nodes: &[HierarchyNode],
        parent_count: usize,
        depth: usize,
        start: f64,
        colors: &[RGBColor],
    ) -> ChartResult<()> {
        let mut angle = start;
        for (i, node) in nodes.iter().enumerate() {
            let sweep = 2.0 * PI * node.count as f64 / self.total as f64;
            let angles = (angle, angle + sweep);
            let radii = self.radii(depth);
            let color = colors[i % colors.len()];
            draw_segment(canvas, self.center, radii, angles, color)?;

            if fits_label(radii, angles) {
                let (x, y) = polar(self.center, (radii.0 + radii.1) / 2.0, angle + sweep / 2.0);
                if node.is_leaf() {
                    let denominator = match self.leaf_percent {
                        LeafPercent::OfRoot => self.total,
                        LeafPercent::OfParent => parent_count,
                    };
                    draw_text(canvas, &node.label, (x, y - 8), 12.0, centered())?;
                    draw_text(canvas, &percent(node.count, denominator), (x, y + 8), 12.0, centered())?;
                } else {
                    draw_text(canvas, &node.label, (x, y), 12.0, centered())?;
                }
            }

            // Descendants take progressively lighter shades of the segment colour
            let shade = [lighten(color, 0.3)];
            self.draw_level(canvas, &node.children, node.count, depth + 1, angle, &shade)?;
            angle += sweep;
        }
        Ok(())
    }
}

/// Standalone SVG sunburst
pub fn sunburst_svg(chart: &Sunburst) -> ChartResult<String> {
    let hierarchy = chart.hierarchy;
    if hierarchy.total == 0 {
        return Err(ChartError::Empty(chart.title.clone()));
    }

    let depth = hierarchy.path.len().max(1);
    let layout = SunburstLayout {
        center: (500, 540),
        hole: 70.0,
        ring: (440.0 - 70.0) / depth as f64,
        total: hierarchy.total,
        leaf_percent: chart.leaf_percent,
    };

    render_svg((1000, 1000), |canvas| {
        draw_text(canvas, &chart.full_title(), (500, 40), 24.0, centered())?;
        layout.draw_level(canvas, &hierarchy.roots, hierarchy.total, 0, 0.0, &PALETTE)?;
        draw_text(
            canvas,
            &format!("n={}", hierarchy.total),
            layout.center,
            20.0,
            centered(),
        )
    })
}

/// Self-contained HTML page around the SVG sunburst
pub fn sunburst_html(chart: &Sunburst) -> ChartResult<String> {
    let svg = sunburst_svg(chart)?;
    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body style=\"font-family: Arial, sans-serif\">\n{}\n</body>\n</html>\n",
        escape_html(&chart.full_title()),
        svg
    ))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
