use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Address, LayoutResult, Point};
use crate::utils::short_label;

const FOCAL_COLOR: RGBColor = RGBColor(0xff, 0x7f, 0x0e);
const PERIPHERAL_COLOR: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const FOCAL_RADIUS_PX: i32 = 16;
const PERIPHERAL_RADIUS_PX: i32 = 11;
const ARC_SEGMENTS: usize = 32;
const ARROW_SIZE: f64 = 0.09;
const PADDING: f64 = 0.6;
const LOOP_RADIUS: f64 = 0.15;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
}

/// Anything that can present a computed layout
pub trait GraphRenderer {
    fn render(&self, layout: &LayoutResult, focal1: &Address, focal2: &Address) -> Result<(), RenderError>;
}

/// Draws the layout into a PNG file
pub struct PngRenderer {
    output_path: PathBuf,
    width: u32,
    height: u32,
}

impl PngRenderer {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            width: 1400,
            height: 900,
        }
    }
}

impl GraphRenderer for PngRenderer {
    fn render(&self, layout: &LayoutResult, focal1: &Address, focal2: &Address) -> Result<(), RenderError> {
        if layout.is_empty() {
            warn!("Graph is empty, nothing to visualize.");
            return Ok(());
        }

        let (min, max) = extent(layout);

        let backend = BitMapBackend::new(&self.output_path, (self.width, self.height));
        let root = backend.into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| RenderError::Drawing(format!("Failed to fill canvas: {}", e)))?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Transaction Graph (Individual Txs)", ("sans-serif", 28.0).into_font())
            .margin(20)
            .build_cartesian_2d(min.x..max.x, min.y..max.y)
            .map_err(|e| RenderError::Drawing(format!("Failed to build chart: {}", e)))?;

        // Edges first so nodes sit on top
        for edge in &layout.edges {
            let (Some(p1), Some(p2)) = (layout.position(&edge.source), layout.position(&edge.target)) else {
                continue;
            };

            let (arc, label_at) = if edge.source == edge.target {
                let arc = self_loop(p1, edge.curvature, ARC_SEGMENTS);
                let top = arc[arc.len() / 2];
                (arc, top)
            } else {
                (quadratic_arc(p1, p2, edge.curvature, ARC_SEGMENTS), edge.label_anchor)
            };
            let width = 2.0 + edge.weight.min(5.0);
            chart
                .draw_series(std::iter::once(PathElement::new(
                    arc.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>(),
                    BLACK.mix(0.8).stroke_width(width.round() as u32),
                )))
                .map_err(|e| RenderError::Drawing(format!("Failed to draw edge: {}", e)))?;

            if let Some(head) = arrow_head(&arc) {
                chart
                    .draw_series(std::iter::once(Polygon::new(
                        head.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>(),
                        BLACK.filled(),
                    )))
                    .map_err(|e| RenderError::Drawing(format!("Failed to draw arrow: {}", e)))?;
            }

            let style = TextStyle::from(("sans-serif", 13.0).into_font())
                .pos(Pos::new(HPos::Center, VPos::Center));
            chart
                .draw_series(std::iter::once(Text::new(
                    format!("{:.4}", edge.weight),
                    (label_at.x, label_at.y),
                    style,
                )))
                .map_err(|e| RenderError::Drawing(format!("Failed to draw edge label: {}", e)))?;
        }

        for (node, point) in &layout.positions {
            let (color, radius) = if node == focal1.as_str() || node == focal2.as_str() {
                (FOCAL_COLOR, FOCAL_RADIUS_PX)
            } else {
                (PERIPHERAL_COLOR, PERIPHERAL_RADIUS_PX)
            };
            let label = layout.label(node).map(str::to_string).unwrap_or_else(|| short_label(node));

            chart
                .draw_series(std::iter::once(Circle::new((point.x, point.y), radius, color.mix(0.9).filled())))
                .map_err(|e| RenderError::Drawing(format!("Failed to draw node: {}", e)))?;

            let style = TextStyle::from(("sans-serif", 14.0).into_font().style(FontStyle::Bold))
                .pos(Pos::new(HPos::Center, VPos::Center));
            chart
                .draw_series(std::iter::once(Text::new(label, (point.x, point.y), style)))
                .map_err(|e| RenderError::Drawing(format!("Failed to draw node label: {}", e)))?;
        }

        root.present()
            .map_err(|e| RenderError::Drawing(format!("Failed to render chart: {}", e)))?;

        info!("Graph written to {}", self.output_path.display());
        Ok(())
    }
}

/// Bounding box of every node, label anchor and self-loop top, padded
fn extent(layout: &LayoutResult) -> (Point, Point) {
    let loop_tops = layout
        .edges
        .iter()
        .filter(|e| e.source == e.target)
        .filter_map(|e| layout.position(&e.source).map(|p| p + Point::new(0.0, 2.0 * loop_radius(e.curvature))));
    let points = layout
        .positions
        .values()
        .copied()
        .chain(layout.edges.iter().map(|e| e.label_anchor))
        .chain(loop_tops);

    let (min, max) = points.fold(
        (Point::new(f64::INFINITY, f64::INFINITY), Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY)),
        |(lo, hi), p| (Point::new(lo.x.min(p.x), lo.y.min(p.y)), Point::new(hi.x.max(p.x), hi.y.max(p.y))),
    );

    (
        Point::new(min.x - PADDING, min.y - PADDING),
        Point::new(max.x + PADDING, max.y + PADDING),
    )
}

/// Sample the quadratic curve from `p1` to `p2` whose control point sits
/// `curvature` chord-lengths to the right of the chord midpoint
pub fn quadratic_arc(p1: Point, p2: Point, curvature: f64, segments: usize) -> Vec<Point> {
    let control = p1.midpoint(p2) + (p2 - p1).right_normal() * curvature;
    let segments = segments.max(1);

    (0..=segments)
        .map(|i| {
            let t = i as f64 / segments as f64;
            let u = 1.0 - t;
            p1 * (u * u) + control * (2.0 * u * t) + p2 * (t * t)
        })
        .collect()
}

fn loop_radius(curvature: f64) -> f64 {
    LOOP_RADIUS + curvature * 0.5
}

/// Sample a circle sitting on top of `p`, starting and ending at `p`.
/// Higher curvature gives a larger loop so repeated self-transfers nest.
pub fn self_loop(p: Point, curvature: f64, segments: usize) -> Vec<Point> {
    let radius = loop_radius(curvature);
    let center = p + Point::new(0.0, radius);
    let segments = segments.max(2);

    (0..=segments)
        .map(|i| {
            let angle = -FRAC_PI_2 + TAU * i as f64 / segments as f64;
            center + Point::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

/// Triangle near the end of the arc, stopping short of the target node
fn arrow_head(arc: &[Point]) -> Option<[Point; 3]> {
    if arc.len() < 4 {
        return None;
    }

    let tip = arc[arc.len() - 3];
    let back = arc[arc.len() - 4];
    let direction = tip - back;
    let length = direction.length();
    if length == 0.0 {
        return None;
    }

    let unit = direction * (1.0 / length);
    let base = tip - unit * ARROW_SIZE;
    let side = unit.right_normal() * (ARROW_SIZE * 0.5);
    Some([tip, base + side, base - side])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::layout_service::label_anchor;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_arc_endpoints_and_peak() {
        let p1 = Point::new(-2.0, 0.0);
        let p2 = Point::new(0.0, 0.0);
        let arc = quadratic_arc(p1, p2, 0.2, 4);

        assert_eq!(arc.len(), 5);
        assert_eq!(arc[0], p1);
        assert!(approx(arc[4].x, p2.x) && approx(arc[4].y, p2.y));

        // The label anchor sits on the curve's midpoint
        let peak = label_anchor(p1, p2, 0.2);
        assert!(approx(arc[2].x, peak.x) && approx(arc[2].y, peak.y));
    }

    #[test]
    fn test_arrow_head_for_degenerate_arc() {
        let p = Point::new(1.0, 1.0);
        let arc = quadratic_arc(p, p, 0.1, 8);
        assert!(arrow_head(&arc).is_none());
    }

    #[test]
    fn test_self_loop_is_drawn_as_a_circle() {
        let p = Point::new(2.0, 0.0);
        let arc = self_loop(p, 0.1, 32);

        assert!(approx(arc[0].x, p.x) && approx(arc[0].y, p.y));
        let end = arc[arc.len() - 1];
        assert!(approx(end.x, p.x) && approx(end.y, p.y));

        let top = arc[arc.len() / 2];
        assert!(approx(top.x, p.x) && approx(top.y, 2.0 * loop_radius(0.1)));
        assert!(arrow_head(&arc).is_some());

        let wider = self_loop(p, 0.2, 32);
        assert!(wider[wider.len() / 2].y > top.y);
    }

    #[test]
    fn test_extent_includes_self_loops() {
        let p = Point::new(0.0, 0.0);
        let mut layout = LayoutResult::default();
        layout.positions.insert("0xaaa".to_string(), p);
        layout.edges.push(crate::models::EdgeLayout {
            source: "0xaaa".to_string(),
            target: "0xaaa".to_string(),
            tx_hash: "h1".to_string(),
            weight: 1.0,
            curvature: 0.3,
            label_anchor: p,
        });

        let (_, max) = extent(&layout);
        assert!(approx(max.y, 2.0 * loop_radius(0.3) + PADDING));
    }

    #[test]
    fn test_empty_layout_is_not_drawn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.png");
        let renderer = PngRenderer::new(&path);

        let result = renderer.render(&LayoutResult::default(), &Address::new("0xa"), &Address::new("0xb"));
        assert!(result.is_ok());
        assert!(!path.exists());
    }
}
