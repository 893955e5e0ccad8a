//! Deterministic SVG rendering of a layout.
//!
//! Layer order is fixed: background, obstacles, shelves, zones, POIs,
//! annotations. Obstacles and shelves are drawn as contiguous region paths
//! (see [`regions`]) rather than per-cell rectangles, so a 200x200 grid with
//! a dozen aisles produces a few dozen elements instead of thousands. No
//! `<script>` or `<style>` elements are ever emitted — every visual
//! attribute is inline on the element itself — and nothing here reads the
//! clock or RNG, so the same grid always renders to the same bytes.

pub mod regions;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::errors::{EngineError, Result};
use crate::grid::{grid_to_real, CellCode, Grid};
use regions::{connected_components, trace_outline, Region};

const OBSTACLE_FILL: &str = "#3a3a3a";
const SHELF_FILL: &str = "#c98a3a";
const ZONE_STROKE: &str = "#2a6fb0";
const ZONE_FILL: &str = "#2a6fb022";
const POI_FILL: &str = "#d6334a";
const POI_RADIUS_FRACTION: f64 = 0.28;

pub struct SvgRenderer;

impl SvgRenderer {
    /// Render `grid` to an SVG document and write it to `path`.
    pub fn render_to_file(grid: &Grid, path: &Path) -> Result<()> {
        let svg = Self::render_to_string(grid);
        fs::write(path, svg).map_err(|e| EngineError::render_io(e.to_string()))
    }

    /// Render `grid` to a complete, standalone SVG document.
    pub fn render_to_string(grid: &Grid) -> String {
        let edge = grid.edge_length_cm().get();
        let width = grid.cols() as f64 * edge;
        let height = grid.rows() as f64 * edge;

        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = fmt_num(width),
            h = fmt_num(height),
        );

        render_background(&mut out, width, height);
        render_regions(&mut out, grid, CellCode::Obstacle, OBSTACLE_FILL, "obstacles");
        render_regions(&mut out, grid, CellCode::Shelf, SHELF_FILL, "shelves");
        render_zones(&mut out, grid);
        render_pois(&mut out, grid);
        render_annotations(&mut out, grid);

        out.push_str("</svg>\n");
        out
    }
}

fn render_background(out: &mut String, width: f64, height: f64) {
    let _ = writeln!(
        out,
        r#"  <g id="background"><rect x="0" y="0" width="{w}" height="{h}" fill="#ffffff"/></g>"#,
        w = fmt_num(width),
        h = fmt_num(height),
    );
}

fn render_regions(out: &mut String, grid: &Grid, code: CellCode, fill: &str, layer_id: &str) {
    let edge = grid.edge_length_cm().get();
    let _ = writeln!(out, r#"  <g id="{layer_id}" fill="{fill}" stroke="none">"#);

    for region in connected_components(grid, code) {
        if region.as_rectangle() {
            render_rect(out, &region, edge);
        } else {
            render_outline(out, &region, edge);
        }
    }

    out.push_str("  </g>\n");
}

fn render_rect(out: &mut String, region: &Region, edge: f64) {
    let x = region.min_col as f64 * edge;
    let y = region.min_row as f64 * edge;
    let w = (region.max_col - region.min_col + 1) as f64 * edge;
    let h = (region.max_row - region.min_row + 1) as f64 * edge;
    let corner_radius = (edge * 0.15).min(8.0);
    let _ = writeln!(
        out,
        r#"    <rect x="{x}" y="{y}" width="{w}" height="{h}" rx="{r}" ry="{r}"/>"#,
        x = fmt_num(x),
        y = fmt_num(y),
        w = fmt_num(w),
        h = fmt_num(h),
        r = fmt_num(corner_radius),
    );
}

fn render_outline(out: &mut String, region: &Region, edge: f64) {
    for loop_points in trace_outline(region) {
        if loop_points.len() < 3 {
            continue;
        }
        let mut d = String::new();
        for (i, (row, col)) in loop_points.iter().enumerate() {
            // Corner coordinates: row indexes physical x, col indexes physical y.
            let x = *col as f64 * edge;
            let y = *row as f64 * edge;
            if i == 0 {
                let _ = write!(d, "M {} {}", fmt_num(y), fmt_num(x));
            } else {
                let _ = write!(d, " L {} {}", fmt_num(y), fmt_num(x));
            }
        }
        d.push_str(" Z");
        let _ = writeln!(out, r#"    <path d="{d}"/>"#);
    }
}

fn render_zones(out: &mut String, grid: &Grid) {
    if grid.zones().is_empty() {
        return;
    }
    let _ = writeln!(
        out,
        r#"  <g id="zones" fill="{ZONE_FILL}" stroke="{ZONE_STROKE}" stroke-width="2">"#
    );
    for zone in grid.zones() {
        if zone.points.len() < 3 {
            continue;
        }
        let points: Vec<String> = zone
            .points
            .iter()
            .map(|p| format!("{},{}", fmt_num(p.y), fmt_num(p.x)))
            .collect();
        let _ = writeln!(out, r#"    <polygon points="{}"/>"#, points.join(" "));

        let cx = zone.points.iter().map(|p| p.y).sum::<f64>() / zone.points.len() as f64;
        let cy = zone.points.iter().map(|p| p.x).sum::<f64>() / zone.points.len() as f64;
        let _ = writeln!(
            out,
            r#"    <text x="{x}" y="{y}" font-size="14" fill="{ZONE_STROKE}" text-anchor="middle">{label}</text>"#,
            x = fmt_num(cx),
            y = fmt_num(cy),
            label = escape_xml(&zone.name),
        );
    }
    out.push_str("  </g>\n");
}

fn render_pois(out: &mut String, grid: &Grid) {
    let edge = grid.edge_length_cm().get();
    let radius = edge * POI_RADIUS_FRACTION;
    let _ = writeln!(out, r#"  <g id="pois" fill="{POI_FILL}" stroke="none">"#);

    let mut pois: Vec<_> = grid
        .iter_cells()
        .filter(|(_, code)| *code == CellCode::Poi)
        .collect();
    pois.sort_by_key(|(coord, _)| (coord.row, coord.col));

    for (coord, _) in pois {
        let center = grid_to_real(coord, grid.edge_length_cm());
        let _ = writeln!(
            out,
            r#"    <circle cx="{cx}" cy="{cy}" r="{r}"/>"#,
            cx = fmt_num(center.y),
            cy = fmt_num(center.x),
            r = fmt_num(radius),
        );
    }
    out.push_str("  </g>\n");
}

fn render_annotations(out: &mut String, grid: &Grid) {
    let _ = writeln!(
        out,
        r#"  <g id="annotations" fill="#555555" font-size="11">
    <text x="4" y="14">{rows}x{cols} cells, {edge}cm/cell</text>
  </g>"#,
        rows = grid.rows(),
        cols = grid.cols(),
        edge = fmt_num(grid.edge_length_cm().get()),
    );
}

fn fmt_num(v: f64) -> String {
    format!("{v:.2}")
}

fn escape_xml(s: &str) -> String {
    s.chars().fold(String::with_capacity(s.len()), |mut acc, c| {
        match c {
            '&' => acc.push_str("&amp;"),
            '<' => acc.push_str("&lt;"),
            '>' => acc.push_str("&gt;"),
            '"' => acc.push_str("&quot;"),
            _ => acc.push(c),
        }
        acc
    })
}
