//! Standalone SVG output for render frames.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use nanobeam_core::layer::FillPattern;
use nanobeam_core::Point;
use thiserror::Error;

use crate::render_data::{RenderFrame, RenderLayer, RenderPolygon};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cell '{0}' has no geometry to render")]
    EmptyCell(String),
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn hex(color: &[f32; 4]) -> String {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", c(color[0]), c(color[1]), c(color[2]))
}

fn ring_path(out: &mut String, frame: &RenderFrame, flat: &[f64]) {
    for (i, xy) in flat.chunks_exact(2).enumerate() {
        let (x, y) = frame.viewport.layout_to_screen(&Point::new(xy[0], xy[1]));
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(out, "{}{:.2},{:.2} ", cmd, x, y);
    }
    out.push_str("Z ");
}

fn polygon_path(frame: &RenderFrame, polygon: &RenderPolygon) -> String {
    let mut d = String::new();
    ring_path(&mut d, frame, &polygon.vertices);
    for hole in &polygon.holes {
        ring_path(&mut d, frame, hole);
    }
    d.trim_end().to_string()
}

fn layer_group(out: &mut String, frame: &RenderFrame, layer: &RenderLayer) {
    let color = hex(&layer.color);
    let fill = match layer.fill_pattern {
        FillPattern::Solid => color.clone(),
        FillPattern::Hatched => format!("url(#hatch-{})", layer.layer_id),
        FillPattern::Outline => "none".to_string(),
    };
    let _ = writeln!(
        out,
        r#"<g id="{}" fill="{}" fill-opacity="{:.2}" fill-rule="evenodd" stroke="{}" stroke-width="0.5">"#,
        escape(&layer.name),
        fill,
        layer.color[3],
        color
    );
    for polygon in &layer.polygons {
        let _ = writeln!(out, r#"  <path d="{}"/>"#, polygon_path(frame, polygon));
    }
    out.push_str("</g>\n");
}

/// Render `frame` as an SVG document sized to its viewport canvas.
pub fn to_svg(frame: &RenderFrame) -> String {
    let vp = &frame.viewport;
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = vp.canvas_width,
        h = vp.canvas_height
    );
    let _ = writeln!(out, "<title>{}</title>", escape(&frame.title));
    out.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");

    out.push_str("<defs>\n");
    for layer in frame
        .layers
        .iter()
        .filter(|l| l.fill_pattern == FillPattern::Hatched)
    {
        let _ = writeln!(
            out,
            r#"  <pattern id="hatch-{}" patternUnits="userSpaceOnUse" width="6" height="6"><path d="M0,6 L6,0" stroke="{}" stroke-width="1"/></pattern>"#,
            layer.layer_id,
            hex(&layer.color)
        );
    }
    out.push_str("</defs>\n");

    for layer in &frame.layers {
        layer_group(&mut out, frame, layer);
    }

    if !frame.labels.is_empty() {
        out.push_str("<g id=\"labels\" font-family=\"monospace\" font-size=\"12\" fill=\"black\">\n");
        for label in &frame.labels {
            let (x, y) = vp.layout_to_screen(&label.position);
            let _ = writeln!(
                out,
                r#"  <text x="{:.2}" y="{:.2}">{}</text>"#,
                x,
                y,
                escape(&label.text)
            );
        }
        out.push_str("</g>\n");
    }

    if !frame.ports.is_empty() {
        out.push_str("<g id=\"ports\" stroke=\"magenta\" fill=\"magenta\" font-family=\"monospace\" font-size=\"10\">\n");
        for port in &frame.ports {
            let tip = port.center + Point::unit(port.orientation) * (port.width / 2.0);
            let (x0, y0) = vp.layout_to_screen(&port.center);
            let (x1, y1) = vp.layout_to_screen(&tip);
            let _ = writeln!(
                out,
                r#"  <line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}"/><circle cx="{:.2}" cy="{:.2}" r="2"/><text x="{:.2}" y="{:.2}" stroke="none">{}</text>"#,
                x0, y0, x1, y1, x0, y0, x1, y1,
                escape(&port.name)
            );
        }
        out.push_str("</g>\n");
    }

    out.push_str("</svg>\n");
    out
}

/// Write the frame to `path` as SVG, or as JSON render data when the path
/// ends in `.json`.
pub fn write_svg(path: impl AsRef<Path>, frame: &RenderFrame) -> Result<(), RenderError> {
    let path = path.as_ref();
    let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let contents = if is_json { frame.to_json()? } else { to_svg(frame) };
    fs::write(path, contents)?;
    log::info!(
        "Wrote preview of '{}' ({} polygons) to {}",
        frame.title,
        frame.polygon_count(),
        path.display()
    );
    Ok(())
}
