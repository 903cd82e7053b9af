use std::fmt::Write as _;

use crate::chart::{Baseline, Label, LinearGradient, PageDrawing, Paint, STROKE_WIDTH, Shape};

const FONT_FAMILY: &str = "sans-serif";

/// XML 1.0 forbids most C0 controls even when escaped.
fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

/// Escapes label text for element content and attribute values.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars().filter(|&c| is_valid_xml_char(c)) {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Coordinates rounded to a thousandth of a millimetre, trailing zeros dropped.
fn num(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}

fn gradient_id(index: usize) -> String {
    format!("route-fill-{index}")
}

impl PageDrawing {
    /// Serializes the page as a standalone A4 SVG document.
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}mm" height="{h}mm" viewBox="0 0 {w} {h}">"#,
            w = num(self.width),
            h = num(self.height),
        );

        let gradients: Vec<_> = self
            .shapes
            .iter()
            .enumerate()
            .filter_map(|(index, shape)| match shape.paint() {
                Paint::Gradient(gradient) => Some((index, gradient)),
                Paint::Solid(_) => None,
            })
            .collect();
        if !gradients.is_empty() {
            svg.push_str("<defs>\n");
            for (index, gradient) in gradients {
                write_gradient(&mut svg, index, gradient);
            }
            svg.push_str("</defs>\n");
        }

        write_label(&mut svg, &self.title);
        for (index, shape) in self.shapes.iter().enumerate() {
            write_shape(&mut svg, index, shape);
        }
        for label in &self.labels {
            write_label(&mut svg, label);
        }

        svg.push_str("</svg>\n");
        svg
    }
}

fn write_gradient(svg: &mut String, index: usize, gradient: &LinearGradient) {
    let _ = writeln!(
        svg,
        r#"<linearGradient id="{id}" gradientUnits="userSpaceOnUse" x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}">"#,
        id = gradient_id(index),
        x1 = num(gradient.start.x),
        y1 = num(gradient.start.y),
        x2 = num(gradient.end.x),
        y2 = num(gradient.end.y),
    );
    for stop in &gradient.stops {
        let _ = writeln!(
            svg,
            r#"<stop offset="{}" stop-color="{}"/>"#,
            num(stop.offset),
            stop.color
        );
    }
    svg.push_str("</linearGradient>\n");
}

fn fill_attr(index: usize, paint: &Paint) -> String {
    match paint {
        Paint::Solid(color) => color.to_string(),
        Paint::Gradient(_) => format!("url(#{})", gradient_id(index)),
    }
}

fn write_shape(svg: &mut String, index: usize, shape: &Shape) {
    let fill = fill_attr(index, shape.paint());
    let stroke = num(STROKE_WIDTH);
    match shape {
        Shape::Disc { center, radius, .. } => {
            let _ = writeln!(
                svg,
                r#"<circle cx="{}" cy="{}" r="{}" fill="{fill}" stroke="black" stroke-width="{stroke}"/>"#,
                num(center.x),
                num(center.y),
                num(*radius),
            );
        }
        Shape::Slice {
            center,
            radius,
            geometry,
            ..
        } => {
            let large_arc = u8::from(geometry.sweep_deg() > 180.0);
            let _ = writeln!(
                svg,
                r#"<path d="M {cx} {cy} L {x1} {y1} A {r} {r} 0 {large_arc} 1 {x2} {y2} Z" fill="{fill}" stroke="black" stroke-width="{stroke}"/>"#,
                cx = num(center.x),
                cy = num(center.y),
                x1 = num(geometry.arc_start.x),
                y1 = num(geometry.arc_start.y),
                r = num(*radius),
                x2 = num(geometry.arc_end.x),
                y2 = num(geometry.arc_end.y),
            );
        }
    }
}

fn write_label(svg: &mut String, label: &Label) {
    let baseline = match label.baseline {
        Baseline::Hanging => "hanging",
        Baseline::Central => "central",
    };
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" font-family="{FONT_FAMILY}" font-size="{}" text-anchor="middle" dominant-baseline="{baseline}" fill="{}">{}</text>"#,
        num(label.position.x),
        num(label.position.y),
        num(label.font_size),
        label.color.as_svg(),
        escape_text(&label.text),
    );
}
