//! Surface markup for a laid-out label
//!
//! The same [`RenderTree`] is drawn two ways:
//! - print: SVG in millimetres wrapped in an HTML document whose print
//!   stylesheet pins the page to the label stock and hides everything else
//! - preview: the same SVG with a pixel size, for on-screen display
//!
//! Both use a `viewBox` in millimetres, so proportions are identical and only
//! the outer size differs.

use std::fmt::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::layout::{RenderNode, RenderTree, TextNode};

/// Class of the element holding the label on a print surface
pub const SURFACE_CLASS: &str = "print-label-surface";

const FONT_FAMILY: &str = "Arial, sans-serif";

/// Fraction of the font size from the top of the text box to its baseline
const BASELINE_RATIO: f32 = 0.8;

/// Outer size of a rendered SVG
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    /// True physical size, in millimetres
    Physical,
    /// On-screen preview at the given pixels per millimetre
    Preview { px_per_mm: f32 },
}

/// Draw the label as a standalone SVG element
pub fn render_svg(tree: &RenderTree, scale: Scale) -> String {
    let (width, height) = match scale {
        Scale::Physical => (
            format!("{}mm", num(tree.width_mm)),
            format!("{}mm", num(tree.height_mm)),
        ),
        Scale::Preview { px_per_mm } => (
            format!("{}px", num(tree.width_mm * px_per_mm)),
            format!("{}px", num(tree.height_mm * px_per_mm)),
        ),
    };

    let mut svg = String::with_capacity(8 * 1024);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {} {}" shape-rendering="crispEdges">"#,
        num(tree.width_mm),
        num(tree.height_mm),
    );
    let _ = write!(
        svg,
        r##"<rect x="0" y="0" width="{}" height="{}" fill="#fff"/>"##,
        num(tree.width_mm),
        num(tree.height_mm),
    );

    for node in &tree.nodes {
        match node {
            RenderNode::Text(text) => write_text(&mut svg, text),
            RenderNode::Barcode(barcode) => {
                svg.push_str(r##"<g fill="#000">"##);
                for bar in barcode.bar_rects() {
                    let _ = write!(
                        svg,
                        r#"<rect x="{}" y="{}" width="{}" height="{}"/>"#,
                        num(bar.x),
                        num(bar.y),
                        num(bar.width),
                        num(bar.height),
                    );
                }
                svg.push_str("</g>");
            }
        }
    }

    svg.push_str("</svg>");
    svg
}

fn write_text(svg: &mut String, text: &TextNode) {
    let center = text.rect.x + text.rect.width / 2.0;
    let baseline = text.rect.y + text.font_size_mm * BASELINE_RATIO;
    let _ = write!(
        svg,
        r##"<text x="{}" y="{}" font-family="{FONT_FAMILY}" font-size="{}" font-weight="{}" text-anchor="middle" fill="#000">{}</text>"##,
        num(center),
        num(baseline),
        num(text.font_size_mm),
        text.font_weight,
        escape_xml(&text.text),
    );
}

/// HTML document for the print surface.
///
/// The stylesheet fixes the page to the label's physical size with no
/// margin, hides everything except the label, and forbids page breaks
/// inside it so the label never spills onto a second page.
pub fn render_print_document(tree: &RenderTree) -> String {
    let w = num(tree.width_mm);
    let h = num(tree.height_mm);
    let svg = render_svg(tree, Scale::Physical);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Label</title>
<style>
@media print {{
  @page {{ size: {w}mm {h}mm; margin: 0; }}
  html, body {{ margin: 0; padding: 0; overflow: hidden; }}
  body * {{ visibility: hidden; }}
  .{SURFACE_CLASS}, .{SURFACE_CLASS} * {{ visibility: visible; }}
  .{SURFACE_CLASS} {{
    position: fixed;
    left: 0;
    top: 0;
    width: {w}mm;
    height: {h}mm;
    background: white;
    page-break-inside: avoid;
    break-inside: avoid;
  }}
}}
.{SURFACE_CLASS} {{ width: {w}mm; height: {h}mm; margin: 0; padding: 0; }}
</style>
</head>
<body>
<div class="{SURFACE_CLASS}">{svg}</div>
</body>
</html>
"#
    )
}

/// `data:` URI of the preview SVG, for embedding in another view
pub fn preview_data_uri(tree: &RenderTree, px_per_mm: f32) -> String {
    let svg = render_svg(tree, Scale::Preview { px_per_mm });
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

/// Format a length with at most three decimals and no trailing zeros
fn num(v: f32) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code128::encode;
    use crate::layout::{LabelFormat, LabelLayoutEngine};

    fn tree(format: LabelFormat) -> RenderTree {
        let symbol = encode("0042").unwrap();
        LabelLayoutEngine::new(format)
            .layout("APH - PTH", &symbol, "0042")
            .unwrap()
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(63.5), "63.5");
        assert_eq!(num(38.1), "38.1");
        assert_eq!(num(2.0), "2");
        assert_eq!(num(4.7625), "4.763");
        assert_eq!(num(-0.0001), "0");
    }

    #[test]
    fn test_physical_svg_uses_millimetres() {
        let svg = render_svg(&tree(LabelFormat::A), Scale::Physical);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="63.5mm" height="38.1mm""#));
        assert!(svg.contains(r#"viewBox="0 0 63.5 38.1""#));
        assert!(svg.contains(">APH - PTH</text>"));
        assert!(svg.contains(">0042</text>"));
    }

    #[test]
    fn test_preview_keeps_proportions() {
        let t = tree(LabelFormat::B);
        let print = render_svg(&t, Scale::Physical);
        let preview = render_svg(&t, Scale::Preview { px_per_mm: 10.0 });

        assert!(preview.contains(r#"width="435px" height="181px""#));

        // Everything after the outer size is identical
        let body = |s: &str| s[s.find("viewBox").unwrap()..].to_string();
        assert_eq!(body(&print), body(&preview));
    }

    #[test]
    fn test_one_rect_per_bar() {
        let t = tree(LabelFormat::A);
        let svg = render_svg(&t, Scale::Physical);
        let bars = t.barcode().unwrap().symbol.bars().count();
        // Background rect plus one per bar
        assert_eq!(svg.matches("<rect").count(), bars + 1);
    }

    #[test]
    fn test_print_document_pins_page_size() {
        let html = render_print_document(&tree(LabelFormat::B));
        assert!(html.contains("@page { size: 43.5mm 18.1mm; margin: 0; }"));
        assert!(html.contains("body * { visibility: hidden; }"));
        assert!(html.contains(r#"<div class="print-label-surface"><svg"#));
        assert!(html.contains("page-break-inside: avoid"));
    }

    #[test]
    fn test_text_is_escaped() {
        let symbol = encode("A&B").unwrap();
        let t = LabelLayoutEngine::new(LabelFormat::A)
            .layout("APH - <X>", &symbol, "A&B")
            .unwrap();
        let svg = render_svg(&t, Scale::Physical);
        assert!(svg.contains(">APH - &lt;X&gt;</text>"));
        assert!(svg.contains(">A&amp;B</text>"));
    }

    #[test]
    fn test_preview_data_uri() {
        let uri = preview_data_uri(&tree(LabelFormat::A), 4.0);
        assert!(uri.starts_with("data:image/svg+xml;base64,"));
        let decoded = STANDARD
            .decode(uri.trim_start_matches("data:image/svg+xml;base64,"))
            .unwrap();
        assert!(String::from_utf8(decoded).unwrap().contains(r#"width="254px""#));
    }
}
