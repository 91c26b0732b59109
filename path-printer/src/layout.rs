//! Label layout engine
//!
//! Places the three label regions (caption, barcode, path id text) on a
//! fixed physical canvas. All geometry is in millimetres so that a label
//! printer loaded with the matching stock receives output at true scale,
//! whatever the screen the preview is shown on.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │         APH - PTH            │  caption, bold, centered
//! │ ▌▌▐ ▌▐▐▌ ▌▌▐▌▐ ▌▐▌▌ ▐▌▐▐▌ ▌  │  barcode, centered, width × ratio
//! │            0042              │  path id, bold, centered
//! └──────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::code128::{Bar, BarcodeSymbol};
use crate::error::{PrintError, PrintResult};

/// CSS reference pixels per millimetre (96 dpi)
pub const CSS_PX_PER_MM: f32 = 96.0 / 25.4;

/// Average advance of a bold sans-serif glyph, as a fraction of font size
const GLYPH_ADVANCE: f32 = 0.6;

/// Rounding slack when comparing positions against the canvas edge
const TOLERANCE_MM: f32 = 1e-3;

/// Physical label stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LabelFormat {
    /// 63.5mm × 38.1mm
    #[default]
    A,
    /// 43.5mm × 18.1mm compact
    B,
}

impl LabelFormat {
    pub fn width_mm(&self) -> f32 {
        match self {
            LabelFormat::A => 63.5,
            LabelFormat::B => 43.5,
        }
    }

    pub fn height_mm(&self) -> f32 {
        match self {
            LabelFormat::A => 38.1,
            LabelFormat::B => 18.1,
        }
    }

    /// Default region metrics for this stock
    pub fn metrics(&self) -> FormatMetrics {
        match self {
            // Caption 18px, barcode 80px tall, id 16px, 2mm gaps
            LabelFormat::A => FormatMetrics {
                top_margin_mm: 2.0,
                caption_font_mm: 18.0 / CSS_PX_PER_MM,
                caption_gap_mm: 2.0,
                barcode_width_ratio: 0.9,
                barcode_height_mm: 80.0 / CSS_PX_PER_MM,
                id_gap_mm: 2.0,
                id_font_mm: 16.0 / CSS_PX_PER_MM,
                side_margin_mm: 1.5,
            },
            LabelFormat::B => FormatMetrics {
                top_margin_mm: 0.8,
                caption_font_mm: 2.8,
                caption_gap_mm: 0.6,
                barcode_width_ratio: 0.92,
                barcode_height_mm: 8.5,
                id_gap_mm: 0.6,
                id_font_mm: 2.6,
                side_margin_mm: 1.0,
            },
        }
    }
}

impl fmt::Display for LabelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mm x {}mm", self.width_mm(), self.height_mm())
    }
}

impl FromStr for LabelFormat {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "63.5x38.1" => Ok(LabelFormat::A),
            "b" | "43.5x18.1" => Ok(LabelFormat::B),
            other => Err(PrintError::InvalidConfig(format!(
                "Unknown label format: {other}"
            ))),
        }
    }
}

/// Vertical stack and font sizes of a label format, in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormatMetrics {
    pub top_margin_mm: f32,
    pub caption_font_mm: f32,
    pub caption_gap_mm: f32,
    /// Barcode width as a fraction of the label width
    pub barcode_width_ratio: f32,
    pub barcode_height_mm: f32,
    pub id_gap_mm: f32,
    pub id_font_mm: f32,
    /// Minimum horizontal clearance for text
    pub side_margin_mm: f32,
}

impl FormatMetrics {
    /// Height of the stacked content
    pub fn content_height_mm(&self) -> f32 {
        self.top_margin_mm
            + self.caption_font_mm
            + self.caption_gap_mm
            + self.barcode_height_mm
            + self.id_gap_mm
            + self.id_font_mm
    }
}

/// Axis-aligned rectangle in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Horizontally centered rect of `width` inside `[0, container)`
    fn centered(container: f32, width: f32, y: f32, height: f32) -> Rect {
        Rect {
            x: (container - width) / 2.0,
            y,
            width,
            height,
        }
    }
}

/// Which text region a text node is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextRole {
    Caption,
    IdText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub role: TextRole,
    pub text: String,
    pub rect: Rect,
    pub font_size_mm: f32,
    pub font_weight: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeNode {
    pub rect: Rect,
    pub module_width_mm: f32,
    pub symbol: BarcodeSymbol,
}

impl BarcodeNode {
    /// Bars in label coordinates
    pub fn bar_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.symbol.bars().map(move |Bar { start, width }| Rect {
            x: self.rect.x + start as f32 * self.module_width_mm,
            y: self.rect.y,
            width: width as f32 * self.module_width_mm,
            height: self.rect.height,
        })
    }
}

/// A positioned region of the label
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RenderNode {
    Text(TextNode),
    Barcode(BarcodeNode),
}

impl RenderNode {
    pub fn rect(&self) -> Rect {
        match self {
            RenderNode::Text(t) => t.rect,
            RenderNode::Barcode(b) => b.rect,
        }
    }
}

/// A complete label: canvas size plus positioned regions, top to bottom
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTree {
    pub format: LabelFormat,
    pub width_mm: f32,
    pub height_mm: f32,
    pub nodes: Vec<RenderNode>,
}

impl RenderTree {
    /// Union of all region rectangles
    pub fn bounding_box(&self) -> Rect {
        self.nodes
            .iter()
            .map(RenderNode::rect)
            .reduce(|acc, r| acc.union(&r))
            .unwrap_or(Rect {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            })
    }

    /// Whether every region lies inside the canvas
    pub fn fits(&self) -> bool {
        let bb = self.bounding_box();
        bb.x >= 0.0
            && bb.y >= 0.0
            && bb.right() <= self.width_mm + TOLERANCE_MM
            && bb.bottom() <= self.height_mm + TOLERANCE_MM
    }

    pub fn text(&self, role: TextRole) -> Option<&TextNode> {
        self.nodes.iter().find_map(|n| match n {
            RenderNode::Text(t) if t.role == role => Some(t),
            _ => None,
        })
    }

    pub fn barcode(&self) -> Option<&BarcodeNode> {
        self.nodes.iter().find_map(|n| match n {
            RenderNode::Barcode(b) => Some(b),
            _ => None,
        })
    }
}

/// Lays out labels for one physical format
#[derive(Debug, Clone)]
pub struct LabelLayoutEngine {
    format: LabelFormat,
    metrics: FormatMetrics,
}

impl LabelLayoutEngine {
    pub fn new(format: LabelFormat) -> Self {
        Self {
            format,
            metrics: format.metrics(),
        }
    }

    /// Use non-default metrics on a standard stock
    pub fn with_metrics(format: LabelFormat, metrics: FormatMetrics) -> Self {
        Self { format, metrics }
    }

    pub fn format(&self) -> LabelFormat {
        self.format
    }

    pub fn metrics(&self) -> &FormatMetrics {
        &self.metrics
    }

    /// Position caption, symbol and id text on the label.
    ///
    /// Text that would run wider than the label is shrunk to fit; a stack
    /// taller than the label is rejected so no second page is ever produced.
    pub fn layout(
        &self,
        caption: &str,
        symbol: &BarcodeSymbol,
        id_text: &str,
    ) -> PrintResult<RenderTree> {
        let m = &self.metrics;
        let width = self.format.width_mm();
        let height = self.format.height_mm();

        let needed = m.content_height_mm();
        if needed > height {
            return Err(PrintError::LayoutOverflow {
                needed_mm: needed,
                available_mm: height,
            });
        }

        let text_width = width - 2.0 * m.side_margin_mm;
        let mut y = m.top_margin_mm;

        let caption_node = text_node(
            TextRole::Caption,
            caption,
            900,
            m.caption_font_mm,
            text_width,
            width,
            y,
        );
        y += m.caption_font_mm + m.caption_gap_mm;

        let barcode_width = width * m.barcode_width_ratio;
        let module_width_mm = barcode_width / symbol.module_count() as f32;
        let barcode_node = BarcodeNode {
            rect: Rect::centered(width, barcode_width, y, m.barcode_height_mm),
            module_width_mm,
            symbol: symbol.clone(),
        };
        y += m.barcode_height_mm + m.id_gap_mm;

        let id_node = text_node(
            TextRole::IdText,
            id_text,
            700,
            m.id_font_mm,
            text_width,
            width,
            y,
        );

        let tree = RenderTree {
            format: self.format,
            width_mm: width,
            height_mm: height,
            nodes: vec![
                RenderNode::Text(caption_node),
                RenderNode::Barcode(barcode_node),
                RenderNode::Text(id_node),
            ],
        };

        debug!(
            format = %self.format,
            modules = symbol.module_count(),
            module_width_mm,
            content_height_mm = needed,
            "Label laid out"
        );

        if !tree.fits() {
            let bb = tree.bounding_box();
            return Err(PrintError::LayoutOverflow {
                needed_mm: bb.right().max(bb.bottom()),
                available_mm: width.min(height),
            });
        }

        Ok(tree)
    }
}

/// Estimated rendered width of `text` at `font_size_mm`
pub fn estimate_text_width(text: &str, font_size_mm: f32) -> f32 {
    text.chars().count() as f32 * font_size_mm * GLYPH_ADVANCE
}

fn text_node(
    role: TextRole,
    text: &str,
    font_weight: u16,
    font_size_mm: f32,
    max_width: f32,
    container: f32,
    y: f32,
) -> TextNode {
    let natural = estimate_text_width(text, font_size_mm);
    let (font_size_mm, text_width) = if natural > max_width {
        let shrunk = max_width / (text.chars().count() as f32 * GLYPH_ADVANCE);
        (shrunk, max_width)
    } else {
        (font_size_mm, natural)
    };

    TextNode {
        role,
        text: text.to_string(),
        rect: Rect::centered(container, text_width, y, font_size_mm),
        font_size_mm,
        font_weight,
    }
}
