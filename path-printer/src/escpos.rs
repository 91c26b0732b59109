//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data for direct
//! (raw socket) label printers. Label text goes out as printer-font text,
//! the barcode as a `GS v 0` raster image so the printed bars are exactly
//! the ones computed by [`crate::code128`]. Vertical positions follow the
//! millimetre layout at the printer's dot density.

use tracing::{debug, instrument};

use crate::layout::{BarcodeNode, RenderNode, RenderTree};

/// Common head resolution for 203 dpi label printers
pub const DEFAULT_DOTS_PER_MM: f32 = 8.0;

/// Built-in printer font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterFont {
    /// 12 × 24 dots
    A,
    /// 9 × 17 dots
    B,
}

impl PrinterFont {
    pub fn height_dots(&self) -> u32 {
        match self {
            PrinterFont::A => 24,
            PrinterFont::B => 17,
        }
    }

    /// Largest built-in font that fits a text row of `dots`
    pub fn for_row(dots: u32) -> Self {
        if dots >= PrinterFont::A.height_dots() {
            PrinterFont::A
        } else {
            PrinterFont::B
        }
    }
}

/// Whole dots from the top of the label down to `mm`
fn dots_at(mm: f32, dots_per_mm: f32) -> u32 {
    (mm.max(0.0) * dots_per_mm).floor() as u32
}

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences. Text must be ASCII; label content always
/// is, since the barcode payload is restricted to ASCII.
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(4096);
        // Initialize printer (ESC @)
        buf.extend_from_slice(&[0x1B, 0x40]);
        Self { buf }
    }

    // === Text Output ===

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Print and feed paper by `dots` (ESC J n)
    pub fn feed_dots(&mut self, dots: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x4A, dots]);
        self
    }

    /// Paper advance per line feed, in dots (ESC 3 n)
    pub fn line_spacing(&mut self, dots: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x33, dots]);
        self
    }

    // === Alignment ===

    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    // === Text Style ===

    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Select the built-in font (ESC M n)
    pub fn font(&mut self, font: PrinterFont) -> &mut Self {
        let n = match font {
            PrinterFont::A => 0x00,
            PrinterFont::B => 0x01,
        };
        self.buf.extend_from_slice(&[0x1B, 0x4D, n]);
        self
    }

    // === Graphics ===

    /// Print a 1-bit raster image (GS v 0, normal density)
    pub fn raster(&mut self, image: &Raster) -> &mut Self {
        let x_bytes = image.bytes_per_row();
        // GS v 0 m xL xH yL yH
        self.buf.extend_from_slice(&[0x1D, 0x76, 0x30, 0x00]);
        self.buf.push(x_bytes as u8);
        self.buf.push((x_bytes >> 8) as u8);
        self.buf.push(image.height as u8);
        self.buf.push((image.height >> 8) as u8);
        self.buf.extend_from_slice(&image.data);
        self
    }

    // === Paper Control ===

    /// Full cut with feed (GS V 66 n)
    pub fn cut_feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x42, lines]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Raster Images
// ============================================================================

/// 1-bit image packed MSB first, rows padded to whole bytes. A set bit is a
/// printed (black) dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    /// Blank (all white) raster
    pub fn new(width: u32, height: u32) -> Self {
        let bytes = width.div_ceil(8) as usize * height as usize;
        Self {
            width,
            height,
            data: vec![0; bytes],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width.div_ceil(8)
    }

    pub fn set(&mut self, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y * self.bytes_per_row() + x / 8) as usize;
        self.data[idx] |= 1 << (7 - (x % 8));
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = (y * self.bytes_per_row() + x / 8) as usize;
        self.data[idx] & (1 << (7 - (x % 8))) != 0
    }

    /// Rasterize a laid-out barcode.
    ///
    /// Each module becomes a whole number of dots (at least one) so every
    /// bar keeps the same width ratio as in the symbol.
    pub fn from_barcode(node: &BarcodeNode, dots_per_mm: f32) -> Self {
        let module_dots = ((node.module_width_mm * dots_per_mm).floor() as u32).max(1);
        let width = node.symbol.module_count() * module_dots;
        let height = (dots_at(node.rect.bottom(), dots_per_mm)
            - dots_at(node.rect.y, dots_per_mm))
        .max(1);

        let mut raster = Self::new(width, height);
        for bar in node.symbol.bars() {
            for x in bar.start * module_dots..(bar.start + bar.width) * module_dots {
                for y in 0..height {
                    raster.set(x, y);
                }
            }
        }
        raster
    }
}

/// Render a laid-out label as a complete ESC/POS job.
///
/// Every region starts at the dot row its rectangle starts at: gaps become
/// dot feeds, text rows set the line spacing to their own height and the
/// barcode raster is exactly as tall as its region. The paper advance of
/// the whole job therefore never exceeds the label height.
#[instrument(skip(tree), fields(format = %tree.format))]
pub fn render_label(tree: &RenderTree, dots_per_mm: f32) -> Vec<u8> {
    let mut b = EscPosBuilder::new();
    b.center();

    let mut cursor = 0u32;
    for node in &tree.nodes {
        let rect = node.rect();
        let top = dots_at(rect.y, dots_per_mm).max(cursor);
        feed(&mut b, top - cursor);
        cursor = top;

        match node {
            RenderNode::Text(text) => {
                let row = dots_at(rect.bottom(), dots_per_mm).saturating_sub(top).max(1);
                let row = row.min(u8::MAX as u32);
                b.font(PrinterFont::for_row(row)).line_spacing(row as u8);
                if text.font_weight >= 700 {
                    b.bold().line(&text.text).bold_off();
                } else {
                    b.line(&text.text);
                }
                cursor += row;
            }
            RenderNode::Barcode(barcode) => {
                let raster = Raster::from_barcode(barcode, dots_per_mm);
                b.raster(&raster);
                cursor += raster.height();
            }
        }
    }

    debug!(dots = cursor, "ESC/POS label rendered");

    b.left().cut_feed(0);
    b.build()
}

/// Feed in steps of at most 255 dots
fn feed(b: &mut EscPosBuilder, mut dots: u32) {
    while dots > 0 {
        let step = dots.min(u8::MAX as u32);
        b.feed_dots(step as u8);
        dots -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code128::encode;
    use crate::layout::{LabelFormat, LabelLayoutEngine};

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_builder_basic() {
        let mut b = EscPosBuilder::new();
        b.center().bold().line("APH - PTH").bold_off().left();

        let data = b.build();
        assert_eq!(&data[..2], &[0x1B, 0x40]);
        assert!(contains(&data, b"APH - PTH\n"));
        assert!(contains(&data, &[0x1B, 0x61, 0x01]));
    }

    #[test]
    fn test_raster_bits() {
        let mut r = Raster::new(10, 2);
        assert_eq!(r.bytes_per_row(), 2);
        r.set(0, 0);
        r.set(9, 1);
        r.set(50, 50);

        assert!(r.get(0, 0));
        assert!(r.get(9, 1));
        assert!(!r.get(1, 0));
        assert_eq!(r.data, vec![0x80, 0x00, 0x00, 0x40]);
    }

    #[test]
    fn test_raster_command_header() {
        let r = Raster::new(16, 3);
        let mut b = EscPosBuilder::new();
        b.raster(&r);
        let data = b.build();
        assert!(contains(&data, &[0x1D, 0x76, 0x30, 0x00, 2, 0, 3, 0]));
        // Header plus 2 bytes x 3 rows
        assert_eq!(data.len(), 2 + 8 + 6);
    }

    #[test]
    fn test_barcode_raster_follows_modules() {
        let symbol = encode("0042").unwrap();
        let tree = LabelLayoutEngine::new(LabelFormat::A)
            .layout("APH - PTH", &symbol, "0042")
            .unwrap();
        let node = tree.barcode().unwrap();

        let raster = Raster::from_barcode(node, DEFAULT_DOTS_PER_MM);
        let module_dots = raster.width() / symbol.module_count();
        assert!(module_dots >= 1);
        assert_eq!(raster.width() % symbol.module_count(), 0);

        let modules = symbol.modules();
        for (i, dark) in modules.iter().enumerate() {
            let x = i as u32 * module_dots;
            assert_eq!(raster.get(x, 0), *dark, "module {i}");
            assert_eq!(raster.get(x, raster.height() - 1), *dark, "module {i}");
        }
    }

    /// Paper advance of a job in dots, following ESC @, ESC 3, ESC J,
    /// GS v 0 and line feeds
    fn vertical_dots(job: &[u8]) -> u32 {
        let mut spacing = 30u32;
        let mut total = 0u32;
        let mut i = 0;
        while i < job.len() {
            match job[i] {
                0x1B => {
                    match job[i + 1] {
                        0x40 => {
                            spacing = 30;
                            i += 2;
                            continue;
                        }
                        0x33 => spacing = job[i + 2] as u32,
                        0x4A => total += job[i + 2] as u32,
                        _ => {}
                    }
                    i += 3;
                }
                0x1D if job[i + 1] == 0x76 => {
                    let x_bytes = job[i + 4] as usize + ((job[i + 5] as usize) << 8);
                    let rows = job[i + 6] as usize + ((job[i + 7] as usize) << 8);
                    total += rows as u32;
                    i += 8 + x_bytes * rows;
                }
                0x1D => i += 4,
                b'\n' => {
                    total += spacing;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        total
    }

    #[test]
    fn test_job_fits_label_height() {
        for format in [LabelFormat::A, LabelFormat::B] {
            for dpm in [DEFAULT_DOTS_PER_MM, 11.81] {
                let symbol = encode("0042").unwrap();
                let tree = LabelLayoutEngine::new(format)
                    .layout("APH - PTH", &symbol, "0042")
                    .unwrap();
                let job = render_label(&tree, dpm);

                let used = vertical_dots(&job);
                let available = (format.height_mm() * dpm).floor() as u32;
                assert!(used <= available, "{format} at {dpm}: {used} > {available} dots");
            }
        }
    }

    #[test]
    fn test_compact_label_uses_small_font() {
        let symbol = encode("0042").unwrap();
        let tree = LabelLayoutEngine::new(LabelFormat::B)
            .layout("APH - PTH", &symbol, "0042")
            .unwrap();
        let job = render_label(&tree, DEFAULT_DOTS_PER_MM);
        assert!(contains(&job, &[0x1B, 0x4D, 0x01]));
        assert!(!contains(&job, &[0x1B, 0x4D, 0x00]));
    }

    #[test]
    fn test_render_label_order() {
        let symbol = encode("PTH0042").unwrap();
        let tree = LabelLayoutEngine::new(LabelFormat::B)
            .layout("APH - PTH", &symbol, "PTH0042")
            .unwrap();
        let data = render_label(&tree, DEFAULT_DOTS_PER_MM);

        let pos = |needle: &[u8]| data.windows(needle.len()).position(|w| w == needle);
        let caption = pos(b"APH - PTH\n").unwrap();
        let raster = pos(&[0x1D, 0x76, 0x30]).unwrap();
        let id = pos(b"PTH0042\n").unwrap();
        assert!(caption < raster && raster < id);
        assert!(data.ends_with(&[0x1D, 0x56, 0x42, 0x00]));
    }
}
