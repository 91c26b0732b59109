//! # path-printer
//!
//! Label printing library: barcode symbology, label layout and print
//! dispatch. It knows HOW a label looks and reaches the printer.
//!
//! ## Scope
//!
//! - CODE128 encoding with automatic code set selection
//! - Label layout for the two supported stocks (63.5×38.1mm, 43.5×18.1mm)
//! - SVG/HTML surfaces for print and on-screen preview
//! - ESC/POS raster output for network label printers
//! - Scoped print surfaces that never outlive their job
//!
//! Which identifier ends up on the label (prefix lookup, record fetch) is
//! application code in `path-desk`.
//!
//! ## Example
//!
//! ```ignore
//! use path_printer::{CommandPrinter, LabelFormat, LabelLayoutEngine, PrintDispatcher, encode};
//!
//! let symbol = encode("0042")?;
//! let tree = LabelLayoutEngine::new(LabelFormat::A).layout("APH - PTH", &symbol, "0042")?;
//!
//! let dispatcher = PrintDispatcher::new("/var/spool/labels", CommandPrinter::default());
//! dispatcher.print_once(tree).await?;
//! ```

pub mod code128;
mod dispatcher;
mod error;
mod escpos;
mod layout;
mod printer;
pub mod surface;

// Re-exports
pub use code128::{BarcodeSymbol, EncodeError, encode};
pub use dispatcher::{DEFAULT_SETTLE, PrintDispatcher, PrintSurface};
pub use error::{PrintError, PrintResult};
pub use escpos::{DEFAULT_DOTS_PER_MM, EscPosBuilder, PrinterFont, Raster, render_label};
pub use layout::{
    BarcodeNode, CSS_PX_PER_MM, FormatMetrics, LabelFormat, LabelLayoutEngine, Rect, RenderNode,
    RenderTree, TextNode, TextRole, estimate_text_width,
};
pub use printer::{CommandPrinter, NetworkPrinter, Printer};
pub use surface::{Scale, preview_data_uri, render_print_document, render_svg};
