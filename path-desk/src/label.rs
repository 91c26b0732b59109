//! Label job assembly
//!
//! Turns an identifier (or a stored record) into everything needed to show
//! and print its label: caption, barcode symbol and laid-out render tree.
//! Intake and reprint share this one path.

use path_printer::{
    BarcodeSymbol, CSS_PX_PER_MM, LabelFormat, LabelLayoutEngine, RenderTree, encode,
    preview_data_uri, render_svg, surface::Scale,
};
use shared::models::PatientRecord;
use shared::{AppResult, DecomposePolicy, LabelIdentifier};
use tracing::debug;

/// A label ready for preview and printing
#[derive(Debug, Clone)]
pub struct LabelJob {
    pub identifier: LabelIdentifier,
    pub caption: String,
    pub symbol: BarcodeSymbol,
    pub tree: RenderTree,
}

impl LabelJob {
    /// Build the label for `identifier`.
    ///
    /// The barcode encodes the path id only; the prefix appears in the
    /// caption as `"<org> - <prefix>"`.
    pub fn new(org: &str, identifier: &LabelIdentifier, format: LabelFormat) -> AppResult<Self> {
        let caption = format!("{} - {}", org, identifier.prefix);
        let symbol = encode(&identifier.local_id).map_err(path_printer::PrintError::from)?;
        let tree = LabelLayoutEngine::new(format).layout(&caption, &symbol, &identifier.local_id)?;

        debug!(identifier = %identifier, %format, "Label job assembled");

        Ok(Self {
            identifier: identifier.clone(),
            caption,
            symbol,
            tree,
        })
    }

    /// Build the label for a stored record.
    ///
    /// The path id is recovered from the stored composite barcode under
    /// `policy`.
    pub fn from_record(
        record: &PatientRecord,
        org: &str,
        format: LabelFormat,
        policy: DecomposePolicy,
    ) -> AppResult<Self> {
        let identifier = record.identifier(policy)?;
        Self::new(org, &identifier, format)
    }

    /// Text printed under the barcode
    pub fn id_text(&self) -> &str {
        &self.identifier.local_id
    }

    /// On-screen preview SVG at `px_per_mm`
    pub fn preview_svg(&self, px_per_mm: f32) -> String {
        render_svg(&self.tree, Scale::Preview { px_per_mm })
    }

    /// Preview at CSS reference pixel density (96 dpi)
    pub fn preview_data_uri(&self) -> String {
        preview_data_uri(&self.tree, CSS_PX_PER_MM)
    }
}
