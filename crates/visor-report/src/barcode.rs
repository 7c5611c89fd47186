//! Code128 barcode of the biopsy number, rendered as inline SVG.

use barcoders::generators::svg::SVG;
use barcoders::sym::code128::Code128;

use crate::error::ReportError;

/// Bar height in SVG user units.
const BAR_HEIGHT: u32 = 60;

/// Code128 character set B selector: printable ASCII.
const CHARSET_B: char = 'Ɓ';

/// Encode `data` as a Code128 (set B) SVG document.
pub fn code128_svg(data: &str) -> Result<String, ReportError> {
    let data = data.trim();
    if data.is_empty() {
        return Err(ReportError::Render("empty barcode data".into()));
    }
    let symbol = Code128::new(format!("{CHARSET_B}{data}"))
        .map_err(|e| ReportError::Render(format!("barcode: {e}")))?;
    SVG::new(BAR_HEIGHT)
        .generate(&symbol.encode())
        .map_err(|e| ReportError::Render(format!("barcode: {e}")))
}
