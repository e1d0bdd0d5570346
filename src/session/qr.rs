//! Terminal rendering of pairing codes.

use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};

/// Render `data` as a compact QR code using Unicode half blocks, two module
/// rows per text line, with a one-module light border.
pub fn render_terminal(data: &str) -> Result<String, QrError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)?;
    let width = code.width();
    let colors = code.into_colors();

    // Border of one light module on each side
    let size = width + 2;
    let is_dark = |row: usize, col: usize| -> bool {
        if row == 0 || col == 0 || row > width || col > width {
            return false;
        }
        colors[(row - 1) * width + (col - 1)] == Color::Dark
    };

    let mut out = String::with_capacity(size * (size / 2 + 1) * 3);
    for row in (0..size).step_by(2) {
        for col in 0..size {
            out.push(match (is_dark(row, col), is_dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }
    Ok(out)
}
