//! Diacritic stripping for headers and identity cells.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::process::CellValue;

/// NFKD-decompose and drop combining marks: "País" becomes "Pais".
pub fn strip_accents(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

pub fn normalize_header(header: &str) -> String {
    strip_accents(header)
}

/// Only text is touched; empty and numeric cells pass through.
pub fn normalize_cell(value: CellValue) -> CellValue {
    match value {
        CellValue::Text(s) => CellValue::Text(strip_accents(&s)),
        other => other,
    }
}
