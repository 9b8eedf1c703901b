// src/process/mod.rs
use csv::ReaderBuilder;
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, instrument};

use crate::error::ParseError;

pub mod raw_table;

pub use raw_table::{CellValue, RawTable};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode `bytes` with `encoding`; malformed sequences are an error, never
/// replaced. A UTF-8 BOM is dropped.
fn decode<'a>(
    bytes: &'a [u8],
    encoding: &'static Encoding,
) -> Result<std::borrow::Cow<'a, str>, ParseError> {
    let bytes = if encoding == UTF_8 {
        bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
    } else {
        bytes
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or(ParseError::Encoding {
            encoding: encoding.name(),
        })
}

/// Parse a delimited payload. The first non-empty line is the header; every
/// data row comes back with exactly one cell per header.
///
/// - Empty payload (no header row) is `MalformedInput`.
/// - A row with more fields than headers is `MalformedInput`.
/// - Short rows are padded with `CellValue::Empty`.
/// - Empty lines are skipped; a line of empty fields (`;;;`) is a row.
#[instrument(level = "debug", skip_all, fields(bytes = bytes.len(), encoding = encoding.name()))]
pub fn parse(
    bytes: &[u8],
    separator: u8,
    encoding: &'static Encoding,
) -> Result<RawTable, ParseError> {
    let text = decode(bytes, encoding)?;

    let mut rdr = ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(false)
        .flexible(true) // short rows are legal, long ones are checked below
        .from_reader(text.as_bytes());

    let mut records = rdr.records();
    let malformed = |e: csv::Error| ParseError::MalformedInput {
        reason: e.to_string(),
    };

    let headers: Vec<String> = match records.next() {
        Some(record) => record.map_err(malformed)?.iter().map(str::to_string).collect(),
        None => {
            return Err(ParseError::MalformedInput {
                reason: "no header row".into(),
            })
        }
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(malformed)?;
        if record.len() > headers.len() {
            let line = record.position().map_or(0, |p| p.line());
            return Err(ParseError::MalformedInput {
                reason: format!(
                    "line {} has {} fields, header has {}",
                    line,
                    record.len(),
                    headers.len()
                ),
            });
        }
        rows.push(record.iter().map(CellValue::from_raw).collect::<Vec<_>>());
    }

    let table = RawTable::new(headers, rows);
    debug!(
        columns = table.width(),
        rows = table.height(),
        "parsed table"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_parse_semicolon_latin1() {
        // "País" and "Bélgica" in latin1
        let bytes = b"Id;Pa\xEDs;Cultivar;1970\n1;B\xE9lgica;Tinta;100\n";
        let table = parse(bytes, b';', WINDOWS_1252).unwrap();

        assert_eq!(table.headers(), vec!["Id", "País", "Cultivar", "1970"]);
        assert_eq!(
            table.rows(),
            vec![vec![text("1"), text("Bélgica"), text("Tinta"), text("100")]]
        );
    }

    #[test]
    fn test_parse_tab_separated() {
        let bytes = b"Id\tPais\t2020\tTotal\n1\tChile\t5\t5\n2\tPeru\t\t0\n";
        let table = parse(bytes, b'\t', WINDOWS_1252).unwrap();

        assert_eq!(table.width(), 4);
        assert_eq!(table.height(), 2);
        assert_eq!(table.get(1, "2020"), Some(&CellValue::Empty));
        assert_eq!(table.get(1, "Total"), Some(&text("0")));
    }

    #[test]
    fn test_parse_pads_short_rows() {
        let table = parse(b"a;b;c\n1;2\n", b';', UTF_8).unwrap();
        assert_eq!(
            table.rows(),
            vec![vec![text("1"), text("2"), CellValue::Empty]]
        );
    }

    #[test]
    fn test_parse_rejects_long_rows() {
        let err = parse(b"a;b\n1;2\n1;2;3\n", b';', UTF_8).unwrap_err();
        match err {
            ParseError::MalformedInput { reason } => assert!(reason.contains("line 3")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(matches!(
            parse(b"", b';', UTF_8),
            Err(ParseError::MalformedInput { .. })
        ));
        assert!(matches!(
            parse(b"\n\n", b';', UTF_8),
            Err(ParseError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_parse_header_only() {
        let table = parse(b"Id;Pais;1970\n", b';', UTF_8).unwrap();
        assert_eq!(table.width(), 3);
        assert_eq!(table.height(), 0);
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let err = parse(b"Id;Pa\xEDs\n", b';', UTF_8).unwrap_err();
        assert!(matches!(err, ParseError::Encoding { encoding: "UTF-8" }));
    }

    #[test]
    fn test_parse_strips_utf8_bom_and_blank_lines() {
        let table = parse(b"\xEF\xBB\xBFId;Pais\n\n1;Brasil\n\n", b';', UTF_8).unwrap();
        assert_eq!(table.headers(), vec!["Id", "Pais"]);
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn test_parse_keeps_rows_of_empty_fields() {
        let bytes = b"Id;Pais;Cultivar;1970\n1;Brasil;Tinta;5\n;;;\n2;Chile;Branca;6\n";
        let table = parse(bytes, b';', UTF_8).unwrap();

        assert_eq!(table.height(), 3);
        assert_eq!(table.rows()[1], vec![CellValue::Empty; 4]);
        assert_eq!(table.get(2, "Pais"), Some(&text("Chile")));
    }

    #[test]
    fn test_parse_keeps_whitespace_cells() {
        let table = parse(b"Id;Pais\n1; \n", b';', UTF_8).unwrap();
        assert_eq!(table.get(0, "Pais"), Some(&text(" ")));
    }

    #[test]
    fn test_parse_quoted_fields() {
        let table = parse(b"Id;Nome\n1;\"Uva; fina\"\n", b';', UTF_8).unwrap();
        assert_eq!(table.get(0, "Nome"), Some(&text("Uva; fina")));
    }
}
