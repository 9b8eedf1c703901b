use serde::{Serialize, Serializer};

/// A cell as read from the source. The parser only produces `Empty` and
/// `Text`; numeric tags are attached later without rejecting anything.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl CellValue {
    /// Raw cell text as found in the file; only a zero-length cell is `Empty`.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    /// Tag numeric text as a number when the number prints back to exactly
    /// the same text. Anything else ("007", "1.50", integers beyond `i64`)
    /// is returned as is.
    pub fn classify(self) -> Self {
        match self {
            CellValue::Text(text) => {
                if let Ok(n) = text.parse::<i64>() {
                    if n.to_string() == text {
                        return CellValue::Integer(n);
                    }
                }
                match text.parse::<f64>() {
                    Ok(f) if f.is_finite() && text.contains('.') && f.to_string() == text => {
                        CellValue::Float(f)
                    }
                    _ => CellValue::Text(text),
                }
            }
            other => other,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_str(""),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Integer(n) => serializer.serialize_i64(*n),
            CellValue::Float(f) => serializer.serialize_f64(*f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names from the header row, in file order.
    headers: Vec<String>,
    /// Data rows; each holds exactly `headers.len()` cells.
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Build a table, padding short rows with `Empty`.
    /// Rows longer than the header are truncated; the parser rejects them
    /// before they get here.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell of `row` under `header` (first match on duplicate names).
    pub fn get(&self, row: usize, header: &str) -> Option<&CellValue> {
        let idx = self.column_index(header)?;
        self.rows.get(row)?.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(CellValue::from_raw(""), CellValue::Empty);
        assert_eq!(CellValue::from_raw("   "), text("   "));
        assert_eq!(CellValue::from_raw("12"), text("12"));
        assert!(!CellValue::from_raw(" ").is_empty());
        assert_eq!(CellValue::from_raw("Tinto").as_text(), Some("Tinto"));
        assert_eq!(CellValue::Integer(1).as_text(), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(text("100").classify(), CellValue::Integer(100));
        assert_eq!(text("-7").classify(), CellValue::Integer(-7));
        assert_eq!(text("1.5").classify(), CellValue::Float(1.5));
        assert_eq!(text("0.25").classify(), CellValue::Float(0.25));
        assert_eq!(text("nd").classify(), text("nd"));
        assert_eq!(text("NaN").classify(), text("NaN"));
        assert_eq!(text("1.234,5").classify(), text("1.234,5"));
        assert_eq!(CellValue::Empty.classify(), CellValue::Empty);
    }

    #[test]
    fn test_classify_keeps_text_that_would_change() {
        for raw in [
            "007",
            "123456789012345678901234",
            "1.50",
            " -7 ",
            "+5",
            "-0",
            "1.0",
            "1e3",
            "   ",
        ] {
            assert_eq!(text(raw).classify(), text(raw), "{raw:?}");
        }
    }

    #[test]
    fn test_serialize() {
        let cells = vec![
            CellValue::Empty,
            text("Tinta"),
            CellValue::Integer(42),
            CellValue::Float(0.5),
        ];
        assert_eq!(
            serde_json::to_string(&cells).unwrap(),
            r#"["","Tinta",42,0.5]"#
        );
    }

    #[test]
    fn test_new_pads_short_rows() {
        let table = RawTable::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![text("1")], vec![text("1"), text("2"), text("3")]],
        );
        assert_eq!(table.width(), 3);
        assert_eq!(table.height(), 2);
        assert!(table.rows().iter().all(|r| r.len() == 3));
        assert_eq!(table.headers(), ["a", "b", "c"]);
        assert_eq!(table.get(0, "c"), Some(&CellValue::Empty));
        assert_eq!(table.get(1, "b"), Some(&text("2")));
        assert_eq!(table.get(2, "b"), None);
        assert_eq!(table.get(0, "z"), None);
    }
}
