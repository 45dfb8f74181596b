//! Tabular output decoding.

/// One line of tabular output, split into fields.
pub type Record = Vec<String>;

/// Decode tab-separated, newline-delimited output.
///
/// `None` means no output was captured and is passed through unchanged. Empty
/// text decodes to an empty list. Empty fields are kept.
pub fn decode(stdout: Option<&str>) -> Option<Vec<Record>> {
    stdout.map(|text| {
        text.lines()
            .map(|line| line.split('\t').map(str::to_owned).collect())
            .collect()
    })
}

/// Encode records as tab-separated lines, each terminated by a newline.
///
/// Records without fields cannot be told apart from a single empty field
/// once encoded.
pub fn encode<R, F>(records: R) -> String
where
    R: IntoIterator<Item = F>,
    F: IntoIterator,
    F::Item: AsRef<str>,
{
    let mut out = String::new();
    for record in records {
        let mut first = true;
        for field in record {
            if !first {
                out.push('\t');
            }
            out.push_str(field.as_ref());
            first = false;
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(fields: &[&str]) -> Record {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_decode_two_lines() {
        let records = decode(Some("a\tb\nc\td\n")).unwrap();
        assert_eq!(records, vec![rec(&["a", "b"]), rec(&["c", "d"])]);
    }

    #[test]
    fn test_decode_absent() {
        assert!(decode(None).is_none());
    }

    #[test]
    fn test_decode_empty_text() {
        assert_eq!(decode(Some("")), Some(vec![]));
    }

    #[test]
    fn test_decode_keeps_empty_fields() {
        let records = decode(Some("tank\t\t-\t\n")).unwrap();
        assert_eq!(records, vec![rec(&["tank", "", "-", ""])]);
    }

    #[test]
    fn test_decode_no_delimiter_collapsing() {
        let records = decode(Some("a\t\t\tb")).unwrap();
        assert_eq!(records, vec![rec(&["a", "", "", "b"])]);
    }

    #[test]
    fn test_decode_blank_line() {
        let records = decode(Some("a\n\nb\n")).unwrap();
        assert_eq!(records, vec![rec(&["a"]), rec(&[""]), rec(&["b"])]);
    }

    #[test]
    fn test_decode_crlf() {
        let records = decode(Some("a\tb\r\nc\td\r\n")).unwrap();
        assert_eq!(records, vec![rec(&["a", "b"]), rec(&["c", "d"])]);
    }

    #[test]
    fn test_decode_missing_trailing_newline() {
        let records = decode(Some("tank\t1024")).unwrap();
        assert_eq!(records, vec![rec(&["tank", "1024"])]);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let records = vec![
            rec(&["tank", "1.2T", "/tank"]),
            rec(&["tank/data", "", "none"]),
            rec(&[""]),
            rec(&["tank@snap", "-"]),
        ];
        let text = encode(&records);
        assert_eq!(decode(Some(text.as_str())), Some(records));
    }

    #[test]
    fn test_encode_empty() {
        let records: Vec<Record> = Vec::new();
        assert_eq!(encode(&records), "");
    }
}
