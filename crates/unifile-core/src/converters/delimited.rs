// SPDX-License-Identifier: AGPL-3.0-or-later
//! Minimal delimited-text reader and writer helpers
//!
//! Handles quoted fields with doubled-quote escapes, including delimiters
//! and line breaks inside quotes. Shared by the CSV converters and the
//! audit log.

use std::borrow::Cow;

/// Delimiters recognised when sniffing, in priority order
pub const DELIMITERS: [char; 3] = [',', ';', '\t'];

/// Pick the delimiter used by a header line (comma when none is present)
pub fn sniff_delimiter(line: &str) -> char {
    DELIMITERS
        .into_iter()
        .find(|d| line.contains(*d))
        .unwrap_or(',')
}

/// Split delimited text into records of raw (untrimmed) fields.
///
/// Lines that are blank outside of quotes produce no record.
pub fn parse_records(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut saw_content = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                saw_content = true;
                if in_quotes && chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            c if c == delimiter && !in_quotes => {
                saw_content = true;
                record.push(std::mem::take(&mut field));
            }
            '\n' if !in_quotes => {
                finish_record(&mut records, &mut record, &mut field, saw_content);
                saw_content = false;
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            c => {
                if !c.is_whitespace() {
                    saw_content = true;
                }
                field.push(c);
            }
        }
    }
    finish_record(&mut records, &mut record, &mut field, saw_content);
    records
}

fn finish_record(
    records: &mut Vec<Vec<String>>,
    record: &mut Vec<String>,
    field: &mut String,
    saw_content: bool,
) {
    record.push(std::mem::take(field));
    let record = std::mem::take(record);
    if saw_content {
        records.push(record);
    }
}

/// Quote a field if it contains the delimiter, a quote or a line break
pub fn escape_field(value: &str, delimiter: char) -> Cow<'_, str> {
    if value.contains(delimiter) || value.contains(['"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Join fields into one line (without terminator)
pub fn join_record<'a, I>(fields: I, delimiter: char) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut line = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            line.push(delimiter);
        }
        line.push_str(&escape_field(field, delimiter));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn strs(records: &[Vec<String>]) -> Vec<Vec<&str>> {
        records
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_simple_records() {
        let records = parse_records("a,b\n1,2\n", ',');
        assert_eq!(strs(&records), vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_quoted_fields() {
        let records = parse_records("\"x, y\",\"say \"\"hi\"\"\"\n", ',');
        assert_eq!(strs(&records), vec![vec!["x, y", "say \"hi\""]]);
    }

    #[test]
    fn test_newline_inside_quotes() {
        let records = parse_records("a,\"line1\nline2\"\r\nb,c", ',');
        assert_eq!(
            strs(&records),
            vec![vec!["a", "line1\nline2"], vec!["b", "c"]]
        );
    }

    #[test]
    fn test_blank_lines_skipped() {
        let records = parse_records("\n  \na;b\n\n1;2\n\n", ';');
        assert_eq!(strs(&records), vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_empty_fields_kept() {
        let records = parse_records("a,,c\n,", ',');
        assert_eq!(strs(&records), vec![vec!["a", "", "c"], vec!["", ""]]);
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a,b;c"), ',');
        assert_eq!(sniff_delimiter("a;b"), ';');
        assert_eq!(sniff_delimiter("a\tb"), '\t');
        assert_eq!(sniff_delimiter("ab"), ',');
    }

    #[test]
    fn test_join_record_escapes() {
        assert_eq!(join_record(["a", "b,c", "d\"e"], ','), "a,\"b,c\",\"d\"\"e\"");
    }

    proptest! {
        #[test]
        fn escaped_field_reads_back(value in "[a-z,;\"\n ]{1,12}") {
            prop_assume!(!value.trim().is_empty());
            let line = join_record([value.as_str(), "tail"], ',');
            let records = parse_records(&line, ',');
            prop_assert_eq!(records.len(), 1);
            prop_assert_eq!(&records[0][0], &value);
        }
    }
}
