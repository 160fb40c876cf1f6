// SPDX-License-Identifier: AGPL-3.0-or-later
#![no_main]

use libfuzzer_sys::fuzz_target;
use unifile_core::converters::csv_json::csv_to_json;
use unifile_core::converters::delimited::{join_record, parse_records, sniff_delimiter};
use unifile_core::converters::json_csv::json_to_csv;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let delimiter = sniff_delimiter(text.lines().next().unwrap_or_default());
    for record in parse_records(text, delimiter) {
        let _ = join_record(record.iter().map(String::as_str), delimiter);
    }

    // Anything the CSV reader accepts must survive the trip back to CSV
    if let Ok(value) = csv_to_json(text) {
        if value.as_array().is_some_and(|rows| !rows.is_empty()) {
            assert!(json_to_csv(&value).is_ok());
        }
    }

    if let Ok(value) = serde_json::from_str(text) {
        let _ = json_to_csv(&value);
    }
});
