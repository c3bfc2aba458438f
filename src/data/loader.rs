//! Bulk CSV loading for the raw event log
//!
//! The input file's header must match the raw_events schema exactly; any
//! mismatch aborts before a single row is stored. Text fields are loaded
//! verbatim (cleaning happens later), numeric fields must parse or the
//! whole load fails.

use crate::data::Database;
use crate::{RawEvent, Result, VolleyError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column order the input file must carry, 1:1 with the raw_events schema
pub const EXPECTED_COLUMNS: [&str; 18] = [
    "rally",
    "round",
    "team",
    "receive_location",
    "digger_location",
    "pass_land_location",
    "hitter_location",
    "hit_land_location",
    "pass_rating",
    "set_type",
    "set_location",
    "hit_type",
    "num_blockers",
    "block_touch",
    "serve_type",
    "win_reason",
    "lose_reason",
    "winning_team",
];

/// Reset the raw table and bulk-load a CSV file into it
pub fn load_file<P: AsRef<Path>>(db: &mut Database, path: P) -> Result<usize> {
    let file = File::open(path)?;
    load_reader(db, file)
}

/// Reset the raw table and bulk-load from any reader
///
/// The full input is parsed before the existing raw table is touched, so a
/// malformed file leaves the previous load intact.
pub fn load_reader<R: Read>(db: &mut Database, reader: R) -> Result<usize> {
    let events = read_events(reader)?;
    db.reset_raw()?;
    db.insert_raw_events(&events)
}

/// Parse and header-validate the full input
pub fn read_events<R: Read>(reader: R) -> Result<Vec<RawEvent>> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    validate_header(csv_reader.headers()?)?;

    let mut events = Vec::new();
    for record in csv_reader.deserialize() {
        let event: RawEvent = record?;
        events.push(event);
    }
    Ok(events)
}

fn validate_header(headers: &csv::StringRecord) -> Result<()> {
    if headers.len() != EXPECTED_COLUMNS.len() {
        return Err(VolleyError::ColumnCount {
            expected: EXPECTED_COLUMNS.len(),
            found: headers.len(),
        });
    }
    for (index, expected) in EXPECTED_COLUMNS.iter().enumerate() {
        let found = headers.get(index).unwrap_or("").trim();
        if found != *expected {
            return Err(VolleyError::SchemaMismatch {
                index,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "rally,round,team,receive_location,digger_location,pass_land_location,\
hitter_location,hit_land_location,pass_rating,set_type,set_location,hit_type,num_blockers,\
block_touch,serve_type,win_reason,lose_reason,winning_team";

    fn csv_with_rows(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn test_read_events() {
        let input = csv_with_rows(&[
            "1,1,a,4,,5,7,2,in,quick,left,hit,2,no,jump,kill,,a",
            "2,1,b,9,3,,,,out,,,,,,float,,serve_error,a",
        ]);
        let events = read_events(input.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].rally, Some(1));
        assert_eq!(events[0].receive_location, Some(4));
        assert_eq!(events[0].digger_location, None);
        assert_eq!(events[0].hit_type.as_deref(), Some("hit"));
        assert_eq!(events[1].team.as_deref(), Some("b"));
        assert_eq!(events[1].lose_reason.as_deref(), Some("serve_error"));
    }

    #[test]
    fn test_text_loaded_verbatim() {
        let input = csv_with_rows(&["1,1, A ,,,,,,,,, TIP ,,,,KILL,,a"]);
        let events = read_events(input.as_bytes()).unwrap();
        assert_eq!(events[0].team.as_deref(), Some(" A "));
        assert_eq!(events[0].hit_type.as_deref(), Some(" TIP "));
        assert_eq!(events[0].win_reason.as_deref(), Some("KILL"));
    }

    #[test]
    fn test_header_column_count_mismatch() {
        let err = read_events("rally,round,team\n1,1,a".as_bytes()).unwrap_err();
        assert!(matches!(err, VolleyError::ColumnCount { found: 3, .. }));
    }

    #[test]
    fn test_header_column_name_mismatch() {
        let bad = HEADER.replace("hit_type", "attack_type");
        let err = read_events(format!("{}\n", bad).as_bytes()).unwrap_err();
        match err {
            VolleyError::SchemaMismatch {
                index,
                expected,
                found,
            } => {
                assert_eq!(index, 11);
                assert_eq!(expected, "hit_type");
                assert_eq!(found, "attack_type");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_numeric_garbage_is_fatal() {
        let input = csv_with_rows(&["one,1,a,,,,,,,,,,,,,,,"]);
        assert!(read_events(input.as_bytes()).is_err());
    }

    #[test]
    fn test_load_replaces_previous_raw_rows() {
        let mut db = Database::in_memory().unwrap();
        let first = csv_with_rows(&["1,1,a,,,,,,,,,,,,,,,", "2,1,b,,,,,,,,,,,,,,,"]);
        let second = csv_with_rows(&["7,2,a,,,,,,,,,,,,,,,"]);

        assert_eq!(load_reader(&mut db, first.as_bytes()).unwrap(), 2);
        assert_eq!(load_reader(&mut db, second.as_bytes()).unwrap(), 1);

        let events = db.get_raw_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rally, Some(7));
    }

    #[test]
    fn test_bad_file_preserves_previous_load() {
        let mut db = Database::in_memory().unwrap();
        let good = csv_with_rows(&["1,1,a,,,,,,,,,,,,,,,"]);
        load_reader(&mut db, good.as_bytes()).unwrap();

        let bad = "rally,round\n1,1";
        assert!(load_reader(&mut db, bad.as_bytes()).is_err());
        assert_eq!(db.get_raw_events().unwrap().len(), 1);
    }
}
