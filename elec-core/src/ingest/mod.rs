use csv::StringRecord;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::domain::MeterReading;
use crate::error::CoreError;

/// Parses CSV text into meter readings.
///
/// Expected header columns (by name, order-independent, extras ignored):
/// - device_id
/// - timestamp (RFC 3339; `Z` and `+00:00` offsets are equivalent)
/// - kwh (non-negative decimal)
///
/// Parsing is all-or-nothing: the first invalid row fails the whole
/// call and no readings are returned. Row order is preserved in the
/// output. An input that is empty after trimming yields zero readings.
pub fn parse_csv_str(text: &str) -> Result<Vec<MeterReading>, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(trimmed.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| CoreError::Validation(format!("failed to read CSV header: {e}")))?
        .clone();

    let mut readings = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| CoreError::Validation(format!("failed to read CSV row: {e}")))?;
        readings.push(record_to_reading(&record, &headers)?);
    }

    Ok(readings)
}

fn record_to_reading(record: &StringRecord, headers: &StringRecord) -> Result<MeterReading, CoreError> {
    let get = |name: &str| -> Result<&str, CoreError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                CoreError::Validation(format!("missing field '{name}' in row {record:?}"))
            })
    };

    let device_id = get("device_id")?;

    let ts_str = get("timestamp")?;
    let timestamp = parse_timestamp(ts_str)?;

    let kwh_str = get("kwh")?;
    let kwh: f64 = kwh_str
        .parse()
        .map_err(|e| CoreError::Validation(format!("invalid kwh '{kwh_str}': {e}")))?;

    MeterReading::new(device_id, timestamp, kwh)
}

fn parse_timestamp(ts_str: &str) -> Result<OffsetDateTime, CoreError> {
    // RFC 3339 already treats a trailing `Z` as `+00:00`.
    OffsetDateTime::parse(ts_str, &Rfc3339)
        .map_err(|e| CoreError::Validation(format!("invalid timestamp '{ts_str}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const SAMPLE: &str = "\
device_id,timestamp,kwh
device-001,2025-11-01T00:00:00Z,0.34
device-001,2025-11-01T01:00:00Z,0.29
device-001,2025-11-01T02:00:00Z,0.31
";

    #[test]
    fn parses_sample_csv() {
        let readings = parse_csv_str(SAMPLE).unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].device_id, "device-001");
        assert_eq!(readings[0].timestamp, datetime!(2025-11-01 00:00:00 UTC));
        assert_eq!(readings[0].kwh, 0.34);
    }

    #[test]
    fn preserves_row_order() {
        let readings = parse_csv_str(SAMPLE).unwrap();
        let kwh: Vec<f64> = readings.iter().map(|r| r.kwh).collect();
        assert_eq!(kwh, vec![0.34, 0.29, 0.31]);
    }

    #[test]
    fn column_order_is_irrelevant_and_extras_ignored() {
        let text = "kwh,notes,device_id,timestamp\n1.5,hello,d1,2025-11-01T00:00:00+00:00\n";
        let readings = parse_csv_str(text).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].device_id, "d1");
        assert_eq!(readings[0].kwh, 1.5);
    }

    #[test]
    fn z_suffix_matches_explicit_utc_offset() {
        let a = parse_csv_str("device_id,timestamp,kwh\nd1,2025-11-01T00:00:00Z,1.0\n").unwrap();
        let b =
            parse_csv_str("device_id,timestamp,kwh\nd1,2025-11-01T00:00:00+00:00,1.0\n").unwrap();
        assert_eq!(a[0].timestamp, b[0].timestamp);
    }

    #[test]
    fn empty_input_yields_no_readings() {
        assert!(parse_csv_str("").unwrap().is_empty());
        assert!(parse_csv_str("   \n  \n").unwrap().is_empty());
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let text = "\n\n  device_id,timestamp,kwh\nd1,2025-11-01T00:00:00Z,1.0\n\n  ";
        let readings = parse_csv_str(text).unwrap();
        assert_eq!(readings.len(), 1);
    }

    #[test]
    fn missing_field_fails_whole_parse() {
        let text = "device_id,timestamp,kwh\nd1,2025-11-01T00:00:00Z,1.0\n,2025-11-01T01:00:00Z,1.0\n";
        let err = parse_csv_str(text).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("device_id"));
    }

    #[test]
    fn negative_kwh_fails_whole_parse() {
        let text = "device_id,timestamp,kwh\nd1,2025-11-01T00:00:00Z,1.0\nd1,2025-11-01T01:00:00Z,-1\n";
        assert!(matches!(parse_csv_str(text), Err(CoreError::Validation(_))));
    }

    #[test]
    fn unparseable_timestamp_fails_whole_parse() {
        let text = "device_id,timestamp,kwh\nd1,01/11/2025 00:00,1.0\n";
        let err = parse_csv_str(text).unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[test]
    fn unparseable_kwh_fails_whole_parse() {
        let text = "device_id,timestamp,kwh\nd1,2025-11-01T00:00:00Z,abc\n";
        let err = parse_csv_str(text).unwrap_err();
        assert!(err.to_string().contains("invalid kwh"));
    }
}
