//! Text encoding for timestamps compared in SQL.
//!
//! Expiry and announcement dates are stored as fixed-width UTC text with
//! nanosecond precision. Byte order of the encoded form equals chronological
//! order, so `>`/`<=` on the column compare instants exactly on both engines,
//! and a saved value reads back unchanged.

use crate::error::{StoreError, StoreResult};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

const FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z");

/// Encode `t` in UTC. Dates before year 0 have no fixed-width form and are rejected.
pub(crate) fn encode(t: OffsetDateTime) -> StoreResult<String> {
    let utc = t.to_offset(UtcOffset::UTC);
    if utc.year() < 0 {
        return Err(StoreError::InvalidTimestamp(format!("{t} is before year 0")));
    }
    utc.format(FORMAT)
        .map_err(|e| StoreError::InvalidTimestamp(format!("{t}: {e}")))
}

pub(crate) fn decode(s: &str) -> StoreResult<OffsetDateTime> {
    PrimitiveDateTime::parse(s, FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| StoreError::InvalidTimestamp(format!("{s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::{Date, Month, Time};

    #[test]
    fn test_encode_is_fixed_width_utc() {
        let encoded = encode(datetime!(2030-01-01 12:00:00.7 +02:00)).unwrap();
        assert_eq!(encoded, "2030-01-01T10:00:00.700000000Z");
        assert_eq!(
            encode(datetime!(0999-12-31 23:59:59 UTC)).unwrap(),
            "0999-12-31T23:59:59.000000000Z"
        );
    }

    #[test]
    fn test_roundtrip_keeps_nanoseconds() {
        let t = datetime!(2030-06-01 12:00:00.123456789 UTC);
        assert_eq!(decode(&encode(t).unwrap()).unwrap(), t);

        let offset = datetime!(2030-06-01 12:00:00.000000001 -05:00);
        assert_eq!(decode(&encode(offset).unwrap()).unwrap(), offset);
    }

    #[test]
    fn test_text_order_matches_time_order() {
        let mut instants = vec![
            datetime!(9999-12-31 23:59:59 UTC),
            datetime!(2030-06-01 12:00:00.7 UTC),
            datetime!(2030-06-01 12:00:00.000000001 UTC),
            datetime!(2030-06-01 12:00:00 UTC),
            datetime!(2030-06-01 13:30:00 +02:00),
            datetime!(0999-01-01 0:00 UTC),
        ];
        let mut encoded: Vec<String> = instants.iter().map(|t| encode(*t).unwrap()).collect();

        instants.sort();
        encoded.sort();
        let decoded: Vec<OffsetDateTime> = encoded.iter().map(|s| decode(s).unwrap()).collect();
        assert_eq!(decoded, instants);
    }

    #[test]
    fn test_negative_year_is_rejected() {
        let date = Date::from_calendar_date(-1, Month::January, 1).unwrap();
        let err = encode(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_decode_rejects_other_formats() {
        assert!(decode("2030-01-01 10:00:00+00:00").is_err());
        assert!(decode("").is_err());
    }
}
