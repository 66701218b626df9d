use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

const LINE_FORMAT: &str = "%Y.%m.%d-%H.%M.%S";
const OPEN_FORMAT: &str = "%m/%d/%y %H:%M:%S";

/// Splits `[2024.01.15-12.34.56:789][123]Body` into its timestamp and body.
pub fn split_prefix(line: &str) -> Option<(DateTime<Utc>, &str)> {
    let rest = line.strip_prefix('[')?;
    let (stamp, rest) = rest.split_once(']')?;
    let rest = rest.strip_prefix('[')?;
    let (_frame, body) = rest.split_once(']')?;
    Some((parse_line_stamp(stamp)?, body))
}

fn parse_line_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    let (seconds, millis) = stamp.split_once(':')?;
    let naive = NaiveDateTime::parse_from_str(seconds, LINE_FORMAT).ok()?;
    let millis: i64 = millis.parse().ok()?;
    Some(naive.and_utc() + TimeDelta::milliseconds(millis))
}

/// Parses the date of `Log file open, 01/15/24 12:34:56`.
pub fn parse_open_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(stamp.trim(), OPEN_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn splits_bracket_prefix() {
        let (ts, body) = split_prefix("[2024.01.15-12.34.56:789][123]LogNet: hello").unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 12, 34, 56).unwrap()
            + TimeDelta::milliseconds(789);
        assert_eq!(ts, expected);
        assert_eq!(body, "LogNet: hello");
    }

    #[test]
    fn accepts_padded_frame_counter() {
        assert!(split_prefix("[2024.01.15-12.34.56:000][  7]LogNet: x").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(split_prefix("LogNet: no prefix").is_none());
        assert!(split_prefix("[not a date][1]LogNet: x").is_none());
        assert!(split_prefix("[2024.01.15-12.34.56:789]").is_none());
    }

    #[test]
    fn parses_open_stamp() {
        let ts = parse_open_stamp("01/15/24 12:00:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
    }
}
