//! Device clock assembly
//!
//! The Domekt controller exposes its clock as three packed registers:
//! hour/minute in one word, month/day in one word, and the year as a
//! plain word. The packing is quirky: the minute occupies only the low
//! nibble of its word, so minute values of 16 and above are truncated.
//! This matches the behaviour of the deployed firmware and must not be
//! "fixed" without confirming the real register semantics.

use chrono::{NaiveDate, NaiveDateTime};

/// Extract the hour and minute from the packed clock word
///
/// Hour lives in the high byte, the minute in the low nibble only.
pub fn unpack_hour_minute(word: u16) -> (u32, u32) {
    ((word >> 8) as u32, (word & 0x0F) as u32)
}

/// Extract the month and day from the packed clock word
pub fn unpack_month_day(word: u16) -> (u32, u32) {
    ((word >> 8) as u32, (word & 0xFF) as u32)
}

/// Assemble a calendar timestamp from the three raw clock registers
///
/// The device occasionally returns out-of-range packed values, probably
/// due to internal race conditions. Anything that does not form a valid
/// calendar date/time yields `None` instead of a panic.
///
/// # Arguments
///
/// * `hour_minute` - Raw `HourAndMinute` register word
/// * `month_day` - Raw `MonthAndDay` register word
/// * `year` - Raw `Year` register word
pub fn assemble_datetime(hour_minute: u16, month_day: u16, year: u16) -> Option<NaiveDateTime> {
    let (hour, minute) = unpack_hour_minute(hour_minute);
    let (month, day) = unpack_month_day(month_day);

    NaiveDate::from_ymd_opt(year as i32, month, day)?.and_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_valid_timestamp() {
        // hour = 0x0A = 10, minute = 0x1E & 0x0F = 14
        // month = 0x06, day = 0x15 = 21
        let dt = assemble_datetime(0x0A1E, 0x0615, 2024).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 6, 21)
            .unwrap()
            .and_hms_opt(10, 14, 0)
            .unwrap();
        assert_eq!(dt, expected);
    }

    #[test]
    fn test_minute_is_truncated_to_low_nibble() {
        // 0x3B = 59, but only the low nibble survives: 11
        let (hour, minute) = unpack_hour_minute(0x173B);
        assert_eq!(hour, 23);
        assert_eq!(minute, 11);
    }

    #[test]
    fn test_invalid_hour_yields_none() {
        // hour = 25 is not a valid time of day
        assert!(assemble_datetime(25 << 8, 0x0101, 2024).is_none());
    }

    #[test]
    fn test_invalid_month_yields_none() {
        assert!(assemble_datetime(0x0A00, 0x0D01, 2024).is_none());
        assert!(assemble_datetime(0x0A00, 0x0000, 2024).is_none());
    }

    #[test]
    fn test_invalid_day_yields_none() {
        // February 30th does not exist
        assert!(assemble_datetime(0x0A00, 0x021E, 2024).is_none());
    }
}
