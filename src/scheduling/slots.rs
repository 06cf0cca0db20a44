// src/scheduling/slots.rs

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use crate::scheduling::SchedulingError;

// Office hours: half-hour grid starting 09:00. The closing hour contributes
// only its on-the-hour slot (no 17:30 / 12:30).
const OPENING_HOUR: u32 = 9;
const WEEKDAY_CLOSING_HOUR: u32 = 17;
const WEEKEND_CLOSING_HOUR: u32 = 12;

const SLOT_STEP_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKind {
    Weekday,
    Weekend,
}

impl DayKind {
    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => DayKind::Weekend,
            _ => DayKind::Weekday,
        }
    }

    fn closing_hour(self) -> u32 {
        match self {
            DayKind::Weekday => WEEKDAY_CLOSING_HOUR,
            DayKind::Weekend => WEEKEND_CLOSING_HOUR,
        }
    }
}

/// Lazy iterator over the bookable times of one calendar day, ascending.
/// Clone to restart from the beginning.
#[derive(Debug, Clone)]
pub struct Slots {
    // minutes since midnight
    next: u32,
    last: u32,
}

impl Iterator for Slots {
    type Item = NaiveTime;

    fn next(&mut self) -> Option<NaiveTime> {
        if self.next > self.last {
            return None;
        }
        let t = NaiveTime::from_hms_opt(self.next / 60, self.next % 60, 0)?;
        self.next += SLOT_STEP_MINUTES;
        Some(t)
    }
}

/// All bookable slots for `date`, in ascending order.
pub fn generate_slots(date: NaiveDate) -> Slots {
    let kind = DayKind::of(date);
    Slots {
        next: OPENING_HOUR * 60,
        last: kind.closing_hour() * 60,
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, SchedulingError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| SchedulingError::InvalidDate(raw.trim().to_string()))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, SchedulingError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| SchedulingError::InvalidTime(raw.trim().to_string()))
}

/// Shared validation for booking and rescheduling: parse both values, reject
/// past dates, and require `time` to be one of the generated slots.
pub fn validate_booking(
    raw_date: &str,
    raw_time: &str,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveTime), SchedulingError> {
    let date = parse_date(raw_date)?;
    if date < today {
        return Err(SchedulingError::InvalidDate(format!(
            "{date} is in the past"
        )));
    }
    let time = parse_time(raw_time)?;
    if !generate_slots(date).any(|slot| slot == time) {
        return Err(SchedulingError::InvalidTime(raw_time.trim().to_string()));
    }
    Ok((date, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekday_sequence() {
        // 2024-06-12 is a Wednesday
        let slots: Vec<NaiveTime> = generate_slots(date(2024, 6, 12)).collect();

        let mut expected = vec![];
        for h in 9..17 {
            expected.push(hm(h, 0));
            expected.push(hm(h, 30));
        }
        expected.push(hm(17, 0));

        assert_eq!(slots, expected);
        assert_eq!(slots.first(), Some(&hm(9, 0)));
        assert_eq!(slots.last(), Some(&hm(17, 0)));
        // closing hour is on-the-hour only
        assert!(!slots.contains(&hm(17, 30)));
    }

    #[test]
    fn test_saturday_sequence() {
        // 2024-06-15 is a Saturday
        let slots: Vec<NaiveTime> = generate_slots(date(2024, 6, 15)).collect();
        assert_eq!(
            slots,
            vec![
                hm(9, 0),
                hm(9, 30),
                hm(10, 0),
                hm(10, 30),
                hm(11, 0),
                hm(11, 30),
                hm(12, 0),
            ]
        );
    }

    #[test]
    fn test_sunday_matches_saturday_hours() {
        let sat: Vec<NaiveTime> = generate_slots(date(2024, 6, 15)).collect();
        let sun: Vec<NaiveTime> = generate_slots(date(2024, 6, 16)).collect();
        assert_eq!(sat, sun);
    }

    #[test]
    fn test_slots_strictly_ascending_no_duplicates() {
        for d in [date(2024, 6, 12), date(2024, 6, 15)] {
            let slots: Vec<NaiveTime> = generate_slots(d).collect();
            assert!(slots.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_slots_restartable() {
        let it = generate_slots(date(2024, 6, 12));
        let first: Vec<NaiveTime> = it.clone().collect();
        let second: Vec<NaiveTime> = it.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_day_kind() {
        assert_eq!(DayKind::of(date(2024, 6, 14)), DayKind::Weekday); // Fri
        assert_eq!(DayKind::of(date(2024, 6, 15)), DayKind::Weekend); // Sat
        assert_eq!(DayKind::of(date(2024, 6, 16)), DayKind::Weekend); // Sun
        assert_eq!(DayKind::of(date(2024, 6, 17)), DayKind::Weekday); // Mon
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2024-06-12").is_ok());
        assert!(matches!(
            parse_date("not-a-date"),
            Err(SchedulingError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_date("2024-13-40"),
            Err(SchedulingError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_date(""),
            Err(SchedulingError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert_eq!(parse_time("09:30").unwrap(), hm(9, 30));
        assert!(matches!(
            parse_time("9 o'clock"),
            Err(SchedulingError::InvalidTime(_))
        ));
        assert!(matches!(
            parse_time("25:00"),
            Err(SchedulingError::InvalidTime(_))
        ));
    }

    #[test]
    fn test_validate_booking_accepts_valid_slot() {
        let today = date(2024, 6, 1);
        let (d, t) = validate_booking("2024-06-12", "10:30", today).unwrap();
        assert_eq!(d, date(2024, 6, 12));
        assert_eq!(t, hm(10, 30));

        // today itself is bookable
        assert!(validate_booking("2024-06-01", "09:00", today).is_ok());
    }

    #[test]
    fn test_validate_booking_rejects_past_date() {
        let today = date(2024, 6, 13);
        assert!(matches!(
            validate_booking("2024-06-12", "10:30", today),
            Err(SchedulingError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_validate_booking_rejects_off_grid_times() {
        let today = date(2024, 6, 1);
        // not on the half-hour grid
        assert!(matches!(
            validate_booking("2024-06-12", "10:15", today),
            Err(SchedulingError::InvalidTime(_))
        ));
        // 17:30 exists on no weekday
        assert!(matches!(
            validate_booking("2024-06-12", "17:30", today),
            Err(SchedulingError::InvalidTime(_))
        ));
        // weekend afternoon is closed
        assert!(matches!(
            validate_booking("2024-06-15", "14:00", today),
            Err(SchedulingError::InvalidTime(_))
        ));
        // 12:30 is past the weekend closing slot
        assert!(matches!(
            validate_booking("2024-06-15", "12:30", today),
            Err(SchedulingError::InvalidTime(_))
        ));
        // before opening
        assert!(matches!(
            validate_booking("2024-06-12", "08:30", today),
            Err(SchedulingError::InvalidTime(_))
        ));
    }
}
