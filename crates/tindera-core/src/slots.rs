use chrono::{DateTime, FixedOffset, Timelike, Utc};

pub const SLOT_INTERVAL_MIN: i64 = 30;
pub const MIN_LEAD_MIN: i64 = 20;
pub const MAX_SLOTS: usize = 4;

const MANILA_UTC_OFFSET_SECS: i32 = 8 * 3600;
const MINUTES_PER_DAY: i64 = 24 * 60;

pub fn manila_offset() -> FixedOffset {
    FixedOffset::east_opt(MANILA_UTC_OFFSET_SECS).expect("valid UTC+8 offset")
}

pub fn manila_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&manila_offset())
}

/// Delivery slots offered for an order placed at `now` (Manila time).
///
/// One deterministic rule: round up to the next half-hour boundary, skip it
/// when it is under the 20-minute preparation lead, then offer up to four
/// consecutive half-hour slots. A partially elapsed minute counts as the
/// next whole minute, so the lead floor holds to the second. Slots never
/// roll into the next calendar day, so late-night calls can return fewer
/// than four labels.
pub fn available_slots(now: DateTime<FixedOffset>) -> Vec<String> {
    let mut minute_of_day = i64::from(now.hour()) * 60 + i64::from(now.minute());
    if now.second() > 0 || now.nanosecond() > 0 {
        minute_of_day += 1;
    }
    let mut boundary = (minute_of_day / SLOT_INTERVAL_MIN + 1) * SLOT_INTERVAL_MIN;
    if boundary - minute_of_day < MIN_LEAD_MIN {
        boundary += SLOT_INTERVAL_MIN;
    }

    let mut slots = Vec::new();
    while slots.len() < MAX_SLOTS && boundary < MINUTES_PER_DAY {
        slots.push(slot_label(boundary));
        boundary += SLOT_INTERVAL_MIN;
    }
    slots
}

fn slot_label(minute_of_day: i64) -> String {
    let hour = minute_of_day / 60;
    let minute = minute_of_day % 60;
    let period = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display_hour}:{minute:02} {period}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        manila_offset()
            .with_ymd_and_hms(2024, 5, 10, hour, minute, 0)
            .unwrap()
    }

    fn minutes_until(now: DateTime<FixedOffset>, label: &str) -> i64 {
        let (time, period) = label.split_once(' ').unwrap();
        let (h, m) = time.split_once(':').unwrap();
        let mut hour: i64 = h.parse().unwrap();
        let minute: i64 = m.parse().unwrap();
        hour %= 12;
        if period == "PM" {
            hour += 12;
        }
        hour * 60 + minute - (i64::from(now.hour()) * 60 + i64::from(now.minute()))
    }

    #[test]
    fn offers_four_half_hour_slots_mid_morning() {
        assert_eq!(
            available_slots(at(9, 5)),
            vec!["9:30 AM", "10:00 AM", "10:30 AM", "11:00 AM"]
        );
    }

    #[test]
    fn skips_a_boundary_inside_the_lead_window() {
        // 9:30 is only 15 minutes out, so the first offer moves to 10:00
        assert_eq!(
            available_slots(at(9, 15)),
            vec!["10:00 AM", "10:30 AM", "11:00 AM", "11:30 AM"]
        );
    }

    #[test]
    fn partial_minutes_count_against_the_lead() {
        let almost_911 = manila_offset()
            .with_ymd_and_hms(2024, 5, 10, 9, 10, 59)
            .unwrap();
        assert_eq!(
            available_slots(almost_911),
            vec!["10:00 AM", "10:30 AM", "11:00 AM", "11:30 AM"]
        );

        let on_the_second = manila_offset()
            .with_ymd_and_hms(2024, 5, 10, 9, 10, 0)
            .unwrap();
        assert_eq!(available_slots(on_the_second)[0], "9:30 AM");
    }

    #[test]
    fn exact_lead_boundary_is_allowed() {
        assert_eq!(
            available_slots(at(9, 10)),
            vec!["9:30 AM", "10:00 AM", "10:30 AM", "11:00 AM"]
        );
        assert_eq!(
            available_slots(at(9, 11)),
            vec!["10:00 AM", "10:30 AM", "11:00 AM", "11:30 AM"]
        );
    }

    #[test]
    fn exact_half_hour_mark_starts_at_the_next_boundary() {
        assert_eq!(
            available_slots(at(10, 0)),
            vec!["10:30 AM", "11:00 AM", "11:30 AM", "12:00 PM"]
        );
    }

    #[test]
    fn never_offers_a_slot_under_the_minimum_lead() {
        for hour in 0..24 {
            for minute in 0..60 {
                let now = at(hour, minute);
                for label in available_slots(now) {
                    assert!(
                        minutes_until(now, &label) >= MIN_LEAD_MIN,
                        "slot {label} too close to {hour}:{minute:02}"
                    );
                }
            }
        }
    }

    #[test]
    fn slots_stop_at_the_end_of_the_day() {
        assert_eq!(available_slots(at(22, 45)), vec!["11:30 PM"]);
        assert!(available_slots(at(23, 20)).is_empty());
    }

    #[test]
    fn midnight_hour_renders_as_twelve_am() {
        assert_eq!(
            available_slots(at(0, 5)),
            vec!["12:30 AM", "1:00 AM", "1:30 AM", "2:00 AM"]
        );
    }

    #[test]
    fn noon_renders_as_twelve_pm() {
        let slots = available_slots(at(11, 5));
        assert_eq!(slots, vec!["11:30 AM", "12:00 PM", "12:30 PM", "1:00 PM"]);
    }
}
