//! Compact schedule-code decoder.
//!
//! The timetable service encodes meeting times as a terse string such as
//! `"M34W2-EE102[GF],R5-EE201[2F]"`: comma-separated segments, each holding a
//! run of day letters with period characters, optionally followed by `-` and
//! a room with a bracketed floor suffix. This module turns that encoding into
//! structured [`ScheduleEntry`] records.
//!
//! Decoding is a pure codec: deterministic, total, and never failing. Junk
//! characters are skipped without aborting the rest of the string.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Day of the week, encoded upstream as `M T W R F S U`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    /// Decode a single day letter. Returns `None` for anything unrecognized.
    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'M' => Some(Day::Monday),
            'T' => Some(Day::Tuesday),
            'W' => Some(Day::Wednesday),
            'R' => Some(Day::Thursday),
            'F' => Some(Day::Friday),
            'S' => Some(Day::Saturday),
            'U' => Some(Day::Sunday),
            _ => None,
        }
    }
}

/// One decoded meeting of a course: a day, its period run, the derived
/// wall-clock span, and the room the segment named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub day: Day,
    /// Period numbers in declaration order. Extension slots sit outside the
    /// 1–9 range: -1/0 before the standard day, 10 at midday, 11–14 in the
    /// evening.
    pub periods: Vec<i8>,
    /// Start of the first declared period.
    pub start: String,
    /// End of the last declared period.
    pub end: String,
    pub classroom: String,
    /// Empty when the room carried no bracketed floor suffix.
    pub floor: String,
}

/// A single teaching slot: its numeric code and wall-clock span.
struct PeriodSlot {
    code: i8,
    start: &'static str,
    end: &'static str,
}

/// Fixed period table of the timetable service. Letters extend the numbered
/// day: `y`/`z` before it, `n` at midday, `a`–`d` in the evening.
fn period_slot(c: char) -> Option<&'static PeriodSlot> {
    const TABLE: &[(char, PeriodSlot)] = &[
        ('y', PeriodSlot { code: -1, start: "06:00", end: "06:50" }),
        ('z', PeriodSlot { code: 0, start: "07:00", end: "07:50" }),
        ('1', PeriodSlot { code: 1, start: "08:00", end: "08:50" }),
        ('2', PeriodSlot { code: 2, start: "09:00", end: "09:50" }),
        ('3', PeriodSlot { code: 3, start: "10:10", end: "11:00" }),
        ('4', PeriodSlot { code: 4, start: "11:10", end: "12:00" }),
        ('n', PeriodSlot { code: 10, start: "12:20", end: "13:10" }),
        ('5', PeriodSlot { code: 5, start: "13:20", end: "14:10" }),
        ('6', PeriodSlot { code: 6, start: "14:20", end: "15:10" }),
        ('7', PeriodSlot { code: 7, start: "15:30", end: "16:20" }),
        ('8', PeriodSlot { code: 8, start: "16:30", end: "17:20" }),
        ('9', PeriodSlot { code: 9, start: "17:30", end: "18:20" }),
        ('a', PeriodSlot { code: 11, start: "18:30", end: "19:20" }),
        ('b', PeriodSlot { code: 12, start: "19:30", end: "20:20" }),
        ('c', PeriodSlot { code: 13, start: "20:30", end: "21:20" }),
        ('d', PeriodSlot { code: 14, start: "21:30", end: "22:20" }),
    ];
    TABLE.iter().find(|(ch, _)| *ch == c).map(|(_, slot)| slot)
}

/// Matches one day letter and everything up to the next day letter.
fn day_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([MTWRFSU])([^MTWRFSU]*)").expect("day run regex"))
}

/// Decode a raw compact schedule string into ordered entries.
///
/// Each segment's room applies to every day letter in that segment. The
/// start/end span uses the first and last period as declared; periods within
/// a segment are taken to be contiguous. Malformed input never errors, it
/// just yields fewer entries.
pub fn decode_schedule(raw: &str) -> Vec<ScheduleEntry> {
    let mut entries = Vec::new();

    for segment in raw.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (time_part, room_part) = match segment.split_once('-') {
            Some((t, r)) => (t, r.trim()),
            None => (segment, ""),
        };
        let (classroom, floor) = split_room(room_part);

        for caps in day_run_regex().captures_iter(time_part) {
            let day_char = caps[1].chars().next().expect("day capture");
            let Some(day) = Day::from_code(day_char) else {
                continue;
            };

            let slots: Vec<&PeriodSlot> = caps[2].chars().filter_map(period_slot).collect();
            let (Some(first), Some(last)) = (slots.first(), slots.last()) else {
                // A day letter with no decodable periods has no time span.
                continue;
            };

            entries.push(ScheduleEntry {
                day,
                periods: slots.iter().map(|s| s.code).collect(),
                start: first.start.to_string(),
                end: last.end.to_string(),
                classroom: classroom.to_string(),
                floor: floor.to_string(),
            });
        }
    }

    entries
}

/// Split a room token into classroom code and optional bracketed floor.
fn split_room(room: &str) -> (&str, &str) {
    if let Some(open) = room.find('[') {
        if let Some(close) = room.rfind(']') {
            if close > open {
                return (room[..open].trim(), &room[open + 1..close]);
            }
        }
    }
    (room, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_multi_day_segment_with_shared_room() {
        let entries = decode_schedule("M34W2-EE102[GF],R5-EE201[2F]");
        assert_eq!(entries.len(), 3);

        let monday = &entries[0];
        assert_eq!(monday.day, Day::Monday);
        assert_eq!(monday.periods, vec![3, 4]);
        assert_eq!(monday.start, "10:10");
        assert_eq!(monday.end, "12:00");
        assert_eq!(monday.classroom, "EE102");
        assert_eq!(monday.floor, "GF");

        let wednesday = &entries[1];
        assert_eq!(wednesday.day, Day::Wednesday);
        assert_eq!(wednesday.periods, vec![2]);
        assert_eq!(wednesday.classroom, "EE102");
        assert_eq!(wednesday.floor, "GF");

        let thursday = &entries[2];
        assert_eq!(thursday.day, Day::Thursday);
        assert_eq!(thursday.periods, vec![5]);
        assert_eq!(thursday.classroom, "EE201");
        assert_eq!(thursday.floor, "2F");
    }

    #[test]
    fn empty_input_yields_no_entries() {
        assert!(decode_schedule("").is_empty());
        assert!(decode_schedule(",,").is_empty());
    }

    #[test]
    fn garbage_never_panics() {
        assert!(decode_schedule("!!??").is_empty());
        assert!(decode_schedule("🙂🙂-🙂").is_empty());
        assert!(decode_schedule("-EE102[GF]").is_empty());
    }

    #[test]
    fn unknown_day_letters_are_skipped() {
        // Q is not a day letter at all.
        assert!(decode_schedule("Q34-EE102").is_empty());

        let entries = decode_schedule("M3X4-EE102");
        // X is not a day letter; the 4 still belongs to Monday's run.
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].day, Day::Monday);
        assert_eq!(entries[0].periods, vec![3, 4]);
    }

    #[test]
    fn junk_period_characters_do_not_block_siblings() {
        let entries = decode_schedule("M3?4-EE102");
        assert_eq!(entries[0].periods, vec![3, 4]);
        assert_eq!(entries[0].start, "10:10");
        assert_eq!(entries[0].end, "12:00");
    }

    #[test]
    fn extension_slots_map_outside_the_numbered_range() {
        let entries = decode_schedule("My1-AB101,Tn-AB102,Fab-AB103");
        assert_eq!(entries[0].periods, vec![-1, 1]);
        assert_eq!(entries[0].start, "06:00");
        assert_eq!(entries[0].end, "08:50");
        assert_eq!(entries[1].periods, vec![10]);
        assert_eq!(entries[1].start, "12:20");
        assert_eq!(entries[2].periods, vec![11, 12]);
        assert_eq!(entries[2].end, "20:20");
    }

    #[test]
    fn day_without_decodable_periods_yields_no_entry() {
        assert!(decode_schedule("M-EE102").is_empty());
        assert!(decode_schedule("M??-EE102").is_empty());
    }

    #[test]
    fn room_without_bracket_has_empty_floor() {
        let entries = decode_schedule("T56-ED302");
        assert_eq!(entries[0].classroom, "ED302");
        assert_eq!(entries[0].floor, "");
    }

    #[test]
    fn segment_without_room_part() {
        let entries = decode_schedule("W789");
        assert_eq!(entries[0].day, Day::Wednesday);
        assert_eq!(entries[0].periods, vec![7, 8, 9]);
        assert_eq!(entries[0].classroom, "");
        assert_eq!(entries[0].floor, "");
    }
}
