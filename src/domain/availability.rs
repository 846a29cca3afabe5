use crate::domain::Location;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;

/// First day of the month the booking calendar is requested for.
///
/// The upstream calendar only prints `MM/DD` tokens, so the anchor also provides the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Anchor(NaiveDate);

impl Anchor {
    pub fn containing(date: NaiveDate) -> Anchor {
        Anchor(date.with_day(1).unwrap_or(date))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// The anchor of the following month.
    pub fn succ(&self) -> Anchor {
        let (year, month) = match self.month() {
            12 => (self.year() + 1, 1),
            month => (self.year(), month + 1),
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Anchor)
            .unwrap_or(*self)
    }

    /// `count` consecutive anchors starting with this one.
    pub fn months(self, count: u32) -> Vec<Anchor> {
        std::iter::successors(Some(self), |anchor| Some(anchor.succ()))
            .take(count.max(1) as usize)
            .collect()
    }

    /// Resolves a day-of-month token to a calendar date.
    ///
    /// Calendars opened in December may spill into January of the next year, and the other
    /// way around for January.
    pub fn resolve(&self, month: u32, day: u32) -> Option<NaiveDate> {
        let year = match (self.month(), month) {
            (12, 1) => self.year() + 1,
            (1, 12) => self.year() - 1,
            _ => self.year(),
        };
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Full,
    Places(u32),
}

impl Status {
    pub const FULL_MARKER: &'static str = "Full";

    pub fn places(count: u32) -> Status {
        match count {
            0 => Status::Full,
            count => Status::Places(count),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Status::Full)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Full => f.write_str(Self::FULL_MARKER),
            Status::Places(count) => write!(f, "{}", count),
        }
    }
}

pub type DateStatuses = BTreeMap<NaiveDate, Status>;

/// A bookable opening, i.e. a non-full entry of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenSlot {
    pub location: Location,
    pub date: NaiveDate,
    pub places: u32,
}

/// Result of one polling cycle: every extracted date for every location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilitySnapshot {
    locations: BTreeMap<Location, DateStatuses>,
}

impl AvailabilitySnapshot {
    /// Merges extracted dates into the entry for `location`. A location that yielded no
    /// dates gets no entry.
    pub fn insert(&mut self, location: Location, dates: DateStatuses) {
        if dates.is_empty() {
            return;
        }
        self.locations.entry(location).or_default().extend(dates);
    }

    pub fn get(&self, location: Location) -> Option<&DateStatuses> {
        self.locations.get(&location)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Location, &DateStatuses)> {
        self.locations.iter().map(|(location, dates)| (*location, dates))
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn total_dates(&self) -> usize {
        self.locations.values().map(BTreeMap::len).sum()
    }

    /// Non-full entries ordered by location, then date.
    pub fn open_slots(&self) -> impl Iterator<Item = OpenSlot> + '_ {
        self.iter().flat_map(|(location, dates)| {
            dates.iter().filter_map(move |(date, status)| match status {
                Status::Full => None,
                Status::Places(places) => Some(OpenSlot {
                    location,
                    date: *date,
                    places: *places,
                }),
            })
        })
    }
}
