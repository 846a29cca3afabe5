use crate::domain::{ChatId, Location, LocationFilter};
use chrono::{DateTime, NaiveDate, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date window. Either bound may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn parse(from: &str, to: &str) -> Result<DateRange, String> {
        let range = DateRange {
            from: parse_bound(from)?,
            to: parse_bound(to)?,
        };
        if let (Some(from), Some(to)) = (range.from, range.to) {
            if from > to {
                return Err(format!(
                    "date_from ({}) must not be after date_to ({}).",
                    from, to
                ));
            }
        }
        Ok(range)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| from <= date) && self.to.map_or(true, |to| date <= to)
    }
}

fn parse_bound(s: &str) -> Result<Option<NaiveDate>, String> {
    match s.trim() {
        "" => Ok(None),
        s => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| format!("'{}' is not a valid date, expected YYYY-MM-DD.", s)),
    }
}

pub fn format_bound(bound: Option<NaiveDate>) -> String {
    bound
        .map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// A filter to be saved for a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuery {
    pub id: Option<String>,
    pub chat_id: ChatId,
    pub location: LocationFilter,
    pub range: DateRange,
}

impl NewQuery {
    /// Identifier used when none was supplied: unique per subscriber and creation instant.
    pub fn id_or_generate(&self, now: DateTime<Utc>) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => {
                let nanos = now
                    .timestamp_nanos_opt()
                    .unwrap_or_else(|| now.timestamp_micros() * 1_000);
                format!("{}-{}", self.chat_id, nanos)
            }
        }
    }
}

/// A saved subscriber filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub id: String,
    pub chat_id: ChatId,
    pub location: LocationFilter,
    pub range: DateRange,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Query {
    pub fn matches(&self, location: Location, date: NaiveDate) -> bool {
        self.location.matches(location) && self.range.contains(date)
    }
}
