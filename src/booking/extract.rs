use crate::domain::{Anchor, DateStatuses, Status};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static AVAILABLE_DAY: Lazy<Selector> = Lazy::new(|| selector(".day.dispo"));
static FULL_DAY: Lazy<Selector> = Lazy::new(|| selector(".day.complet"));
static DATE_SPAN: Lazy<Selector> = Lazy::new(|| selector("span.date"));
static PLACE_SPAN: Lazy<Selector> = Lazy::new(|| selector("span.place"));
static ANY_SPAN: Lazy<Selector> = Lazy::new(|| selector("span"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must be valid")
}

/// Extracts the calendar of one booking page.
///
/// Available days carry a `MM/DD` token and a place count, full days only the token.
/// Entries whose token or count cannot be read are skipped, so an empty map is a valid
/// result for a page without a calendar.
pub fn extract_availability(html: &str, anchor: Anchor) -> DateStatuses {
    let document = Html::parse_document(html);
    let mut dates = DateStatuses::new();

    for day in document.select(&AVAILABLE_DAY) {
        let token = day_token(day);
        let Some(date) = parse_day_token(&token).and_then(|(m, d)| anchor.resolve(m, d)) else {
            tracing::debug!(token = %token, "Skipping available day with an unreadable date");
            continue;
        };
        let places = first_text(day, &PLACE_SPAN).or_else(|| first_text(day, &ANY_SPAN));
        match places.as_deref().map(str::parse::<u32>) {
            Some(Ok(count)) => {
                dates.insert(date, Status::places(count));
            }
            _ => {
                tracing::warn!(%date, places = ?places, "Skipping available day with an unreadable place count");
            }
        }
    }

    for day in document.select(&FULL_DAY) {
        let token = day_token(day);
        match parse_day_token(&token).and_then(|(m, d)| anchor.resolve(m, d)) {
            Some(date) => {
                dates.insert(date, Status::Full);
            }
            None => tracing::debug!(token = %token, "Skipping full day with an unreadable date"),
        }
    }

    dates
}

/// `span.date` when present, otherwise the element's own text, otherwise all of its text.
fn day_token(day: ElementRef<'_>) -> String {
    if let Some(token) = first_text(day, &DATE_SPAN) {
        return token;
    }
    let own: String = day
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim())
        .collect();
    if !own.is_empty() {
        return own;
    }
    day.text().collect::<String>().trim().to_string()
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

fn parse_day_token(token: &str) -> Option<(u32, u32)> {
    let (month, day) = token.trim().split_once('/')?;
    Some((month.trim().parse().ok()?, day.trim().parse().ok()?))
}
