use crate::domain::{Anchor, Location, OpenSlot};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::Duration;

/// Groups openings by location and lists each group by ascending date.
pub fn availability_message(slots: &[OpenSlot]) -> String {
    let mut grouped: BTreeMap<Location, Vec<&OpenSlot>> = BTreeMap::new();
    for slot in slots {
        grouped.entry(slot.location).or_default().push(slot);
    }

    let mut message = String::from("🏔 <b>New refuge availability</b>\n");
    for (location, mut slots) in grouped {
        slots.sort_by_key(|slot| slot.date);
        let _ = write!(message, "\n<b>{}</b>\n", location.name());
        for slot in slots {
            let _ = writeln!(
                message,
                "• {}: {} {}",
                slot.date.format("%Y-%m-%d"),
                slot.places,
                if slot.places == 1 { "place" } else { "places" }
            );
        }
    }
    message
}

/// Escapes text for Telegram's HTML parse mode.
pub fn html_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn scrape_failure_message() -> String {
    "⚠️ No dates were found for any refuge in the last check. \
     The booking page may have changed or be unreachable."
        .to_string()
}

pub fn reauth_message() -> String {
    "⚠️ The booking session has expired. \
     Refresh the PHPSESSID cookie (booking.session_id) and restart the service."
        .to_string()
}

pub fn startup_message(anchors: &[Anchor], interval: Duration) -> String {
    let months: Vec<String> = anchors
        .iter()
        .map(|anchor| anchor.date().format("%B %Y").to_string())
        .collect();
    let refuges: Vec<&str> = Location::ALL.iter().map(Location::name).collect();
    format!(
        "🚀 Monitoring started for {}\nRefuges: {}\nChecking every {} second(s)",
        months.join(", "),
        refuges.join(", "),
        interval.as_secs()
    )
}

pub fn shutdown_message() -> String {
    "🛑 Monitoring stopped".to_string()
}
