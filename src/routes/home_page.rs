use crate::domain::{Language, Location, Status};
use crate::guards::PageLanguage;
use crate::routes::error_chain_fmt;
use crate::startup::MeasurementId;
use crate::status_board::StatusBoard;
use askama::Template;
use rocket::http::Status as HttpStatus;
use rocket::response::content::RawHtml;
use rocket::response::Responder;
use rocket::{Request, Response, State};

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    lang: Language,
    languages: [Language; 5],
    locations: [Location; 2],
    refuges: Vec<RefugeView>,
    last_check: String,
    measurement_id: String,
}

struct RefugeView {
    name: &'static str,
    days: Vec<DayView>,
}

struct DayView {
    date: String,
    /// `None` when the date is full.
    places: Option<u32>,
}

#[tracing::instrument(name = "Render home page", skip(board, measurement_id))]
#[get("/")]
pub fn home(
    language: PageLanguage,
    board: &State<StatusBoard>,
    measurement_id: &State<MeasurementId>,
) -> Result<RawHtml<String>, HomeError> {
    let view = board.read();
    let refuges = view
        .snapshot
        .iter()
        .map(|(location, dates)| RefugeView {
            name: location.name(),
            days: dates
                .iter()
                .map(|(date, status)| DayView {
                    date: date.format("%Y-%m-%d").to_string(),
                    places: match status {
                        Status::Full => None,
                        Status::Places(n) => Some(*n),
                    },
                })
                .collect(),
        })
        .collect();

    let page = HomeTemplate {
        lang: language.0,
        languages: Language::ALL,
        locations: Location::ALL,
        refuges,
        last_check: view.last_check.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        measurement_id: measurement_id.0.clone(),
    };
    Ok(RawHtml(page.render()?))
}

#[derive(thiserror::Error)]
pub enum HomeError {
    #[error("Failed to render the home page.")]
    Render(#[from] askama::Error),
}

impl std::fmt::Debug for HomeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl<'r> Responder<'r, 'static> for HomeError {
    fn respond_to(self, _request: &'r Request<'_>) -> rocket::response::Result<'static> {
        tracing::error!("HomeError: {:?}", self);
        Response::build()
            .status(HttpStatus::InternalServerError)
            .ok()
    }
}
