use crate::domain::Language;
use rocket::outcome::Outcome::Success;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use std::convert::Infallible;

pub const LANGUAGE_COOKIE: &str = "lang";

/// Display language of a page: `?lang=`, then the `lang` cookie,
/// then `Accept-Language`, then English.
#[derive(Debug)]
pub struct PageLanguage(pub Language);

#[async_trait]
impl<'r> FromRequest<'r> for PageLanguage {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Success(PageLanguage(detect(request)))
    }
}

fn detect(request: &Request) -> Language {
    let from_query = request
        .query_value::<&str>("lang")
        .and_then(Result::ok)
        .filter(|v| !v.trim().is_empty());
    if let Some(value) = from_query {
        return Language::detect(value).unwrap_or_default();
    }
    if let Some(cookie) = request.cookies().get(LANGUAGE_COOKIE) {
        return Language::detect(cookie.value()).unwrap_or_default();
    }
    request
        .headers()
        .get_one("Accept-Language")
        .and_then(Language::from_accept_language)
        .unwrap_or_default()
}
