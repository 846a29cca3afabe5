use crate::domain::{
    ChatId, DateRange, Language, LocationFilter, NewQuery, NewSubscriber,
};
use crate::messenger::Notifier;
use crate::routes::error_chain_fmt;
use crate::store::{StoreError, SubscriberStore};
use rocket::form::Form;
use rocket::http::{ContentType, Status};
use rocket::response::{Redirect, Responder};
use rocket::{Request, Response, State};
use std::io::Cursor;
use std::sync::Arc;
use uuid::Uuid;

const CONFIRMATION: &str = "✅ Subscription saved. We'll notify you when matching dates appear.";

#[derive(FromForm)]
pub struct FormData {
    chat_id: String,
    language: Option<String>,
    refuge: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
}

/// A validated subscribe request: the subscriber and the query to save for them.
#[derive(Debug)]
struct Subscription {
    subscriber: NewSubscriber,
    query: NewQuery,
}

impl TryFrom<FormData> for Subscription {
    type Error = String;

    fn try_from(form: FormData) -> Result<Self, Self::Error> {
        let chat_id = ChatId::parse(form.chat_id)?;
        let language = match form.language.as_deref().map(str::trim) {
            None | Some("") => Language::default(),
            Some(code) => Language::parse(code)?,
        };
        let location = LocationFilter::parse(form.refuge.as_deref().unwrap_or_default())?;
        let range = DateRange::parse(
            form.date_from.as_deref().unwrap_or_default(),
            form.date_to.as_deref().unwrap_or_default(),
        )?;
        Ok(Subscription {
            subscriber: NewSubscriber::new(chat_id.clone(), language),
            query: NewQuery {
                id: None,
                chat_id,
                location,
                range,
            },
        })
    }
}

#[tracing::instrument(
    name = "Adding a new subscription",
    skip(form, store, notifier),
    fields(
        request_id = %Uuid::new_v4(),
        chat_id = %form.chat_id,
        refuge = ?form.refuge
    )
)]
#[post("/subscribe", data = "<form>")]
pub async fn subscribe(
    form: Form<FormData>,
    store: &State<Arc<dyn SubscriberStore>>,
    notifier: &State<Notifier>,
) -> Result<Redirect, SubscribeError> {
    let subscription: Subscription = form
        .into_inner()
        .try_into()
        .map_err(SubscribeError::Validation)?;
    let chat_id = subscription.subscriber.chat_id.clone();

    store.upsert_subscriber(subscription.subscriber).await?;
    let query_id = store.add_query(subscription.query).await?;
    tracing::info!(%query_id, "Saved subscription query");

    // Best effort: the subscription stands even if the chat cannot be reached.
    let _ = notifier.send_to(&chat_id, CONFIRMATION).await;
    Ok(Redirect::to("/#subscribe"))
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    Validation(String),
    #[error("Failed to save the subscription.")]
    Store(#[from] StoreError),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl<'r> Responder<'r, 'static> for SubscribeError {
    fn respond_to(self, _request: &'r Request<'_>) -> rocket::response::Result<'static> {
        tracing::warn!("SubscribeError: {:?}", self);
        let (status, body) = match &self {
            SubscribeError::Validation(message) => (Status::BadRequest, message.clone()),
            SubscribeError::Store(_) => (Status::InternalServerError, self.to_string()),
        };
        Response::build()
            .status(status)
            .header(ContentType::Plain)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
