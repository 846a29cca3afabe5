use crate::booking::{requires_reauth, BookingPage, FetchError};
use crate::configuration::BookingSettings;
use crate::domain::{Anchor, Location};
use async_trait::async_trait;
use reqwest::header;
use secrecy::{ExposeSecret, Secret};

/// Posts the availability form of the booking widget, one structure at a time.
pub struct BookingClient {
    http_client: reqwest::Client,
    base_url: String,
    parent_url: String,
    session_id: Secret<String>,
    pax: u32,
}

impl BookingClient {
    pub fn new(settings: &BookingSettings) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;
        Ok(Self {
            http_client,
            base_url: settings.base_url.clone(),
            parent_url: settings.parent_url.clone(),
            session_id: Secret::new(settings.session_id.expose_secret().clone()),
            pax: settings.pax,
        })
    }
}

#[async_trait]
impl BookingPage for BookingClient {
    #[tracing::instrument(
        name = "Fetch booking calendar",
        skip(self),
        fields(location = %location, anchor = %anchor)
    )]
    async fn fetch(&self, location: Location, anchor: Anchor) -> Result<String, FetchError> {
        let date = anchor.to_string();
        let pax = self.pax.to_string();
        let form = [
            ("action", "availability"),
            ("parent_url", self.parent_url.as_str()),
            ("mode", "FORM_PREBOOK"),
            ("productCategory", "nomatter"),
            ("pax", pax.as_str()),
            ("date", date.as_str()),
            ("structure", location.structure_id()),
        ];

        let response = self
            .http_client
            .post(&self.base_url)
            .header(
                header::COOKIE,
                format!("PHPSESSID={}", self.session_id.expose_secret()),
            )
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if requires_reauth(&body) {
            return Err(FetchError::ReauthRequired);
        }
        tracing::debug!(bytes = body.len(), "Received booking calendar");
        Ok(body)
    }
}
