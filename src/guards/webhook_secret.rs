use crate::guards::OrStatus;
use crate::startup::WebhookSecret;
use rocket::http::Status;
use rocket::outcome::Outcome::{Error, Success};
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use secrecy::ExposeSecret;

pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Proof that a webhook call carries the configured secret token.
/// Always granted when no secret is configured.
pub struct VerifiedWebhook {
    // prevents construction outside of this module
    _private: (),
}

#[async_trait]
impl<'r> FromRequest<'r> for VerifiedWebhook {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match from_request_result(request) {
            Ok(verified) => Success(verified),
            Err((status, e)) => {
                tracing::warn!(error.cause_chain = ?e, "Rejected webhook call");
                Error((status, e))
            }
        }
    }
}

fn from_request_result(request: &Request) -> Result<VerifiedWebhook, (Status, anyhow::Error)> {
    let expected = request
        .rocket()
        .state::<WebhookSecret>()
        .or_status(Status::InternalServerError, "Webhook secret is not managed.")?;

    if let Some(expected) = &expected.0 {
        let provided = request
            .headers()
            .get_one(SECRET_TOKEN_HEADER)
            .or_status(Status::Unauthorized, "The secret token header was missing.")?;
        if provided != expected.expose_secret() {
            return Err((
                Status::Unauthorized,
                anyhow::anyhow!("The secret token did not match."),
            ));
        }
    }
    Ok(VerifiedWebhook { _private: () })
}
