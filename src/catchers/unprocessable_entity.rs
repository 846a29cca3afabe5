use rocket::response::status;
use rocket::response::status::BadRequest;
use rocket::Request;

/// Form fields that are missing or of the wrong shape are the client's fault.
#[catch(422)]
pub fn unprocessable_entity_to_bad_request(_req: &Request) -> BadRequest<&'static str> {
    status::BadRequest("The submitted form is incomplete or malformed.")
}
