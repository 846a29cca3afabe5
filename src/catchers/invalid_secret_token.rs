use rocket::response::status;
use rocket::Request;

#[catch(401)]
pub fn unauthorized(_req: &Request) -> status::Unauthorized<&'static str> {
    status::Unauthorized("Invalid or missing secret token.")
}
