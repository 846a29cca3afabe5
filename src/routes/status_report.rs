use crate::status_board::StatusBoard;
use rocket::serde::json::Json;
use rocket::State;

#[derive(serde::Serialize)]
pub struct StatusResponse {
    status: &'static str,
    refuges: usize,
    last_check: String,
}

#[get("/status")]
pub fn status(board: &State<StatusBoard>) -> Json<StatusResponse> {
    let view = board.read();
    Json(StatusResponse {
        status: "ok",
        refuges: view.snapshot.location_count(),
        last_check: view.last_check.to_rfc3339(),
    })
}
