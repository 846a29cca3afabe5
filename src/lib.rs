#[macro_use]
extern crate rocket;

pub mod booking;
pub mod catchers;
pub mod configuration;
pub mod domain;
pub mod guards;
pub mod messenger;
pub mod models;
pub mod notifications;
pub mod poller;
pub mod port_saver;
pub mod routes;
pub mod schema;
pub mod startup;
pub mod status_board;
pub mod store;
pub mod telemetry;
