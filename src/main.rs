use rocket::{Build, Rocket};

#[macro_use]
extern crate rocket;

use f1_telemetry_analytics::modules::helpers::logging::setup_logging;
use f1_telemetry_analytics::routes::api::lap;

#[launch]
fn rocket() -> Rocket<Build> {
    dotenvy::dotenv().ok();

    if let Err(error) = setup_logging() {
        eprintln!("logging setup failed: {}", error);
    }

    rocket::build().mount(
        "/api",
        routes![
            lap::save_one,
            lap::list_all,
            lap::get_analysis,
            lap::get_telemetry,
            lap::health,
        ],
    )
}
