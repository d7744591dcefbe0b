use std::env;

use diesel::pg::PgConnection;
use diesel::Connection;
use dotenvy::dotenv;

/// # open a connection to the primary store
/// reads `DATABASE_URL` from the environment. a missing variable or a
/// refused connection is reported as a plain reason string, the postgres
/// adapter folds it into its unavailable state instead of panicking so
/// the tier chain can degrade.
pub fn establish_connection() -> Result<PgConnection, String> {
    dotenv().ok();

    let database_url =
        env::var("DATABASE_URL").map_err(|_| "DATABASE_URL is not set".to_string())?;

    PgConnection::establish(&database_url).map_err(|error| error.to_string())
}
