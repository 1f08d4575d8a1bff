#[macro_use]
extern crate log;

#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use mongodb::{error::Error as DbError, options::ClientOptions, Client};
use rocket::{fairing::AdHoc, Build, Rocket};

use crate::error::LaunchError;

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;
pub mod serializer;
pub mod voting;

pub use config::Config;

/// Build the server: connect to the database named in the configuration and mount everything.
pub async fn build() -> Result<Rocket<Build>, LaunchError> {
    let config = Config::from_figment()?;
    let db_client = db_client(&config).await?;
    let db_name = database(&config);
    Ok(rocket_for_db(db_client, &db_name))
}

/// Build a rocket that uses the given database.
///
/// Indexes, id counters and the voting service are set up by [`voting::VotingFairing`] during
/// ignition.
pub fn rocket_for_db(db_client: Client, db_name: &str) -> Rocket<Build> {
    let db = db_client.database(db_name);
    rocket::build()
        .mount("/", api::routes())
        .attach(logging::LoggerFairing)
        .attach(AdHoc::config::<Config>())
        .manage(db_client)
        .manage(db)
        .attach(voting::VotingFairing)
}

/// Connect to the database server given in the configuration.
pub async fn db_client(config: &Config) -> Result<Client, DbError> {
    let mut options = ClientOptions::parse(config.db_uri()).await?;
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    Client::with_options(options)
}

/// The database name to use.
#[cfg(not(test))]
pub fn database(config: &Config) -> String {
    config.db_name().to_string()
}

/// The database name to use. Every test gets its own database so tests can run in parallel.
#[cfg(test)]
pub fn database(config: &Config) -> String {
    use mongodb::bson::oid::ObjectId;
    format!("{}_test_{}", config.db_name(), ObjectId::new())
}
