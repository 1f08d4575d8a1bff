//! A small CLI tool for issuing admin bearer tokens.
//! Tokens are signed with the server's own `jwt_secret`, read from `Rocket.toml` and `ROCKET_*`
//! environment variables exactly as the server reads it.

use chrono::Duration;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use vote_ledger::{model::api::auth::AdminToken, Config};

const PROGRAM_NAME: &str = "admin-token";

const ABOUT_TEXT: &str = "Issue a bearer token for the admin endpoints.

The token is printed on stdout. Pass it as `Authorization: Bearer <token>`.";

const ADMIN_ID: &str = "ADMIN_ID";
const TTL_HOURS: &str = "ttl-hours";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(ADMIN_ID)
                .help("Numeric ID of the admin, recorded against every cancellation they make")
                .value_parser(value_parser!(u32))
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(TTL_HOURS)
                .long(TTL_HOURS)
                .help("How long the token stays valid, in hours")
                .value_parser(value_parser!(u32).range(1..))
                .action(ArgAction::Set)
                .default_value("12"),
        )
}

/// Issue the token, returning the exit code.
fn run(args: &ArgMatches) -> u8 {
    // Both arguments have parsers and one has a default, so neither can be missing.
    let admin_id = args.get_one::<u32>(ADMIN_ID).copied().unwrap_or_default();
    let ttl_hours = args.get_one::<u32>(TTL_HOURS).copied().unwrap_or(12);

    let config = match Config::from_figment() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            return 1;
        }
    };

    match AdminToken::issue(admin_id, Duration::hours(ttl_hours.into()), &config) {
        Ok(token) => {
            println!("{token}");
            0
        }
        Err(err) => {
            eprintln!("Failed to issue token: {err}");
            2
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn issued_tokens_verify() {
        let args = cli().get_matches_from([PROGRAM_NAME, "7", "--ttl-hours", "1"]);
        assert_eq!(args.get_one::<u32>(ADMIN_ID), Some(&7));

        let config = Config::from_figment().unwrap();
        let token = AdminToken::issue(7, Duration::hours(1), &config).unwrap();
        assert_eq!(AdminToken::verify(&token, &config).unwrap().admin_id, 7);
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let result = cli().try_get_matches_from([PROGRAM_NAME, "7", "--ttl-hours", "0"]);
        assert!(result.is_err());
    }
}
