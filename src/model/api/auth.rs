//! Request guards for the two kinds of caller: the conversational front-end, which presents a
//! shared secret, and administrators, who present a signed bearer token.

use chrono::{serde::ts_seconds, DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::common::AdminId;

pub const BOT_SECRET_HEADER: &str = "X-Bot-Secret";

/// Proof that the request came from the conversational front-end.
#[derive(Debug, Clone, Copy)]
pub struct BotAuth;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BotAuth {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.guard::<&State<Config>>().await {
            Outcome::Success(config) => config,
            _ => return missing_config(),
        };

        match req.headers().get_one(BOT_SECRET_HEADER) {
            Some(secret) if secrets_match(secret.as_bytes(), config.bot_secret().as_bytes()) => {
                Outcome::Success(BotAuth)
            }
            Some(_) => unauthorized("Wrong bot secret"),
            None => unauthorized("Missing bot secret"),
        }
    }
}

/// An administrator, identified by a valid bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminToken {
    pub admin_id: AdminId,
}

/// Bearer token claims.
#[derive(Serialize, Deserialize)]
struct Claims {
    sub: AdminId,
    #[serde(with = "ts_seconds")]
    exp: DateTime<Utc>,
}

impl AdminToken {
    /// Sign a token for the given admin, valid for `ttl`.
    pub fn issue(admin_id: AdminId, ttl: Duration, config: &Config) -> Result<String> {
        let claims = Claims {
            sub: admin_id,
            exp: Utc::now() + ttl,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(token)
    }

    /// Verify a token and extract the admin it names.
    pub fn verify(token: &str, config: &Config) -> Result<Self> {
        let admin_id = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims>| data.claims.sub)?;
        Ok(Self { admin_id })
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminToken {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.guard::<&State<Config>>().await {
            Outcome::Success(config) => config,
            _ => return missing_config(),
        };

        let token = match req
            .headers()
            .get_one("Authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
        {
            Some(token) => token.trim(),
            None => return unauthorized("Missing bearer token"),
        };

        match Self::verify(token, config) {
            Ok(admin) => Outcome::Success(admin),
            Err(err) => {
                debug!("Rejected admin token: {err}");
                unauthorized("Invalid bearer token")
            }
        }
    }
}

/// Compare secrets without exiting early on the first differing byte.
fn secrets_match(given: &[u8], expected: &[u8]) -> bool {
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn unauthorized<T>(why: &str) -> Outcome<T, Error> {
    Outcome::Failure((
        Status::Unauthorized,
        Error::Status(Status::Unauthorized, why.to_string()),
    ))
}

fn missing_config<T>() -> Outcome<T, Error> {
    let status = Status::InternalServerError;
    Outcome::Failure((status, Error::Status(status, "Config not managed".to_string())))
}
