use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::{
    bson::{de::Error as BsonDeError, ser::Error as BsonSerError},
    error::Error as DbError,
};
use rocket::{figment::Error as FigmentError, http::Status, response::Responder};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    BsonSer(#[from] BsonSerError),
    #[error(transparent)]
    BsonDe(#[from] BsonDeError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Storage contention persisted after {attempts} attempts: {source}")]
    Storage {
        attempts: u32,
        #[source]
        source: DbError,
    },
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// Shorthand for a not-found error.
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("Not found: {what}"))
    }

    /// Shorthand for a bad-request error.
    pub fn bad_request(why: String) -> Self {
        Self::Status(Status::BadRequest, why)
    }

    /// Shorthand for a request that conflicts with the current state.
    pub fn conflict(why: String) -> Self {
        Self::Status(Status::Conflict, why)
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Storage { .. } | Self::BsonSer(_) | Self::BsonDe(_) => {
                Status::InternalServerError
            }
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{}: {self}", describe(req));
        } else {
            debug!("{}: {self}", describe(req));
        }
        Err(status)
    }
}

/// Method and path of a request. Query strings may carry voter names, so they are left out.
fn describe(req: &rocket::Request<'_>) -> String {
    format!("{} {}", req.method(), req.uri().path())
}

/// Errors that stop the server from launching at all.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] FigmentError),
    #[error("Failed to contact database during launch: {0}")]
    Db(#[from] DbError),
}
