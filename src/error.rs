use crate::tracking::PersonId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("person {0} is not currently tracked")]
    UnknownPerson(PersonId),
    #[error("session is still active")]
    SessionActive,
    #[error("session driver is not running")]
    DriverClosed,
}
