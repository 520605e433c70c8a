//! The errors encountered in this crate.
//!
//! Everything fallible returns a `failure::Error`. Use
//! `Error::downcast_ref()` to check for one of the specific kinds below.

use failure::Fail;
use reqwest::StatusCode;

pub use crate::repo::UnknownField;

/// A URL didn't look like `<domain>/<owner>/<repo>` for the provider which
/// was asked to handle it.
#[derive(Debug, Clone, PartialEq, Fail)]
#[fail(display = "\"{}\" isn't a valid repository URL for {}", url, provider)]
pub struct MalformedUrl {
    pub url: String,
    pub provider: String,
}

/// None of the registered providers claims the URL's domain.
#[derive(Debug, Clone, PartialEq, Fail)]
#[fail(display = "No provider found for \"{}\"", url)]
pub struct ProviderNotFound {
    pub url: String,
}

/// The provider wants credentials we don't have.
#[derive(Debug, Clone, PartialEq, Fail)]
#[fail(display = "{} requires authorization ({})", url, status)]
pub struct Unauthorized {
    pub status: StatusCode,
    pub url: String,
}

/// The server responded with a non-successful status code.
#[derive(Debug, Clone, PartialEq, Fail)]
#[fail(display = "Request to {} failed with {}", url, status)]
pub struct FailedRequest {
    pub status: StatusCode,
    pub url: String,
}

/// A storage backend couldn't find the repo it was asked to change.
#[derive(Debug, Clone, PartialEq, Fail)]
#[fail(display = "Unable to find {} in storage", what)]
pub struct NotFound {
    pub what: String,
}

/// The configured storage driver isn't one we know about.
#[derive(Debug, Clone, PartialEq, Fail)]
#[fail(
    display = "Unknown storage driver \"{}\", expected local, mock or rest",
    name
)]
pub struct UnknownStorage {
    pub name: String,
}

/// The configured custom provider kind isn't one we know about.
#[derive(Debug, Clone, PartialEq, Fail)]
#[fail(display = "Unknown provider kind \"{}\", expected gitlab or gitea", name)]
pub struct UnknownProviderKind {
    pub name: String,
}
