//! Curate a personal shelf of starred repositories.
//!
//! Repositories are looked up on whichever hosting service a URL belongs to
//! (GitHub, GitLab, Gitea, Codeberg or a self-hosted instance), normalized
//! into a single [`Repo`] shape, then persisted with one of several
//! [`Storage`] backends.

#[macro_use]
extern crate log;

pub mod client;
pub mod config;
pub mod driver;
pub mod errors;
pub mod mapper;
pub mod providers;
pub mod registry;
pub mod repo;
pub mod storage;

pub use crate::config::Config;
pub use crate::driver::Driver;
pub use crate::mapper::{parse_response, FieldMapper};
pub use crate::providers::{Provider, ProviderKind};
pub use crate::registry::{is_user_profile_url, sanitize_url, ProviderRegistry};
pub use crate::repo::{Repo, RepoField};
pub use crate::storage::{Storage, StorageKind};
