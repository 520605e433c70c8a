use failure::Fail;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// The canonical record for a single repository, regardless of where it is
/// hosted.
///
/// Every field is optional. Providers only populate what their field mapper
/// declares, and the `id` is handed out by whichever storage backend saves
/// the repo first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_push: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_type: Option<String>,
}

impl Repo {
    /// A human friendly name for log messages.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or_else(|| self.url.as_deref())
            .unwrap_or("<unnamed repo>")
    }

    /// The key used when checking whether two repos are the same
    /// repository (lower-cased URL without protocol or trailing slashes).
    pub fn dedup_key(&self) -> Option<String> {
        self.url.as_deref().map(normalize_url)
    }

    /// Store a raw JSON value in the requested field.
    ///
    /// Values whose JSON type doesn't fit the field (including `null`) leave
    /// the field untouched. Returns whether the field was set.
    pub fn set(&mut self, field: RepoField, value: &Value) -> bool {
        match field {
            RepoField::FullName => assign(&mut self.full_name, as_string(value)),
            RepoField::Name => assign(&mut self.name, as_string(value)),
            RepoField::Description => {
                assign(&mut self.description, as_string(value))
            }
            RepoField::Topics => assign(&mut self.topics, as_strings(value)),
            RepoField::Url => assign(&mut self.url, as_string(value)),
            RepoField::Homepage => assign(&mut self.homepage, as_string(value)),
            RepoField::Lang => assign(&mut self.lang, as_string(value)),
            RepoField::License => assign(&mut self.license, as_string(value)),
            RepoField::CreatedAt => {
                assign(&mut self.created_at, as_string(value))
            }
            RepoField::LastPush => assign(&mut self.last_push, as_string(value)),
            RepoField::LastUpdate => {
                assign(&mut self.last_update, as_string(value))
            }
            RepoField::Forked => assign(&mut self.forked, value.as_bool()),
            RepoField::Archived => assign(&mut self.archived, value.as_bool()),
            RepoField::Template => assign(&mut self.template, value.as_bool()),
            RepoField::Forks => assign(&mut self.forks, value.as_u64()),
            RepoField::Stars => assign(&mut self.stars, value.as_u64()),
            RepoField::Owner => assign(&mut self.owner, as_string(value)),
            RepoField::OwnerType => {
                assign(&mut self.owner_type, as_string(value))
            }
        }
    }
}

fn assign<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(String::from)
}

fn as_strings(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|it| it.as_str().map(String::from))
            .collect()
    })
}

/// Lower-case a URL and strip its protocol and any trailing slashes.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let without_protocol = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    without_protocol.trim_end_matches('/').to_lowercase()
}

/// Every field a field mapper is allowed to populate.
///
/// `id` is deliberately missing, only storage backends get to assign it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RepoField {
    FullName,
    Name,
    Description,
    Topics,
    Url,
    Homepage,
    Lang,
    License,
    CreatedAt,
    LastPush,
    LastUpdate,
    Forked,
    Archived,
    Template,
    Forks,
    Stars,
    Owner,
    OwnerType,
}

impl RepoField {
    pub const ALL: [RepoField; 18] = [
        RepoField::FullName,
        RepoField::Name,
        RepoField::Description,
        RepoField::Topics,
        RepoField::Url,
        RepoField::Homepage,
        RepoField::Lang,
        RepoField::License,
        RepoField::CreatedAt,
        RepoField::LastPush,
        RepoField::LastUpdate,
        RepoField::Forked,
        RepoField::Archived,
        RepoField::Template,
        RepoField::Forks,
        RepoField::Stars,
        RepoField::Owner,
        RepoField::OwnerType,
    ];

    /// The field's name as it appears in serialized repos.
    pub fn as_str(self) -> &'static str {
        match self {
            RepoField::FullName => "full_name",
            RepoField::Name => "name",
            RepoField::Description => "description",
            RepoField::Topics => "topics",
            RepoField::Url => "url",
            RepoField::Homepage => "homepage",
            RepoField::Lang => "lang",
            RepoField::License => "license",
            RepoField::CreatedAt => "created_at",
            RepoField::LastPush => "last_push",
            RepoField::LastUpdate => "last_update",
            RepoField::Forked => "forked",
            RepoField::Archived => "archived",
            RepoField::Template => "template",
            RepoField::Forks => "forks",
            RepoField::Stars => "stars",
            RepoField::Owner => "owner",
            RepoField::OwnerType => "owner_type",
        }
    }
}

impl Display for RepoField {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<RepoField, UnknownField> {
        RepoField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField {
                name: s.to_string(),
            })
    }
}

/// A field mapper tried to target a field which doesn't exist on [`Repo`].
#[derive(Debug, Clone, PartialEq, Fail)]
#[fail(display = "\"{}\" isn't a known repo field", name)]
pub struct UnknownField {
    pub name: String,
}
