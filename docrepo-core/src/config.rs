//! Collection bindings and the settings they are resolved from.
//!
//! A repository is bound to exactly one (database, collection) pair for its
//! whole lifetime. The binding is either passed in directly as a
//! [`RepositoryConfig`] or resolved from [`RepositorySettings`] by entity name.
//!
//! Settings can be loaded from several sources:
//!
//! - JSON or YAML text, or a file picked by extension
//! - flat `MongoGenericRepo:{Entity}:Collection` / `MongoGenericRepo:{Entity}:Database` pairs
//! - process environment, using `__` as the section separator
//!
//! ```yaml
//! User:
//!   collection: users
//!   database: app
//! ```

use std::{
    collections::HashMap,
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, RepositoryResult};

/// Root section of flat configuration keys.
pub const SETTINGS_SECTION: &str = "MongoGenericRepo";

const COLLECTION_KEY: &str = "Collection";
const DATABASE_KEY: &str = "Database";
const ENV_SEPARATOR: &str = "__";

/// The (database, collection) pair a repository is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(alias = "collection", alias = "collectionName")]
    pub collection_name: String,
    #[serde(alias = "database", alias = "databaseName")]
    pub database_name: String,
}

impl RepositoryConfig {
    pub fn new(collection_name: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            database_name: database_name.into(),
        }
    }

    /// Checks that both names are present.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ConfigurationMissing`] if either name is blank.
    pub fn validate(&self) -> RepositoryResult<()> {
        if self.collection_name.trim().is_empty() {
            return Err(RepositoryError::ConfigurationMissing("collection name".into()));
        }
        if self.database_name.trim().is_empty() {
            return Err(RepositoryError::ConfigurationMissing("database name".into()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct PartialBinding {
    #[serde(default, alias = "Collection", alias = "collection_name", alias = "collectionName")]
    collection: Option<String>,
    #[serde(default, alias = "Database", alias = "database_name", alias = "databaseName")]
    database: Option<String>,
}

/// Collection bindings keyed by entity name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySettings {
    entries: HashMap<String, PartialBinding>,
}

#[derive(Deserialize)]
struct SettingsFile {
    #[serde(rename = "MongoGenericRepo")]
    section: HashMap<String, PartialBinding>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SettingsShape {
    Sectioned(SettingsFile),
    Flat(HashMap<String, PartialBinding>),
}

impl From<SettingsShape> for RepositorySettings {
    fn from(shape: SettingsShape) -> Self {
        let entries = match shape {
            SettingsShape::Sectioned(file) => file.section,
            SettingsShape::Flat(entries) => entries,
        };

        Self { entries }
    }
}

impl RepositorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a complete binding for an entity.
    pub fn with_binding(mut self, entity: impl Into<String>, config: RepositoryConfig) -> Self {
        self.entries.insert(
            entity.into(),
            PartialBinding {
                collection: Some(config.collection_name),
                database: Some(config.database_name),
            },
        );
        self
    }

    /// Parses settings from JSON. Accepts either a bare map of entity bindings
    /// or one nested under a `MongoGenericRepo` section.
    pub fn from_json_str(contents: &str) -> RepositoryResult<Self> {
        let shape: SettingsShape = serde_json::from_str(contents)?;
        Ok(shape.into())
    }

    /// Parses settings from YAML, with the same shapes as [`Self::from_json_str`].
    pub fn from_yaml_str(contents: &str) -> RepositoryResult<Self> {
        let shape: SettingsShape = serde_yaml::from_str(contents)?;
        Ok(shape.into())
    }

    /// Loads settings from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            RepositoryError::Initialization(format!("failed to read settings file {:?}: {}", path, e))
        })?;
        let ext = path
            .extension()
            .and_then(|os| os.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&contents),
            "json" => Self::from_json_str(&contents),
            other => Err(RepositoryError::Initialization(format!(
                "unsupported settings extension: {other}"
            ))),
        }
    }

    /// Builds settings from flat `MongoGenericRepo:{Entity}:{Collection|Database}` pairs.
    ///
    /// Keys outside the section, or with an unknown leaf, are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::from_separated_pairs(pairs, ":")
    }

    /// Builds settings from environment variables such as
    /// `MongoGenericRepo__User__Collection=users`.
    pub fn from_env() -> Self {
        Self::from_separated_pairs(std::env::vars(), ENV_SEPARATOR)
    }

    fn from_separated_pairs<I, K, V>(pairs: I, separator: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = Self::default();

        for (key, value) in pairs {
            let mut parts = key.as_ref().split(separator);
            let (Some(section), Some(entity), Some(leaf), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            if !section.eq_ignore_ascii_case(SETTINGS_SECTION) {
                continue;
            }

            let binding = settings.entries.entry(entity.to_string()).or_default();
            if leaf.eq_ignore_ascii_case(COLLECTION_KEY) {
                binding.collection = Some(value.into());
            } else if leaf.eq_ignore_ascii_case(DATABASE_KEY) {
                binding.database = Some(value.into());
            }
        }

        settings
    }

    /// Merges `other` into these settings; values present in `other` win.
    pub fn merge(mut self, other: RepositorySettings) -> Self {
        for (entity, binding) in other.entries {
            let current = self.entries.entry(entity).or_default();
            if binding.collection.is_some() {
                current.collection = binding.collection;
            }
            if binding.database.is_some() {
                current.database = binding.database;
            }
        }
        self
    }

    /// Resolves the binding for an entity.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ConfigurationMissing`] naming the first missing
    /// key when either name is absent or blank.
    pub fn resolve(&self, entity: &str) -> RepositoryResult<RepositoryConfig> {
        let binding = self.entries.get(entity);
        let lookup = |value: Option<&String>, leaf: &str| {
            value
                .filter(|name| !name.trim().is_empty())
                .cloned()
                .ok_or_else(|| {
                    RepositoryError::ConfigurationMissing(format!("{SETTINGS_SECTION}:{entity}:{leaf}"))
                })
        };

        let collection_name = lookup(binding.and_then(|b| b.collection.as_ref()), COLLECTION_KEY)?;
        let database_name = lookup(binding.and_then(|b| b.database.as_ref()), DATABASE_KEY)?;

        Ok(RepositoryConfig { collection_name, database_name })
    }

    /// Returns the entity names with at least one configured value.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
