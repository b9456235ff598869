//! Environment-driven core configuration.
//!
//! # Responsibility
//! - Resolve database location, collection names, document storage and
//!   logging settings from environment variables.
//!
//! # Invariants
//! - Every setting has a default; only malformed values are errors.
//! - The list page size is clamped to `1..=MAX_LIST_LIMIT`.

use crate::blob::{DEFAULT_UPLOAD_TTL_SECS, MAX_UPLOAD_TTL_SECS};
use crate::logging::default_log_level;
use crate::model::EntityKind;
use crate::repo::{normalize_list_limit, DEFAULT_LIST_LIMIT};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "CLASSBOARD_DB_PATH";
pub const DOCUMENTS_BUCKET_VAR: &str = "DOCUMENTS_BUCKET";
pub const DOCUMENTS_PUBLIC_BASE_URL_VAR: &str = "DOCUMENTS_PUBLIC_BASE_URL";
pub const DOCUMENTS_ROOT_VAR: &str = "DOCUMENTS_ROOT";
pub const DOCUMENTS_SIGNING_SECRET_VAR: &str = "DOCUMENTS_SIGNING_SECRET";
pub const UPLOAD_URL_TTL_VAR: &str = "UPLOAD_URL_TTL_SECS";
pub const LIST_LIMIT_VAR: &str = "LIST_LIMIT_DEFAULT";
pub const LOG_LEVEL_VAR: &str = "CLASSBOARD_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "CLASSBOARD_LOG_DIR";

const DEFAULT_BUCKET: &str = "classboard-documents";
const DEV_SIGNING_SECRET: &str = "classboard-dev-signing-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { var: &'static str, value: String },
    OutOfRange { var: &'static str, value: u64 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { var, value } => {
                write!(f, "{var} must be a non-negative integer, got `{value}`")
            }
            Self::OutOfRange { var, value } => write!(f, "{var} value {value} is out of range"),
        }
    }
}

impl Error for ConfigError {}

/// Document blob settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentsConfig {
    pub bucket: String,
    pub public_base_url: String,
    /// Root directory of the local object store.
    pub root: PathBuf,
    pub signing_secret: String,
    pub upload_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
    collections: BTreeMap<EntityKind, String>,
    pub documents: DocumentsConfig,
    pub list_limit_default: u32,
    pub log_level: String,
    /// `None` leaves file logging disabled.
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let collections = EntityKind::ALL
            .into_iter()
            .map(|kind| {
                let name = get(kind.collection_env_var())
                    .unwrap_or_else(|| kind.default_collection().to_string());
                (kind, name)
            })
            .collect();

        let bucket = get(DOCUMENTS_BUCKET_VAR).unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        let public_base_url = get(DOCUMENTS_PUBLIC_BASE_URL_VAR)
            .unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com"));
        let root = get(DOCUMENTS_ROOT_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_BUCKET));
        let signing_secret =
            get(DOCUMENTS_SIGNING_SECRET_VAR).unwrap_or_else(|| DEV_SIGNING_SECRET.to_string());

        let upload_ttl_secs =
            parse_number(UPLOAD_URL_TTL_VAR, get(UPLOAD_URL_TTL_VAR))?.unwrap_or(DEFAULT_UPLOAD_TTL_SECS);
        if upload_ttl_secs == 0 || upload_ttl_secs > MAX_UPLOAD_TTL_SECS {
            return Err(ConfigError::OutOfRange {
                var: UPLOAD_URL_TTL_VAR,
                value: upload_ttl_secs,
            });
        }

        let list_limit = parse_number(LIST_LIMIT_VAR, get(LIST_LIMIT_VAR))?
            .map(|value| u32::try_from(value).unwrap_or(u32::MAX));
        let list_limit_default = normalize_list_limit(list_limit, DEFAULT_LIST_LIMIT);

        Ok(Self {
            db_path: get(DB_PATH_VAR).map(PathBuf::from),
            collections,
            documents: DocumentsConfig {
                bucket,
                public_base_url,
                root,
                signing_secret,
                upload_ttl_secs,
            },
            list_limit_default,
            log_level: get(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: get(LOG_DIR_VAR).map(PathBuf::from),
        })
    }

    /// Collection name for `kind`.
    pub fn collection(&self, kind: EntityKind) -> &str {
        self.collections
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_collection())
    }

    /// Whether the signing secret is the built-in development value.
    pub fn uses_dev_signing_secret(&self) -> bool {
        self.documents.signing_secret == DEV_SIGNING_SECRET
    }
}

fn parse_number(var: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    raw.map(|value| {
        value
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { var, value })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use crate::model::EntityKind;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<CoreConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        CoreConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert!(config.db_path.is_none());
        assert_eq!(config.collection(EntityKind::Board), "boards");
        assert_eq!(config.collection(EntityKind::Student), "students");
        assert_eq!(config.documents.bucket, "classboard-documents");
        assert_eq!(
            config.documents.public_base_url,
            "https://classboard-documents.s3.amazonaws.com"
        );
        assert_eq!(config.documents.upload_ttl_secs, 3600);
        assert_eq!(config.list_limit_default, 50);
        assert!(config.uses_dev_signing_secret());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("BOARDS_TABLE", "prod-boards"),
            ("DOCUMENTS_BUCKET", "school-docs"),
            ("UPLOAD_URL_TTL_SECS", "600"),
            ("LIST_LIMIT_DEFAULT", "5000"),
            ("CLASSBOARD_DB_PATH", "/var/lib/classboard.db"),
        ])
        .unwrap();
        assert_eq!(config.collection(EntityKind::Board), "prod-boards");
        assert_eq!(config.collection(EntityKind::Course), "courses");
        assert_eq!(
            config.documents.public_base_url,
            "https://school-docs.s3.amazonaws.com"
        );
        assert_eq!(config.documents.upload_ttl_secs, 600);
        assert_eq!(config.list_limit_default, 1000);
        assert!(config.db_path.is_some());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("ITEMS_TABLE", "   ")]).unwrap();
        assert_eq!(config.collection(EntityKind::Item), "items");
    }

    #[test]
    fn malformed_numbers_name_the_variable() {
        let err = config_from(&[("UPLOAD_URL_TTL_SECS", "soon")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: "UPLOAD_URL_TTL_SECS",
                value: "soon".to_string()
            }
        );
        assert!(matches!(
            config_from(&[("UPLOAD_URL_TTL_SECS", "0")]),
            Err(ConfigError::OutOfRange { .. })
        ));
    }
}
