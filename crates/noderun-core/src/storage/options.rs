//! Backend-specific option payloads carried by storage requests.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::storage::StorageType;
use crate::CoreError;

fn default_top_k() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

/// Sort direction for database reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

/// Options specific to database reads, including vector similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseReadOptions {
    pub columns: Option<Vec<String>>,
    /// Each condition is a mapping of column to expected value; all must hold.
    pub conditions: Option<Vec<Map<String, Value>>>,
    pub order_by: Option<String>,
    #[serde(default)]
    pub order_direction: OrderDirection,
    pub limit: Option<usize>,
    pub offset: Option<usize>,

    /// Query embedding for similarity search.
    pub query_vector: Option<Vec<f32>>,
    /// Column to search against.
    pub query_col: Option<String>,
    /// Column to return as the answer.
    pub answer_col: Option<String>,
    /// Column containing stored vectors.
    pub vector_col: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_true")]
    pub include_similarity: bool,
}

impl Default for DatabaseReadOptions {
    fn default() -> Self {
        Self {
            columns: None,
            conditions: None,
            order_by: None,
            order_direction: OrderDirection::Asc,
            limit: None,
            offset: None,
            query_vector: None,
            query_col: None,
            answer_col: None,
            vector_col: None,
            top_k: default_top_k(),
            include_similarity: true,
        }
    }
}

impl DatabaseReadOptions {
    /// True when the options request a vector similarity search.
    pub fn is_vector_search(&self) -> bool {
        self.query_vector.is_some()
    }

    /// Builder method to select columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method to add an equality condition group.
    pub fn with_condition(mut self, condition: Map<String, Value>) -> Self {
        self.conditions.get_or_insert_with(Vec::new).push(condition);
        self
    }

    /// Builder method to order results.
    pub fn with_order(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = Some(column.into());
        self.order_direction = direction;
        self
    }

    /// Builder method to paginate results.
    pub fn with_page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Builder method to turn the read into a vector similarity search.
    pub fn with_vector_search(
        mut self,
        query_vector: Vec<f32>,
        vector_col: impl Into<String>,
        top_k: u32,
    ) -> Self {
        self.query_vector = Some(query_vector);
        self.vector_col = Some(vector_col.into());
        self.top_k = top_k;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.top_k < 1 {
            return Err(CoreError::validation("top_k must be at least 1"));
        }
        if self.is_vector_search() && self.vector_col.is_none() {
            return Err(CoreError::validation("vector search requires vector_col"));
        }
        Ok(())
    }
}

/// What to do with the IPNS name record on write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpnsOperation {
    Create,
    Update,
    #[default]
    #[serde(rename = "none")]
    Skip,
}

/// Options specific to the content-addressed backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpfsOptions {
    #[serde(default)]
    pub ipns_operation: IpnsOperation,
    /// Name record to update when `ipns_operation` is `update`.
    pub ipns_name: Option<String>,
    /// Unpin `previous_hash` after writing.
    #[serde(default)]
    pub unpin_previous: bool,
    pub previous_hash: Option<String>,
    /// Treat the read path as a name record and resolve it first.
    #[serde(default)]
    pub resolve_ipns: bool,
}

impl IpfsOptions {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.ipns_operation == IpnsOperation::Update && self.ipns_name.is_none() {
            return Err(CoreError::validation("ipns_operation 'update' requires ipns_name"));
        }
        if self.unpin_previous && self.previous_hash.is_none() {
            return Err(CoreError::validation("unpin_previous requires previous_hash"));
        }
        Ok(())
    }
}

/// Options attached to a storage request.
///
/// Serialises to a plain mapping regardless of variant. Deserialising always
/// yields [`StorageOptions::Generic`]; backends interpret the mapping through
/// [`StorageOptions::database_read`] or [`StorageOptions::ipfs`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StorageOptions {
    Generic(Map<String, Value>),
    DatabaseRead(DatabaseReadOptions),
    Ipfs(IpfsOptions),
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self::Generic(Map::new())
    }
}

impl<'de> Deserialize<'de> for StorageOptions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Map<String, Value>>::deserialize(deserializer)
            .map(|map| Self::Generic(map.unwrap_or_default()))
    }
}

impl From<Map<String, Value>> for StorageOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self::Generic(map)
    }
}

impl From<DatabaseReadOptions> for StorageOptions {
    fn from(options: DatabaseReadOptions) -> Self {
        Self::DatabaseRead(options)
    }
}

impl From<IpfsOptions> for StorageOptions {
    fn from(options: IpfsOptions) -> Self {
        Self::Ipfs(options)
    }
}

impl StorageOptions {
    /// Short name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Generic(_) => "generic",
            Self::DatabaseRead(_) => "database_read",
            Self::Ipfs(_) => "ipfs",
        }
    }

    /// Backend a structured variant is tied to; `None` for generic options.
    pub fn required_backend(&self) -> Option<StorageType> {
        match self {
            Self::Generic(_) => None,
            Self::DatabaseRead(_) => Some(StorageType::Database),
            Self::Ipfs(_) => Some(StorageType::Ipfs),
        }
    }

    /// Fail with [`CoreError::UnsupportedBackend`] if a structured variant
    /// targets a different backend than `backend`.
    pub fn check_backend(&self, backend: StorageType) -> Result<(), CoreError> {
        match self.required_backend() {
            Some(required) if required != backend => Err(CoreError::UnsupportedBackend {
                options: self.kind_name().to_string(),
                backend: backend.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::Generic(_) => Ok(()),
            Self::DatabaseRead(options) => options.validate(),
            Self::Ipfs(options) => options.validate(),
        }
    }

    /// Flatten to a plain mapping.
    pub fn to_map(&self) -> Result<Map<String, Value>, CoreError> {
        match self {
            Self::Generic(map) => Ok(map.clone()),
            other => match serde_json::to_value(other)? {
                Value::Object(map) => Ok(map),
                _ => Err(CoreError::Serialization(
                    "options did not serialise to a mapping".to_string(),
                )),
            },
        }
    }

    /// Interpret the options as database read options.
    pub fn database_read(&self) -> Result<DatabaseReadOptions, CoreError> {
        let options = match self {
            Self::DatabaseRead(options) => options.clone(),
            Self::Generic(map) => serde_json::from_value(Value::Object(map.clone()))?,
            Self::Ipfs(_) => {
                return Err(CoreError::UnsupportedBackend {
                    options: self.kind_name().to_string(),
                    backend: StorageType::Database.to_string(),
                })
            }
        };
        options.validate()?;
        Ok(options)
    }

    /// Interpret the options as content-addressed store options.
    pub fn ipfs(&self) -> Result<IpfsOptions, CoreError> {
        let options = match self {
            Self::Ipfs(options) => options.clone(),
            Self::Generic(map) => serde_json::from_value(Value::Object(map.clone()))?,
            Self::DatabaseRead(_) => {
                return Err(CoreError::UnsupportedBackend {
                    options: self.kind_name().to_string(),
                    backend: StorageType::Ipfs.to_string(),
                })
            }
        };
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_database_defaults() {
        let options = DatabaseReadOptions::default();
        assert_eq!(options.top_k, 5);
        assert!(options.include_similarity);
        assert_eq!(options.order_direction, OrderDirection::Asc);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let options = DatabaseReadOptions {
            top_k: 0,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_structured_options_flatten_to_map() {
        let options = StorageOptions::from(
            DatabaseReadOptions::default()
                .with_columns(["name"])
                .with_order("name", OrderDirection::Desc),
        );
        let map = options.to_map().unwrap();
        assert_eq!(map["columns"], json!(["name"]));
        assert_eq!(map["order_direction"], json!("desc"));
        assert_eq!(map["top_k"], json!(5));
    }

    #[test]
    fn test_deserialize_yields_generic_and_reinterprets() {
        let options: StorageOptions =
            serde_json::from_value(json!({"limit": 2, "order_by": "age"})).unwrap();
        assert_eq!(options.kind_name(), "generic");
        let db = options.database_read().unwrap();
        assert_eq!(db.limit, Some(2));
        assert_eq!(db.order_by.as_deref(), Some("age"));
    }

    #[test]
    fn test_check_backend_mismatch() {
        let options = StorageOptions::from(DatabaseReadOptions::default());
        assert!(options.check_backend(StorageType::Database).is_ok());
        assert!(matches!(
            options.check_backend(StorageType::Filesystem),
            Err(CoreError::UnsupportedBackend { .. })
        ));
        assert!(StorageOptions::default()
            .check_backend(StorageType::Filesystem)
            .is_ok());
    }

    #[test]
    fn test_ipns_update_requires_name() {
        let options = IpfsOptions {
            ipns_operation: IpnsOperation::Update,
            ..Default::default()
        };
        assert!(options.validate().is_err());
        assert_eq!(
            serde_json::to_value(IpnsOperation::Skip).unwrap(),
            json!("none")
        );
    }
}
