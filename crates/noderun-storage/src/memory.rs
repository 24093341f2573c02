//! In-memory database backend.
//!
//! Paths name tables; each table is an ordered list of JSON rows. Reads
//! honour [`DatabaseReadOptions`]: conditions, column projection, ordering,
//! pagination and cosine-similarity vector search.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use noderun_core::CoreError;
use noderun_core::storage::{
    CreateRequest, DatabaseReadOptions, DeleteRequest, ListRequest, OrderDirection, ReadRequest,
    SearchRequest, StorageLocation, StorageObject, StoragePayload, StorageType, UpdateRequest,
};
use serde_json::{Map, Number, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{bytes_to_map, create_bytes, StorageBackend};
use crate::error::{StorageError, StorageResult};

type Row = Map<String, Value>;

/// Database backend keeping tables in memory.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in `table`, or `None` if it does not exist.
    pub async fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.read().await.get(table).map(Vec::len)
    }
}

fn row_object(table: &str, row: Row) -> StorageObject {
    StorageObject::new(
        StorageLocation::new(StorageType::Database, table),
        Some(Value::Object(row)),
    )
}

fn matches_condition(row: &Row, condition: &Map<String, Value>) -> bool {
    condition
        .iter()
        .all(|(column, expected)| row.get(column) == Some(expected))
}

fn matches_all(row: &Row, conditions: &[Map<String, Value>]) -> bool {
    conditions.iter().all(|c| matches_condition(row, c))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn project(row: &Row, columns: Option<&[String]>) -> Row {
    match columns {
        Some(columns) => columns
            .iter()
            .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
            .collect(),
        None => row.clone(),
    }
}

fn as_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// Cosine similarity of two equal-length vectors; `None` on a length
/// mismatch or a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}

fn vector_search(
    rows: &[Row],
    options: &DatabaseReadOptions,
    query: &[f32],
) -> StorageResult<Vec<Row>> {
    let vector_col = options
        .vector_col
        .as_deref()
        .ok_or_else(|| CoreError::validation("vector search requires vector_col"))?;
    let conditions = options.conditions.as_deref().unwrap_or_default();

    let mut scored: Vec<(f32, &Row)> = rows
        .iter()
        .filter(|row| matches_all(row, conditions))
        .filter_map(|row| {
            let stored = as_vector(row.get(vector_col)?)?;
            Some((cosine_similarity(query, &stored)?, row))
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    Ok(scored
        .into_iter()
        .take(options.top_k as usize)
        .map(|(score, row)| {
            let mut out = match (&options.columns, &options.answer_col) {
                (Some(columns), _) => project(row, Some(columns.as_slice())),
                (None, Some(answer)) => project(row, Some(std::slice::from_ref(answer))),
                (None, None) => {
                    let mut all = row.clone();
                    all.remove(vector_col);
                    all
                }
            };
            if options.include_similarity {
                if let Some(n) = Number::from_f64(f64::from(score)) {
                    out.insert("similarity".to_string(), Value::Number(n));
                }
            }
            out
        })
        .collect())
}

fn select(rows: &[Row], options: &DatabaseReadOptions) -> StorageResult<Vec<Row>> {
    if let Some(query) = options.query_vector.as_deref() {
        return vector_search(rows, options, query);
    }

    let conditions = options.conditions.as_deref().unwrap_or_default();
    let mut selected: Vec<&Row> = rows.iter().filter(|r| matches_all(r, conditions)).collect();

    if let Some(column) = options.order_by.as_deref() {
        selected.sort_by(|a, b| {
            let ord = compare_values(a.get(column), b.get(column));
            match options.order_direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            }
        });
    }

    Ok(selected
        .into_iter()
        .skip(options.offset.unwrap_or(0))
        .take(options.limit.unwrap_or(usize::MAX))
        .map(|row| project(row, options.columns.as_deref()))
        .collect())
}

fn text_matches(row: &Row, needle: &str) -> bool {
    row.values().any(|value| match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        _ => false,
    })
}

#[async_trait]
impl StorageBackend for MemoryDatabase {
    fn storage_type(&self) -> StorageType {
        StorageType::Database
    }

    async fn create(&self, request: &CreateRequest) -> StorageResult<StorageObject> {
        let row = match &request.data {
            Some(StoragePayload::Json(map)) => map.clone(),
            _ => bytes_to_map(&create_bytes(request)?)?,
        };
        let table = request.target.path.clone();
        let mut tables = self.tables.write().await;
        tables.entry(table.clone()).or_default().push(row.clone());
        debug!(table = %table, "Inserted row");
        Ok(row_object(&table, row))
    }

    async fn read(&self, request: &ReadRequest) -> StorageResult<Vec<StorageObject>> {
        let options = request.target.options.database_read()?;
        let table = &request.target.path;
        let tables = self.tables.read().await;
        let rows = tables
            .get(table)
            .ok_or_else(|| StorageError::not_found(format!("table '{table}'")))?;
        Ok(select(rows, &options)?
            .into_iter()
            .map(|row| row_object(table, row))
            .collect())
    }

    async fn update(&self, request: &UpdateRequest) -> StorageResult<Vec<StorageObject>> {
        let changes = match &request.data {
            Some(StoragePayload::Json(map)) => map.clone(),
            Some(StoragePayload::Bytes(bytes)) => bytes_to_map(bytes)?,
            None => return Err(StorageError::backend("update request carries no data")),
        };
        let options = request.target.options.database_read()?;
        let conditions = options.conditions.unwrap_or_default();
        let table = &request.target.path;

        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::not_found(format!("table '{table}'")))?;
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| matches_all(r, &conditions)) {
            for (column, value) in &changes {
                row.insert(column.clone(), value.clone());
            }
            updated.push(row_object(table, row.clone()));
        }
        debug!(table = %table, rows = updated.len(), "Updated rows");
        Ok(updated)
    }

    async fn delete(&self, request: &DeleteRequest) -> StorageResult<usize> {
        let table = &request.target.path;
        let mut tables = self.tables.write().await;
        let removed = match &request.condition {
            Some(condition) => {
                let rows = tables
                    .get_mut(table)
                    .ok_or_else(|| StorageError::not_found(format!("table '{table}'")))?;
                let before = rows.len();
                rows.retain(|row| !matches_condition(row, condition));
                before - rows.len()
            }
            None => tables
                .remove(table)
                .map(|rows| rows.len())
                .ok_or_else(|| StorageError::not_found(format!("table '{table}'")))?,
        };
        debug!(table = %table, removed, "Deleted rows");
        Ok(removed)
    }

    async fn list(&self, request: &ListRequest) -> StorageResult<Vec<StorageObject>> {
        let options = request.target.options.database_read()?;
        let table = &request.target.path;
        let tables = self.tables.read().await;
        let rows = tables
            .get(table)
            .ok_or_else(|| StorageError::not_found(format!("table '{table}'")))?;
        Ok(rows
            .iter()
            .skip(options.offset.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|row| row_object(table, row.clone()))
            .collect())
    }

    async fn search(&self, request: &SearchRequest) -> StorageResult<Vec<StorageObject>> {
        let table = &request.target.path;
        let limit = request.limit.unwrap_or(usize::MAX);
        let tables = self.tables.read().await;
        let rows = tables
            .get(table)
            .ok_or_else(|| StorageError::not_found(format!("table '{table}'")))?;

        let found: Vec<Row> = match request.query_type.as_str() {
            "vector" => {
                let query = as_vector(&request.query).ok_or_else(|| {
                    StorageError::backend("vector query must be an array of numbers")
                })?;
                let mut options = request.target.options.database_read()?;
                options.top_k = options.top_k.min(u32::try_from(limit).unwrap_or(u32::MAX));
                vector_search(rows, &options, &query)?
            }
            "text" => {
                let needle = match &request.query {
                    Value::String(s) => s.to_lowercase(),
                    other => other.to_string().to_lowercase(),
                };
                rows.iter()
                    .filter(|row| text_matches(row, &needle))
                    .take(limit)
                    .cloned()
                    .collect()
            }
            other => {
                return Err(StorageError::backend(format!(
                    "unsupported query type '{other}'"
                )))
            }
        };
        Ok(found.into_iter().map(|row| row_object(table, row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noderun_core::storage::StorageRequest;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryDatabase {
        let db = MemoryDatabase::new();
        for row in [
            json!({"id": 1, "title": "Rust", "score": 3, "embedding": [1.0, 0.0]}),
            json!({"id": 2, "title": "Python", "score": 9, "embedding": [0.0, 1.0]}),
            json!({"id": 3, "title": "Rustacean", "score": 5, "embedding": [0.9, 0.1]}),
        ] {
            let request = StorageRequest::create(StorageType::Database, "docs", map(row)).unwrap();
            let StorageRequest::Create(create) = request else { unreachable!() };
            db.create(&create).await.unwrap();
        }
        db
    }

    fn read(options: DatabaseReadOptions) -> ReadRequest {
        match StorageRequest::read(StorageType::Database, "docs").with_options(options) {
            StorageRequest::Read(read) => read,
            _ => unreachable!(),
        }
    }

    fn ids(objects: &[StorageObject]) -> Vec<i64> {
        objects
            .iter()
            .filter_map(|o| o.data.as_ref()?.get("id")?.as_i64())
            .collect()
    }

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), Some(1.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
    }

    #[tokio::test]
    async fn test_read_with_conditions() {
        let db = seeded().await;
        let options =
            DatabaseReadOptions::default().with_condition(map(json!({"title": "Python"})));
        let rows = db.read(&read(options)).await.unwrap();
        assert_eq!(ids(&rows), vec![2]);
    }

    #[tokio::test]
    async fn test_read_orders_and_paginates() {
        let db = seeded().await;
        let options = DatabaseReadOptions::default()
            .with_order("score", OrderDirection::Desc)
            .with_page(2, 1);
        let rows = db.read(&read(options)).await.unwrap();
        assert_eq!(ids(&rows), vec![3, 1]);
    }

    #[tokio::test]
    async fn test_read_projects_columns() {
        let db = seeded().await;
        let options = DatabaseReadOptions::default().with_columns(["title"]);
        let rows = db.read(&read(options)).await.unwrap();
        assert_eq!(rows[0].data, Some(json!({"title": "Rust"})));
    }

    #[tokio::test]
    async fn test_vector_search_ranks_by_similarity() {
        let db = seeded().await;
        let mut options = DatabaseReadOptions::default();
        options.query_vector = Some(vec![1.0, 0.0]);
        options.vector_col = Some("embedding".to_string());
        options.answer_col = Some("title".to_string());
        options.top_k = 2;
        let rows = db.read(&read(options)).await.unwrap();

        assert_eq!(rows.len(), 2);
        let first = rows[0].data.as_ref().unwrap();
        assert_eq!(first["title"], json!("Rust"));
        assert_eq!(first["similarity"], json!(1.0));
        assert_eq!(rows[1].data.as_ref().unwrap()["title"], json!("Rustacean"));
        assert!(first.get("embedding").is_none());
    }

    #[tokio::test]
    async fn test_missing_table_not_found() {
        let db = MemoryDatabase::new();
        let err = db.read(&read(DatabaseReadOptions::default())).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_matching_rows() {
        let db = seeded().await;
        let changes = map(json!({"score": 0}));
        let request = StorageRequest::update(StorageType::Database, "docs", changes)
            .unwrap()
            .with_options(DatabaseReadOptions::default().with_condition(map(json!({"id": 1}))));
        let StorageRequest::Update(update) = request else { unreachable!() };
        let updated = db.update(&update).await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].data.as_ref().unwrap()["score"], json!(0));
    }

    #[tokio::test]
    async fn test_delete_with_and_without_condition() {
        let db = seeded().await;
        let request =
            StorageRequest::delete(StorageType::Database, "docs", Some(map(json!({"id": 2}))));
        let StorageRequest::Delete(delete) = request else { unreachable!() };
        assert_eq!(db.delete(&delete).await.unwrap(), 1);
        assert_eq!(db.row_count("docs").await, Some(2));

        let request = StorageRequest::delete(StorageType::Database, "docs", None);
        let StorageRequest::Delete(drop) = request else { unreachable!() };
        assert_eq!(db.delete(&drop).await.unwrap(), 2);
        assert_eq!(db.row_count("docs").await, None);
    }

    #[tokio::test]
    async fn test_text_search() {
        let db = seeded().await;
        let StorageRequest::Search(search) =
            StorageRequest::search(StorageType::Database, "docs", "rust").unwrap()
        else {
            unreachable!()
        };
        let rows = db.search(&search).await.unwrap();
        assert_eq!(ids(&rows), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_vector_search_requires_vector_col() {
        let db = seeded().await;
        let request = StorageRequest::search(StorageType::Database, "docs", json!([1.0, 0.0]))
            .unwrap()
            .with_query_type("vector");
        let StorageRequest::Search(search) = request.clone() else { unreachable!() };
        let err = db.search(&search).await.unwrap_err();
        assert!(matches!(err, StorageError::Core(CoreError::Validation(_))));

        let mut options = DatabaseReadOptions::default();
        options.vector_col = Some("embedding".to_string());
        let StorageRequest::Search(search) = request.with_options(options) else {
            unreachable!()
        };
        let rows = db.search(&search).await.unwrap();
        assert_eq!(ids(&rows), vec![1, 3, 2]);
    }
}
