//! 文档库工具：按 db / collection 组织的 JSON 文档 CRUD（SQLite 持久化）
//!
//! 过滤、更新与投影在内存中按 [`filter`] 的语义执行；每个集合的文档按插入顺序返回。
//! 输入不完整（缺少 db_name、data 等）时返回 Failure 文本，而不是报错。

pub mod filter;

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::Value;

use crate::tools::{DocumentAction, DocumentParams, Tool, ToolError, ToolOutcome, ToolParams};

pub use filter::Document;

/// SQLite 上的文档存储；一行一个文档，body 为 JSON 文本（含 `_id`）
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ToolError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::Other(format!("create {}: {}", parent.display(), e)))?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, ToolError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, ToolError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                db TEXT NOT NULL,
                coll TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (db, coll, id)
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ToolError> {
        self.conn
            .lock()
            .map_err(|_| ToolError::Other("document store lock poisoned".to_string()))
    }

    fn load(conn: &Connection, db: &str, coll: &str) -> Result<Vec<(String, Document)>, ToolError> {
        let mut stmt =
            conn.prepare("SELECT id, body FROM documents WHERE db = ?1 AND coll = ?2 ORDER BY rowid")?;
        let rows = stmt.query_map(params![db, coll], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut docs = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let doc: Document =
                serde_json::from_str(&body).map_err(|e| ToolError::Decode(e.to_string()))?;
            docs.push((id, doc));
        }
        Ok(docs)
    }

    fn matching(
        conn: &Connection,
        db: &str,
        coll: &str,
        query: &Document,
    ) -> Result<Vec<(String, Document)>, ToolError> {
        let mut out = Vec::new();
        for (id, doc) in Self::load(conn, db, coll)? {
            if filter::matches(&doc, query).map_err(ToolError::Other)? {
                out.push((id, doc));
            }
        }
        Ok(out)
    }

    /// 查询；limit 为 None 时不限条数
    pub fn find(
        &self,
        db: &str,
        coll: &str,
        query: &Document,
        projection: Option<&Document>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, ToolError> {
        let conn = self.lock()?;
        let docs = Self::matching(&conn, db, coll, query)?;
        Ok(docs
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|(_, doc)| match projection {
                Some(p) if !p.is_empty() => filter::project(&doc, p),
                _ => doc,
            })
            .collect())
    }

    /// 插入一条文档，返回 `_id`；未给出 `_id` 时生成一个
    pub fn insert(&self, db: &str, coll: &str, mut data: Document) -> Result<String, ToolError> {
        let id = match data.get("_id") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => uuid::Uuid::new_v4().simple().to_string(),
        };
        data.insert("_id".to_string(), Value::String(id.clone()));
        let body = serde_json::to_string(&data).map_err(|e| ToolError::Decode(e.to_string()))?;
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO documents (db, coll, id, body) VALUES (?1, ?2, ?3, ?4)",
            params![db, coll, id, body],
        )?;
        if inserted == 0 {
            return Err(ToolError::Other(format!("duplicate _id: {}", id)));
        }
        Ok(id)
    }

    /// 更新匹配的文档，返回实际被修改的条数
    pub fn update(
        &self,
        db: &str,
        coll: &str,
        query: &Document,
        update: &Document,
        many: bool,
    ) -> Result<usize, ToolError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let targets = Self::matching(&tx, db, coll, query)?;
        let mut modified = 0;
        for (id, mut doc) in targets.into_iter().take(if many { usize::MAX } else { 1 }) {
            if filter::apply_update(&mut doc, update).map_err(ToolError::Other)? {
                let body =
                    serde_json::to_string(&doc).map_err(|e| ToolError::Decode(e.to_string()))?;
                tx.execute(
                    "UPDATE documents SET body = ?1 WHERE db = ?2 AND coll = ?3 AND id = ?4",
                    params![body, db, coll, id],
                )?;
                modified += 1;
            }
        }
        tx.commit()?;
        Ok(modified)
    }

    /// 删除匹配的文档，返回删除条数
    pub fn delete(&self, db: &str, coll: &str, query: &Document, many: bool) -> Result<usize, ToolError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let targets = Self::matching(&tx, db, coll, query)?;
        let mut deleted = 0;
        for (id, _) in targets.into_iter().take(if many { usize::MAX } else { 1 }) {
            deleted += tx.execute(
                "DELETE FROM documents WHERE db = ?1 AND coll = ?2 AND id = ?3",
                params![db, coll, id],
            )?;
        }
        tx.commit()?;
        Ok(deleted)
    }
}

pub struct DocumentStoreTool {
    store: SqliteDocumentStore,
    max_find_results: usize,
}

impl DocumentStoreTool {
    pub fn new(store: SqliteDocumentStore, max_find_results: usize) -> Self {
        Self {
            store,
            max_find_results,
        }
    }

    fn run(&self, p: DocumentParams) -> Result<ToolOutcome, ToolError> {
        let (Some(db), Some(coll)) = (
            p.db_name.as_deref().filter(|s| !s.is_empty()),
            p.coll_name.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Ok(ToolOutcome::Failure(
                "Please specify both db_name and coll_name.".to_string(),
            ));
        };

        let mut query = p.query.unwrap_or_default();
        if let Some(id) = p.object_id.filter(|s| !s.is_empty()) {
            query.insert("_id".to_string(), Value::String(id));
        }
        let projection = p.projection.as_ref();
        let pretty = |v: &Value| serde_json::to_string_pretty(v).unwrap_or_default();

        let outcome = match p.action {
            DocumentAction::Find => {
                let docs =
                    self.store
                        .find(db, coll, &query, projection, Some(self.max_find_results))?;
                if docs.is_empty() {
                    ToolOutcome::Success("No results.".to_string())
                } else {
                    let list = Value::Array(docs.into_iter().map(Value::Object).collect());
                    ToolOutcome::Success(format!(
                        "Results (up to {}):\n{}",
                        self.max_find_results,
                        pretty(&list)
                    ))
                }
            }
            DocumentAction::FindOne => {
                match self.store.find(db, coll, &query, projection, Some(1))?.pop() {
                    Some(doc) => ToolOutcome::Success(format!(
                        "Result (1 document):\n{}",
                        pretty(&Value::Object(doc))
                    )),
                    None => ToolOutcome::Success("No results.".to_string()),
                }
            }
            DocumentAction::Insert => match p.data.filter(|d| !d.is_empty()) {
                Some(data) => {
                    let id = self.store.insert(db, coll, data)?;
                    ToolOutcome::Success(format!("Inserted: _id={}", id))
                }
                None => ToolOutcome::Failure("Please provide the data to insert.".to_string()),
            },
            DocumentAction::Update => match p.update.filter(|u| !u.is_empty()) {
                Some(update) if !query.is_empty() => {
                    let n = self.store.update(db, coll, &query, &update, p.many)?;
                    ToolOutcome::Success(format!("{} document(s) updated.", n))
                }
                _ => ToolOutcome::Failure(
                    "Please provide both query and update for an update.".to_string(),
                ),
            },
            DocumentAction::Delete => {
                if query.is_empty() {
                    ToolOutcome::Failure("Please provide the query for a delete.".to_string())
                } else {
                    let n = self.store.delete(db, coll, &query, p.many)?;
                    ToolOutcome::Success(format!("{} document(s) deleted.", n))
                }
            }
        };
        Ok(outcome)
    }
}

#[async_trait]
impl Tool for DocumentStoreTool {
    fn name(&self) -> &str {
        "document_store"
    }

    fn description(&self) -> &str {
        "Document database operations on a named db and collection. `action` is one of find, find_one, insert, update, delete. \
`query` filters with MongoDB-style operators ($eq, $ne, $gt, $gte, $lt, $lte, $in, $nin, $exists, $and, $or); \
`data` is the document to insert; `update` uses $set/$unset/$inc/$push; `many` applies update/delete to all matches; \
`object_id` targets one document by _id; `projection` limits returned fields."
    }

    fn parameters_schema(&self) -> Value {
        crate::tools::schema::args_schema::<DocumentParams>()
    }

    async fn execute(&self, params: ToolParams) -> Result<ToolOutcome, ToolError> {
        let ToolParams::DocumentStore(p) = params else {
            return Ok(ToolOutcome::Failure(
                "document_store received parameters for a different tool".to_string(),
            ));
        };
        tracing::info!(action = ?p.action, db = ?p.db_name, coll = ?p.coll_name, "document_store");
        match self.run(p) {
            // 查询语法错误属于输入问题，转为可读说明
            Err(ToolError::Other(msg)) => Ok(ToolOutcome::Failure(format!(
                "Document store operation failed: {}",
                msg
            ))),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn as_document(value: Value) -> Option<Document> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    fn params(v: Value) -> DocumentParams {
        serde_json::from_value(v).unwrap()
    }

    fn tool() -> DocumentStoreTool {
        DocumentStoreTool::new(SqliteDocumentStore::open_in_memory().unwrap(), 10)
    }

    async fn run(tool: &DocumentStoreTool, v: Value) -> ToolOutcome {
        tool.execute(ToolParams::DocumentStore(params(v))).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_collection_is_failure() {
        let t = tool();
        let out = run(&t, json!({"action": "find", "db_name": "mydb"})).await;
        assert_eq!(
            out,
            ToolOutcome::Failure("Please specify both db_name and coll_name.".into())
        );
    }

    #[tokio::test]
    async fn test_insert_find_update_delete() {
        let t = tool();
        let out = run(
            &t,
            json!({"action": "insert", "db_name": "mydb", "coll_name": "users", "data": {"name": "Alice", "age": 30}}),
        )
        .await;
        assert!(out.text().starts_with("Inserted: _id="));
        run(
            &t,
            json!({"action": "insert", "db_name": "mydb", "coll_name": "users", "data": {"name": "Bob", "age": 15}}),
        )
        .await;

        let out = run(
            &t,
            json!({"action": "find", "db_name": "mydb", "coll_name": "users",
                   "query": {"age": {"$lt": 18}}, "projection": {"name": 1, "_id": 0}}),
        )
        .await;
        assert_eq!(
            out.text(),
            "Results (up to 10):\n[\n  {\n    \"name\": \"Bob\"\n  }\n]"
        );

        let out = run(
            &t,
            json!({"action": "update", "db_name": "mydb", "coll_name": "users",
                   "query": {}, "update": {"$inc": {"age": 1}}, "many": true}),
        )
        .await;
        // 空 query 不允许更新
        assert!(!out.is_success());

        let out = run(
            &t,
            json!({"action": "update", "db_name": "mydb", "coll_name": "users",
                   "query": {"age": {"$gte": 0}}, "update": {"$inc": {"age": 1}}, "many": true}),
        )
        .await;
        assert_eq!(out.text(), "2 document(s) updated.");

        let out = run(
            &t,
            json!({"action": "delete", "db_name": "mydb", "coll_name": "users", "query": {"name": "Alice"}}),
        )
        .await;
        assert_eq!(out.text(), "1 document(s) deleted.");

        let out = run(
            &t,
            json!({"action": "find_one", "db_name": "mydb", "coll_name": "users", "query": {"name": "Alice"}}),
        )
        .await;
        assert_eq!(out.text(), "No results.");
    }

    #[tokio::test]
    async fn test_object_id_targets_document() {
        let t = tool();
        let id = t
            .store
            .insert("db", "c", as_document(json!({"k": 1})).unwrap())
            .unwrap();
        t.store
            .insert("db", "c", as_document(json!({"k": 2})).unwrap())
            .unwrap();
        let out = run(
            &t,
            json!({"action": "find_one", "db_name": "db", "coll_name": "c", "object_id": id}),
        )
        .await;
        assert!(out.text().contains("\"k\": 1"));
        let out = run(
            &t,
            json!({"action": "delete", "db_name": "db", "coll_name": "c", "object_id": id}),
        )
        .await;
        assert_eq!(out.text(), "1 document(s) deleted.");
    }

    #[tokio::test]
    async fn test_bad_operator_is_failure_text() {
        let t = tool();
        let out = run(
            &t,
            json!({"action": "find", "db_name": "db", "coll_name": "c", "query": {"a": {"$regex": "x"}}}),
        )
        .await;
        assert_eq!(
            out,
            ToolOutcome::Failure(
                "Document store operation failed: unsupported query operator: $regex".into()
            )
        );
    }

    #[tokio::test]
    async fn test_inc_overflow_keeps_store_usable() {
        let t = tool();
        t.store
            .insert("db", "c", as_document(json!({"_id": "big", "n": i64::MAX})).unwrap())
            .unwrap();
        let out = run(
            &t,
            json!({"action": "update", "db_name": "db", "coll_name": "c",
                   "object_id": "big", "update": {"$inc": {"n": 1}}}),
        )
        .await;
        assert!(!out.is_success());
        assert!(out.text().starts_with("Document store operation failed:"));
        assert!(out.text().contains("overflows"));

        let out = run(
            &t,
            json!({"action": "find_one", "db_name": "db", "coll_name": "c", "object_id": "big"}),
        )
        .await;
        assert!(out.is_success());
        assert!(out.text().contains(&i64::MAX.to_string()));
    }

    #[test]
    fn test_store_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/docs.db");
        {
            let store = SqliteDocumentStore::open(&path).unwrap();
            store
                .insert("db", "c", as_document(json!({"_id": "fixed", "v": 1})).unwrap())
                .unwrap();
            assert!(store
                .insert("db", "c", as_document(json!({"_id": "fixed"})).unwrap())
                .is_err());
        }
        let store = SqliteDocumentStore::open(&path).unwrap();
        let docs = store
            .find("db", "c", &Map::new(), None, None)
            .unwrap();
        assert_eq!(Value::Object(docs[0].clone()), json!({"_id": "fixed", "v": 1}));
    }
}
