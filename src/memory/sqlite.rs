//! SQLite node backend.
//!
//! Each write runs inside a transaction: upsert into `nodes` (preserving
//! `created_at`) and an audit row in `node_log`.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::backend::{NodeBackend, WriteOutcome};
use super::error::StoreResult;
use super::types::{MemoryNode, Strata};

pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Wrap a connection whose schema has already been initialized
    /// (see [`crate::db::open_database`]).
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(crate::db::open_memory_database()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl NodeBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn put(&mut self, node: &MemoryNode) -> StoreResult<WriteOutcome> {
        let keywords = serde_json::to_string(&node.keywords)?;
        let transcendence = serde_json::to_string(&node.transcendence_links)?;
        let immanence = serde_json::to_string(&node.immanence_links)?;
        let now = chrono::Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM nodes WHERE path = ?1",
            params![node.path],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO nodes (path, content, summary, keywords, strata, transcendence_links, immanence_links, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) \
             ON CONFLICT(path) DO UPDATE SET \
               content = excluded.content, summary = excluded.summary, keywords = excluded.keywords, \
               strata = excluded.strata, transcendence_links = excluded.transcendence_links, \
               immanence_links = excluded.immanence_links, updated_at = excluded.updated_at",
            params![
                node.path,
                node.content,
                node.summary,
                keywords,
                node.strata.as_str(),
                transcendence,
                immanence,
                now,
            ],
        )?;

        let outcome = if exists {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Created
        };
        let operation = match outcome {
            WriteOutcome::Created => "create",
            WriteOutcome::Updated => "update",
        };
        write_audit_log(&tx, operation, &node.path, None)?;

        tx.commit()?;
        Ok(outcome)
    }

    fn get(&self, path: &str) -> StoreResult<Option<MemoryNode>> {
        let row = self
            .conn
            .query_row(
                "SELECT path, content, summary, keywords, strata, transcendence_links, immanence_links \
                 FROM nodes WHERE path = ?1",
                params![path],
                raw_node,
            )
            .optional()?;
        row.map(RawNode::into_node).transpose()
    }

    fn delete(&mut self, path: &str) -> StoreResult<bool> {
        let tx = self.conn.transaction()?;
        let rows = tx.execute("DELETE FROM nodes WHERE path = ?1", params![path])?;
        if rows > 0 {
            write_audit_log(&tx, "delete", path, None)?;
        }
        tx.commit()?;
        Ok(rows > 0)
    }

    fn load_all(&self) -> StoreResult<Vec<MemoryNode>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, content, summary, keywords, strata, transcendence_links, immanence_links \
             FROM nodes ORDER BY path",
        )?;
        let raws = stmt
            .query_map([], raw_node)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawNode::into_node).collect()
    }
}

/// Row image before the JSON columns are decoded.
struct RawNode {
    path: String,
    content: String,
    summary: String,
    keywords: String,
    strata: String,
    transcendence: String,
    immanence: String,
}

fn raw_node(row: &Row<'_>) -> rusqlite::Result<RawNode> {
    Ok(RawNode {
        path: row.get(0)?,
        content: row.get(1)?,
        summary: row.get(2)?,
        keywords: row.get(3)?,
        strata: row.get(4)?,
        transcendence: row.get(5)?,
        immanence: row.get(6)?,
    })
}

impl RawNode {
    fn into_node(self) -> StoreResult<MemoryNode> {
        Ok(MemoryNode {
            path: self.path,
            content: self.content,
            summary: self.summary,
            keywords: serde_json::from_str(&self.keywords)?,
            strata: Strata::from(self.strata),
            transcendence_links: serde_json::from_str(&self.transcendence)?,
            immanence_links: serde_json::from_str(&self.immanence)?,
        })
    }
}

/// Write an entry to the node_log audit table.
pub(crate) fn write_audit_log(
    conn: &Connection,
    operation: &str,
    path: &str,
    details: Option<&serde_json::Value>,
) -> rusqlite::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let details_json = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO node_log (operation, path, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, path, details_json, now],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SqliteBackend {
        SqliteBackend::in_memory().unwrap()
    }

    fn node(path: &str, content: &str) -> MemoryNode {
        MemoryNode::new(
            path,
            content,
            "summary",
            vec!["alpha".into(), "beta".into()],
            Strata::Cognitive,
        )
        .with_transcendence_links(vec!["/principles/x".into()])
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut b = backend();
        let n = node("/a/b", "payload");
        assert_eq!(b.put(&n).unwrap(), WriteOutcome::Created);

        let loaded = b.get("/a/b").unwrap().unwrap();
        assert_eq!(loaded, n);
    }

    #[test]
    fn overwrite_reports_update_and_keeps_created_at() {
        let mut b = backend();
        b.put(&node("/a", "one")).unwrap();
        let created: String = b
            .connection()
            .query_row("SELECT created_at FROM nodes WHERE path = '/a'", [], |r| r.get(0))
            .unwrap();

        assert_eq!(b.put(&node("/a", "two")).unwrap(), WriteOutcome::Updated);

        let (content, created_after): (String, String) = b
            .connection()
            .query_row(
                "SELECT content, created_at FROM nodes WHERE path = '/a'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(content, "two");
        assert_eq!(created, created_after);
    }

    #[test]
    fn audit_log_records_each_operation() {
        let mut b = backend();
        b.put(&node("/a", "one")).unwrap();
        b.put(&node("/a", "two")).unwrap();
        assert!(b.delete("/a").unwrap());
        assert!(!b.delete("/a").unwrap());

        let ops: Vec<String> = b
            .connection()
            .prepare("SELECT operation FROM node_log ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(ops, vec!["create", "update", "delete"]);
    }

    #[test]
    fn load_all_returns_sorted_nodes() {
        let mut b = backend();
        b.put(&node("/z", "")).unwrap();
        b.put(&node("/a", "")).unwrap();
        let paths: Vec<String> = b.load_all().unwrap().into_iter().map(|n| n.path).collect();
        assert_eq!(paths, vec!["/a", "/z"]);
    }
}
