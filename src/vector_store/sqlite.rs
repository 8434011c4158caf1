//! SQLite-based vector store implementation.
//!
//! Persists the manifest, the movies and the chunk vectors in a single
//! database file. Vectors are stored as little-endian `f32` blobs; search
//! happens in memory on the loaded [`IndexState`].

use super::{DistanceMetric, IndexEntry, IndexExpectation, IndexManifest, IndexState, VectorStore};
use crate::chunking::Chunk;
use crate::corpus::MovieRecord;
use crate::error::{PlotlineError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Bumped whenever the table layout changes; older files are rebuilt.
const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS manifest (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        schema_version INTEGER NOT NULL,
        dimensions INTEGER NOT NULL,
        chunk_count INTEGER NOT NULL,
        embedding_model TEXT NOT NULL,
        metric TEXT NOT NULL,
        corpus_fingerprint TEXT NOT NULL,
        built_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        year INTEGER,
        genres_json TEXT NOT NULL,
        plot TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        position INTEGER PRIMARY KEY,
        chunk_id TEXT NOT NULL UNIQUE,
        record_id INTEGER NOT NULL,
        text TEXT NOT NULL,
        word_start INTEGER NOT NULL,
        word_end INTEGER NOT NULL,
        embedding BLOB NOT NULL
    );
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    location: String,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = match Self::open(path) {
            Ok(conn) => conn,
            Err(e) if is_not_a_database(&e) => {
                warn!("{:?} is not a SQLite database, recreating it", path);
                std::fs::remove_file(path)?;
                for suffix in ["-wal", "-shm"] {
                    let side = PathBuf::from(format!("{}{}", path.display(), suffix));
                    if side.exists() {
                        std::fs::remove_file(side)?;
                    }
                }
                Self::open(path)?
            }
            Err(e) => return Err(e.into()),
        };

        info!("Opened SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            location: PathBuf::from(path).display().to_string(),
        })
    }

    fn open(path: &Path) -> rusqlite::Result<Connection> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            location: ":memory:".to_string(),
        })
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn read_manifest(conn: &Connection) -> Result<Option<(i64, IndexManifest)>> {
        let row = conn.query_row(
            r#"
            SELECT schema_version, dimensions, chunk_count, embedding_model,
                   metric, corpus_fingerprint, built_at
            FROM manifest WHERE id = 1
            "#,
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        );

        let (version, dimensions, chunk_count, embedding_model, metric, fingerprint, built_at) =
            match row {
                Ok(values) => values,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

        let metric: DistanceMetric = metric.parse().map_err(PlotlineError::IncompatibleIndex)?;
        let built_at = DateTime::parse_from_rfc3339(&built_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| PlotlineError::IncompatibleIndex(format!("bad build timestamp: {}", e)))?;

        Ok(Some((
            version,
            IndexManifest {
                dimensions: dimensions as usize,
                chunk_count: chunk_count as usize,
                embedding_model,
                metric,
                corpus_fingerprint: fingerprint,
                built_at,
            },
        )))
    }

    fn read_records(conn: &Connection) -> Result<Vec<MovieRecord>> {
        let mut stmt = conn.prepare("SELECT id, title, year, genres_json, plot FROM records ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i32>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, title, year, genres_json, plot) = row?;
            let genres: Vec<String> = serde_json::from_str(&genres_json)
                .map_err(|e| PlotlineError::IncompatibleIndex(format!("bad genres for movie {}: {}", id, e)))?;
            records.push(MovieRecord {
                id,
                title,
                year,
                genres,
                plot,
            });
        }
        Ok(records)
    }

    fn read_entries(conn: &Connection) -> Result<Vec<IndexEntry>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT chunk_id, record_id, text, word_start, word_end, embedding
            FROM chunks ORDER BY position
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(5)?;
            Ok(IndexEntry {
                chunk: Chunk {
                    chunk_id: row.get(0)?,
                    parent_record_id: row.get(1)?,
                    text: row.get(2)?,
                    word_range: (row.get::<_, i64>(3)? as usize, row.get::<_, i64>(4)? as usize),
                },
                vector: Self::bytes_to_embedding(&embedding_bytes),
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, state), fields(chunks = state.len()))]
    fn save(&self, state: &IndexState) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| {
            PlotlineError::VectorStore(format!("Failed to acquire lock: {}", e))
        })?;

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS chunks; DROP TABLE IF EXISTS records; DROP TABLE IF EXISTS manifest;",
        )?;
        tx.execute_batch(SCHEMA)?;

        let manifest = state.manifest();
        tx.execute(
            r#"
            INSERT INTO manifest
            (id, schema_version, dimensions, chunk_count, embedding_model, metric,
             corpus_fingerprint, built_at)
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                SCHEMA_VERSION,
                manifest.dimensions as i64,
                manifest.chunk_count as i64,
                manifest.embedding_model,
                manifest.metric.to_string(),
                manifest.corpus_fingerprint,
                manifest.built_at.to_rfc3339(),
            ],
        )?;

        {
            let mut insert_record = tx.prepare(
                "INSERT INTO records (id, title, year, genres_json, plot) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in state.records() {
                insert_record.execute(params![
                    record.id,
                    record.title,
                    record.year,
                    serde_json::to_string(&record.genres)?,
                    record.plot,
                ])?;
            }

            let mut insert_chunk = tx.prepare(
                r#"
                INSERT INTO chunks
                (position, chunk_id, record_id, text, word_start, word_end, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for (position, entry) in state.entries().iter().enumerate() {
                insert_chunk.execute(params![
                    position as i64,
                    entry.chunk.chunk_id,
                    entry.chunk.parent_record_id,
                    entry.chunk.text,
                    entry.chunk.word_range.0 as i64,
                    entry.chunk.word_range.1 as i64,
                    Self::embedding_to_bytes(&entry.vector),
                ])?;
            }
        }

        tx.commit()?;
        info!("Saved index with {} chunks to {}", state.len(), self.location);
        Ok(())
    }

    #[instrument(skip(self, expected))]
    fn load(&self, expected: &IndexExpectation) -> Result<IndexState> {
        let conn = self.conn.lock().map_err(|e| {
            PlotlineError::VectorStore(format!("Failed to acquire lock: {}", e))
        })?;

        let (version, manifest) = Self::read_manifest(&conn)
            .map_err(unreadable)?
            .ok_or_else(|| PlotlineError::IndexNotFound(self.location.clone()))?;

        if version != SCHEMA_VERSION {
            return Err(PlotlineError::IncompatibleIndex(format!(
                "index schema version {} is not supported (expected {})",
                version, SCHEMA_VERSION
            )));
        }
        manifest.check(expected)?;

        let records = Self::read_records(&conn).map_err(unreadable)?;
        let entries = Self::read_entries(&conn).map_err(unreadable)?;
        debug!("Read {} chunks and {} movies", entries.len(), records.len());

        IndexState::from_parts(manifest, entries, records)
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

fn is_not_a_database(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::NotADatabase
    )
}

/// A file this version cannot read is stale, not fatal.
fn unreadable(err: PlotlineError) -> PlotlineError {
    match err {
        PlotlineError::Database(e) => {
            PlotlineError::IncompatibleIndex(format!("unreadable index: {}", e))
        }
        other => other,
    }
}
