//! Movie corpus loading.
//!
//! Reads a JSON array of movie entries and normalizes them into [`MovieRecord`]s.
//! Entries need a `title` and a `plot` (the Wikipedia-derived dataset calls the
//! plot `extract`; both keys are accepted).

use crate::error::{PlotlineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info, instrument};

/// A movie loaded from the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Position in the loaded corpus.
    pub id: u32,
    pub title: String,
    pub year: Option<i32>,
    /// Distinct genres in first-seen order.
    pub genres: Vec<String>,
    pub plot: String,
}

impl MovieRecord {
    /// Year for display, or "Unknown".
    pub fn display_year(&self) -> String {
        self.year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Load at most `max_documents` movie records from a JSON file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load(path: &Path, max_documents: usize) -> Result<Vec<MovieRecord>> {
    let content = std::fs::read_to_string(path)?;
    let records = parse(&content, max_documents)?;
    info!("Loaded {} movies from {}", records.len(), path.display());
    Ok(records)
}

/// Parse movie records from JSON text.
pub fn parse(content: &str, max_documents: usize) -> Result<Vec<MovieRecord>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| PlotlineError::DataFormat(format!("corpus is not valid JSON: {}", e)))?;

    let entries = value
        .as_array()
        .ok_or_else(|| PlotlineError::DataFormat("corpus must be a JSON array".to_string()))?;

    let mut records = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        if records.len() >= max_documents {
            debug!("Reached max_documents ({}), ignoring remaining entries", max_documents);
            break;
        }

        let object = entry.as_object().ok_or_else(|| {
            PlotlineError::DataFormat(format!("entry {} is not an object", index))
        })?;

        let title = required_str(object, index, &["title"])?;
        let plot = required_str(object, index, &["plot", "extract"])?;

        if plot.trim().is_empty() {
            debug!("Skipping '{}' (entry {}): empty plot", title, index);
            continue;
        }

        records.push(MovieRecord {
            id: records.len() as u32,
            title: title.trim().to_string(),
            year: object.get("year").and_then(parse_year),
            genres: parse_genres(object.get("genres")),
            plot: plot.trim().to_string(),
        });
    }

    Ok(records)
}

fn required_str<'a>(
    object: &'a serde_json::Map<String, Value>,
    index: usize,
    keys: &[&str],
) -> Result<&'a str> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .ok_or_else(|| {
            PlotlineError::DataFormat(format!("entry {} is missing '{}'", index, keys[0]))
        })?
        .as_str()
        .ok_or_else(|| {
            PlotlineError::DataFormat(format!("entry {}: '{}' must be a string", index, keys[0]))
        })
}

fn parse_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_genres(value: Option<&Value>) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    let Some(Value::Array(items)) = value else {
        return genres;
    };

    for genre in items.iter().filter_map(Value::as_str) {
        let genre = genre.trim();
        if !genre.is_empty() && !genres.iter().any(|g| g == genre) {
            genres.push(genre.to_string());
        }
    }
    genres
}

/// Stable fingerprint of a loaded corpus plus anything else that shapes the index
/// (e.g. serialized chunking settings). Hex-encoded SHA-256.
pub fn fingerprint(records: &[MovieRecord], salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    for record in records {
        hasher.update(record.id.to_le_bytes());
        hasher.update(record.title.as_bytes());
        hasher.update([0u8]);
        hasher.update(record.display_year().as_bytes());
        hasher.update([0u8]);
        for genre in &record.genres {
            hasher.update(genre.as_bytes());
            hasher.update([1u8]);
        }
        hasher.update(record.plot.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"title": "The Matrix", "year": 1999, "genres": ["Science Fiction", "Action", "Action"], "extract": "A hacker discovers reality is a simulation."},
        {"title": "Inception", "year": "2010", "plot": "A thief enters dreams to plant an idea."},
        {"title": "Untitled", "extract": "   "},
        {"title": "Heat", "year": "Unknown", "genres": [], "plot": "A detective hunts a crew of thieves."}
    ]"#;

    #[test]
    fn test_parse_normalizes_records() {
        let records = parse(SAMPLE, 400).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].title, "The Matrix");
        assert_eq!(records[0].year, Some(1999));
        assert_eq!(records[0].genres, vec!["Science Fiction", "Action"]);

        assert_eq!(records[1].year, Some(2010));
        assert!(records[1].genres.is_empty());

        // The empty-plot entry is skipped, ids stay dense.
        assert_eq!(records[2].title, "Heat");
        assert_eq!(records[2].id, 2);
        assert_eq!(records[2].year, None);
        assert_eq!(records[2].display_year(), "Unknown");
    }

    #[test]
    fn test_parse_caps_in_file_order() {
        let records = parse(SAMPLE, 2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "The Matrix");
        assert_eq!(records[1].title, "Inception");
    }

    #[test]
    fn test_missing_required_fields() {
        let err = parse(r#"[{"title": "No plot"}]"#, 10).unwrap_err();
        assert!(matches!(err, PlotlineError::DataFormat(msg) if msg.contains("plot")));

        let err = parse(r#"[{"plot": "No title"}]"#, 10).unwrap_err();
        assert!(matches!(err, PlotlineError::DataFormat(msg) if msg.contains("title")));

        let err = parse(r#"[{"title": 7, "plot": "x"}]"#, 10).unwrap_err();
        assert!(matches!(err, PlotlineError::DataFormat(_)));

        let err = parse(r#"{"title": "x"}"#, 10).unwrap_err();
        assert!(matches!(err, PlotlineError::DataFormat(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let records = load(&path, 400).unwrap();
        assert_eq!(records.len(), 3);

        let missing = load(&dir.path().join("absent.json"), 400).unwrap_err();
        assert!(matches!(missing, PlotlineError::Io(_)));
    }

    #[test]
    fn test_fingerprint_tracks_content_and_salt() {
        let records = parse(SAMPLE, 400).unwrap();
        let a = fingerprint(&records, "window");
        assert_eq!(a, fingerprint(&records, "window"));
        assert_ne!(a, fingerprint(&records, "sentence"));
        assert_ne!(a, fingerprint(&records[..2], "window"));
        assert_eq!(a.len(), 64);
    }
}
