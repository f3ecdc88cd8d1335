use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::creature::CreatureRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub id: String,
    /// Creation instant, epoch milliseconds.
    pub timestamp: i64,
    pub record: CreatureRecord,
    pub image_url: String,
}

impl ArchiveEntry {
    pub fn new(record: CreatureRecord, image_url: impl Into<String>, timestamp: i64) -> Self {
        let id = record
            .entity_id()
            .map(str::to_string)
            .unwrap_or_else(|| fallback_entry_id(timestamp));
        Self {
            id,
            timestamp,
            record,
            image_url: image_url.into(),
        }
    }
}

/// Identifier used when the record carries no entity id.
pub fn fallback_entry_id(timestamp: i64) -> String {
    timestamp.to_string()
}

/// Local archive of generated creatures, one JSON object keyed by entry id.
///
/// Every operation re-reads the file, so two handles on the same path see
/// each other's writes and a write only touches its own key. A save whose id
/// already exists replaces the stored entry (upsert, latest write wins).
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    path: PathBuf,
}

impl ArchiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, record: &CreatureRecord, image_url: &str) -> anyhow::Result<ArchiveEntry> {
        let entry = ArchiveEntry::new(record.clone(), image_url, now_millis());
        self.put(&entry)?;
        Ok(entry)
    }

    /// Refuses to write over a file it cannot parse, so a torn archive is
    /// never replaced by a single entry.
    pub fn put(&self, entry: &ArchiveEntry) -> anyhow::Result<()> {
        let mut on_disk = load_for_write(&self.path)?;
        on_disk.insert(
            entry.id.clone(),
            serde_json::to_value(entry).context("archive entry serialization failed")?,
        );
        write_json_object(&self.path, &on_disk)
    }

    pub fn get(&self, id: &str) -> Option<ArchiveEntry> {
        let payload = read_json_object(&self.path)?;
        serde_json::from_value(payload.get(id)?.clone()).ok()
    }

    /// Newest first. An unreadable file lists as empty; corrupt rows are
    /// skipped.
    pub fn list_all(&self) -> Vec<ArchiveEntry> {
        let Some(payload) = read_json_object(&self.path) else {
            return Vec::new();
        };
        let mut entries = payload
            .into_iter()
            .filter_map(|(_, row)| serde_json::from_value::<ArchiveEntry>(row).ok())
            .collect::<Vec<ArchiveEntry>>();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    pub fn len(&self) -> usize {
        self.list_all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deleting an absent id is not an error.
    pub fn delete_one(&self, id: &str) -> anyhow::Result<()> {
        let mut on_disk = load_for_write(&self.path)?;
        if on_disk.remove(id).is_none() {
            return Ok(());
        }
        write_json_object(&self.path, &on_disk)
    }

    pub fn clear_all(&self) -> anyhow::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        write_json_object(&self.path, &Map::new())
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    parsed.as_object().cloned()
}

/// A missing file is an empty archive; anything unreadable is an error.
fn load_for_write(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("archive {} is not valid JSON", path.display()))?;
    match parsed {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("archive {} is not a JSON object", path.display())),
    }
}

/// Writes through a sibling temp file and renames it over `path`, so readers
/// see either the old archive or the new one.
fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let body = serde_json::to_string_pretty(&Value::Object(payload.clone()))?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to stage archive in {}", dir.display()))?;
    staged.write_all(body.as_bytes())?;
    staged.as_file().sync_all()?;
    staged
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ArchiveEntry, ArchiveStore};
    use crate::creature::sample_record;

    fn entry(id: &str, timestamp: i64) -> ArchiveEntry {
        ArchiveEntry {
            id: id.to_string(),
            timestamp,
            record: sample_record(id, &format!("Creature {id}")),
            image_url: format!("data:image/png;base64,{id}"),
        }
    }

    #[test]
    fn list_all_is_newest_first() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = ArchiveStore::new(temp.path().join("archive.json"));
        store.put(&entry("a", 100))?;
        store.put(&entry("b", 300))?;
        store.put(&entry("c", 200))?;

        let timestamps = store
            .list_all()
            .into_iter()
            .map(|entry| entry.timestamp)
            .collect::<Vec<i64>>();
        assert_eq!(timestamps, vec![300, 200, 100]);
        Ok(())
    }

    #[test]
    fn save_with_same_entity_id_upserts_latest() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = ArchiveStore::new(temp.path().join("archive.json"));
        let first = sample_record("dup-1", "First Draft");
        let second = sample_record("dup-1", "Second Draft");

        store.save(&first, "data:image/png;base64,AAAA")?;
        let saved = store.save(&second, "data:image/png;base64,BBBB")?;

        let entries = store.list_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "dup-1");
        assert_eq!(entries[0].record.codex.common_name, "Second Draft");
        assert_eq!(entries[0].image_url, "data:image/png;base64,BBBB");
        assert_eq!(entries[0], saved);
        Ok(())
    }

    #[test]
    fn blank_entity_id_falls_back_to_timestamp_key() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = ArchiveStore::new(temp.path().join("archive.json"));
        let saved = store.save(&sample_record("", "Nameless"), "data:image/png;base64,AA")?;
        assert_eq!(saved.id, saved.timestamp.to_string());
        assert_eq!(store.get(&saved.id), Some(saved));
        Ok(())
    }

    #[test]
    fn corrupt_file_lists_as_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("archive.json");
        std::fs::write(&path, "{not json")?;
        let store = ArchiveStore::new(&path);
        assert!(store.list_all().is_empty());
        assert!(store.get("a").is_none());

        std::fs::write(&path, "[1, 2, 3]")?;
        assert!(store.list_all().is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_rows_are_skipped() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("archive.json");
        let good = serde_json::to_value(entry("good", 5))?;
        std::fs::write(
            &path,
            serde_json::to_string(&json!({"good": good, "bad": {"id": "bad"}}))?,
        )?;
        let store = ArchiveStore::new(&path);
        let entries = store.list_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "good");
        Ok(())
    }

    #[test]
    fn torn_file_is_never_overwritten_by_a_save() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("archive.json");
        let store = ArchiveStore::new(&path);
        store.put(&entry("a", 1))?;
        store.put(&entry("b", 2))?;

        let full = std::fs::read(&path)?;
        std::fs::write(&path, &full[..full.len() / 2])?;
        let torn = std::fs::read(&path)?;

        assert!(store.put(&entry("c", 3)).is_err());
        assert!(store.delete_one("a").is_err());
        assert_eq!(std::fs::read(&path)?, torn);

        std::fs::write(&path, &full)?;
        let ids = store
            .list_all()
            .into_iter()
            .map(|entry| entry.id)
            .collect::<Vec<String>>();
        assert_eq!(ids, vec!["b", "a"]);
        Ok(())
    }

    #[test]
    fn writes_leave_no_staging_files_behind() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = ArchiveStore::new(temp.path().join("archive.json"));
        store.put(&entry("a", 1))?;
        store.delete_one("a")?;
        store.put(&entry("b", 2))?;

        let names = std::fs::read_dir(temp.path())?
            .filter_map(|item| item.ok())
            .map(|item| item.file_name().to_string_lossy().into_owned())
            .collect::<Vec<String>>();
        assert_eq!(names, vec!["archive.json"]);
        Ok(())
    }

    #[test]
    fn delete_and_clear_are_idempotent() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = ArchiveStore::new(temp.path().join("nested").join("archive.json"));
        store.delete_one("missing")?;
        store.clear_all()?;

        store.put(&entry("a", 1))?;
        store.put(&entry("b", 2))?;
        store.delete_one("a")?;
        store.delete_one("a")?;
        assert_eq!(store.len(), 1);

        store.clear_all()?;
        store.clear_all()?;
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn separate_handles_keep_each_others_keys() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("archive.json");
        let store_a = ArchiveStore::new(&path);
        let store_b = ArchiveStore::new(&path);

        store_a.put(&entry("a", 1))?;
        store_b.put(&entry("b", 2))?;
        store_a.put(&entry("c", 3))?;

        let ids = ArchiveStore::new(path)
            .list_all()
            .into_iter()
            .map(|entry| entry.id)
            .collect::<Vec<String>>();
        assert_eq!(ids, vec!["c", "b", "a"]);
        Ok(())
    }

    #[test]
    fn save_into_unwritable_location_errors() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = ArchiveStore::new(temp.path());
        assert!(store.save(&sample_record("x", "X"), "data:,").is_err());
        Ok(())
    }
}
