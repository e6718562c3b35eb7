use crate::consts::{MAX_ID_ATTEMPTS, RESULT_ID_ALPHABET, RESULT_ID_LEN};
use crate::error::{GfResult, GroupingError};
use crate::result::GroupingResult;
use fastrand::Rng;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// Append-only home for grouping results. Stored results are never replaced.
pub trait ResultStore {
    fn contains(&self, id: &str) -> GfResult<bool>;

    /// Stores a result under its id. Fails if the id is already taken.
    fn put(&self, result: &GroupingResult) -> GfResult<()>;

    fn get(&self, id: &str) -> GfResult<GroupingResult>;

    fn ids(&self) -> GfResult<Vec<String>>;
}

pub fn random_id(rng: &mut Rng) -> String {
    (0..RESULT_ID_LEN)
        .map(|_| RESULT_ID_ALPHABET[rng.usize(..RESULT_ID_ALPHABET.len())] as char)
        .collect()
}

/// Draws ids until one is unused by `store`.
pub fn allocate_id<S: ResultStore + ?Sized>(store: &S, rng: &mut Rng) -> GfResult<String> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = random_id(rng);
        if !store.contains(&id)? {
            return Ok(id);
        }
        debug!("Result id {} taken, drawing again", id);
    }
    Err(GroupingError::Validation(format!(
        "no free result id after {} attempts",
        MAX_ID_ATTEMPTS
    )))
}

fn taken(id: &str) -> GroupingError {
    GroupingError::Validation(format!("result id '{}' already exists", id))
}

fn missing(id: &str) -> GroupingError {
    GroupingError::NotFound(format!("no grouping result with id '{}'", id))
}

#[derive(Default)]
pub struct MemoryStore {
    results: RwLock<HashMap<String, GroupingResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> GroupingError {
    GroupingError::Io(std::io::Error::other(e.to_string()))
}

impl ResultStore for MemoryStore {
    fn contains(&self, id: &str) -> GfResult<bool> {
        Ok(self.results.read().map_err(poisoned)?.contains_key(id))
    }

    fn put(&self, result: &GroupingResult) -> GfResult<()> {
        let mut guard = self.results.write().map_err(poisoned)?;
        if guard.contains_key(&result.id) {
            return Err(taken(&result.id));
        }
        guard.insert(result.id.clone(), result.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> GfResult<GroupingResult> {
        self.results
            .read()
            .map_err(poisoned)?
            .get(id)
            .cloned()
            .ok_or_else(|| missing(id))
    }

    fn ids(&self) -> GfResult<Vec<String>> {
        let mut ids: Vec<String> = self.results.read().map_err(poisoned)?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// One pretty-printed `<id>.json` per result inside a directory.
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn open<P: AsRef<Path>>(root: P) -> GfResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> GfResult<PathBuf> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(GroupingError::Validation(format!(
                "malformed result id '{}'",
                id
            )));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }
}

impl ResultStore for JsonDirStore {
    fn contains(&self, id: &str) -> GfResult<bool> {
        Ok(self.path_for(id)?.exists())
    }

    fn put(&self, result: &GroupingResult) -> GfResult<()> {
        let path = self.path_for(&result.id)?;
        let file = match File::options().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(taken(&result.id)),
            Err(e) => return Err(e.into()),
        };
        serde_json::to_writer_pretty(BufWriter::new(file), result)?;
        debug!("Stored result {} at {:?}", result.id, path);
        Ok(())
    }

    fn get(&self, id: &str) -> GfResult<GroupingResult> {
        let path = match self.path_for(id) {
            Ok(p) => p,
            Err(_) => return Err(missing(id)),
        };
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(missing(id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn ids(&self) -> GfResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_id_shape() {
        let mut rng = Rng::with_seed(4);
        for _ in 0..20 {
            let id = random_id(&mut rng);
            assert_eq!(id.len(), RESULT_ID_LEN);
            assert!(id.bytes().all(|b| RESULT_ID_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get("FFFFFF"), Err(GroupingError::NotFound(_))));

        let dir = tempfile::tempdir().unwrap();
        let disk = JsonDirStore::open(dir.path()).unwrap();
        assert!(matches!(disk.get("FFFFFF"), Err(GroupingError::NotFound(_))));
        assert!(matches!(disk.get("../etc"), Err(GroupingError::NotFound(_))));
    }
}
