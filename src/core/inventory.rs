//! Content inventory
//!
//! A per-module map of relative path to (size, modification time, content
//! hash). Diffing compares size and timestamp first and only rehashes a file
//! when one of them moved, so an untouched tree costs one `stat` per file.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

use crate::error::InventoryError;

/// Inventory file format version
const INVENTORY_VERSION: u32 = 1;

/// Signature of one regular file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// File size in bytes
    pub size: u64,
    /// Modification time, nanoseconds since the Unix epoch
    pub modified: u64,
    /// Hex SHA-256 of the content
    #[serde(default)]
    pub hash: Option<String>,
}

/// Persisted source inventory of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentInventory {
    version: u32,
    entries: BTreeMap<String, InventoryEntry>,
}

impl Default for ContentInventory {
    fn default() -> Self {
        Self {
            version: INVENTORY_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl ContentInventory {
    /// Create an initial inventory of every file reachable from `paths`
    ///
    /// Each path is relative to `root` and may name a file or a directory;
    /// directories are traversed but not recorded. Paths that do not exist
    /// are skipped.
    pub fn compute(root: &Path, paths: &BTreeSet<String>) -> Result<Self, InventoryError> {
        let mut inventory = Self::default();
        walk_sources(root, paths, |key, file| {
            let entry = signature(file, true)?;
            inventory.entries.insert(key, entry);
            Ok(())
        })?;
        tracing::debug!(
            "Initial inventory of {} paths below {} holds {} files",
            paths.len(),
            root.display(),
            inventory.entries.len()
        );
        Ok(inventory)
    }

    /// Diff the inventory against the current tree and update it in place
    ///
    /// Returns the added, changed and removed files (absolute paths). After
    /// this call the inventory reflects the current tree, so a second diff
    /// against an unchanged tree returns nothing.
    pub fn check_for_changes(
        &mut self,
        root: &Path,
        paths: &BTreeSet<String>,
    ) -> Result<Vec<PathBuf>, InventoryError> {
        let mut left: BTreeSet<String> = self.entries.keys().cloned().collect();
        let mut changes = Vec::new();
        let entries = &mut self.entries;

        walk_sources(root, paths, |key, file| {
            left.remove(&key);
            match entries.get_mut(&key) {
                None => {
                    entries.insert(key, signature(file, true)?);
                    changes.push(file.to_path_buf());
                }
                Some(entry) => {
                    let current = signature(file, false)?;
                    if current.size != entry.size || current.modified != entry.modified {
                        // Probable change: only the hash can tell
                        entry.size = current.size;
                        entry.modified = current.modified;
                        let hash = hash_file(file)?;
                        if entry.hash.as_deref() != Some(hash.as_str()) {
                            entry.hash = Some(hash);
                            changes.push(file.to_path_buf());
                        }
                    }
                }
            }
            Ok(())
        })?;

        for key in left {
            self.entries.remove(&key);
            changes.push(root.join(&key));
        }
        Ok(changes)
    }

    /// Load a stored inventory
    ///
    /// Returns `None` when the file is missing or cannot be decoded; callers
    /// treat that as "no prior state known".
    pub fn load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str::<Self>(&content) {
            Ok(inventory) if inventory.version == INVENTORY_VERSION => Some(inventory),
            Ok(inventory) => {
                tracing::warn!(
                    "Ignoring inventory {} with unsupported version {}",
                    path.display(),
                    inventory.version
                );
                None
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable inventory {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Save the inventory, replacing any previous file atomically
    pub fn save(&self, path: &Path) -> Result<(), InventoryError> {
        let save_error = |error: String| InventoryError::Save {
            path: path.to_path_buf(),
            error,
        };
        let content = serde_json::to_string(self).map_err(|e| save_error(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| save_error(e.to_string()))?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content).map_err(|e| save_error(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            save_error(e.to_string())
        })
    }

    /// Look up the entry for a relative path
    pub fn get(&self, relative: &str) -> Option<&InventoryEntry> {
        self.entries.get(relative)
    }

    /// Number of recorded files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no files are recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Visit every regular file below the build sources, keyed by relative path
fn walk_sources<F>(root: &Path, paths: &BTreeSet<String>, mut visit: F) -> Result<(), InventoryError>
where
    F: FnMut(String, &Path) -> Result<(), InventoryError>,
{
    for sub in paths {
        let sub = sub.replace('\\', "/");
        let sub = sub.trim_end_matches('/');
        if sub.is_empty() {
            return Err(InventoryError::EmptySubpath {
                root: root.to_path_buf(),
            });
        }

        let target = root.join(sub);
        if target.is_file() {
            visit(sub.to_string(), &target)?;
        } else if target.is_dir() {
            let walker = WalkDir::new(&target)
                .min_depth(1)
                .follow_links(true)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|e| InventoryError::Walk {
                    path: target.clone(),
                    error: e.to_string(),
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let key = relative_key(sub, &target, entry.path());
                visit(key, entry.path())?;
            }
        } else if target.symlink_metadata().is_ok() {
            // Present but unresolvable, such as a dangling symlink
            let error = match fs::metadata(&target) {
                Err(e) => e.to_string(),
                Ok(_) => "not a regular file or directory".to_string(),
            };
            return Err(InventoryError::Read {
                path: target,
                error,
            });
        }
    }
    Ok(())
}

/// Build the `/`-separated inventory key for a file below `base`
fn relative_key(sub: &str, base: &Path, path: &Path) -> String {
    let mut key = sub.to_string();
    if let Ok(rest) = path.strip_prefix(base) {
        for component in rest.components() {
            key.push('/');
            key.push_str(&component.as_os_str().to_string_lossy());
        }
    }
    key
}

fn signature(path: &Path, with_hash: bool) -> Result<InventoryEntry, InventoryError> {
    let metadata = fs::metadata(path).map_err(|e| read_error(path, &e))?;
    let modified = metadata
        .modified()
        .map_err(|e| read_error(path, &e))?
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0);
    let hash = if with_hash {
        Some(hash_file(path)?)
    } else {
        None
    };
    Ok(InventoryEntry {
        size: metadata.len(),
        modified,
        hash,
    })
}

/// Compute the hex SHA-256 of a file's content
pub fn hash_file(path: &Path) -> Result<String, InventoryError> {
    let mut file = fs::File::open(path).map_err(|e| read_error(path, &e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer).map_err(|e| read_error(path, &e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn read_error(path: &Path, e: &std::io::Error) -> InventoryError {
    InventoryError::Read {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}
