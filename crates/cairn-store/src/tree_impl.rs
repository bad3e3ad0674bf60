//! Tree codec: directory snapshots to and from `kind id name` records.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, instrument, trace};

use crate::error::StoreError;
use crate::fs_repo::{self, FsRepo};
use crate::repo::SnapshotRepo;
use crate::types::*;

/// Deepest directory nesting `write_tree` and `read_tree_flat` will follow.
pub const MAX_TREE_DEPTH: usize = 256;

/// Serialize entries as newline-terminated `kind id name` records, sorted by
/// name.
#[must_use]
pub fn encode_tree(entries: &[TreeEntry]) -> Vec<u8> {
    let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    let mut out = String::new();
    for entry in sorted {
        out.push_str(&format!("{} {} {}\n", entry.kind, entry.id, entry.name));
    }
    out.into_bytes()
}

/// Parse a tree payload.
///
/// # Errors
/// [`StoreError::MalformedTree`] for non-UTF-8 payloads, records without
/// three fields, bad ids, or names that are empty, contain `/`, or are
/// `.`/`..`. [`StoreError::UnknownEntryKind`] for kinds other than
/// `blob`/`tree`.
pub fn decode_tree(id: ObjectId, payload: &[u8]) -> Result<Vec<TreeEntry>, StoreError> {
    let malformed = |reason: String| StoreError::MalformedTree { id, reason };
    let text =
        std::str::from_utf8(payload).map_err(|e| malformed(format!("not UTF-8: {e}")))?;

    let mut entries = Vec::new();
    for line in text.split_terminator('\n') {
        let mut fields = line.splitn(3, ' ');
        let (Some(kind), Some(entry_id), Some(name)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(malformed(format!("record {line:?} does not have three fields")));
        };
        let kind = match kind {
            "blob" => EntryKind::Blob,
            "tree" => EntryKind::Tree,
            other => {
                return Err(StoreError::UnknownEntryKind {
                    id,
                    kind: other.to_owned(),
                });
            }
        };
        let entry_id: ObjectId = entry_id
            .parse()
            .map_err(|e| malformed(format!("record {line:?}: {e}")))?;
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(malformed(format!("invalid entry name {name:?}")));
        }
        entries.push(TreeEntry {
            name: name.to_owned(),
            kind,
            id: entry_id,
        });
    }
    Ok(entries)
}

fn sync_err(path: &Path, source: io::Error) -> StoreError {
    StoreError::SyncFailure {
        path: path.to_path_buf(),
        source,
    }
}

#[instrument(skip(repo), fields(dir = %dir.display()))]
pub fn write_tree(repo: &FsRepo, dir: &Path) -> Result<ObjectId, StoreError> {
    let entries = collect_entries(repo, dir, 0)?;
    let id = repo.put_object(&encode_tree(&entries), ObjectKind::Tree)?;
    debug!(tree = %id, "wrote tree");
    Ok(id)
}

/// Store the files under `dir` and return its entries. Subdirectories that
/// hold no files at any depth get no entry, since checkout cannot bring
/// them back.
fn collect_entries(
    repo: &FsRepo,
    dir: &Path,
    depth: usize,
) -> Result<Vec<TreeEntry>, StoreError> {
    if depth > MAX_TREE_DEPTH {
        return Err(sync_err(
            dir,
            io::Error::other(format!("directory nesting exceeds {MAX_TREE_DEPTH} levels")),
        ));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| sync_err(dir, e))? {
        let entry = entry.map_err(|e| sync_err(dir, e))?;
        let path = entry.path();
        let raw_name = entry.file_name();
        if fs_repo::is_ignored(&raw_name) {
            continue;
        }
        let name = raw_name
            .to_str()
            .filter(|n| !n.contains('\n'))
            .ok_or_else(|| {
                sync_err(
                    &path,
                    io::Error::new(io::ErrorKind::InvalidData, "file name cannot be recorded"),
                )
            })?
            .to_owned();

        let file_type = entry.file_type().map_err(|e| sync_err(&path, e))?;
        if file_type.is_file() {
            let data = fs::read(&path).map_err(|e| sync_err(&path, e))?;
            let id = repo.put_object(&data, ObjectKind::Blob)?;
            trace!(%name, %id, "blob");
            entries.push(TreeEntry {
                name,
                kind: EntryKind::Blob,
                id,
            });
        } else if file_type.is_dir() {
            let children = collect_entries(repo, &path, depth + 1)?;
            if children.is_empty() {
                trace!(path = %path.display(), "skipping empty directory");
                continue;
            }
            let id = repo.put_object(&encode_tree(&children), ObjectKind::Tree)?;
            entries.push(TreeEntry {
                name,
                kind: EntryKind::Tree,
                id,
            });
        } else {
            trace!(path = %path.display(), "skipping non-regular entry");
        }
    }
    Ok(entries)
}

pub fn read_tree(repo: &FsRepo, id: ObjectId) -> Result<Vec<TreeEntry>, StoreError> {
    let payload = repo.get_object(id, Some(ObjectKind::Tree))?;
    decode_tree(id, &payload)
}

pub fn read_tree_flat(repo: &FsRepo, id: ObjectId) -> Result<FlatTree, StoreError> {
    let mut out = FlatTree::new();
    flatten_into(repo, id, "", 0, &mut out)?;
    Ok(out)
}

fn flatten_into(
    repo: &FsRepo,
    id: ObjectId,
    base: &str,
    depth: usize,
    out: &mut FlatTree,
) -> Result<(), StoreError> {
    if depth > MAX_TREE_DEPTH {
        return Err(StoreError::MalformedTree {
            id,
            reason: format!("nesting exceeds {MAX_TREE_DEPTH} levels"),
        });
    }
    for entry in read_tree(repo, id)? {
        let path = format!("{base}{}", entry.name);
        match entry.kind {
            EntryKind::Blob => {
                out.insert(path, entry.id);
            }
            EntryKind::Tree => flatten_into(repo, entry.id, &format!("{path}/"), depth + 1, out)?,
        }
    }
    Ok(())
}
