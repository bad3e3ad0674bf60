//! Working-directory reconciliation: snapshot → filesystem.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::fs_repo::{self, FsRepo};
use crate::repo::SnapshotRepo;
use crate::types::*;

fn sync_err(path: &Path, source: io::Error) -> StoreError {
    StoreError::SyncFailure {
        path: path.to_path_buf(),
        source,
    }
}

#[instrument(skip(repo), fields(tree = %tree))]
pub fn read_tree_into_workdir(repo: &FsRepo, tree: ObjectId) -> Result<(), StoreError> {
    // Flatten first so a bad tree fails before anything is deleted.
    let files = repo.read_tree_flat(tree)?;
    clear_dir(&repo.workdir)?;

    for (path, id) in &files {
        let target = path
            .split('/')
            .fold(repo.workdir.clone(), |acc, component| acc.join(component));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| sync_err(parent, e))?;
        }
        let data = repo.get_object(*id, Some(ObjectKind::Blob))?;
        fs::write(&target, data).map_err(|e| sync_err(&target, e))?;
    }
    debug!(files = files.len(), "materialized tree");
    Ok(())
}

/// Remove every non-ignored file under `dir`, then every directory left
/// empty. A directory that cannot be removed because ignored entries remain
/// inside it is kept.
fn clear_dir(dir: &Path) -> Result<(), StoreError> {
    for entry in fs::read_dir(dir).map_err(|e| sync_err(dir, e))? {
        let entry = entry.map_err(|e| sync_err(dir, e))?;
        if fs_repo::is_ignored(&entry.file_name()) {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| sync_err(&path, e))?;
        if file_type.is_dir() {
            clear_dir(&path)?;
            if let Err(e) = fs::remove_dir(&path) {
                if holds_only_ignored(&path) {
                    warn!(path = %path.display(), error = %e, "keeping directory with ignored entries");
                } else {
                    return Err(sync_err(&path, e));
                }
            }
        } else if file_type.is_file() || file_type.is_symlink() {
            fs::remove_file(&path).map_err(|e| sync_err(&path, e))?;
        }
    }
    Ok(())
}

/// `true` when `dir` is non-empty and everything left in it is an ignored
/// name or a subdirectory that `clear_dir` already decided to keep.
fn holds_only_ignored(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    let mut any = false;
    for entry in entries {
        let Ok(entry) = entry else { return false };
        any = true;
        if fs_repo::is_ignored(&entry.file_name()) {
            continue;
        }
        if !entry.file_type().is_ok_and(|t| t.is_dir()) {
            return false;
        }
    }
    any
}

#[instrument(skip(repo))]
pub fn checkout(repo: &FsRepo, name: &str) -> Result<ObjectId, StoreError> {
    let id = repo.resolve_name(name)?;
    let commit = repo.read_commit(id)?;
    repo.read_tree_into_workdir(commit.tree)?;

    let branch = match RefName::branch(name) {
        Ok(branch) if !repo.resolve_ref(&branch, false)?.is_unset() => Some(branch),
        _ => None,
    };
    let head = match &branch {
        Some(branch) => RefValue::Symbolic(branch.clone()),
        None => RefValue::Direct(Some(id)),
    };
    repo.update_ref(&RefName::head(), &head, false)?;
    info!(commit = %id, branch = ?branch.as_ref().map(RefName::as_str), "checked out");
    Ok(id)
}
