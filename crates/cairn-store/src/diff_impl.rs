//! Tree comparison and unified-diff rendering.
//!
//! [`compare_trees`] is pure: it unions two flattened trees. Turning a
//! changed path into text is delegated to a [`DiffRenderer`]: either the
//! external `diff` program ([`ExternalDiff`]) or an in-process line diff
//! ([`BuiltinDiff`]).

use std::io::Write as _;
use std::process::Command;

use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::fs_repo::FsRepo;
use crate::repo::SnapshotRepo;
use crate::types::*;

/// Renders a unified diff for one path given its old and new content.
///
/// Absent sides are passed as empty buffers. Implementations must not touch
/// the store.
pub trait DiffRenderer {
    /// Produce diff text for `path`, labelled `a/<path>` and `b/<path>`.
    fn render(&self, old: &[u8], new: &[u8], path: &str) -> Result<Vec<u8>, StoreError>;
}

/// Shells out to a `diff`-compatible program over two temp files.
#[derive(Clone, Debug)]
pub struct ExternalDiff {
    program: String,
}

impl ExternalDiff {
    /// Use `program` (looked up on `PATH`) instead of `diff`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ExternalDiff {
    fn default() -> Self {
        Self::new("diff")
    }
}

impl DiffRenderer for ExternalDiff {
    fn render(&self, old: &[u8], new: &[u8], path: &str) -> Result<Vec<u8>, StoreError> {
        let mut old_file = tempfile::NamedTempFile::new()?;
        let mut new_file = tempfile::NamedTempFile::new()?;
        old_file.write_all(old)?;
        old_file.flush()?;
        new_file.write_all(new)?;
        new_file.flush()?;

        let failed = |message: String| StoreError::DiffToolFailed {
            tool: self.program.clone(),
            path: path.to_owned(),
            message,
        };
        let output = Command::new(&self.program)
            .arg("--unified")
            .arg("--show-c-function")
            .arg("--label")
            .arg(format!("a/{path}"))
            .arg(old_file.path())
            .arg("--label")
            .arg(format!("b/{path}"))
            .arg(new_file.path())
            .output()
            .map_err(|e| failed(format!("could not run: {e}")))?;

        // diff exits 0 for identical input, 1 for differences, 2+ for trouble.
        match output.status.code() {
            Some(0 | 1) => Ok(output.stdout),
            code => Err(failed(format!(
                "exit status {}: {}",
                code.map_or_else(|| "signal".to_owned(), |c| c.to_string()),
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}

/// In-process unified diff with three lines of context.
///
/// Non-UTF-8 content is compared lossily.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinDiff;

impl DiffRenderer for BuiltinDiff {
    fn render(&self, old: &[u8], new: &[u8], path: &str) -> Result<Vec<u8>, StoreError> {
        let old = String::from_utf8_lossy(old);
        let new = String::from_utf8_lossy(new);
        let diff = similar::TextDiff::from_lines(old.as_ref(), new.as_ref());
        let text = diff
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{path}"), &format!("b/{path}"))
            .to_string();
        Ok(text.into_bytes())
    }
}

/// Union the paths of two flattened trees, in path order.
///
/// Every path present on either side appears once, with the id from each
/// side that has it. Unchanged paths are included; filter with
/// [`Change::is_changed`].
#[must_use]
pub fn compare_trees(old: &FlatTree, new: &FlatTree) -> Vec<Change> {
    let mut paths: Vec<&String> = old.keys().chain(new.keys()).collect();
    paths.sort();
    paths.dedup();
    paths
        .into_iter()
        .map(|path| Change {
            path: path.clone(),
            old: old.get(path).copied(),
            new: new.get(path).copied(),
        })
        .collect()
}

/// Render every changed path between two flattened trees and concatenate
/// the output.
///
/// # Errors
/// Fails if a blob cannot be read or the renderer fails.
pub fn diff_flat_trees(
    repo: &dyn SnapshotRepo,
    old: &FlatTree,
    new: &FlatTree,
    renderer: &dyn DiffRenderer,
) -> Result<Vec<u8>, StoreError> {
    let read = |id: Option<ObjectId>| -> Result<Vec<u8>, StoreError> {
        id.map_or_else(|| Ok(Vec::new()), |id| repo.get_object(id, Some(ObjectKind::Blob)))
    };
    let mut output = Vec::new();
    for change in compare_trees(old, new).into_iter().filter(Change::is_changed) {
        let rendered = renderer.render(&read(change.old)?, &read(change.new)?, &change.path)?;
        output.extend_from_slice(&rendered);
    }
    Ok(output)
}

#[instrument(skip(repo, renderer))]
pub fn diff_trees(
    repo: &FsRepo,
    old: Option<ObjectId>,
    new: ObjectId,
    renderer: &dyn DiffRenderer,
) -> Result<Vec<u8>, StoreError> {
    let old_flat = match old {
        Some(id) => repo.read_tree_flat(id)?,
        None => FlatTree::new(),
    };
    let new_flat = repo.read_tree_flat(new)?;
    let output = diff_flat_trees(repo, &old_flat, &new_flat, renderer)?;
    debug!(bytes = output.len(), "rendered diff");
    Ok(output)
}
