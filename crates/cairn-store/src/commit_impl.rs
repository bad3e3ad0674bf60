//! Commit codec and parent-graph traversal.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::error::StoreError;
use crate::fs_repo::FsRepo;
use crate::repo::SnapshotRepo;
use crate::types::*;

/// Serialize a commit: `tree` line, optional `parent` line, a blank line,
/// then the message verbatim.
#[must_use]
pub fn encode_commit(tree: ObjectId, parent: Option<ObjectId>, message: &str) -> Vec<u8> {
    let mut out = format!("tree {tree}\n");
    if let Some(parent) = parent {
        out.push_str(&format!("parent {parent}\n"));
    }
    out.push('\n');
    out.push_str(message);
    out.into_bytes()
}

/// Parse a commit payload.
///
/// Header lines run up to the first blank line; everything after it is the
/// message, embedded blank lines included. A payload with no blank line has
/// an empty message.
///
/// # Errors
/// [`StoreError::MalformedCommit`] for non-UTF-8 payloads, unknown or
/// repeated header keys, bad ids, or a missing `tree` line.
pub fn decode_commit(id: ObjectId, payload: &[u8]) -> Result<Commit, StoreError> {
    let malformed = |reason: String| StoreError::MalformedCommit { id, reason };
    let text =
        std::str::from_utf8(payload).map_err(|e| malformed(format!("not UTF-8: {e}")))?;

    let mut tree = None;
    let mut parent = None;
    let mut rest = text;
    let message = loop {
        let (line, tail) = match rest.split_once('\n') {
            Some(split) => split,
            None => (rest, ""),
        };
        if line.is_empty() {
            break tail;
        }
        let (key, value) = line
            .split_once(' ')
            .ok_or_else(|| malformed(format!("header line {line:?} has no value")))?;
        let value: ObjectId = value
            .parse()
            .map_err(|e| malformed(format!("header {key}: {e}")))?;
        let slot = match key {
            "tree" => &mut tree,
            "parent" => &mut parent,
            other => return Err(malformed(format!("unknown header key {other:?}"))),
        };
        if slot.replace(value).is_some() {
            return Err(malformed(format!("repeated header key {key:?}")));
        }
        rest = tail;
    };

    let tree = tree.ok_or_else(|| malformed("missing tree header".to_owned()))?;
    Ok(Commit {
        tree,
        parent,
        message: message.to_owned(),
    })
}

pub fn write_commit(
    repo: &FsRepo,
    tree: ObjectId,
    parent: Option<ObjectId>,
    message: &str,
) -> Result<ObjectId, StoreError> {
    let id = repo.put_object(&encode_commit(tree, parent, message), ObjectKind::Commit)?;
    debug!(commit = %id, %tree, parent = ?parent, "wrote commit");
    Ok(id)
}

pub fn read_commit(repo: &FsRepo, id: ObjectId) -> Result<Commit, StoreError> {
    let payload = repo.get_object(id, Some(ObjectKind::Commit))?;
    decode_commit(id, &payload)
}

// ---------------------------------------------------------------------------
// Ancestry
// ---------------------------------------------------------------------------

/// Lazy breadth-first walk over parent pointers.
///
/// Yields every commit reachable from the seeds exactly once, seeds first in
/// the order given. A commit without a parent ends its branch of the walk.
/// The walk is finite because a commit can only name an already-stored
/// parent. Read errors are yielded in place and do not stop the iterator.
///
/// Produced by [`SnapshotRepo::iter_ancestry`].
pub struct Ancestry<'a> {
    repo: &'a dyn SnapshotRepo,
    frontier: VecDeque<ObjectId>,
    visited: HashSet<ObjectId>,
}

impl<'a> Ancestry<'a> {
    /// Start a walk over `repo` from `seeds`.
    #[must_use]
    pub fn new(repo: &'a dyn SnapshotRepo, seeds: &[ObjectId]) -> Self {
        Self {
            repo,
            frontier: seeds.iter().copied().collect(),
            visited: HashSet::new(),
        }
    }
}

impl Iterator for Ancestry<'_> {
    type Item = Result<ObjectId, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.frontier.pop_front()?;
            if !self.visited.insert(id) {
                continue;
            }
            return Some(self.repo.read_commit(id).map(|commit| {
                if let Some(parent) = commit.parent {
                    self.frontier.push_back(parent);
                }
                id
            }));
        }
    }
}
