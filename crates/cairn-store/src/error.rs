//! Error types for store operations.
//!
//! [`StoreError`] is the single error type returned by all
//! [`SnapshotRepo`](crate::SnapshotRepo) methods. Every structural violation
//! has its own variant so callers can match on the failure mode instead of
//! parsing messages. Nothing in this crate downgrades an error to a warning
//! except the swallowed directory removals described on
//! [`SnapshotRepo::checkout`](crate::SnapshotRepo::checkout).

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ObjectId, ObjectKind};

/// Errors returned by [`SnapshotRepo`](crate::SnapshotRepo) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No frame is stored under the requested id.
    #[error("object {id} not found")]
    ObjectNotFound {
        /// The id that was looked up.
        id: ObjectId,
    },

    /// The object exists but has a different kind than the caller asked for.
    #[error("object {id} is a {actual}, expected a {expected}")]
    TypeMismatch {
        /// The id that was read.
        id: ObjectId,
        /// The kind the caller required.
        expected: ObjectKind,
        /// The kind tag found in the stored frame.
        actual: ObjectKind,
    },

    /// A stored frame has no kind separator or an unrecognised kind tag.
    #[error("malformed object {id}: {reason}")]
    MalformedObject {
        /// The id of the unreadable frame.
        id: ObjectId,
        /// What was wrong with it.
        reason: String,
    },

    /// A stored frame no longer hashes to the id it is filed under.
    #[error("object {id} is corrupt: content hashes to {actual}")]
    CorruptObject {
        /// The id the frame is stored under.
        id: ObjectId,
        /// The digest of the frame's current bytes.
        actual: ObjectId,
    },

    /// A tree object violates the `kind id name` record format.
    #[error("malformed tree {id}: {reason}")]
    MalformedTree {
        /// The tree being parsed.
        id: ObjectId,
        /// The offending record or rule.
        reason: String,
    },

    /// A tree record names a kind other than `blob` or `tree`.
    #[error("tree {id} has an entry of unknown kind `{kind}`")]
    UnknownEntryKind {
        /// The tree being parsed.
        id: ObjectId,
        /// The kind tag found in the record.
        kind: String,
    },

    /// A commit object has a header line with no recognised key.
    #[error("malformed commit {id}: {reason}")]
    MalformedCommit {
        /// The commit being parsed.
        id: ObjectId,
        /// The offending line or rule.
        reason: String,
    },

    /// Name resolution exhausted every ref probe and the text is not a raw id.
    #[error("unknown name `{name}`")]
    UnknownName {
        /// The text that was resolved.
        name: String,
    },

    /// A direct ref write was requested with no id to store.
    #[error("refusing to write empty target to `{ref_name}`")]
    EmptyTarget {
        /// The ref that would have been written.
        ref_name: String,
    },

    /// Symbolic indirection revisited a ref it had already followed.
    #[error("reference cycle: {}", chain.join(" -> "))]
    ReferenceCycle {
        /// The names visited, ending with the repeated one.
        chain: Vec<String>,
    },

    /// A ref name is empty, escapes the ref namespace, or has bad components.
    #[error("invalid ref name `{value}`: {reason}")]
    InvalidRefName {
        /// The rejected name.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A ref file holds something that is neither an id nor `ref: <name>`.
    #[error("ref `{ref_name}` has unreadable content {raw:?}")]
    MalformedRef {
        /// The ref whose slot was read.
        ref_name: String,
        /// The raw slot content.
        raw: String,
    },

    /// A tag with this name already exists; tags are never moved.
    #[error("tag `{name}` already exists")]
    TagExists {
        /// The short tag name.
        name: String,
    },

    /// Working-directory reconciliation could not create or remove a path.
    #[error("sync failed at {}: {source}", path.display())]
    SyncFailure {
        /// The path being created or removed.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The external line-differencing tool terminated abnormally.
    #[error("diff tool `{tool}` failed for {path}: {message}")]
    DiffToolFailed {
        /// The program that was run.
        tool: String,
        /// The path label being diffed.
        path: String,
        /// Exit status and stderr.
        message: String,
    },

    /// No control directory exists at the given root.
    #[error("not a cairn repository: {}", path.display())]
    NotARepository {
        /// The root that was opened.
        path: PathBuf,
    },

    /// `init` found an existing control directory.
    #[error("repository already initialized at {}", path.display())]
    AlreadyInitialized {
        /// The control directory that exists.
        path: PathBuf,
    },

    /// An I/O error outside working-directory reconciliation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Short machine-readable code for the error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ObjectNotFound { .. } => "object_not_found",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::MalformedObject { .. } => "malformed_object",
            Self::CorruptObject { .. } => "corrupt_object",
            Self::MalformedTree { .. } => "malformed_tree",
            Self::UnknownEntryKind { .. } => "unknown_entry_kind",
            Self::MalformedCommit { .. } => "malformed_commit",
            Self::UnknownName { .. } => "unknown_name",
            Self::EmptyTarget { .. } => "empty_target",
            Self::ReferenceCycle { .. } => "reference_cycle",
            Self::InvalidRefName { .. } => "invalid_ref_name",
            Self::MalformedRef { .. } => "malformed_ref",
            Self::TagExists { .. } => "tag_exists",
            Self::SyncFailure { .. } => "sync_failure",
            Self::DiffToolFailed { .. } => "diff_tool_failed",
            Self::NotARepository { .. } => "not_a_repository",
            Self::AlreadyInitialized { .. } => "already_initialized",
            Self::Io(_) => "io_error",
        }
    }
}
