//! The [`SnapshotRepo`] trait: the single boundary between callers and the
//! on-disk store.
//!
//! The command surface, the graph builder, and the tests all program against
//! this trait. It is object-safe so callers can hold `&dyn SnapshotRepo`.
//!
//! Method groups, leaf-first:
//!
//! | Group        | Methods                                                        |
//! |--------------|----------------------------------------------------------------|
//! | Objects      | `put_object`, `get_object`, `object_kind`, `verify_object`, ...|
//! | Trees        | `write_tree`, `read_tree`, `read_tree_flat`                    |
//! | Commits      | `write_commit`, `read_commit`, `iter_ancestry`                 |
//! | Refs         | `update_ref`, `resolve_ref`, `list_refs`                       |
//! | Names        | `resolve_name`                                                 |
//! | Working dir  | `snapshot`, `read_tree_into_workdir`, `checkout`               |
//! | Diff         | `diff_trees`                                                   |
//!
//! Provided methods at the bottom compose these into the operations the
//! command surface needs (`commit`, `create_branch`, `create_tag`, ...).

use std::path::Path;

use tracing::debug;

use crate::commit_impl::Ancestry;
use crate::diff_impl::DiffRenderer;
use crate::error::StoreError;
use crate::types::{Commit, FlatTree, ObjectId, ObjectKind, RefName, RefValue, TreeEntry};

/// The store abstraction used by every cairn caller.
///
/// # Object safety
///
/// No generic methods and no `Self` outside the receiver, so `&dyn
/// SnapshotRepo` works everywhere.
pub trait SnapshotRepo {
    /// The working directory this repository snapshots and restores.
    fn workdir(&self) -> &Path;

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Store `payload` as an object of `kind` and return its id.
    ///
    /// The id is the digest of `kind ‖ 0x00 ‖ payload`. Writing content that
    /// is already stored is a no-op returning the same id.
    fn put_object(&self, payload: &[u8], kind: ObjectKind) -> Result<ObjectId, StoreError>;

    /// Read the payload stored under `id`.
    ///
    /// With `expected` set, fails with [`StoreError::TypeMismatch`] if the
    /// stored kind differs. With `None`, returns the payload of any kind.
    fn get_object(&self, id: ObjectId, expected: Option<ObjectKind>)
    -> Result<Vec<u8>, StoreError>;

    /// Read only the kind tag of the object stored under `id`.
    fn object_kind(&self, id: ObjectId) -> Result<ObjectKind, StoreError>;

    /// Return `true` if a frame is stored under `id`.
    fn has_object(&self, id: ObjectId) -> Result<bool, StoreError>;

    /// List every stored object id, sorted.
    fn list_objects(&self) -> Result<Vec<ObjectId>, StoreError>;

    /// Re-hash the frame stored under `id` and fail with
    /// [`StoreError::CorruptObject`] if it no longer matches.
    fn verify_object(&self, id: ObjectId) -> Result<(), StoreError>;

    // -----------------------------------------------------------------------
    // Trees
    // -----------------------------------------------------------------------

    /// Snapshot `dir` recursively into tree and blob objects.
    ///
    /// The control directory is skipped at every level. Children are fully
    /// stored before their parent tree is serialized, and entries are sorted
    /// by name, so identical contents always produce the same id.
    fn write_tree(&self, dir: &Path) -> Result<ObjectId, StoreError>;

    /// Decode one level of a tree object.
    fn read_tree(&self, id: ObjectId) -> Result<Vec<TreeEntry>, StoreError>;

    /// Expand a tree into a flat mapping of slash-joined path to blob id.
    fn read_tree_flat(&self, id: ObjectId) -> Result<FlatTree, StoreError>;

    // -----------------------------------------------------------------------
    // Commits
    // -----------------------------------------------------------------------

    /// Store a commit pointing at `tree` with an optional `parent`.
    fn write_commit(
        &self,
        tree: ObjectId,
        parent: Option<ObjectId>,
        message: &str,
    ) -> Result<ObjectId, StoreError>;

    /// Decode a commit object.
    fn read_commit(&self, id: ObjectId) -> Result<Commit, StoreError>;

    /// Breadth-first walk over parent pointers from `seeds`, yielding each
    /// commit id at most once.
    fn iter_ancestry(&self, seeds: &[ObjectId]) -> Ancestry<'_>;

    // -----------------------------------------------------------------------
    // Refs
    // -----------------------------------------------------------------------

    /// Write `value` into the ref `name`.
    ///
    /// With `deref`, symbolic indirections starting at `name` are followed
    /// and the write lands on the final concrete slot. Without it, the
    /// literal slot is overwritten. Writing `RefValue::Direct(None)` fails
    /// with [`StoreError::EmptyTarget`] before anything touches disk.
    fn update_ref(&self, name: &RefName, value: &RefValue, deref: bool)
    -> Result<(), StoreError>;

    /// Read the ref `name`.
    ///
    /// With `deref`, indirections are followed until a direct value or an
    /// unset slot; without it, the literal slot's own content is returned.
    /// An unwritten slot yields `RefValue::Direct(None)`, not an error.
    fn resolve_ref(&self, name: &RefName, deref: bool) -> Result<RefValue, StoreError>;

    /// Enumerate `HEAD` and every ref under `refs/` whose name starts with
    /// `prefix`, skipping unset slots, in name order with `HEAD` first.
    fn list_refs(&self, prefix: &str, deref: bool)
    -> Result<Vec<(RefName, RefValue)>, StoreError>;

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    /// Turn user-supplied text into an object id.
    ///
    /// `@` means `HEAD`. Otherwise the literal name, `refs/<text>`,
    /// `refs/tags/<text>` and `refs/heads/<text>` are probed in that order;
    /// the first set slot wins and is fully dereferenced. Failing that, a
    /// 40-character hex string is taken as a raw id.
    fn resolve_name(&self, text: &str) -> Result<ObjectId, StoreError>;

    // -----------------------------------------------------------------------
    // Working directory
    // -----------------------------------------------------------------------

    /// Snapshot the working directory; `write_tree` rooted at [`workdir`](Self::workdir).
    fn snapshot(&self) -> Result<ObjectId, StoreError> {
        self.write_tree(self.workdir())
    }

    /// Replace the working directory's tracked content with `tree`.
    ///
    /// Every non-ignored file is removed, then every directory left empty,
    /// then the tree's blobs are written out.
    fn read_tree_into_workdir(&self, tree: ObjectId) -> Result<(), StoreError>;

    /// Resolve `name` to a commit, materialize its tree, and move `HEAD`.
    ///
    /// `HEAD` becomes symbolic to `refs/heads/<name>` when `name` is an
    /// existing branch and a detached direct id otherwise. Directory
    /// removals that fail only because excluded entries remain are
    /// swallowed; any other removal or write failure is a
    /// [`StoreError::SyncFailure`].
    fn checkout(&self, name: &str) -> Result<ObjectId, StoreError>;

    // -----------------------------------------------------------------------
    // Diff
    // -----------------------------------------------------------------------

    /// Render the differences between two trees through `renderer`.
    ///
    /// `old = None` compares against the empty tree.
    fn diff_trees(
        &self,
        old: Option<ObjectId>,
        new: ObjectId,
        renderer: &dyn DiffRenderer,
    ) -> Result<Vec<u8>, StoreError>;

    // -----------------------------------------------------------------------
    // Provided operations
    // -----------------------------------------------------------------------

    /// The commit `HEAD` currently resolves to, or `None` before the first commit.
    fn head_id(&self) -> Result<Option<ObjectId>, StoreError> {
        Ok(self.resolve_ref(&RefName::head(), true)?.id())
    }

    /// The branch `HEAD` is attached to, or `None` when detached.
    fn current_branch(&self) -> Result<Option<String>, StoreError> {
        match self.resolve_ref(&RefName::head(), false)? {
            RefValue::Symbolic(target) => Ok(target.branch_name().map(str::to_owned)),
            RefValue::Direct(_) => Ok(None),
        }
    }

    /// Snapshot the working directory and record it as a child of `HEAD`.
    ///
    /// The new id is written through `HEAD`, so an attached branch advances
    /// and a detached `HEAD` moves by itself.
    fn commit(&self, message: &str) -> Result<ObjectId, StoreError> {
        let tree = self.snapshot()?;
        let parent = self.head_id()?;
        let id = self.write_commit(tree, parent, message)?;
        self.update_ref(&RefName::head(), &RefValue::Direct(Some(id)), true)?;
        debug!(commit = %id, tree = %tree, "recorded commit");
        Ok(id)
    }

    /// Point `HEAD`'s final slot at `id` without touching the working directory.
    fn reset(&self, id: ObjectId) -> Result<(), StoreError> {
        self.require_commit(id)?;
        self.update_ref(&RefName::head(), &RefValue::Direct(Some(id)), true)
    }

    /// Create or move `refs/heads/<name>` to `id`.
    fn create_branch(&self, name: &str, id: ObjectId) -> Result<RefName, StoreError> {
        let ref_name = RefName::branch(name)?;
        self.require_commit(id)?;
        self.update_ref(&ref_name, &RefValue::Direct(Some(id)), true)?;
        Ok(ref_name)
    }

    /// Create `refs/tags/<name>` at `id`. Existing tags are never moved.
    fn create_tag(&self, name: &str, id: ObjectId) -> Result<RefName, StoreError> {
        let ref_name = RefName::tag(name)?;
        self.require_commit(id)?;
        if !self.resolve_ref(&ref_name, false)?.is_unset() {
            return Err(StoreError::TagExists {
                name: name.to_owned(),
            });
        }
        self.update_ref(&ref_name, &RefValue::Direct(Some(id)), false)?;
        Ok(ref_name)
    }

    /// Fail with [`StoreError::TypeMismatch`] unless `id` names a stored commit.
    ///
    /// Branches, tags and `HEAD` only ever point at commits when moved
    /// through this trait.
    fn require_commit(&self, id: ObjectId) -> Result<(), StoreError> {
        let actual = self.object_kind(id)?;
        if actual == ObjectKind::Commit {
            Ok(())
        } else {
            Err(StoreError::TypeMismatch {
                id,
                expected: ObjectKind::Commit,
                actual,
            })
        }
    }

    /// Short names of all branches, sorted.
    fn list_branches(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .list_refs(crate::types::HEADS_PREFIX, false)?
            .into_iter()
            .filter_map(|(name, _)| name.branch_name().map(str::to_owned))
            .collect())
    }

    /// Return `true` if `ancestor` is reachable from `descendant` through
    /// parent pointers (a commit is its own ancestor).
    fn is_ancestor(&self, ancestor: ObjectId, descendant: ObjectId) -> Result<bool, StoreError> {
        for id in self.iter_ancestry(&[descendant]) {
            if id? == ancestor {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Verify every stored object, returning each failing id with its error.
    fn verify_all(&self) -> Result<Vec<(ObjectId, StoreError)>, StoreError> {
        let mut bad = Vec::new();
        for id in self.list_objects()? {
            if let Err(e) = self.verify_object(id) {
                bad.push((id, e));
            }
        }
        Ok(bad)
    }
}
