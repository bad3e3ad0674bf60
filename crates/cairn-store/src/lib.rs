//! Content-addressed snapshot store for cairn.
//!
//! Everything a caller needs goes through the [`SnapshotRepo`] trait:
//! immutable blob/tree/commit objects keyed by the SHA-1 of their framed
//! content, plus a small mutable layer of named refs (`HEAD`,
//! `refs/heads/*`, `refs/tags/*`) that may point at an object or at
//! another ref. [`FsRepo`] is the filesystem-backed implementation rooted
//! at a working directory with a `.cairn` control directory inside it.
//!
//! # Crate layout
//!
//! - [`repo`]: the [`SnapshotRepo`] trait.
//! - [`types`]: ids, kinds, ref names and values, tree entries, changes.
//! - [`error`]: the [`StoreError`] enum returned by every operation.
//!
//! ```no_run
//! use cairn_store::{FsRepo, SnapshotRepo};
//!
//! # fn main() -> Result<(), cairn_store::StoreError> {
//! let repo = FsRepo::init(std::path::Path::new("."), "main")?;
//! let first = repo.commit("initial")?;
//! assert_eq!(repo.resolve_name("@")?, first);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod repo;
pub mod types;

// filesystem-backed implementation modules
mod checkout_impl;
mod commit_impl;
mod diff_impl;
mod fs_repo;
mod objects_impl;
mod refs_impl;
mod tree_impl;

pub use commit_impl::{Ancestry, decode_commit, encode_commit};
pub use diff_impl::{BuiltinDiff, DiffRenderer, ExternalDiff, compare_trees, diff_flat_trees};
pub use error::StoreError;
pub use fs_repo::{CONTROL_DIR, FsRepo};
pub use refs_impl::CURRENT_POSITION;
pub use repo::SnapshotRepo;
pub use tree_impl::{MAX_TREE_DEPTH, decode_tree, encode_tree};
pub use types::{
    Change, ChangeType, Commit, EntryKind, FlatTree, IdParseError, KindParseError, ObjectId,
    ObjectKind, RefName, RefNameError, RefValue, TreeEntry,
};
