//! The filesystem-backed implementation of [`SnapshotRepo`].

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::commit_impl::Ancestry;
use crate::diff_impl::DiffRenderer;
use crate::error::StoreError;
use crate::repo::SnapshotRepo;
use crate::types::*;

/// Name of the control directory at the root of every repository.
pub const CONTROL_DIR: &str = ".cairn";

/// A [`SnapshotRepo`] stored under `<workdir>/.cairn/`.
///
/// ```text
/// .cairn/
/// ├── HEAD              ← `ref: refs/heads/main` or a 40-hex id
/// ├── config.toml       ← read by the command surface, not by the store
/// ├── objects/<id>      ← `<kind> 0x00 <payload>`
/// └── refs/
///     ├── heads/<name>
///     └── tags/<name>
/// ```
///
/// Construct via [`FsRepo::init`] or [`FsRepo::open`]. The handle is the
/// only repository state; nothing is kept in globals.
#[derive(Debug, Clone)]
pub struct FsRepo {
    pub(crate) workdir: PathBuf,
    pub(crate) control: PathBuf,
}

impl FsRepo {
    /// Create the control directory under `workdir` and return a handle.
    ///
    /// `HEAD` is set symbolically to `refs/heads/<default_branch>`, which
    /// stays unset until the first commit.
    ///
    /// # Errors
    /// Returns [`StoreError::AlreadyInitialized`] if `.cairn/` exists, or an
    /// I/O error if the directories cannot be created.
    #[instrument(skip_all, fields(workdir = %workdir.display()))]
    pub fn init(workdir: &Path, default_branch: &str) -> Result<Self, StoreError> {
        let control = workdir.join(CONTROL_DIR);
        if control.exists() {
            return Err(StoreError::AlreadyInitialized { path: control });
        }
        let head_target = RefName::branch(default_branch)?;
        fs::create_dir_all(control.join("objects"))?;
        fs::create_dir_all(control.join("refs").join("heads"))?;
        fs::create_dir_all(control.join("refs").join("tags"))?;
        let repo = Self {
            workdir: workdir.to_path_buf(),
            control,
        };
        repo.update_ref(&RefName::head(), &RefValue::Symbolic(head_target), false)?;
        debug!("initialized repository");
        Ok(repo)
    }

    /// Open the repository whose working directory is exactly `workdir`.
    ///
    /// # Errors
    /// Returns [`StoreError::NotARepository`] if `workdir/.cairn` is not a
    /// directory.
    pub fn open(workdir: &Path) -> Result<Self, StoreError> {
        let control = workdir.join(CONTROL_DIR);
        if !control.is_dir() {
            return Err(StoreError::NotARepository {
                path: workdir.to_path_buf(),
            });
        }
        Ok(Self {
            workdir: workdir.to_path_buf(),
            control,
        })
    }

    /// Path of the control directory.
    #[must_use]
    pub fn control_dir(&self) -> &Path {
        &self.control
    }

    pub(crate) fn objects_dir(&self) -> PathBuf {
        self.control.join("objects")
    }

    pub(crate) fn object_path(&self, id: ObjectId) -> PathBuf {
        self.objects_dir().join(id.to_string())
    }

    pub(crate) fn ref_path(&self, name: &RefName) -> PathBuf {
        // RefName validation guarantees every component is a plain name.
        name.as_str()
            .split('/')
            .fold(self.control.clone(), |path, component| path.join(component))
    }

    /// Write `bytes` to `path` through a temp file in the control directory
    /// and a rename, so readers never see a partial file.
    pub(crate) fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = tempfile::NamedTempFile::new_in(&self.control)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

/// Return `true` if `name` is the control directory and must never be
/// snapshotted or cleared.
pub(crate) fn is_ignored(name: &std::ffi::OsStr) -> bool {
    name == CONTROL_DIR
}

impl SnapshotRepo for FsRepo {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    // === Objects ===
    fn put_object(&self, payload: &[u8], kind: ObjectKind) -> Result<ObjectId, StoreError> {
        crate::objects_impl::put_object(self, payload, kind)
    }

    fn get_object(
        &self,
        id: ObjectId,
        expected: Option<ObjectKind>,
    ) -> Result<Vec<u8>, StoreError> {
        crate::objects_impl::get_object(self, id, expected)
    }

    fn object_kind(&self, id: ObjectId) -> Result<ObjectKind, StoreError> {
        crate::objects_impl::object_kind(self, id)
    }

    fn has_object(&self, id: ObjectId) -> Result<bool, StoreError> {
        crate::objects_impl::has_object(self, id)
    }

    fn list_objects(&self) -> Result<Vec<ObjectId>, StoreError> {
        crate::objects_impl::list_objects(self)
    }

    fn verify_object(&self, id: ObjectId) -> Result<(), StoreError> {
        crate::objects_impl::verify_object(self, id)
    }

    // === Trees ===
    fn write_tree(&self, dir: &Path) -> Result<ObjectId, StoreError> {
        crate::tree_impl::write_tree(self, dir)
    }

    fn read_tree(&self, id: ObjectId) -> Result<Vec<TreeEntry>, StoreError> {
        crate::tree_impl::read_tree(self, id)
    }

    fn read_tree_flat(&self, id: ObjectId) -> Result<FlatTree, StoreError> {
        crate::tree_impl::read_tree_flat(self, id)
    }

    // === Commits ===
    fn write_commit(
        &self,
        tree: ObjectId,
        parent: Option<ObjectId>,
        message: &str,
    ) -> Result<ObjectId, StoreError> {
        crate::commit_impl::write_commit(self, tree, parent, message)
    }

    fn read_commit(&self, id: ObjectId) -> Result<Commit, StoreError> {
        crate::commit_impl::read_commit(self, id)
    }

    fn iter_ancestry(&self, seeds: &[ObjectId]) -> Ancestry<'_> {
        Ancestry::new(self, seeds)
    }

    // === Refs ===
    fn update_ref(&self, name: &RefName, value: &RefValue, deref: bool) -> Result<(), StoreError> {
        crate::refs_impl::update_ref(self, name, value, deref)
    }

    fn resolve_ref(&self, name: &RefName, deref: bool) -> Result<RefValue, StoreError> {
        crate::refs_impl::resolve_ref(self, name, deref)
    }

    fn list_refs(&self, prefix: &str, deref: bool) -> Result<Vec<(RefName, RefValue)>, StoreError> {
        crate::refs_impl::list_refs(self, prefix, deref)
    }

    // === Names ===
    fn resolve_name(&self, text: &str) -> Result<ObjectId, StoreError> {
        crate::refs_impl::resolve_name(self, text)
    }

    // === Working directory ===
    fn read_tree_into_workdir(&self, tree: ObjectId) -> Result<(), StoreError> {
        crate::checkout_impl::read_tree_into_workdir(self, tree)
    }

    fn checkout(&self, name: &str) -> Result<ObjectId, StoreError> {
        crate::checkout_impl::checkout(self, name)
    }

    // === Diff ===
    fn diff_trees(
        &self,
        old: Option<ObjectId>,
        new: ObjectId,
        renderer: &dyn DiffRenderer,
    ) -> Result<Vec<u8>, StoreError> {
        crate::diff_impl::diff_trees(self, old, new, renderer)
    }
}
