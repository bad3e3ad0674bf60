//! Ref storage, symbolic indirection, and short-name resolution.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, trace};

use crate::error::StoreError;
use crate::fs_repo::FsRepo;
use crate::types::*;

/// Marker that starts a symbolic ref slot.
const SYMBOLIC_MARKER: &str = "ref: ";

/// Token that [`resolve_name`] reads as `HEAD`.
pub const CURRENT_POSITION: &str = "@";

/// Read one slot without following indirection.
fn read_slot(repo: &FsRepo, name: &RefName) -> Result<RefValue, StoreError> {
    let path = repo.ref_path(name);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        // A namespace directory such as `refs/heads` is not a slot.
        Err(e) if e.kind() == io::ErrorKind::NotFound || path.is_dir() => {
            return Ok(RefValue::Direct(None));
        }
        Err(e) => return Err(StoreError::Io(e)),
    };
    let value = raw.trim_end();
    let malformed = || StoreError::MalformedRef {
        ref_name: name.to_string(),
        raw: raw.clone(),
    };
    if value.is_empty() {
        return Ok(RefValue::Direct(None));
    }
    if let Some(target) = value.strip_prefix(SYMBOLIC_MARKER) {
        let target = RefName::new(target.trim()).map_err(|_| malformed())?;
        return Ok(RefValue::Symbolic(target));
    }
    let id: ObjectId = value.parse().map_err(|_| malformed())?;
    Ok(RefValue::Direct(Some(id)))
}

/// Follow indirection from `name` to the last slot in the chain: the first
/// one that is direct or unset.
///
/// Returns that slot's name and value. Revisiting a name is a
/// [`StoreError::ReferenceCycle`].
fn final_slot(repo: &FsRepo, name: &RefName) -> Result<(RefName, RefValue), StoreError> {
    let mut seen = HashSet::new();
    let mut chain = Vec::new();
    let mut current = name.clone();
    loop {
        chain.push(current.to_string());
        if !seen.insert(current.clone()) {
            return Err(StoreError::ReferenceCycle { chain });
        }
        match read_slot(repo, &current)? {
            RefValue::Symbolic(target) => {
                trace!(from = %current, to = %target, "following symbolic ref");
                current = target;
            }
            direct @ RefValue::Direct(_) => return Ok((current, direct)),
        }
    }
}

pub fn resolve_ref(repo: &FsRepo, name: &RefName, deref: bool) -> Result<RefValue, StoreError> {
    if deref {
        final_slot(repo, name).map(|(_, value)| value)
    } else {
        read_slot(repo, name)
    }
}

pub fn update_ref(
    repo: &FsRepo,
    name: &RefName,
    value: &RefValue,
    deref: bool,
) -> Result<(), StoreError> {
    if value.is_unset() {
        return Err(StoreError::EmptyTarget {
            ref_name: name.to_string(),
        });
    }
    let slot = if deref {
        final_slot(repo, name)?.0
    } else {
        name.clone()
    };
    repo.write_atomic(&repo.ref_path(&slot), value.to_string().as_bytes())?;
    debug!(ref_name = %name, slot = %slot, %value, "updated ref");
    Ok(())
}

pub fn list_refs(
    repo: &FsRepo,
    prefix: &str,
    deref: bool,
) -> Result<Vec<(RefName, RefValue)>, StoreError> {
    let mut names = Vec::new();
    collect_ref_names(&repo.control.join("refs"), "refs", &mut names)?;
    names.sort();

    let mut out = Vec::new();
    for name in std::iter::once(RefName::head()).chain(names) {
        if !name.as_str().starts_with(prefix) {
            continue;
        }
        let value = resolve_ref(repo, &name, deref)?;
        if !value.is_unset() {
            out.push((name, value));
        }
    }
    Ok(out)
}

fn collect_ref_names(dir: &Path, base: &str, out: &mut Vec<RefName>) -> Result<(), StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StoreError::Io(e)),
    };
    for entry in entries {
        let entry = entry?;
        let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let full = format!("{base}/{file_name}");
        if entry.file_type()?.is_dir() {
            collect_ref_names(&entry.path(), &full, out)?;
        } else if let Ok(name) = RefName::new(&full) {
            out.push(name);
        }
    }
    Ok(())
}

pub fn resolve_name(repo: &FsRepo, text: &str) -> Result<ObjectId, StoreError> {
    let text = if text == CURRENT_POSITION { HEAD } else { text };

    let candidates = [
        text.to_owned(),
        format!("refs/{text}"),
        format!("{TAGS_PREFIX}{text}"),
        format!("{HEADS_PREFIX}{text}"),
    ];
    for candidate in &candidates {
        let Ok(name) = RefName::new(candidate) else {
            continue;
        };
        if read_slot(repo, &name)?.is_unset() {
            continue;
        }
        // The first set slot wins, even if it dereferences to nothing.
        return match resolve_ref(repo, &name, true)?.id() {
            Some(id) => {
                trace!(%text, ref_name = %name, %id, "resolved name via ref");
                Ok(id)
            }
            None => Err(StoreError::UnknownName {
                name: text.to_owned(),
            }),
        };
    }

    if ObjectId::looks_like_id(text) {
        return text.parse().map_err(|_| StoreError::UnknownName {
            name: text.to_owned(),
        });
    }
    Err(StoreError::UnknownName {
        name: text.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::SnapshotRepo;

    fn repo() -> (tempfile::TempDir, FsRepo) {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsRepo::init(dir.path(), "main").unwrap();
        (dir, repo)
    }

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_bytes([byte; 20])
    }

    fn main_ref() -> RefName {
        RefName::branch("main").unwrap()
    }

    fn stored_commit(repo: &FsRepo, message: &str) -> ObjectId {
        let tree = repo.put_object(b"", ObjectKind::Tree).unwrap();
        repo.write_commit(tree, None, message).unwrap()
    }

    #[test]
    fn ref_directory_is_an_unset_slot() {
        let (_dir, repo) = repo();
        let nested = RefName::branch("feature/x").unwrap();
        repo.update_ref(&nested, &RefValue::Direct(Some(id(3))), false)
            .unwrap();

        let namespace = RefName::new("refs/heads").unwrap();
        assert!(repo.resolve_ref(&namespace, true).unwrap().is_unset());
        assert!(
            repo.resolve_ref(&RefName::branch("feature").unwrap(), false)
                .unwrap()
                .is_unset()
        );
        for text in ["heads", "feature", "refs/heads"] {
            assert!(
                matches!(repo.resolve_name(text), Err(StoreError::UnknownName { .. })),
                "{text}"
            );
        }
        assert_eq!(repo.resolve_name("feature/x").unwrap(), id(3));
    }

    #[test]
    fn unwritten_slot_is_unset() {
        let (_dir, repo) = repo();
        let value = repo.resolve_ref(&RefName::tag("nope").unwrap(), true).unwrap();
        assert_eq!(value, RefValue::Direct(None));
    }

    #[test]
    fn head_through_unborn_branch_is_unset() {
        let (_dir, repo) = repo();
        assert_eq!(
            repo.resolve_ref(&RefName::head(), true).unwrap(),
            RefValue::Direct(None)
        );
        assert_eq!(
            repo.resolve_ref(&RefName::head(), false).unwrap(),
            RefValue::Symbolic(main_ref())
        );
    }

    #[test]
    fn deref_write_lands_on_branch() {
        let (_dir, repo) = repo();
        repo.update_ref(&RefName::head(), &RefValue::Direct(Some(id(7))), true)
            .unwrap();
        assert_eq!(
            repo.resolve_ref(&main_ref(), false).unwrap(),
            RefValue::Direct(Some(id(7)))
        );
        assert!(repo.resolve_ref(&RefName::head(), false).unwrap().is_symbolic());
    }

    #[test]
    fn literal_write_detaches_head() {
        let (_dir, repo) = repo();
        repo.update_ref(&RefName::head(), &RefValue::Direct(Some(id(7))), false)
            .unwrap();
        assert_eq!(
            repo.resolve_ref(&RefName::head(), false).unwrap(),
            RefValue::Direct(Some(id(7)))
        );
        assert!(repo.resolve_ref(&main_ref(), false).unwrap().is_unset());
    }

    #[test]
    fn empty_target_is_rejected_before_write() {
        let (_dir, repo) = repo();
        let err = repo
            .update_ref(&main_ref(), &RefValue::Direct(None), false)
            .unwrap_err();
        assert!(matches!(err, StoreError::EmptyTarget { .. }));
        assert!(!repo.ref_path(&main_ref()).exists());
    }

    #[test]
    fn cycle_is_reported_not_looped() {
        let (_dir, repo) = repo();
        let a = RefName::branch("a").unwrap();
        let b = RefName::branch("b").unwrap();
        repo.update_ref(&a, &RefValue::Symbolic(b.clone()), false).unwrap();
        repo.update_ref(&b, &RefValue::Symbolic(a.clone()), false).unwrap();
        let err = repo.resolve_ref(&a, true).unwrap_err();
        match err {
            StoreError::ReferenceCycle { chain } => {
                assert_eq!(chain, vec!["refs/heads/a", "refs/heads/b", "refs/heads/a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(matches!(
            repo.update_ref(&a, &RefValue::Direct(Some(id(1))), true),
            Err(StoreError::ReferenceCycle { .. })
        ));
    }

    #[test]
    fn slot_is_written_without_trailing_newline() {
        let (_dir, repo) = repo();
        repo.update_ref(&main_ref(), &RefValue::Direct(Some(id(0xab))), false)
            .unwrap();
        let raw = std::fs::read_to_string(repo.ref_path(&main_ref())).unwrap();
        assert_eq!(raw, "ab".repeat(20));
    }

    #[test]
    fn hand_edited_slot_with_newline_still_reads() {
        let (_dir, repo) = repo();
        std::fs::write(repo.ref_path(&main_ref()), format!("{}\n", id(3))).unwrap();
        assert_eq!(
            repo.resolve_ref(&main_ref(), false).unwrap(),
            RefValue::Direct(Some(id(3)))
        );
    }

    #[test]
    fn garbage_slot_is_malformed() {
        let (_dir, repo) = repo();
        std::fs::write(repo.ref_path(&main_ref()), "not an id").unwrap();
        assert!(matches!(
            repo.resolve_ref(&main_ref(), false).unwrap_err(),
            StoreError::MalformedRef { .. }
        ));
    }

    #[test]
    fn list_is_sorted_with_head_first() {
        let (_dir, repo) = repo();
        repo.update_ref(&RefName::head(), &RefValue::Direct(Some(id(1))), true)
            .unwrap();
        let c = stored_commit(&repo, "c");
        repo.create_branch("zeta", c).unwrap();
        repo.create_tag("v1", c).unwrap();
        let names: Vec<String> = repo
            .list_refs("", true)
            .unwrap()
            .into_iter()
            .map(|(n, _)| n.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["HEAD", "refs/heads/main", "refs/heads/zeta", "refs/tags/v1"]
        );
    }

    #[test]
    fn list_filters_by_prefix_and_skips_unset() {
        let (_dir, repo) = repo();
        let c = stored_commit(&repo, "c");
        repo.create_tag("v1", c).unwrap();
        let refs = repo.list_refs(HEADS_PREFIX, true).unwrap();
        assert!(refs.is_empty());
        let tags = repo.list_refs(TAGS_PREFIX, true).unwrap();
        assert_eq!(tags, vec![(RefName::tag("v1").unwrap(), RefValue::Direct(Some(c)))]);
    }

    #[test]
    fn literal_listing_keeps_symbolic_head() {
        let (_dir, repo) = repo();
        let refs = repo.list_refs("HEAD", false).unwrap();
        assert_eq!(refs, vec![(RefName::head(), RefValue::Symbolic(main_ref()))]);
    }

    #[test]
    fn name_precedence_prefers_tags_over_branches() {
        let (_dir, repo) = repo();
        let on_branch = stored_commit(&repo, "branch");
        let on_tag = stored_commit(&repo, "tag");
        repo.create_branch("dup", on_branch).unwrap();
        repo.create_tag("dup", on_tag).unwrap();
        assert_eq!(repo.resolve_name("dup").unwrap(), on_tag);
        assert_eq!(repo.resolve_name("heads/dup").unwrap(), on_branch);
        assert_eq!(repo.resolve_name("refs/heads/dup").unwrap(), on_branch);
    }

    #[test]
    fn at_sign_means_head() {
        let (_dir, repo) = repo();
        repo.update_ref(&RefName::head(), &RefValue::Direct(Some(id(9))), true)
            .unwrap();
        assert_eq!(repo.resolve_name("@").unwrap(), id(9));
        assert_eq!(repo.resolve_name("HEAD").unwrap(), id(9));
    }

    #[test]
    fn raw_hex_id_is_accepted() {
        let (_dir, repo) = repo();
        let hex = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(repo.resolve_name(hex).unwrap().to_string(), hex);
    }

    #[test]
    fn short_or_non_hex_unknown() {
        let (_dir, repo) = repo();
        let not_hex = "z".repeat(40);
        for text in ["0123456789abcdef0123456789abcdef0123456", not_hex.as_str(), "nope"] {
            assert!(
                matches!(repo.resolve_name(text), Err(StoreError::UnknownName { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn unborn_head_is_unknown_name() {
        let (_dir, repo) = repo();
        assert!(matches!(
            repo.resolve_name("@"),
            Err(StoreError::UnknownName { .. })
        ));
    }
}
