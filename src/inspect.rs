//! Plumbing: direct object access and store verification.

use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use cairn_store::{ObjectKind, SnapshotRepo};

use crate::Session;

pub fn hash_object(session: &Session, file: &Path) -> Result<()> {
    let data =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let id = session.repo.put_object(&data, ObjectKind::Blob)?;
    println!("{id}");
    Ok(())
}

pub fn cat_file(session: &Session, object: &str, kind: Option<ObjectKind>) -> Result<()> {
    let id = session.repo.resolve_name(object)?;
    let payload = session.repo.get_object(id, kind)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&payload)?;
    stdout.flush()?;
    Ok(())
}

pub fn write_tree(session: &Session) -> Result<()> {
    let id = session.repo.snapshot()?;
    println!("{id}");
    Ok(())
}

pub fn read_tree(session: &Session, tree: &str) -> Result<()> {
    let id = session.repo.resolve_name(tree)?;
    session
        .repo
        .read_tree_into_workdir(id)
        .with_context(|| format!("Failed to restore tree {id}"))?;
    Ok(())
}

pub fn fsck(session: &Session) -> Result<()> {
    let objects = session.repo.list_objects()?;
    let failures = session.repo.verify_all()?;
    for (id, error) in &failures {
        println!("bad {id}: {error}");
    }
    if !failures.is_empty() {
        bail!(
            "{} of {} objects failed verification",
            failures.len(),
            objects.len()
        );
    }
    println!("{} objects ok", objects.len());
    Ok(())
}
