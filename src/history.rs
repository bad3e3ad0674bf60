//! Commands that record or read commit history.

use std::collections::BTreeMap;
use std::io::Write as _;

use anyhow::{Context, Result};
use cairn_store::{Commit, ObjectId, ObjectKind, SnapshotRepo};

use crate::Session;

pub fn commit(session: &Session, message: &str) -> Result<()> {
    let id = session.repo.commit(message)?;
    println!("{id}");
    Ok(())
}

pub fn log(session: &Session, name: &str) -> Result<()> {
    let start = session.repo.resolve_name(name)?;
    let labels = ref_labels(session)?;
    let mut stdout = std::io::stdout().lock();
    for id in session.repo.iter_ancestry(&[start]) {
        let id = id?;
        let commit = session.repo.read_commit(id)?;
        write_header(&mut stdout, id, &commit, labels.get(&id))?;
    }
    Ok(())
}

pub fn show(session: &Session, name: &str) -> Result<()> {
    let id = session.repo.resolve_name(name)?;
    let commit = session.repo.read_commit(id)?;
    let parent_tree = match commit.parent {
        Some(parent) => Some(session.repo.read_commit(parent)?.tree),
        None => None,
    };

    let labels = ref_labels(session)?;
    let renderer = session.config.diff.renderer();
    let diff = session
        .repo
        .diff_trees(parent_tree, commit.tree, renderer.as_ref())?;

    let mut stdout = std::io::stdout().lock();
    write_header(&mut stdout, id, &commit, labels.get(&id))?;
    stdout.write_all(&diff)?;
    stdout.flush()?;
    Ok(())
}

pub fn diff(session: &Session, old: &str, new: &str) -> Result<()> {
    let old = tree_of(session, old)?;
    let new = tree_of(session, new)?;
    let renderer = session.config.diff.renderer();
    let diff = session
        .repo
        .diff_trees(Some(old), new, renderer.as_ref())?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&diff)?;
    stdout.flush()?;
    Ok(())
}

pub fn graph(session: &Session) -> Result<()> {
    let dot = cairn::graph::render_dot(&session.repo)?;
    print!("{dot}");
    Ok(())
}

/// Resolve `name` and accept either a commit (using its tree) or a tree.
fn tree_of(session: &Session, name: &str) -> Result<ObjectId> {
    let id = session.repo.resolve_name(name)?;
    match session.repo.object_kind(id)? {
        ObjectKind::Commit => Ok(session.repo.read_commit(id)?.tree),
        ObjectKind::Tree => Ok(id),
        ObjectKind::Blob => {
            anyhow::bail!("{name} names a blob; expected a commit or tree")
        }
    }
}

/// Ref names grouped by the commit they resolve to, for decorating output.
fn ref_labels(session: &Session) -> Result<BTreeMap<ObjectId, Vec<String>>> {
    let mut labels: BTreeMap<ObjectId, Vec<String>> = BTreeMap::new();
    let refs = session
        .repo
        .list_refs("", true)
        .context("Failed to list refs")?;
    for (name, value) in refs {
        if let Some(id) = value.id() {
            labels.entry(id).or_default().push(name.to_string());
        }
    }
    Ok(labels)
}

fn write_header(
    out: &mut impl std::io::Write,
    id: ObjectId,
    commit: &Commit,
    labels: Option<&Vec<String>>,
) -> std::io::Result<()> {
    match labels {
        Some(labels) => writeln!(out, "commit {id} ({})", labels.join(", "))?,
        None => writeln!(out, "commit {id}")?,
    }
    if let Some(parent) = commit.parent {
        writeln!(out, "parent {parent}")?;
    }
    writeln!(out)?;
    for line in commit.message.lines() {
        writeln!(out, "    {line}")?;
    }
    writeln!(out)
}
