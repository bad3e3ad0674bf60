//! Commands that move or report the current position (`HEAD`, branches, tags).

use anyhow::{Context, Result};
use cairn_store::{ChangeType, FlatTree, SnapshotRepo, compare_trees};

use crate::Session;

pub fn checkout(session: &Session, name: &str) -> Result<()> {
    let id = session
        .repo
        .checkout(name)
        .with_context(|| format!("Failed to check out {name}"))?;
    match session.repo.current_branch()? {
        Some(branch) => println!("Switched to branch '{branch}'"),
        None => println!("HEAD is now at {id}"),
    }
    Ok(())
}

pub fn branch(session: &Session, name: Option<&str>, start: &str) -> Result<()> {
    let Some(name) = name else {
        let current = session.repo.current_branch()?;
        for branch in session.repo.list_branches()? {
            let marker = if current.as_deref() == Some(branch.as_str()) {
                "*"
            } else {
                " "
            };
            println!("{marker} {branch}");
        }
        return Ok(());
    };

    let id = session.repo.resolve_name(start)?;
    session.repo.create_branch(name, id)?;
    println!("Branch {name} created at {id}");
    Ok(())
}

pub fn tag(session: &Session, name: &str, target: &str) -> Result<()> {
    let id = session.repo.resolve_name(target)?;
    session.repo.create_tag(name, id)?;
    println!("Tag {name} created at {id}");
    Ok(())
}

pub fn status(session: &Session) -> Result<()> {
    let head = session.repo.head_id()?;
    match (session.repo.current_branch()?, head) {
        (Some(branch), Some(_)) => println!("On branch {branch}"),
        (Some(branch), None) => println!("On branch {branch} (no commits yet)"),
        (None, Some(id)) => println!("HEAD detached at {id}"),
        (None, None) => println!("HEAD is unset"),
    }

    let committed = match head {
        Some(id) => session
            .repo
            .read_tree_flat(session.repo.read_commit(id)?.tree)?,
        None => FlatTree::new(),
    };
    let working = session.repo.read_tree_flat(session.repo.snapshot()?)?;
    let changes: Vec<_> = compare_trees(&committed, &working)
        .into_iter()
        .filter(|c| c.is_changed())
        .collect();
    if changes.is_empty() {
        return Ok(());
    }

    println!();
    println!("Changes since last commit:");
    for change in changes {
        let label = match change.change_type() {
            ChangeType::Added => "new file",
            ChangeType::Deleted => "deleted",
            ChangeType::Modified | ChangeType::Unchanged => "modified",
        };
        println!("  {label}: {}", change.path);
    }
    Ok(())
}

pub fn reset(session: &Session, name: &str) -> Result<()> {
    let id = session.repo.resolve_name(name)?;
    session.repo.reset(id)?;
    println!("HEAD is now at {id}");
    Ok(())
}
