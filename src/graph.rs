//! Graphviz description of refs and commit ancestry.
//!
//! Every listed ref is fully dereferenced before it seeds the ancestry walk,
//! so a symbolic `HEAD` and the branch it names both point at the same
//! commit node.

use std::fmt::Write as _;

use cairn_store::{ObjectId, ObjectKind, RefName, SnapshotRepo, StoreError};
use tracing::debug;

/// Characters of an id shown in node labels.
const SHORT_ID_LEN: usize = 10;

/// Render the repository's refs and reachable commits as a `dot` digraph.
///
/// Ref nodes are drawn as notes with an edge to the commit they resolve to.
/// Commit nodes are boxes labelled with a short id and the first message
/// line, with an edge to their parent.
///
/// # Errors
/// Fails if a ref cannot be resolved or a reachable commit cannot be read.
/// Refs naming a stored tree or blob are left out of the graph.
pub fn render_dot(repo: &dyn SnapshotRepo) -> Result<String, StoreError> {
    let mut refs: Vec<(RefName, ObjectId)> = Vec::new();
    for (name, value) in repo.list_refs("", true)? {
        let Some(id) = value.id() else { continue };
        // `update_ref` does not check kinds, so a slot may hold a tree or blob.
        if repo.object_kind(id)? != ObjectKind::Commit {
            debug!(%name, %id, "skipping ref that does not name a commit");
            continue;
        }
        refs.push((name, id));
    }
    let seeds: Vec<ObjectId> = refs.iter().map(|(_, id)| *id).collect();

    let mut out = String::from("digraph commits {\n");
    for (name, id) in &refs {
        let _ = writeln!(out, "  \"{name}\" [shape=note];");
        let _ = writeln!(out, "  \"{name}\" -> \"{id}\";");
    }
    for id in repo.iter_ancestry(&seeds) {
        let id = id?;
        let commit = repo.read_commit(id)?;
        let hex = id.to_string();
        let short = &hex[..SHORT_ID_LEN];
        let summary = commit.message.lines().next().unwrap_or_default();
        let _ = writeln!(
            out,
            "  \"{id}\" [shape=box, style=filled, label=\"{short}\\n{}\"];",
            escape(summary)
        );
        if let Some(parent) = commit.parent {
            let _ = writeln!(out, "  \"{id}\" -> \"{parent}\";");
        }
    }
    out.push_str("}\n");
    Ok(out)
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
