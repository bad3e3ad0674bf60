use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cairn::config::{CONFIG_FILE, CairnConfig};
use cairn_store::{FsRepo, ObjectKind};
use clap::{Parser, Subcommand};

mod history;
mod init;
mod inspect;
mod position;

/// Content-addressed snapshots of a directory, with branches and tags
///
/// cairn records the whole working directory as immutable objects and
/// keeps a handful of named refs pointing into them. `HEAD` is the current
/// position: attached to a branch that every commit advances, or detached
/// at a specific commit.
///
/// QUICK START:
///
///   cairn init
///   cairn commit -m "first snapshot"
///   cairn branch experiment
///   cairn checkout experiment
///   cairn log
///
/// NAMES:
///
///   Anywhere a commit is expected you may pass `@` (HEAD), a branch or tag
///   name, a full ref path such as `refs/tags/v1`, or a 40-character id.
#[derive(Parser)]
#[command(name = "cairn")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'cairn <command> --help' for more information on a specific command.")]
struct Cli {
    /// Repository root (the directory holding `.cairn/`)
    #[arg(long, global = true, env = "CAIRN_DIR", value_name = "PATH")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty repository
    ///
    /// Writes `.cairn/` with an object store, empty ref namespaces, a
    /// default `config.toml`, and `HEAD` attached to the default branch.
    Init {
        /// Branch `HEAD` starts on (overrides the default `main`)
        #[arg(long, short = 'b')]
        branch: Option<String>,
    },

    /// Store a file as a blob and print its id
    HashObject {
        /// File to store
        file: PathBuf,
    },

    /// Print the raw payload of an object
    CatFile {
        /// Object id or name
        object: String,

        /// Fail unless the object has this kind (blob, tree, commit)
        #[arg(long)]
        kind: Option<ObjectKind>,
    },

    /// Snapshot the working directory and print the tree id
    WriteTree,

    /// Replace the working directory with the contents of a tree
    ///
    /// HEAD does not move.
    ReadTree {
        /// Tree id or name
        tree: String,
    },

    /// Snapshot the working directory as a new commit on HEAD
    Commit {
        /// Commit message
        #[arg(long, short)]
        message: String,
    },

    /// Show commit history
    Log {
        /// Where to start (default: HEAD)
        #[arg(default_value = "@")]
        name: String,
    },

    /// Restore a commit into the working directory and move HEAD to it
    ///
    /// Checking out a branch attaches HEAD to it; anything else detaches.
    Checkout {
        /// Branch, tag, or commit id
        name: String,
    },

    /// List branches, or create one
    Branch {
        /// Name of the branch to create; lists branches when omitted
        name: Option<String>,

        /// Commit the new branch points at (default: HEAD)
        #[arg(default_value = "@")]
        start: String,
    },

    /// Create a tag
    ///
    /// Tags are fixed once written; tagging an existing name fails.
    Tag {
        /// Tag name
        name: String,

        /// Commit the tag points at (default: HEAD)
        #[arg(default_value = "@")]
        target: String,
    },

    /// Show a commit and its changes against its parent
    Show {
        /// Commit to show (default: HEAD)
        #[arg(default_value = "@")]
        name: String,
    },

    /// Show changes between two commits or trees
    Diff {
        /// Old side
        old: String,
        /// New side
        new: String,
    },

    /// Report the current position and uncommitted changes
    Status,

    /// Move the current branch (or detached HEAD) to a commit
    ///
    /// The working directory is left as it is.
    Reset {
        /// Commit to move to
        name: String,
    },

    /// Print a Graphviz description of refs and commit ancestry
    ///
    /// Pipe into `dot -Tsvg` to render.
    #[command(name = "k")]
    Graph,

    /// Verify every stored object against its id
    Fsck,
}

/// An opened repository and its configuration.
struct Session {
    repo: FsRepo,
    config: CairnConfig,
}

impl Session {
    fn open(root: &Path) -> Result<Self> {
        let repo = FsRepo::open(root)
            .with_context(|| format!("Failed to open repository at {}", root.display()))?;
        let config = CairnConfig::load(&repo.control_dir().join(CONFIG_FILE))?;
        Ok(Self { repo, config })
    }
}

fn main() -> Result<()> {
    let _telemetry = cairn::telemetry::init();
    let cli = Cli::parse();

    let root = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let open = || Session::open(&root);

    match cli.command {
        Commands::Init { branch } => init::run(&root, branch.as_deref()),
        Commands::HashObject { file } => inspect::hash_object(&open()?, &file),
        Commands::CatFile { object, kind } => inspect::cat_file(&open()?, &object, kind),
        Commands::WriteTree => inspect::write_tree(&open()?),
        Commands::ReadTree { tree } => inspect::read_tree(&open()?, &tree),
        Commands::Fsck => inspect::fsck(&open()?),
        Commands::Commit { message } => history::commit(&open()?, &message),
        Commands::Log { name } => history::log(&open()?, &name),
        Commands::Show { name } => history::show(&open()?, &name),
        Commands::Diff { old, new } => history::diff(&open()?, &old, &new),
        Commands::Graph => history::graph(&open()?),
        Commands::Checkout { name } => position::checkout(&open()?, &name),
        Commands::Branch { name, start } => position::branch(&open()?, name.as_deref(), &start),
        Commands::Tag { name, target } => position::tag(&open()?, &name, &target),
        Commands::Status => position::status(&open()?),
        Commands::Reset { name } => position::reset(&open()?, &name),
    }
}
