//! End-to-end tests driving the `cairn` binary in temp directories.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let repo = Self { dir };
        repo.cairn_ok(&["init"]);
        repo
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cairn(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_cairn"))
            .args(args)
            .current_dir(self.path())
            .env_remove("CAIRN_DIR")
            .env_remove("CAIRN_LOG")
            .output()
            .expect("failed to run cairn")
    }

    fn cairn_ok(&self, args: &[&str]) -> String {
        let out = self.cairn(args);
        assert!(
            out.status.success(),
            "cairn {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8(out.stdout).expect("stdout should be UTF-8")
    }

    fn cairn_err(&self, args: &[&str]) -> String {
        let out = self.cairn(args);
        assert!(!out.status.success(), "cairn {args:?} unexpectedly succeeded");
        String::from_utf8_lossy(&out.stderr).into_owned()
    }

    fn write(&self, rel: &str, contents: &str) {
        let path = self.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel)).unwrap()
    }

    fn use_builtin_diff(&self) {
        std::fs::write(
            self.path().join(".cairn/config.toml"),
            "[diff]\nrenderer = \"builtin\"\n",
        )
        .unwrap();
    }

    fn commit(&self, message: &str) -> String {
        self.cairn_ok(&["commit", "-m", message]).trim().to_owned()
    }
}

#[test]
fn init_lays_out_control_dir() {
    let repo = TestRepo::new();
    let control = repo.path().join(".cairn");
    assert!(control.join("objects").is_dir());
    assert!(control.join("refs/heads").is_dir());
    assert!(control.join("refs/tags").is_dir());
    assert_eq!(repo.read(".cairn/HEAD"), "ref: refs/heads/main");
    assert!(repo.read(".cairn/config.toml").contains("default_branch = \"main\""));
}

#[test]
fn init_twice_fails() {
    let repo = TestRepo::new();
    let stderr = repo.cairn_err(&["init"]);
    assert!(stderr.contains("already"), "{stderr}");
}

#[test]
fn init_with_branch_option() {
    let dir = TempDir::new().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_cairn"))
        .args(["init", "--branch", "trunk"])
        .env("CAIRN_DIR", dir.path())
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(
        std::fs::read_to_string(dir.path().join(".cairn/HEAD")).unwrap(),
        "ref: refs/heads/trunk"
    );
}

#[test]
fn init_with_non_ascii_branch_config_reloads() {
    let dir = TempDir::new().unwrap();
    let cairn = |args: &[&str]| {
        Command::new(env!("CARGO_BIN_EXE_cairn"))
            .args(args)
            .env("CAIRN_DIR", dir.path())
            .env_remove("CAIRN_LOG")
            .output()
            .unwrap()
    };
    assert!(cairn(&["init", "-b", "café"]).status.success());
    let config = std::fs::read_to_string(dir.path().join(".cairn/config.toml")).unwrap();
    assert!(config.contains("default_branch = \"café\""), "{config}");

    let out = cairn(&["status"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("On branch café"));
}

#[test]
fn commands_outside_a_repository_fail() {
    let dir = TempDir::new().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_cairn"))
        .arg("status")
        .current_dir(dir.path())
        .env_remove("CAIRN_DIR")
        .output()
        .unwrap();
    assert!(!out.status.success());
}

#[test]
fn hash_object_then_cat_file() {
    let repo = TestRepo::new();
    repo.write("note.txt", "hello\n");
    let id = repo.cairn_ok(&["hash-object", "note.txt"]);
    let id = id.trim();
    assert_eq!(id.len(), 40);
    assert_eq!(repo.cairn_ok(&["cat-file", id]), "hello\n");
    assert_eq!(repo.cairn_ok(&["cat-file", id, "--kind", "blob"]), "hello\n");
    repo.cairn_err(&["cat-file", id, "--kind", "tree"]);
}

#[test]
fn write_tree_and_read_tree_restore_files() {
    let repo = TestRepo::new();
    repo.write("a.txt", "a\n");
    repo.write("dir/b.txt", "b\n");
    let tree = repo.cairn_ok(&["write-tree"]).trim().to_owned();

    repo.write("a.txt", "changed\n");
    repo.write("stray.txt", "stray\n");
    repo.cairn_ok(&["read-tree", &tree]);

    assert_eq!(repo.read("a.txt"), "a\n");
    assert_eq!(repo.read("dir/b.txt"), "b\n");
    assert!(!repo.path().join("stray.txt").exists());
}

#[test]
fn commit_log_and_show() {
    let repo = TestRepo::new();
    repo.use_builtin_diff();
    repo.write("f.txt", "one\n");
    let first = repo.commit("first");
    repo.write("f.txt", "two\n");
    let second = repo.commit("second\n\nwith body");

    let log = repo.cairn_ok(&["log"]);
    let first_pos = log.find(&format!("commit {first}")).unwrap();
    let second_pos = log.find(&format!("commit {second} (HEAD, refs/heads/main)")).unwrap();
    assert!(second_pos < first_pos, "{log}");
    assert!(log.contains("    with body"), "{log}");

    let show = repo.cairn_ok(&["show"]);
    assert!(show.contains(&format!("parent {first}")), "{show}");
    assert!(show.contains("-one"), "{show}");
    assert!(show.contains("+two"), "{show}");
}

#[test]
fn diff_between_names() {
    let repo = TestRepo::new();
    repo.use_builtin_diff();
    repo.write("f.txt", "old\n");
    repo.commit("old");
    repo.cairn_ok(&["tag", "before"]);
    repo.write("f.txt", "new\n");
    repo.write("added.txt", "added\n");
    repo.commit("new");

    let diff = repo.cairn_ok(&["diff", "before", "@"]);
    assert!(diff.contains("--- a/f.txt"), "{diff}");
    assert!(diff.contains("+new"), "{diff}");
    assert!(diff.contains("+++ b/added.txt"), "{diff}");
}

#[test]
fn branch_checkout_and_status() {
    let repo = TestRepo::new();
    repo.write("f.txt", "main\n");
    repo.commit("on main");
    repo.cairn_ok(&["branch", "feature"]);

    let branches = repo.cairn_ok(&["branch"]);
    assert_eq!(branches, "  feature\n* main\n");

    let out = repo.cairn_ok(&["checkout", "feature"]);
    assert!(out.contains("Switched to branch 'feature'"), "{out}");
    repo.write("f.txt", "feature\n");
    repo.write("new.txt", "n\n");

    let status = repo.cairn_ok(&["status"]);
    assert!(status.starts_with("On branch feature"), "{status}");
    assert!(status.contains("modified: f.txt"), "{status}");
    assert!(status.contains("new file: new.txt"), "{status}");

    repo.commit("on feature");
    repo.cairn_ok(&["checkout", "main"]);
    assert_eq!(repo.read("f.txt"), "main\n");
    assert!(!repo.path().join("new.txt").exists());
}

#[test]
fn checkout_commit_detaches() {
    let repo = TestRepo::new();
    repo.write("f.txt", "1\n");
    let first = repo.commit("one");
    repo.write("f.txt", "2\n");
    repo.commit("two");

    repo.cairn_ok(&["checkout", &first]);
    let status = repo.cairn_ok(&["status"]);
    assert_eq!(status, format!("HEAD detached at {first}\n"));
    assert_eq!(repo.read(".cairn/HEAD"), first);
}

#[test]
fn tags_are_fixed_once_created() {
    let repo = TestRepo::new();
    repo.write("f.txt", "1\n");
    repo.commit("one");
    repo.cairn_ok(&["tag", "v1"]);
    repo.write("f.txt", "2\n");
    repo.commit("two");
    let stderr = repo.cairn_err(&["tag", "v1"]);
    assert!(stderr.contains("v1"), "{stderr}");
}

#[test]
fn reset_moves_branch_but_not_files() {
    let repo = TestRepo::new();
    repo.write("f.txt", "1\n");
    let first = repo.commit("one");
    repo.write("f.txt", "2\n");
    repo.commit("two");

    repo.cairn_ok(&["reset", &first]);
    assert_eq!(repo.read(".cairn/refs/heads/main"), first);
    assert_eq!(repo.read("f.txt"), "2\n");
}

#[test]
fn unknown_name_fails() {
    let repo = TestRepo::new();
    let stderr = repo.cairn_err(&["log", "nope"]);
    assert!(stderr.contains("nope"), "{stderr}");
}

#[test]
fn graph_lists_refs_and_commits() {
    let repo = TestRepo::new();
    repo.write("f.txt", "1\n");
    let first = repo.commit("one");
    repo.write("f.txt", "2\n");
    let second = repo.commit("two");

    let dot = repo.cairn_ok(&["k"]);
    assert!(dot.starts_with("digraph commits {"), "{dot}");
    assert!(dot.contains(&format!("\"refs/heads/main\" -> \"{second}\"")), "{dot}");
    assert!(dot.contains(&format!("\"{second}\" -> \"{first}\"")), "{dot}");
}

#[test]
fn fsck_reports_corruption() {
    let repo = TestRepo::new();
    repo.write("f.txt", "1\n");
    repo.commit("one");
    assert!(repo.cairn_ok(&["fsck"]).contains("objects ok"));

    let blob = repo.cairn_ok(&["hash-object", "f.txt"]).trim().to_owned();
    std::fs::write(repo.path().join(".cairn/objects").join(&blob), b"blob\0evil").unwrap();
    let out = repo.cairn(&["fsck"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains(&format!("bad {blob}")));
}
