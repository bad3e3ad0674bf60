//! Core value types for the cairn store.
//!
//! These types form the vocabulary shared between the
//! [`SnapshotRepo`](crate::SnapshotRepo) trait and its callers. They carry no
//! filesystem handles; the on-disk layout is an implementation detail of
//! [`FsRepo`](crate::FsRepo).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use sha1::{Digest, Sha1};

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// Length of an [`ObjectId`] rendered as hex.
pub const ID_HEX_LEN: usize = 40;

/// A content-derived object identifier (SHA-1 of the framed object, 20 bytes).
///
/// Stored as raw bytes for cheap comparison and `Copy` semantics.
/// Displays as 40 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// The all-zero id. Never produced by hashing in practice; used in tests
    /// and error values where no real id exists.
    pub const ZERO: Self = Self([0; 20]);

    /// Create an `ObjectId` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Compute the id of `payload` stored as an object of `kind`.
    ///
    /// Equal to [`hash_frame`](Self::hash_frame) over `kind ‖ 0x00 ‖ payload`,
    /// without building the frame.
    #[must_use]
    pub fn for_object(kind: ObjectKind, payload: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(payload);
        Self::from_digest(&hasher.finalize())
    }

    /// Hash an already-framed object exactly as stored on disk.
    #[must_use]
    pub fn hash_frame(frame: &[u8]) -> Self {
        Self::from_digest(&Sha1::digest(frame))
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(digest);
        Self(bytes)
    }

    /// Return `true` if `s` has the exact shape of a hex id.
    #[must_use]
    pub fn looks_like_id(s: &str) -> bool {
        s.len() == ID_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl FromStr for ObjectId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ID_HEX_LEN {
            return Err(IdParseError {
                value: s.to_owned(),
                reason: format!("expected {ID_HEX_LEN} hex characters, got {}", s.len()),
            });
        }
        let mut bytes = [0u8; 20];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hi = hex_digit(chunk[0]).ok_or_else(|| IdParseError {
                value: s.to_owned(),
                reason: format!("invalid hex digit '{}'", chunk[0] as char),
            })?;
            let lo = hex_digit(chunk[1]).ok_or_else(|| IdParseError {
                value: s.to_owned(),
                reason: format!("invalid hex digit '{}'", chunk[1] as char),
            })?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

/// Error from parsing a hex string into an [`ObjectId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdParseError {
    /// The raw value that failed.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid object id {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for IdParseError {}

const fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        // Uppercase is accepted on input; ids always display lowercase.
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ObjectKind
// ---------------------------------------------------------------------------

/// The kind tag written at the front of every stored frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Opaque file content.
    Blob,
    /// Directory listing.
    Tree,
    /// Snapshot metadata.
    Commit,
}

impl ObjectKind {
    /// The tag as written on disk.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }

    /// Parse a tag, returning `None` for anything unrecognised.
    #[must_use]
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"blob" => Some(Self::Blob),
            b"tree" => Some(Self::Tree),
            b"commit" => Some(Self::Commit),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s.as_bytes()).ok_or_else(|| KindParseError(s.to_owned()))
    }
}

/// Error from parsing an unknown object kind name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindParseError(pub String);

impl fmt::Display for KindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown object kind {:?} (expected blob, tree, or commit)", self.0)
    }
}

impl std::error::Error for KindParseError {}

// ---------------------------------------------------------------------------
// Tree types
// ---------------------------------------------------------------------------

/// The kind of object a tree entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A file.
    Blob,
    /// A subdirectory.
    Tree,
}

impl EntryKind {
    /// The matching object kind.
    #[must_use]
    pub const fn object_kind(self) -> ObjectKind {
        match self {
            Self::Blob => ObjectKind::Blob,
            Self::Tree => ObjectKind::Tree,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.object_kind().as_str())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    /// File or directory name (a single path component).
    pub name: String,
    /// What the entry points at.
    pub kind: EntryKind,
    /// The id of the blob or nested tree.
    pub id: ObjectId,
}

/// A tree expanded to full slash-joined paths, each mapped to its blob id.
///
/// A `BTreeMap` so iteration is in path order.
pub type FlatTree = BTreeMap<String, ObjectId>;

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A decoded commit object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// The preceding commit, absent for the first commit on a line of history.
    pub parent: Option<ObjectId>,
    /// Free text, kept verbatim.
    pub message: String,
}

// ---------------------------------------------------------------------------
// RefName
// ---------------------------------------------------------------------------

/// The ref naming the current checkout position.
pub const HEAD: &str = "HEAD";

/// Namespace for branches.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// Namespace for tags.
pub const TAGS_PREFIX: &str = "refs/tags/";

/// A validated ref name: `HEAD`, or a slash-separated path under `refs/`.
///
/// Components may not be empty, `.`, or `..`, and may not contain
/// whitespace, control characters, or backslashes, so a ref name always
/// maps to a file inside the control directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefName(String);

impl RefName {
    /// Create a new `RefName`, validating its shape.
    ///
    /// # Errors
    /// Returns an error if the name is not `HEAD` and is not a well-formed
    /// path under `refs/`.
    pub fn new(name: &str) -> Result<Self, RefNameError> {
        Self::validate(name)?;
        Ok(Self(name.to_owned()))
    }

    /// The `HEAD` ref.
    #[must_use]
    pub fn head() -> Self {
        Self(HEAD.to_owned())
    }

    /// `refs/heads/<name>`.
    ///
    /// # Errors
    /// Returns an error if `name` is not a valid ref path component sequence.
    pub fn branch(name: &str) -> Result<Self, RefNameError> {
        Self::new(&format!("{HEADS_PREFIX}{name}"))
    }

    /// `refs/tags/<name>`.
    ///
    /// # Errors
    /// Returns an error if `name` is not a valid ref path component sequence.
    pub fn tag(name: &str) -> Result<Self, RefNameError> {
        Self::new(&format!("{TAGS_PREFIX}{name}"))
    }

    /// Return the ref name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return `true` for `HEAD`.
    #[must_use]
    pub fn is_head(&self) -> bool {
        self.0 == HEAD
    }

    /// The branch name if this ref lives under `refs/heads/`.
    #[must_use]
    pub fn branch_name(&self) -> Option<&str> {
        self.0.strip_prefix(HEADS_PREFIX)
    }

    /// The tag name if this ref lives under `refs/tags/`.
    #[must_use]
    pub fn tag_name(&self) -> Option<&str> {
        self.0.strip_prefix(TAGS_PREFIX)
    }

    fn validate(name: &str) -> Result<(), RefNameError> {
        let reject = |reason: &str| {
            Err(RefNameError {
                value: name.to_owned(),
                reason: reason.to_owned(),
            })
        };
        if name == HEAD {
            return Ok(());
        }
        if name.is_empty() {
            return reject("ref name must not be empty");
        }
        let Some(rest) = name.strip_prefix("refs/") else {
            return reject("ref name must be HEAD or start with 'refs/'");
        };
        if rest.is_empty() {
            return reject("ref name must have a component after 'refs/'");
        }
        for component in rest.split('/') {
            if component.is_empty() || component == "." || component == ".." {
                return reject("ref path components must be non-empty and not '.' or '..'");
            }
            if component
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || c == '\\')
            {
                return reject("ref name must not contain whitespace, control characters, or '\\'");
            }
        }
        Ok(())
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RefName {
    type Err = RefNameError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error from validating a [`RefName`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefNameError {
    /// The invalid value.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

impl fmt::Display for RefNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ref name {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for RefNameError {}

impl From<RefNameError> for crate::StoreError {
    fn from(e: RefNameError) -> Self {
        Self::InvalidRefName {
            value: e.value,
            reason: e.reason,
        }
    }
}

// ---------------------------------------------------------------------------
// RefValue
// ---------------------------------------------------------------------------

/// The content of a ref slot.
///
/// `Direct(None)` is what an unwritten slot resolves to: "no history yet",
/// as opposed to a resolution failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefValue {
    /// A literal object id, or nothing for an unset slot.
    Direct(Option<ObjectId>),
    /// An indirection to another ref.
    Symbolic(RefName),
}

impl RefValue {
    /// Return `true` for an indirection.
    #[must_use]
    pub const fn is_symbolic(&self) -> bool {
        matches!(self, Self::Symbolic(_))
    }

    /// The direct id, if this is a set direct value.
    #[must_use]
    pub const fn id(&self) -> Option<ObjectId> {
        match self {
            Self::Direct(id) => *id,
            Self::Symbolic(_) => None,
        }
    }

    /// Return `true` for an unset direct value.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Direct(None))
    }
}

impl fmt::Display for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(Some(id)) => write!(f, "{id}"),
            Self::Direct(None) => Ok(()),
            Self::Symbolic(target) => write!(f, "ref: {target}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Diff types
// ---------------------------------------------------------------------------

/// How a path differs between two trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    /// Only present in the new tree.
    Added,
    /// Only present in the old tree.
    Deleted,
    /// Present in both with different content.
    Modified,
    /// Present in both with the same content.
    Unchanged,
}

/// One path from the union of two flattened trees.
///
/// Produced by [`compare_trees`](crate::compare_trees).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    /// Slash-joined path relative to the tree root.
    pub path: String,
    /// Blob id in the old tree, if present there.
    pub old: Option<ObjectId>,
    /// Blob id in the new tree, if present there.
    pub new: Option<ObjectId>,
}

impl Change {
    /// Classify the change. A path absent on both sides is unchanged.
    #[must_use]
    pub fn change_type(&self) -> ChangeType {
        match (self.old, self.new) {
            (None, None) => ChangeType::Unchanged,
            (None, Some(_)) => ChangeType::Added,
            (Some(_), None) => ChangeType::Deleted,
            (Some(a), Some(b)) if a == b => ChangeType::Unchanged,
            (Some(_), Some(_)) => ChangeType::Modified,
        }
    }

    /// Return `true` unless both sides hold the same id.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.old != self.new
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ObjectId --

    #[test]
    fn id_roundtrip_hex() {
        let hex = "0123456789abcdef0123456789abcdef01234567";
        let id: ObjectId = hex.parse().unwrap();
        assert_eq!(id.to_string(), hex);
    }

    #[test]
    fn id_uppercase_displays_lowercase() {
        let id: ObjectId = "ABCDEF0123456789ABCDEF0123456789ABCDEF01".parse().unwrap();
        assert_eq!(id.to_string(), "abcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn id_rejects_short() {
        assert!("a".repeat(39).parse::<ObjectId>().is_err());
        assert!(!ObjectId::looks_like_id(&"a".repeat(39)));
    }

    #[test]
    fn id_rejects_non_hex() {
        let bad = "g".repeat(40);
        assert!(bad.parse::<ObjectId>().is_err());
        assert!(!ObjectId::looks_like_id(&bad));
    }

    #[test]
    fn object_id_matches_frame_hash() {
        let id = ObjectId::for_object(ObjectKind::Blob, b"hello");
        assert_eq!(id, ObjectId::hash_frame(b"blob\0hello"));
    }

    #[test]
    fn kind_is_part_of_identity() {
        assert_ne!(
            ObjectId::for_object(ObjectKind::Blob, b"x"),
            ObjectId::for_object(ObjectKind::Tree, b"x")
        );
    }

    #[test]
    fn hash_frame_is_plain_sha1() {
        assert_eq!(
            ObjectId::hash_frame(b"abc").to_string(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    // -- ObjectKind --

    #[test]
    fn kind_tags() {
        assert_eq!(ObjectKind::from_tag(b"commit"), Some(ObjectKind::Commit));
        assert_eq!(ObjectKind::from_tag(b"tag"), None);
        assert!("blob".parse::<ObjectKind>().is_ok());
        assert!("bolb".parse::<ObjectKind>().is_err());
    }

    // -- RefName --

    #[test]
    fn refname_valid() {
        assert!(RefName::new("HEAD").is_ok());
        assert!(RefName::new("refs/heads/main").is_ok());
        assert!(RefName::new("refs/tags/v1.0").is_ok());
        assert!(RefName::new("refs/heads/feature/x").is_ok());
    }

    #[test]
    fn refname_rejects_bare_and_escapes() {
        assert!(RefName::new("main").is_err());
        assert!(RefName::new("").is_err());
        assert!(RefName::new("refs/").is_err());
        assert!(RefName::new("refs/heads/../../objects").is_err());
        assert!(RefName::new("refs/heads//x").is_err());
        assert!(RefName::new("refs/heads/a b").is_err());
        assert!(RefName::new("refs/heads/x/").is_err());
    }

    #[test]
    fn refname_short_names() {
        let b = RefName::branch("main").unwrap();
        assert_eq!(b.as_str(), "refs/heads/main");
        assert_eq!(b.branch_name(), Some("main"));
        assert_eq!(b.tag_name(), None);
        let t = RefName::tag("v1").unwrap();
        assert_eq!(t.tag_name(), Some("v1"));
        assert!(RefName::head().is_head());
    }

    // -- RefValue --

    #[test]
    fn ref_value_display() {
        let id: ObjectId = "ab".repeat(20).parse().unwrap();
        assert_eq!(RefValue::Direct(Some(id)).to_string(), "ab".repeat(20));
        assert_eq!(RefValue::Direct(None).to_string(), "");
        assert_eq!(
            RefValue::Symbolic(RefName::branch("main").unwrap()).to_string(),
            "ref: refs/heads/main"
        );
    }

    // -- Change --

    #[test]
    fn change_classification() {
        let a = ObjectId::for_object(ObjectKind::Blob, b"a");
        let b = ObjectId::for_object(ObjectKind::Blob, b"b");
        let mk = |old, new| Change {
            path: "p".into(),
            old,
            new,
        };
        assert_eq!(mk(None, Some(a)).change_type(), ChangeType::Added);
        assert_eq!(mk(Some(a), None).change_type(), ChangeType::Deleted);
        assert_eq!(mk(Some(a), Some(b)).change_type(), ChangeType::Modified);
        assert_eq!(mk(Some(a), Some(a)).change_type(), ChangeType::Unchanged);
        assert!(!mk(Some(a), Some(a)).is_changed());
    }

    #[test]
    fn absent_on_both_sides_is_unchanged() {
        let change = Change {
            path: "ghost".into(),
            old: None,
            new: None,
        };
        assert_eq!(change.change_type(), ChangeType::Unchanged);
        assert_eq!(change.change_type() != ChangeType::Unchanged, change.is_changed());
    }
}
