//! Content-addressed object storage: one framed file per object.

use std::fs;
use std::io::{self, Read as _};

use tracing::{debug, trace};

use crate::error::StoreError;
use crate::fs_repo::FsRepo;
use crate::types::*;

/// Build the on-disk frame `kind ‖ 0x00 ‖ payload`.
fn frame(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let tag = kind.as_str().as_bytes();
    let mut out = Vec::with_capacity(tag.len() + 1 + payload.len());
    out.extend_from_slice(tag);
    out.push(0);
    out.extend_from_slice(payload);
    out
}

/// Split a stored frame into its kind and payload.
fn split_frame(id: ObjectId, bytes: &[u8]) -> Result<(ObjectKind, &[u8]), StoreError> {
    let nul = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| StoreError::MalformedObject {
            id,
            reason: "missing kind separator".to_owned(),
        })?;
    let tag = &bytes[..nul];
    let kind = ObjectKind::from_tag(tag).ok_or_else(|| StoreError::MalformedObject {
        id,
        reason: format!("unknown kind tag {:?}", String::from_utf8_lossy(tag)),
    })?;
    Ok((kind, &bytes[nul + 1..]))
}

fn read_frame(repo: &FsRepo, id: ObjectId) -> Result<Vec<u8>, StoreError> {
    match fs::read(repo.object_path(id)) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::ObjectNotFound { id }),
        Err(e) => Err(StoreError::Io(e)),
    }
}

pub fn put_object(repo: &FsRepo, payload: &[u8], kind: ObjectKind) -> Result<ObjectId, StoreError> {
    let id = ObjectId::for_object(kind, payload);
    let path = repo.object_path(id);
    if path.exists() {
        trace!(%id, %kind, "object already stored");
        return Ok(id);
    }
    repo.write_atomic(&path, &frame(kind, payload))?;
    debug!(%id, %kind, len = payload.len(), "stored object");
    Ok(id)
}

pub fn get_object(
    repo: &FsRepo,
    id: ObjectId,
    expected: Option<ObjectKind>,
) -> Result<Vec<u8>, StoreError> {
    let bytes = read_frame(repo, id)?;
    let (actual, payload) = split_frame(id, &bytes)?;
    if let Some(expected) = expected
        && expected != actual
    {
        return Err(StoreError::TypeMismatch {
            id,
            expected,
            actual,
        });
    }
    Ok(payload.to_vec())
}

pub fn object_kind(repo: &FsRepo, id: ObjectId) -> Result<ObjectKind, StoreError> {
    // The longest tag plus separator fits in 8 bytes.
    let mut head = Vec::with_capacity(8);
    let file = match fs::File::open(repo.object_path(id)) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::ObjectNotFound { id });
        }
        Err(e) => return Err(StoreError::Io(e)),
    };
    file.take(8).read_to_end(&mut head)?;
    split_frame(id, &head).map(|(kind, _)| kind)
}

pub fn has_object(repo: &FsRepo, id: ObjectId) -> Result<bool, StoreError> {
    Ok(repo.object_path(id).is_file())
}

pub fn list_objects(repo: &FsRepo) -> Result<Vec<ObjectId>, StoreError> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(repo.objects_dir())? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        // Anything not named by an id is not an object.
        if let Ok(id) = name.parse::<ObjectId>() {
            ids.push(id);
        }
    }
    ids.sort();
    Ok(ids)
}

pub fn verify_object(repo: &FsRepo, id: ObjectId) -> Result<(), StoreError> {
    let bytes = read_frame(repo, id)?;
    let actual = ObjectId::hash_frame(&bytes);
    if actual != id {
        return Err(StoreError::CorruptObject { id, actual });
    }
    split_frame(id, &bytes)?;
    Ok(())
}
