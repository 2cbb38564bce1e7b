// SPDX-License-Identifier: Apache-2.0

//! Raw file attachments: upload from disk, download into a directory.

use std::fs;
use std::path::{Path, PathBuf};

use snpdb_model::{Attributes, FileFilter, FileId, FileMeta};
use snpdb_store::BlobStore;
use tracing::info;

use crate::{QueryError, QueryErrorCode};

fn io_error(path: &Path, err: &std::io::Error) -> QueryError {
    QueryError::new(QueryErrorCode::Store, format!("{}: {err}", path.display()))
}

/// Stores the file at `path` under its base name.
pub fn attach_file<S: BlobStore + ?Sized>(
    store: &S,
    path: &Path,
    individual: Option<&str>,
) -> Result<FileId, QueryError> {
    let bytes = fs::read(path).map_err(|e| io_error(path, &e))?;
    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        return Err(QueryError::new(
            QueryErrorCode::Validation,
            format!("{} has no usable file name", path.display()),
        ));
    };
    let id = store.put_file(&bytes, filename, individual, Attributes::new())?;
    info!(file = %id, filename, bytes = bytes.len(), "file attached");
    Ok(id)
}

pub fn fetch_file<S: BlobStore + ?Sized>(
    store: &S,
    id: FileId,
) -> Result<(FileMeta, Vec<u8>), QueryError> {
    Ok(store.get_file(id)?)
}

/// Writes every matching file into `dir` under its stored name. Later files
/// overwrite earlier ones with the same name.
pub fn download_files<S: BlobStore + ?Sized>(
    store: &S,
    filter: &FileFilter,
    dir: &Path,
) -> Result<Vec<PathBuf>, QueryError> {
    let mut written = Vec::new();
    for meta in store.list_files(filter)? {
        let (meta, bytes) = fetch_file(store, meta.id)?;
        let name = Path::new(&meta.filename)
            .file_name()
            .ok_or_else(|| {
                QueryError::new(
                    QueryErrorCode::Validation,
                    format!("stored file {} has an unusable name", meta.id),
                )
            })?;
        let target = dir.join(name);
        fs::write(&target, &bytes).map_err(|e| io_error(&target, &e))?;
        written.push(target);
    }
    Ok(written)
}
