//! File system helpers over `cap-std` directory handles.
//!
//! Every helper opens the parent directory with ambient authority and then
//! operates on the final path component, mirroring how configuration files
//! are read and written elsewhere in the crate.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};

/// Failure raised by a file helper, carrying the path that was touched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct FileError {
    pub(crate) path: Utf8PathBuf,
    pub(crate) message: String,
}

impl FileError {
    fn new(path: &Utf8Path, err: &io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

fn parent_of(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}

fn file_name_of(path: &Utf8Path) -> Result<&str, FileError> {
    path.file_name().ok_or_else(|| FileError {
        path: path.to_path_buf(),
        message: String::from("path is missing a final component"),
    })
}

fn open_dir(path: &Utf8Path) -> Result<Dir, FileError> {
    Dir::open_ambient_dir(path, ambient_authority()).map_err(|err| FileError::new(path, &err))
}

pub(crate) fn path_exists(path: &Utf8Path) -> Result<bool, FileError> {
    let parent = parent_of(path);
    let file_name = file_name_of(path)?;
    match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir
            .try_exists(file_name)
            .map_err(|err| FileError::new(path, &err)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(FileError::new(parent, &err)),
    }
}

pub(crate) fn read_to_string(path: &Utf8Path) -> Result<String, FileError> {
    let dir = open_dir(parent_of(path))?;
    dir.read_to_string(file_name_of(path)?)
        .map_err(|err| FileError::new(path, &err))
}

/// Writes `contents`, creating missing parent directories first.
pub(crate) fn write(path: &Utf8Path, contents: impl AsRef<[u8]>) -> Result<(), FileError> {
    let parent = parent_of(path);
    create_dir_all(parent)?;
    let dir = open_dir(parent)?;
    dir.write(file_name_of(path)?, contents)
        .map_err(|err| FileError::new(path, &err))
}

pub(crate) fn create_dir_all(path: &Utf8Path) -> Result<(), FileError> {
    Dir::create_ambient_dir_all(path, ambient_authority()).map_err(|err| FileError::new(path, &err))
}

/// Removes a directory tree. Returns `false` when nothing was there.
pub(crate) fn remove_dir_all(path: &Utf8Path) -> Result<bool, FileError> {
    let parent = parent_of(path);
    let file_name = file_name_of(path)?;
    let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(FileError::new(parent, &err)),
    };
    match dir.remove_dir_all(file_name) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(FileError::new(path, &err)),
    }
}

/// Renames a file within its directory.
pub(crate) fn rename_in_place(from: &Utf8Path, to: &Utf8Path) -> Result<(), FileError> {
    let dir = open_dir(parent_of(from))?;
    let target_dir = open_dir(parent_of(to))?;
    dir.rename(file_name_of(from)?, &target_dir, file_name_of(to)?)
        .map_err(|err| FileError::new(from, &err))
}

/// Lists the names of the directories directly below `path`, sorted.
///
/// A missing `path` yields an empty list.
pub(crate) fn list_dirs(path: &Utf8Path) -> Result<Vec<String>, FileError> {
    let dir = match Dir::open_ambient_dir(path, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(FileError::new(path, &err)),
    };
    let entries = dir.entries().map_err(|err| FileError::new(path, &err))?;
    let mut names = Vec::new();
    for listed in entries {
        let entry = listed.map_err(|err| FileError::new(path, &err))?;
        let file_type = entry.file_type().map_err(|err| FileError::new(path, &err))?;
        if file_type.is_dir() {
            names.push(entry.file_name().map_err(|err| FileError::new(path, &err))?);
        }
    }
    names.sort();
    Ok(names)
}
