// ABOUTME: Recursive directory comparison and copying for release trees.
// ABOUTME: Blocking std::fs code, run from async callers via spawn_blocking.

use std::fs::{self, File, FileType};
use std::io::{self, BufRead, BufReader, ErrorKind};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// List relative paths whose content or type differs between two trees.
///
/// An entry present on only one side counts as a difference. Symlinks are
/// compared by target, not followed.
pub fn differences(left: &Path, right: &Path) -> io::Result<Vec<PathBuf>> {
    let mut diffs = Vec::new();
    if !fs::symlink_metadata(right)?.is_dir() {
        diffs.push(PathBuf::new());
        return Ok(diffs);
    }

    let mut walker = walk(left);
    while let Some(entry) = walker.next() {
        let entry = entry?;
        let rel = relative(left, &entry)?;
        let left_type = entry.file_type();

        let Some(right_type) = file_type(&right.join(&rel))? else {
            diffs.push(rel);
            if left_type.is_dir() {
                walker.skip_current_dir();
            }
            continue;
        };

        if left_type.is_dir() && right_type.is_dir() {
            continue;
        }
        if left_type.is_dir() {
            walker.skip_current_dir();
        }

        let same = if left_type.is_symlink() && right_type.is_symlink() {
            fs::read_link(entry.path())? == fs::read_link(right.join(&rel))?
        } else if left_type.is_file() && right_type.is_file() {
            same_contents(entry.path(), &right.join(&rel))?
        } else {
            false
        };
        if !same {
            diffs.push(rel);
        }
    }

    // Entries only on the right; mismatched types were reported above.
    let mut walker = walk(right);
    while let Some(entry) = walker.next() {
        let entry = entry?;
        let rel = relative(right, &entry)?;
        let is_dir = entry.file_type().is_dir();

        match file_type(&left.join(&rel))? {
            None => {
                diffs.push(rel);
                if is_dir {
                    walker.skip_current_dir();
                }
            }
            Some(left_type) if is_dir && !left_type.is_dir() => walker.skip_current_dir(),
            Some(_) => {}
        }
    }

    Ok(diffs)
}

/// Depth-first walk below `root`, not following symlinks, in name order.
fn walk(root: &Path) -> walkdir::IntoIter {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
}

fn relative(root: &Path, entry: &DirEntry) -> io::Result<PathBuf> {
    entry
        .path()
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(io::Error::other)
}

fn file_type(path: &Path) -> io::Result<Option<FileType>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta.file_type())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn same_contents(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut left = BufReader::new(File::open(a)?);
    let mut right = BufReader::new(File::open(b)?);
    loop {
        let l = left.fill_buf()?;
        let r = right.fill_buf()?;
        if l.is_empty() || r.is_empty() {
            return Ok(l.is_empty() && r.is_empty());
        }
        let n = l.len().min(r.len());
        if l[..n] != r[..n] {
            return Ok(false);
        }
        left.consume(n);
        right.consume(n);
    }
}

/// Copy the contents of `src` into the existing directory `dst`.
///
/// Preserves symlinks and permission bits. With `preserve_owner`, uid and
/// gid are carried over too. Special files (fifos, sockets, devices) are skipped.
pub fn copy_tree(src: &Path, dst: &Path, preserve_owner: bool) -> io::Result<()> {
    let mut dirs = Vec::new();

    for entry in walk(src) {
        let entry = entry?;
        let to = dst.join(relative(src, &entry)?);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir(&to)?;
            dirs.push((entry.path().to_path_buf(), to.clone()));
        } else if file_type.is_symlink() {
            std::os::unix::fs::symlink(fs::read_link(entry.path())?, &to)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &to)?;
        } else {
            tracing::debug!("Skipping special file {}", entry.path().display());
            continue;
        }

        if preserve_owner {
            copy_owner(entry.path(), &to)?;
        }
    }

    // Deepest first, after all contents, so read-only directories can still be filled.
    for (from, to) in dirs.iter().rev() {
        fs::set_permissions(to, fs::metadata(from)?.permissions())?;
    }
    Ok(())
}

/// Give `to` the same uid/gid as `from`, without following symlinks.
pub fn copy_owner(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(from)?;
    std::os::unix::fs::lchown(to, Some(meta.uid()), Some(meta.gid()))
}
