//! Ownership and mode enforcement over an install tree.
//!
//! Every entry must carry the resolved uid/gid and grant nothing to "other".
//! Symlinks are skipped in both directions.

use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use anyhow::{Context, Result, bail};
use nix::unistd::{Gid, Uid, chown};
use walkdir::WalkDir;

const WORLD_BITS: u32 = 0o007;

/// `chown -R uid:gid` plus `chmod -R o-rwx`.
///
/// # Errors
///
/// Returns an error naming the first entry that cannot be changed.
pub fn apply_ownership(dir: &Path, uid: u32, gid: u32) -> Result<()> {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        if entry.path_is_symlink() {
            continue;
        }
        let path = entry.path();
        chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
            .with_context(|| format!("chown {uid}:{gid} {}", path.display()))?;

        let meta = entry
            .metadata()
            .with_context(|| format!("stat {}", path.display()))?;
        let mode = meta.permissions().mode();
        if mode & WORLD_BITS != 0 {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & !WORLD_BITS))
                .with_context(|| format!("chmod o-rwx {}", path.display()))?;
        }
    }
    Ok(())
}

/// Give `path` the same owner and group as `reference`.
///
/// # Errors
///
/// Returns an error if either path cannot be inspected or changed.
pub fn match_owner(path: &Path, reference: &Path) -> Result<()> {
    let meta =
        std::fs::metadata(reference).with_context(|| format!("stat {}", reference.display()))?;
    chown(
        path,
        Some(Uid::from_raw(meta.uid())),
        Some(Gid::from_raw(meta.gid())),
    )
    .with_context(|| format!("chown {}:{} {}", meta.uid(), meta.gid(), path.display()))?;
    Ok(())
}

/// Check that the whole tree is owned by `uid:gid` with no world access.
///
/// Entries that vanish mid-walk are ignored.
///
/// # Errors
///
/// Returns an error describing the first offending entry.
pub fn validate_tree(dir: &Path, uid: u32, gid: u32) -> Result<()> {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_not_found(&e) => continue,
            Err(e) => return Err(e).context("error traversing the file tree"),
        };
        if entry.path_is_symlink() {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(e) if is_not_found(&e) => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("stat {}", entry.path().display()));
            }
        };
        let path = entry.path().display();
        if meta.uid() != uid {
            bail!("{path} doesn't have correct uid: has {} (expected {uid})", meta.uid());
        }
        if meta.gid() != gid {
            bail!("{path} doesn't have correct gid: has {} (expected {gid})", meta.gid());
        }
        if meta.mode() & WORLD_BITS != 0 {
            bail!("{path} has world access");
        }
    }
    Ok(())
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}
