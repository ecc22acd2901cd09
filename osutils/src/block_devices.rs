use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};

use raidplan_api::constants::DEV_DISK_BY_PATH;

/// Returns the `/dev/disk/by-path` link of a block device, if udev created one.
pub fn block_device_by_path(device: impl AsRef<Path>) -> Result<Option<PathBuf>, Error> {
    find_symlink_for_target(device, DEV_DISK_BY_PATH)
}

/// Looks in `directory` for symlinks resolving to `target`. When several links
/// point at the same device, the lexically smallest one is returned so that the
/// answer does not depend on directory iteration order.
pub fn find_symlink_for_target(
    target: impl AsRef<Path>,
    directory: impl AsRef<Path>,
) -> Result<Option<PathBuf>, Error> {
    let (target, directory) = (target.as_ref(), directory.as_ref());
    let resolved_target = target
        .canonicalize()
        .with_context(|| format!("Failed to canonicalize target path '{}'", target.display()))?;

    let mut links: Vec<PathBuf> = fs::read_dir(directory)
        .with_context(|| format!("Failed to read directory '{}'", directory.display()))?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_symlink()))
        .map(|entry| entry.path())
        .filter(|link| link.canonicalize().is_ok_and(|p| p == resolved_target))
        .collect();

    links.sort();
    Ok(links.into_iter().next())
}
