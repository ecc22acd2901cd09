use std::{
    fs::{File, Permissions},
    io::Write,
    os::unix::fs::PermissionsExt,
    path::Path,
};

use anyhow::{Context, Error};

/// Creates a file and all parent directories if they don't exist. Truncates
/// the file if it already exists.
pub fn create_file(path: impl AsRef<Path>) -> Result<File, Error> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).context(format!(
            "Could not create path: {}",
            parent.display()
        ))?;
    }

    File::create(path.as_ref()).context(format!(
        "Could not create file: {}",
        path.as_ref().display()
    ))
}

/// Writes contents to a file with the given mode, creating parent directories
/// as needed.
pub fn write_file(path: impl AsRef<Path>, mode: u32, contents: &[u8]) -> Result<(), Error> {
    let mut file = create_file(path.as_ref())?;
    std::fs::set_permissions(path.as_ref(), Permissions::from_mode(mode)).context(format!(
        "Could not set permissions {:#o} for file {}",
        mode,
        path.as_ref().display()
    ))?;

    file.write_all(contents).context(format!(
        "Could not write to file: {}",
        path.as_ref().display()
    ))
}
