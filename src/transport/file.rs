//! A payload image kept in a file.
//!
//! Used where no tag is at hand: the file holds exactly the bytes that
//! would be on the medium.

use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::Transport;
use crate::error::TransportError;

#[derive(Debug, Clone)]
pub struct FileTransport {
    path: PathBuf,
}

impl FileTransport {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the image atomically.
    ///
    /// The bytes go to a fresh temporary file next to the target, which is
    /// synced and then moved over the target; the directory is synced last.
    /// A crash leaves either the old image or the new one, never a mix.
    fn save(&self, data: &[u8]) -> Result<(), TransportError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.random_tmp_path()?;

        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        let written = tmp_file.write_all(data).and_then(|()| tmp_file.sync_all());
        drop(tmp_file);
        discard_on_error(&tmp_path, written)?;

        discard_on_error(&tmp_path, self.atomic_replace(&tmp_path))?;

        if let Some(parent) = self.path.parent() {
            // an empty parent means the current directory
            let dir = if parent.as_os_str().is_empty() {
                File::open(".")?
            } else {
                File::open(parent)?
            };
            dir.sync_all()?;
        }

        Ok(())
    }

    /// `<file name>.tmp.<16 hex chars>` in the target's directory.
    fn random_tmp_path(&self) -> Result<PathBuf, TransportError> {
        let mut buf = [0u8; 8];
        fill(&mut buf).map_err(|e| TransportError::Io(io::Error::other(e.to_string())))?;

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| TransportError::Unsupported("path has no file name".into()))?
            .to_string_lossy();

        let tmp_name = format!("{}.tmp.{}", file_name, hex::encode(buf));

        Ok(self.path.with_file_name(tmp_name))
    }

    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<(), TransportError> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

        // ReplaceFileW needs an existing target
        if !self.path.exists() {
            fs::rename(tmp_path, &self.path)?;
            return Ok(());
        }

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let target_w = to_wide(self.path.as_os_str());
        let tmp_w = to_wide(tmp_path.as_os_str());

        // SAFETY:
        // - Strings are valid UTF-16 and null-terminated
        // - Pointers remain valid during the call
        // - Windows does not retain the pointers after return
        let result = unsafe {
            ReplaceFileW(
                target_w.as_ptr(),
                tmp_w.as_ptr(),
                std::ptr::null(),
                REPLACEFILE_WRITE_THROUGH,
                std::ptr::null(),
                std::ptr::null(),
            )
        };

        if result == 0 {
            return Err(io::Error::last_os_error().into());
        }

        Ok(())
    }

    /// `rename()` is atomic when both paths are on the same filesystem.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<(), TransportError> {
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

/// Removes the temporary file if `result` is an error.
fn discard_on_error<T, E>(tmp_path: &Path, result: Result<T, E>) -> Result<T, TransportError>
where
    E: Into<TransportError>,
{
    result.map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        e.into()
    })
}

impl Transport for FileTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.save(bytes)?;
        debug!(path = %self.path.display(), len = bytes.len(), "wrote payload image");
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_returns_written_data() {
        let dir = tempdir().unwrap();
        let mut medium = FileTransport::new(dir.path().join("tag.bin"));

        medium.write(b"hello world").unwrap();

        assert_eq!(medium.read().unwrap().unwrap(), b"hello world");
    }

    #[test]
    fn missing_file_reads_none() {
        let dir = tempdir().unwrap();
        let mut medium = FileTransport::new(dir.path().join("missing.bin"));

        assert!(medium.read().unwrap().is_none());
    }

    #[test]
    fn directory_in_place_of_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let mut medium = FileTransport::new(dir.path().to_path_buf());

        assert!(matches!(medium.read(), Err(TransportError::Io(_))));
    }

    #[test]
    fn random_tmp_path_has_same_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tag.bin");
        let medium = FileTransport::new(path.clone());

        let tmp = medium.random_tmp_path().unwrap();

        assert_eq!(tmp.parent(), path.parent());
        assert_ne!(tmp, path);
    }

    #[test]
    fn tmp_names_are_unique() {
        let dir = tempdir().unwrap();
        let medium = FileTransport::new(dir.path().join("tag.bin"));

        let a = medium.random_tmp_path().unwrap();
        let b = medium.random_tmp_path().unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn write_replaces_existing_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tag.bin");
        let mut medium = FileTransport::new(path.clone());

        medium.write(b"first").unwrap();
        medium.write(b"second").unwrap();

        assert_eq!(fs::read(path).unwrap(), b"second");
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        let mut medium = FileTransport::new(dir.path().join("tag.bin"));

        medium.write(b"data").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], "tag.bin");
    }

    #[test]
    fn failed_write_leaves_no_tmp_file() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("tag.bin.tmp.00");
        fs::write(&tmp, b"partial").unwrap();

        let failed: io::Result<()> = Err(io::Error::other("disk full"));
        let result = discard_on_error(&tmp, failed);

        assert!(matches!(result, Err(TransportError::Io(_))));
        assert!(!tmp.exists());
    }

    #[test]
    fn successful_step_keeps_tmp_file() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("tag.bin.tmp.00");
        fs::write(&tmp, b"complete").unwrap();

        discard_on_error(&tmp, Ok::<(), io::Error>(())).unwrap();

        assert!(tmp.exists());
    }

    #[test]
    fn parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("tag.bin");
        let mut medium = FileTransport::new(nested.clone());

        medium.write(b"data").unwrap();

        assert!(nested.exists());
    }
}
