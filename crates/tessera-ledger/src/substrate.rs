//! Byte-level file access shared by every loader and append-only writer.

use crate::error::LoadError;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Read a text artifact, rejecting NUL bytes and invalid UTF-8.
pub fn read_substrate(path: &Path) -> Result<String, LoadError> {
    let bytes = fs::read(path).map_err(|e| LoadError::read(path, e))?;
    if bytes.contains(&0) {
        return Err(LoadError::Corrupt {
            path: path.display().to_string(),
            reason: "contains NUL byte(s)".to_string(),
        });
    }
    String::from_utf8(bytes).map_err(|_| LoadError::Corrupt {
        path: path.display().to_string(),
        reason: "contains non-UTF-8 byte sequence(s)".to_string(),
    })
}

/// Write `bytes` to `path` via a synced temp file and rename, so readers
/// never observe a half-written artifact.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();
    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp_path);
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempDirGuard;

    #[test]
    fn rejects_nul_and_invalid_utf8() {
        let tmp = TempDirGuard::new("substrate");
        let nul = tmp.path().join("nul.json");
        fs::write(&nul, b"[\0]").expect("write");
        assert!(matches!(read_substrate(&nul), Err(LoadError::Corrupt { .. })));

        let latin = tmp.path().join("latin.json");
        fs::write(&latin, [0x5b, 0xff, 0x5d]).expect("write");
        assert!(matches!(read_substrate(&latin), Err(LoadError::Corrupt { .. })));
    }

    #[test]
    fn atomic_write_creates_parents() {
        let tmp = TempDirGuard::new("atomic");
        let target = tmp.path().join("a/b/out.json");
        write_atomic(&target, b"{}").expect("write");
        assert_eq!(read_substrate(&target).expect("read"), "{}");
        let leftovers = fs::read_dir(target.parent().expect("parent"))
            .expect("list")
            .count();
        assert_eq!(leftovers, 1);
    }
}
