use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes `data` to `path` through a buffered writer and forces a durability
/// sync before returning. Best-effort durable, not crash-atomic: on failure
/// the target may be empty or partially written, and callers are expected to
/// hold a backup if the previous content matters.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(&file);

    writer.write_all(data)?;
    writer.flush()?;

    file.sync_all()?;

    Ok(())
}

/// Streams `src` into `dst` (created or truncated) and syncs `dst`.
pub fn atomic_copy(dst: &Path, src: &Path) -> io::Result<()> {
    let mut source = File::open(src)?;
    let mut dest = File::create(dst)?;

    io::copy(&mut source, &mut dest)?;

    dest.sync_all()?;

    Ok(())
}

/// Distinguishes "no entry at `path`" (Ok(false)) from stat failures (Err).
pub fn check_exists(path: &Path) -> io::Result<bool> {
    match std::fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
