//! Bulk directory reads.
//!
//! On Linux a directory is read with `getdents64` into a caller-supplied
//! scratch buffer, and the packed `linux_dirent64` records are parsed with a
//! bounds-checked [`RecordCursor`]. The type tag delivered by the kernel is
//! used directly; only entries the file system reports as `DT_UNKNOWN` cost an
//! extra `lstat`. Other targets fall back to [`std::fs::read_dir`].

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::sync::OnceLock;

use dirk_core::{EntryKind, WalkError};

/// Scratch size used when the caller's buffer is smaller than one page.
pub const DEFAULT_SCRATCH_SIZE: usize = 64 * 1024;

/// Size of the fixed `linux_dirent64` header: ino(8) off(8) reclen(2) type(1).
pub const RECORD_HEADER_SIZE: usize = 19;

/// Smallest scratch buffer the reader will use as given: one memory page.
pub fn minimum_scratch_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: sysconf has no preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        usize::try_from(size).ok().filter(|&s| s > 0).unwrap_or(4096)
    })
}

/// Grow `scratch` to [`DEFAULT_SCRATCH_SIZE`] if it is below one page.
pub fn prepare_scratch(scratch: &mut Vec<u8>) {
    if scratch.len() < minimum_scratch_size() {
        scratch.resize(DEFAULT_SCRATCH_SIZE, 0);
    }
}

/// One immediate child of a directory: its name and type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: OsString,
    kind: EntryKind,
}

impl DirEntry {
    /// Create an entry.
    pub fn new(name: impl Into<OsString>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Build an entry for `path` from `lstat`.
    pub fn from_path(path: &Path) -> Result<Self, WalkError> {
        let metadata = std::fs::symlink_metadata(path).map_err(|e| WalkError::io(path, e))?;
        let name = path
            .file_name()
            .unwrap_or(path.as_os_str())
            .to_os_string();
        Ok(Self::new(name, metadata.file_type().into()))
    }

    /// Base name (never `.` or `..`).
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// Consume the entry, keeping its name.
    pub fn into_name(self) -> OsString {
        self.name
    }

    /// Type tag as delivered by the directory read.
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Check if this entry is a directory (symlinks are not followed).
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this entry is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }

    /// Check if the name starts with a dot.
    pub fn is_hidden(&self) -> bool {
        self.name.as_encoded_bytes().first() == Some(&b'.')
    }
}

/// One parsed `linux_dirent64` record, borrowing from the scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    /// Inode number; zero marks a deleted slot.
    pub ino: u64,
    /// Kernel `d_type` tag.
    pub d_type: u8,
    /// Name bytes without the terminating NUL.
    pub name: &'a [u8],
}

impl RawRecord<'_> {
    /// Records that never become entries: deleted slots, empty names, `.` and `..`.
    pub fn is_skipped(&self) -> bool {
        self.ino == 0 || self.name.is_empty() || self.name == b"." || self.name == b".."
    }
}

/// A record header or length that does not fit the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordError {
    /// Byte offset of the offending record.
    pub offset: usize,
    /// What was wrong with it.
    pub reason: &'static str,
}

impl RecordError {
    /// Attach the directory path.
    pub fn into_walk_error(self, dir: &Path) -> WalkError {
        WalkError::MalformedRecord {
            path: dir.to_path_buf(),
            offset: self.offset,
            reason: self.reason,
        }
    }
}

/// Safe iterator over the packed records of one filled buffer.
///
/// Every record's header and `d_reclen` are validated against the buffer
/// before anything is read. The first malformed record ends iteration.
#[derive(Debug, Clone)]
pub struct RecordCursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> RecordCursor<'a> {
    /// Create a cursor over the bytes the kernel filled in.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn fail(&mut self, reason: &'static str) -> Option<Result<RawRecord<'a>, RecordError>> {
        let offset = self.offset;
        self.offset = self.buf.len();
        Some(Err(RecordError { offset, reason }))
    }
}

impl<'a> Iterator for RecordCursor<'a> {
    type Item = Result<RawRecord<'a>, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.buf.get(self.offset..)?;
        if rest.is_empty() {
            return None;
        }
        let Some(header) = rest.get(..RECORD_HEADER_SIZE) else {
            return self.fail("truncated record header");
        };

        let mut ino = [0u8; 8];
        ino.copy_from_slice(&header[0..8]);
        let mut reclen = [0u8; 2];
        reclen.copy_from_slice(&header[16..18]);
        let reclen = usize::from(u16::from_ne_bytes(reclen));
        let d_type = header[18];

        if reclen < RECORD_HEADER_SIZE {
            return self.fail("record length shorter than header");
        }
        let Some(record) = rest.get(..reclen) else {
            return self.fail("record extends past end of buffer");
        };

        let name_area = &record[RECORD_HEADER_SIZE..];
        let Some(nul) = name_area.iter().position(|&b| b == 0) else {
            return self.fail("unterminated record name");
        };

        self.offset += reclen;
        Some(Ok(RawRecord {
            ino: u64::from_ne_bytes(ino),
            d_type,
            name: &name_area[..nul],
        }))
    }
}

/// Read the immediate children of `dir` with their type tags.
///
/// `scratch` is grown to [`DEFAULT_SCRATCH_SIZE`] when smaller than one page
/// and reused across reads. The result is all-or-nothing: any failure
/// discards the entries read so far.
pub fn read_dir_entries(dir: &Path, scratch: &mut Vec<u8>) -> Result<Vec<DirEntry>, WalkError> {
    prepare_scratch(scratch);
    sys::read_entries(dir, scratch, true)
}

/// Read the names of the immediate children of `dir`.
///
/// Unlike [`read_dir_entries`] this never stats entries of unknown type.
pub fn read_dir_names(dir: &Path, scratch: &mut Vec<u8>) -> Result<Vec<OsString>, WalkError> {
    prepare_scratch(scratch);
    let entries = sys::read_entries(dir, scratch, false)?;
    Ok(entries.into_iter().map(DirEntry::into_name).collect())
}

/// `lstat` fallback for entries the directory read could not type.
fn stat_kind(dir: &Path, name: &OsStr) -> Result<EntryKind, WalkError> {
    let path = dir.join(name);
    tracing::trace!(path = %path.display(), "type unknown, falling back to lstat");
    let metadata = std::fs::symlink_metadata(&path).map_err(|e| WalkError::io(&path, e))?;
    Ok(metadata.file_type().into())
}

#[cfg(target_os = "linux")]
mod sys {
    use std::ffi::OsStr;
    use std::fs::OpenOptions;
    use std::io;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::AsRawFd;
    use std::path::Path;

    use dirk_core::{EntryKind, WalkError};

    use super::{DirEntry, RawRecord, RecordCursor, stat_kind};

    pub(super) fn kind_from_dtype(d_type: u8) -> EntryKind {
        match d_type {
            libc::DT_REG => EntryKind::Regular,
            libc::DT_DIR => EntryKind::Directory,
            libc::DT_LNK => EntryKind::Symlink,
            libc::DT_CHR => EntryKind::CharDevice,
            libc::DT_BLK => EntryKind::BlockDevice,
            libc::DT_FIFO => EntryKind::Fifo,
            libc::DT_SOCK => EntryKind::Socket,
            _ => EntryKind::Unknown,
        }
    }

    pub(super) fn read_entries(
        dir: &Path,
        scratch: &mut [u8],
        resolve_unknown: bool,
    ) -> Result<Vec<DirEntry>, WalkError> {
        let handle = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECTORY | libc::O_CLOEXEC)
            .open(dir)
            .map_err(|e| WalkError::io(dir, e))?;
        let fd = handle.as_raw_fd();

        let mut entries = Vec::new();
        loop {
            // SAFETY: the buffer is valid for writes of `scratch.len()` bytes
            // and `fd` stays open for the lifetime of `handle`.
            let read = unsafe {
                libc::syscall(
                    libc::SYS_getdents64,
                    fd,
                    scratch.as_mut_ptr().cast::<libc::c_void>(),
                    scratch.len(),
                )
            };
            if read < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(WalkError::io(dir, err));
            }
            let filled = usize::try_from(read).unwrap_or(0).min(scratch.len());
            if filled == 0 {
                break;
            }

            push_records(dir, &scratch[..filled], resolve_unknown, &mut entries)?;
        }
        Ok(entries)
    }

    /// Append the entries of one filled buffer. Fails on the first
    /// malformed record or failed `lstat`.
    pub(super) fn push_records(
        dir: &Path,
        buf: &[u8],
        resolve_unknown: bool,
        entries: &mut Vec<DirEntry>,
    ) -> Result<(), WalkError> {
        for record in RecordCursor::new(buf) {
            let record = record.map_err(|e| e.into_walk_error(dir))?;
            if record.is_skipped() {
                continue;
            }
            entries.push(entry_from_record(dir, &record, resolve_unknown)?);
        }
        Ok(())
    }

    /// Turn a record into an entry, with one `lstat` when the kernel left
    /// the type unknown and `resolve_unknown` is set.
    pub(super) fn entry_from_record(
        dir: &Path,
        record: &RawRecord<'_>,
        resolve_unknown: bool,
    ) -> Result<DirEntry, WalkError> {
        let name = OsStr::from_bytes(record.name);
        let mut kind = kind_from_dtype(record.d_type);
        if kind == EntryKind::Unknown && resolve_unknown {
            kind = stat_kind(dir, name)?;
        }
        Ok(DirEntry::new(name, kind))
    }
}

#[cfg(not(target_os = "linux"))]
mod sys {
    use std::path::Path;

    use dirk_core::{EntryKind, WalkError};

    use super::{DirEntry, stat_kind};

    pub(super) fn read_entries(
        dir: &Path,
        _scratch: &mut [u8],
        resolve_unknown: bool,
    ) -> Result<Vec<DirEntry>, WalkError> {
        let read_dir = std::fs::read_dir(dir).map_err(|e| WalkError::io(dir, e))?;
        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| WalkError::io(dir, e))?;
            let name = entry.file_name();
            let kind = match entry.file_type() {
                Ok(file_type) => EntryKind::from(file_type),
                Err(_) if resolve_unknown => stat_kind(dir, &name)?,
                Err(_) => EntryKind::Unknown,
            };
            entries.push(DirEntry::new(name, kind));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn record(ino: u64, d_type: u8, name: &[u8]) -> Vec<u8> {
        // Name plus NUL, padded to 8 bytes like the kernel does.
        let unpadded = RECORD_HEADER_SIZE + name.len() + 1;
        let reclen = unpadded.div_ceil(8) * 8;
        let mut buf = Vec::with_capacity(reclen);
        buf.extend_from_slice(&ino.to_ne_bytes());
        buf.extend_from_slice(&0i64.to_ne_bytes());
        buf.extend_from_slice(&(reclen as u16).to_ne_bytes());
        buf.push(d_type);
        buf.extend_from_slice(name);
        buf.resize(reclen, 0);
        buf
    }

    #[test]
    fn test_cursor_parses_consecutive_records() {
        let mut buf = record(1, 4, b".");
        buf.extend(record(2, 4, b".."));
        buf.extend(record(42, 8, b"hello.txt"));
        buf.extend(record(0, 8, b"deleted"));

        let records: Vec<_> = RecordCursor::new(&buf).collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[2].name, b"hello.txt");
        assert_eq!(records[2].ino, 42);
        assert_eq!(records[2].d_type, 8);

        let kept: Vec<_> = records.iter().filter(|r| !r.is_skipped()).collect();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_cursor_rejects_short_reclen() {
        let mut buf = record(7, 8, b"a");
        buf[16..18].copy_from_slice(&4u16.to_ne_bytes());

        let mut cursor = RecordCursor::new(&buf);
        let err = cursor.next().unwrap().unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_cursor_rejects_overrun() {
        let mut buf = record(7, 8, b"first");
        let second_offset = buf.len();
        let mut second = record(8, 8, b"second");
        second.truncate(RECORD_HEADER_SIZE + 2);
        buf.extend(second);

        let results: Vec<_> = RecordCursor::new(&buf).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1].unwrap_err().offset, second_offset);
    }

    #[test]
    fn test_cursor_rejects_truncated_header() {
        let buf = vec![0u8; RECORD_HEADER_SIZE - 1];
        let err = RecordCursor::new(&buf).next().unwrap().unwrap_err();
        assert_eq!(err.reason, "truncated record header");
        let err = err.into_walk_error(Path::new("/d"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_cursor_rejects_missing_nul() {
        let mut buf = record(9, 8, b"abcd");
        let last = buf.len() - 1;
        for b in &mut buf[RECORD_HEADER_SIZE..=last] {
            *b = b'x';
        }
        let err = RecordCursor::new(&buf).next().unwrap().unwrap_err();
        assert_eq!(err.reason, "unterminated record name");
    }

    #[test]
    fn test_prepare_scratch_grows_small_buffers() {
        let mut scratch = Vec::new();
        prepare_scratch(&mut scratch);
        assert_eq!(scratch.len(), DEFAULT_SCRATCH_SIZE);

        let mut big = vec![0u8; DEFAULT_SCRATCH_SIZE * 2];
        prepare_scratch(&mut big);
        assert_eq!(big.len(), DEFAULT_SCRATCH_SIZE * 2);
    }

    #[test]
    fn test_minimum_scratch_is_a_page() {
        let page = minimum_scratch_size();
        assert!(page >= 4096);
        assert!(page.is_power_of_two());
    }

    #[test]
    fn test_hidden_entry() {
        assert!(DirEntry::new(".git", EntryKind::Directory).is_hidden());
        assert!(!DirEntry::new("src", EntryKind::Directory).is_hidden());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unknown_type_resolved_by_lstat() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("plain"), "x").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let mut buf = record(11, libc::DT_UNKNOWN, b"plain");
        buf.extend(record(12, libc::DT_UNKNOWN, b"sub"));
        buf.extend(record(13, libc::DT_REG, b"untouched"));

        let mut entries = Vec::new();
        sys::push_records(temp.path(), &buf, true, &mut entries).unwrap();
        let kinds: Vec<_> = entries.iter().map(|e| (e.name().to_owned(), e.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                (OsString::from("plain"), EntryKind::Regular),
                (OsString::from("sub"), EntryKind::Directory),
                // Typed records are never stat'ed, even if the name is gone
                (OsString::from("untouched"), EntryKind::Regular),
            ]
        );

        // Names-only reads leave the type unresolved
        let raw = RecordCursor::new(&buf).next().unwrap().unwrap();
        let entry = sys::entry_from_record(temp.path(), &raw, false).unwrap();
        assert_eq!(entry.kind(), EntryKind::Unknown);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_vanished_unknown_entry_fails_whole_read() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("kept"), "").unwrap();

        let mut buf = record(21, libc::DT_UNKNOWN, b"kept");
        buf.extend(record(22, libc::DT_UNKNOWN, b"vanished"));

        let mut entries = Vec::new();
        let err = sys::push_records(temp.path(), &buf, true, &mut entries).unwrap_err();
        assert!(matches!(err, WalkError::NotFound { .. }));
        assert!(!err.is_fatal());

        // Without resolution the same buffer reads fine
        let mut entries = Vec::new();
        sys::push_records(temp.path(), &buf, false, &mut entries).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_dtype_mapping() {
        assert_eq!(sys::kind_from_dtype(libc::DT_DIR), EntryKind::Directory);
        assert_eq!(sys::kind_from_dtype(libc::DT_LNK), EntryKind::Symlink);
        assert_eq!(sys::kind_from_dtype(libc::DT_UNKNOWN), EntryKind::Unknown);
    }
}
