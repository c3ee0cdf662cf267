//! Header and file index of the wxapkg container.

use super::PackageError;

pub(super) const FIRST_MARK: u8 = 0xBE;
pub(super) const LAST_MARK: u8 = 0xED;
pub(super) const HEADER_LEN: usize = 14;
/// Upper bound on a single file name in the index (10 MiB).
pub(super) const MAX_NAME_LEN: u32 = 10 * 1024 * 1024;

/// Fixed 14-byte header plus the file count that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageHeader {
    /// Length of the index (file count + entries).
    pub index_info_len: u32,
    /// Length of the concatenated file bodies.
    pub body_info_len: u32,
    pub file_count: u32,
}

/// One index record. `offset` is absolute from the start of the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

impl FileEntry {
    /// Byte range of the body, or None when it runs past `len`.
    pub fn range_within(&self, len: usize) -> Option<std::ops::Range<usize>> {
        let start = self.offset as usize;
        let end = start.checked_add(self.size as usize)?;
        (end <= len).then_some(start..end)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], PackageError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(PackageError::Truncated { at: self.pos })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, PackageError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Parse the header and index of a plain (decrypted) package.
pub fn parse_index(data: &[u8]) -> Result<(PackageHeader, Vec<FileEntry>), PackageError> {
    if data.len() < HEADER_LEN || data[0] != FIRST_MARK || data[13] != LAST_MARK {
        return Err(PackageError::BadMagic);
    }
    let mut r = Reader { data, pos: 5 };
    let index_info_len = r.u32()?;
    let body_info_len = r.u32()?;
    r.pos = HEADER_LEN;
    let file_count = r.u32()?;
    if file_count == 0 {
        return Err(PackageError::EmptyIndex);
    }

    // Cap the preallocation: a corrupt count must not reserve gigabytes.
    let mut entries = Vec::with_capacity((file_count as usize).min(4096));
    for _ in 0..file_count {
        let name_len = r.u32()?;
        if name_len > MAX_NAME_LEN {
            return Err(PackageError::NameTooLong { len: name_len });
        }
        let name = String::from_utf8_lossy(r.take(name_len as usize)?).into_owned();
        let offset = r.u32()?;
        let size = r.u32()?;
        entries.push(FileEntry { name, offset, size });
    }

    Ok((
        PackageHeader {
            index_info_len,
            body_info_len,
            file_count,
        },
        entries,
    ))
}

/// Build a package from `(name, body)` pairs. Names are stored as given
/// (the WeChat packer uses a leading `/`).
pub fn write_package<N, B>(files: &[(N, B)]) -> Vec<u8>
where
    N: AsRef<str>,
    B: AsRef<[u8]>,
{
    let index_len: usize = 4 + files
        .iter()
        .map(|(name, _)| 4 + name.as_ref().len() + 4 + 4)
        .sum::<usize>();
    let body_len: usize = files.iter().map(|(_, body)| body.as_ref().len()).sum();

    let mut out = Vec::with_capacity(HEADER_LEN + index_len + body_len);
    out.push(FIRST_MARK);
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&(index_len as u32).to_be_bytes());
    out.extend_from_slice(&(body_len as u32).to_be_bytes());
    out.push(LAST_MARK);
    out.extend_from_slice(&(files.len() as u32).to_be_bytes());

    let mut offset = HEADER_LEN + index_len;
    for (name, body) in files {
        let (name, body) = (name.as_ref(), body.as_ref());
        out.extend_from_slice(&(name.len() as u32).to_be_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        offset += body.len();
    }
    for (_, body) in files {
        out.extend_from_slice(body.as_ref());
    }
    out
}
