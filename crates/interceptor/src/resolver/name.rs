#![forbid(unsafe_code)]

use crate::{Error, text::FilePath};
use std::{
    borrow::Cow,
    os::fd::{AsRawFd, BorrowedFd},
    path::Path,
};

/// Suffix procfs appends to links whose target was unlinked.
const DELETED_SUFFIX: &str = " (deleted)";

/// Opaque handle to the name of the object an operation targets.
#[derive(Debug, Clone, Copy)]
pub enum NameContext<'a> {
    /// The caller already knows the name.
    Path(&'a Path),
    /// An open descriptor in this process; resolved through procfs.
    Fd(BorrowedFd<'a>),
    /// Objects without a name (pipes, anonymous memory, early I/O stages).
    Unnamed,
}

impl NameContext<'_> {
    /// Fetch the raw name. Nothing is normalized yet.
    fn query(&self) -> Result<Cow<'_, str>, Error> {
        match self {
            Self::Path(path) => Ok(path.to_string_lossy()),
            Self::Fd(fd) => {
                let link = std::fs::read_link(format!("/proc/self/fd/{}", fd.as_raw_fd()))
                    .map_err(|_| Error::NameUnavailable)?;
                Ok(Cow::Owned(link.to_string_lossy().into_owned()))
            }
            Self::Unnamed => Err(Error::NameUnavailable),
        }
    }
}

/// A fetched and parsed file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameInfo {
    name: String,
    /// Byte offset of the final component within `name`.
    final_start: usize,
}

impl FileNameInfo {
    /// Normalize `raw`: `/` and `\` both separate components, runs of
    /// separators collapse, trailing separators and the procfs
    /// ` (deleted)` marker are dropped.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let raw = raw.strip_suffix(DELETED_SUFFIX).unwrap_or(raw);
        let separator = if raw.contains('\\') && !raw.contains('/') { '\\' } else { '/' };

        let mut name = String::with_capacity(raw.len());
        let mut previous_was_separator = false;
        for ch in raw.chars() {
            let is_separator = ch == '/' || ch == '\\';
            if is_separator && previous_was_separator {
                continue;
            }
            name.push(if is_separator { separator } else { ch });
            previous_was_separator = is_separator;
        }
        while name.len() > 1 && name.ends_with(separator) {
            name.pop();
        }
        if name.is_empty() || name == separator.to_string() {
            return Err(Error::NameUnavailable);
        }

        let final_start = name.rfind(separator).map_or(0, |idx| idx + 1);
        Ok(Self { name, final_start })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn final_component(&self) -> &str {
        &self.name[self.final_start..]
    }

    /// Everything before the final component, without its separator.
    pub fn parent(&self) -> Option<&str> {
        (self.final_start > 0).then(|| &self.name[..self.final_start - 1])
    }

    pub fn extension(&self) -> Option<&str> {
        match self.final_component().rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

/// Bounded, normalized path of the operation's target.
pub fn resolve_file_path(context: &NameContext<'_>) -> Result<FilePath, Error> {
    let raw = context.query()?;
    let info = FileNameInfo::parse(&raw)?;
    Ok(FilePath::from_str_truncated(info.name()))
}
