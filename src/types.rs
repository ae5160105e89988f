//! Shared value types passed between the repository, the lifecycle hooks and
//! the image pipeline.

use std::fmt;

/// A file submitted by an editor, held in memory until a hook stores it.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-side file name, e.g. `"dawn.jpg"`. Only the last path
    /// component is ever used to build storage keys.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name.
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }

    /// File name with any client-side directories stripped.
    pub fn file_name(&self) -> &str {
        self.name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.name.as_str())
    }
}

// Upload payloads can be megabytes; keep Debug output to the size.
impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The image submitted with a save.
///
/// Images are compared by identity, never by content: `Keep` is the
/// previously stored file, an `Upload` is always a new one even if its bytes
/// happen to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    Keep,
    Upload(UploadedFile),
}

impl ImageInput {
    pub fn upload(&self) -> Option<&UploadedFile> {
        match self {
            ImageInput::Keep => None,
            ImageInput::Upload(file) => Some(file),
        }
    }
}

/// Who is asking. Authentication itself happens outside this crate; all we
/// see is whether the request carries a logged-in editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Staff,
}

impl Caller {
    pub fn is_staff(self) -> bool {
        matches!(self, Caller::Staff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_strips_client_directories() {
        let f = UploadedFile::new("C:\\Users\\me\\dawn.jpg", vec![]);
        assert_eq!(f.file_name(), "dawn.jpg");
        let f = UploadedFile::new("photos/2024/dawn.jpg", vec![]);
        assert_eq!(f.file_name(), "dawn.jpg");
        let f = UploadedFile::new("dawn.jpg", vec![]);
        assert_eq!(f.file_name(), "dawn.jpg");
    }

    #[test]
    fn debug_hides_payload() {
        let f = UploadedFile::new("a.png", vec![0; 4096]);
        let dbg = format!("{f:?}");
        assert!(dbg.contains("len: 4096"));
        assert!(!dbg.contains("0, 0"));
    }

    #[test]
    fn keep_has_no_upload() {
        assert!(ImageInput::Keep.upload().is_none());
        let up = ImageInput::Upload(UploadedFile::new("a.png", vec![1]));
        assert_eq!(up.upload().map(|f| f.name.as_str()), Some("a.png"));
    }
}
