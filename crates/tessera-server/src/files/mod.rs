//! File handlers.
//!
//! - [`FileUploader`] stores the file part of a `multipart/form-data` body
//! - [`FileDownloader`] sends a file from a directory as an attachment
//! - [`StaticResourceHandler`] serves assets by extension with an optional
//!   LRU cache
//!
//! The downloader and the static handler write straight to the response
//! sink, so middleware that inspects the buffered response sees nothing
//! from them.

mod downloader;
mod static_files;
mod uploader;

use std::path::{Component, Path, PathBuf};

pub use downloader::FileDownloader;
pub use static_files::StaticResourceHandler;
pub use uploader::{FileHeader, FileUploader};

/// Joins `relative` onto `dir`, refusing anything that could leave `dir`.
///
/// `.` components are dropped. Parent, root and prefix components reject
/// the whole path, as does a path that names nothing.
pub(crate) fn join_within(dir: &Path, relative: &str) -> Option<PathBuf> {
    let mut joined = dir.to_path_buf();
    let mut named = false;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                named = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    named.then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_within() {
        let dir = Path::new("/srv/files");
        assert_eq!(join_within(dir, "a.txt"), Some(PathBuf::from("/srv/files/a.txt")));
        assert_eq!(join_within(dir, "./sub/a.txt"), Some(PathBuf::from("/srv/files/sub/a.txt")));
        assert_eq!(join_within(dir, "../etc/passwd"), None);
        assert_eq!(join_within(dir, "sub/../../x"), None);
        assert_eq!(join_within(dir, "/etc/passwd"), None);
        assert_eq!(join_within(dir, ""), None);
        assert_eq!(join_within(dir, "."), None);
    }
}
