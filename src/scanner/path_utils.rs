//! Root prefix removal for enumerated paths.
//!
//! Every record in the inventory stores its path relative to the snapshot root
//! it was found under, so the same logical file in two snapshots gets the same
//! `relative_path` and can be grouped.
//!
//! Two ways of removing the root are supported:
//!
//! - [`strip_root_prefix`]: component-wise, via [`Path::strip_prefix`]. A root
//!   given as `/snap/a` or `/snap/a/` produces the same relative paths.
//! - [`slice_root_prefix`]: drops as many bytes as the root string is long.
//!   This is how stores written by the old tooling were keyed, so it keeps
//!   their quirks: a root without a trailing slash leaves a leading separator
//!   on every relative path, and a root with one does not.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use treehardlink::scanner::path_utils::{slice_root_prefix, strip_root_prefix};
//!
//! let path = Path::new("/snap/a/docs/report.pdf");
//!
//! assert_eq!(strip_root_prefix(Path::new("/snap/a"), path).unwrap(), "docs/report.pdf");
//! assert_eq!(strip_root_prefix(Path::new("/snap/a/"), path).unwrap(), "docs/report.pdf");
//!
//! assert_eq!(slice_root_prefix(Path::new("/snap/a"), path).unwrap(), "/docs/report.pdf");
//! assert_eq!(slice_root_prefix(Path::new("/snap/a/"), path).unwrap(), "docs/report.pdf");
//! ```

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use super::RelativePathMode;

/// Remove `root` from the front of `path` component by component.
///
/// Returns `None` if `path` is not under `root`. Non-UTF-8 bytes are replaced
/// with U+FFFD.
#[must_use]
pub fn strip_root_prefix(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().into_owned())
}

/// Remove as many leading bytes from `path` as `root` has.
///
/// The bytes are not compared, only counted. Returns `None` when `path` is
/// shorter than `root`.
#[must_use]
pub fn slice_root_prefix(root: &Path, path: &Path) -> Option<String> {
    let root_len = root.as_os_str().as_encoded_bytes().len();
    let bytes = path.as_os_str().as_encoded_bytes();
    bytes
        .get(root_len..)
        .map(|rest| String::from_utf8_lossy(rest).into_owned())
}

/// Make a root absolute against the current directory.
///
/// Absolute roots are returned byte for byte, so slicing keeps working on
/// them. Symlinks and `..` are not resolved. If the current directory cannot
/// be read the root is returned as given.
#[must_use]
pub fn absolute_root(root: &Path) -> PathBuf {
    if root.is_absolute() {
        return root.to_path_buf();
    }
    std::path::absolute(root).unwrap_or_else(|e| {
        log::debug!("Cannot make {} absolute: {}", root.display(), e);
        root.to_path_buf()
    })
}

/// Compute the relative path in the given mode.
#[must_use]
pub fn relative_path(root: &Path, path: &Path, mode: RelativePathMode) -> Option<String> {
    match mode {
        RelativePathMode::StripPrefix => strip_root_prefix(root, path),
        RelativePathMode::ByteSlice => slice_root_prefix(root, path),
    }
}

/// Rebuild a displayable full path from a stored root and relative path.
///
/// Works for relative paths from either mode: a leading separator left by
/// byte slicing is not doubled.
///
/// # Example
///
/// ```
/// use treehardlink::scanner::path_utils::rejoin;
///
/// assert_eq!(rejoin("/snap/a", "docs/x"), "/snap/a/docs/x");
/// assert_eq!(rejoin("/snap/a", "/docs/x"), "/snap/a/docs/x");
/// assert_eq!(rejoin("/snap/a/", "docs/x"), "/snap/a/docs/x");
/// ```
#[must_use]
pub fn rejoin(root: &str, relative: &str) -> String {
    let root_has_sep = root.ends_with(&['/', MAIN_SEPARATOR][..]);
    let rel_has_sep = relative.starts_with(&['/', MAIN_SEPARATOR][..]);
    match (root_has_sep, rel_has_sep) {
        (true, true) => format!("{}{}", root, &relative[1..]),
        (false, false) if !root.is_empty() => format!("{root}{MAIN_SEPARATOR}{relative}"),
        _ => format!("{root}{relative}"),
    }
}
