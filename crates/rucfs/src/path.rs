//! Path strings.
//!
//! Paths are byte strings with `/` as the separator. Neither a leading
//! nor a trailing slash is required, and runs of separators are
//! tolerated everywhere. `.` and `..` are ordinary names.

use crate::error::{RucfsError, RucfsResult};

/// The path separator.
pub const SEPARATOR: u8 = b'/';

/// Iterate the non-empty segments of `path`.
pub fn segments(path: &[u8]) -> impl Iterator<Item = &[u8]> {
    path.split(|&b| b == SEPARATOR).filter(|s| !s.is_empty())
}

/// Collapse runs of `/` in `src` into `dst`, returning the number of
/// bytes written.
///
/// A leading run becomes a single `/`. Interior runs become a single `/`
/// when followed by a name. A trailing run is dropped, unless `endslash`
/// is set, in which case it is kept as one `/` and a further `/` is
/// appended:
///
/// ```
/// let mut buf = [0u8; 21];
/// let n = rucfs::normalize_path(&mut buf, b"//fff//dd////d39.bb/", false).unwrap();
/// assert_eq!(&buf[..n], b"/fff/dd/d39.bb");
/// let n = rucfs::normalize_path(&mut buf, b"//fff//dd////d39.bb/", true).unwrap();
/// assert_eq!(&buf[..n], b"/fff/dd/d39.bb//");
/// ```
///
/// `dst` must hold at least `src.len() + 1` bytes.
pub fn normalize_path(dst: &mut [u8], src: &[u8], endslash: bool) -> RucfsResult<usize> {
    if dst.len() < src.len() + 1 {
        return Err(RucfsError::arguments(format!(
            "destination of {} bytes cannot hold a normalized {}-byte path",
            dst.len(),
            src.len()
        )));
    }

    let mut len = 0;
    let mut pending = false;
    for (i, &b) in src.iter().enumerate() {
        if b == SEPARATOR {
            if i == 0 {
                dst[len] = SEPARATOR;
                len += 1;
            } else if dst[..len].last() != Some(&SEPARATOR) {
                pending = true;
            }
            continue;
        }
        if pending {
            dst[len] = SEPARATOR;
            len += 1;
            pending = false;
        }
        dst[len] = b;
        len += 1;
    }

    if endslash {
        if pending {
            dst[len] = SEPARATOR;
            len += 1;
        }
        dst[len] = SEPARATOR;
        len += 1;
    }
    Ok(len)
}

/// Allocating wrapper around [`normalize_path`].
pub fn normalized(src: &[u8], endslash: bool) -> Vec<u8> {
    let mut buf = vec![0u8; src.len() + 1];
    // The buffer is sized for the worst case, so this cannot fail.
    let len = normalize_path(&mut buf, src, endslash).unwrap_or(0);
    buf.truncate(len);
    buf
}

/// Lossy display form of a byte path, for error messages and logs.
pub(crate) fn lossy(path: &[u8]) -> String {
    String::from_utf8_lossy(path).into_owned()
}
