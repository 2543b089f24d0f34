use std::path::{Component, Path, PathBuf};

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

pub(crate) fn is_relative_to_base(path: &Path, base: &Path) -> bool {
    path.starts_with(base)
}

/// Resolve `.` and `..` without touching the filesystem.
///
/// `..` at the root stays at the root.
pub(crate) fn normalize_path_lexically(path: &Path) -> PathBuf {
    let mut path_out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => path_out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                path_out.pop();
            }
            Component::Normal(part) => path_out.push(part),
        }
    }
    path_out
}

/// Printable header-safe copy of `name`: control chars become `_`, quotes and
/// backslashes are escaped.
pub(crate) fn escape_quoted_filename(name: &str) -> String {
    let mut c_out = String::with_capacity(name.len());
    for chr in name.chars() {
        match chr {
            '"' | '\\' => {
                c_out.push('\\');
                c_out.push(chr);
            }
            _ if chr.is_control() => c_out.push('_'),
            _ => c_out.push(chr),
        }
    }
    c_out
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
