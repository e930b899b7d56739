//! Display-path resolution for document headers.

use std::path::Path;

/// Display path for `file`, relative to `root` where possible.
///
/// Without a root the bare file name is returned. With one, a file under
/// the root resolves to its root-relative path and a file outside it to
/// its full absolute path, both forward-slash separated so the emitted
/// document is platform-independent. Any resolution failure falls back
/// to the bare file name; header rendering never aborts an export.
pub fn display_path(file: &Path, root: Option<&Path>) -> String {
    let Some(root) = root else {
        return base_name(file);
    };
    relative_display(file, root).unwrap_or_else(|| base_name(file))
}

fn relative_display(file: &Path, root: &Path) -> Option<String> {
    let file = std::path::absolute(file).ok()?;
    let root = std::path::absolute(root).ok()?;
    let shown = match file.strip_prefix(&root) {
        Ok(relative) => relative,
        Err(_) => file.as_path(),
    };
    Some(shown.to_string_lossy().replace('\\', "/"))
}

/// The file's final component, or the whole path if it has none.
pub fn base_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_no_root_uses_base_name() {
        assert_eq!(display_path(Path::new("/proj/sub/main.py"), None), "main.py");
    }

    #[test]
    fn test_file_under_root_is_relative() {
        let root = PathBuf::from("/proj");
        let file = root.join("sub").join("dir").join("file.py");
        assert_eq!(
            display_path(&file, Some(&root)),
            "sub/dir/file.py"
        );
    }

    #[test]
    fn test_file_outside_root_is_absolute() {
        let shown = display_path(Path::new("/other/place/file.py"), Some(Path::new("/proj")));
        assert_eq!(shown, "/other/place/file.py");
    }

    #[test]
    fn test_root_prefix_must_match_whole_component() {
        // "/proj2/file.py" is not under "/proj" even though the string is
        // a prefix.
        let shown = display_path(Path::new("/proj2/file.py"), Some(Path::new("/proj")));
        assert_eq!(shown, "/proj2/file.py");
    }

    #[test]
    fn test_empty_path_falls_back_to_itself() {
        assert_eq!(display_path(Path::new(""), None), "");
    }
}
