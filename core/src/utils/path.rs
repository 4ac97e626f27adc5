use std::path::{Path, PathBuf};

pub trait PathExtension {
    /// normalized path, "." when empty
    fn display_path(&self) -> String;

    /// replace a leading `~` with the home directory
    fn expand_home(&self) -> PathBuf;
}

impl<T: AsRef<Path>> PathExtension for T {
    fn display_path(&self) -> String {
        let path = norm_path(self.as_ref().to_string_lossy());
        match path.is_empty() {
            true => String::from("."),
            false => path,
        }
    }

    fn expand_home(&self) -> PathBuf {
        let path = self.as_ref();
        let Ok(rest) = path.strip_prefix("~") else {
            return path.to_path_buf();
        };
        match home::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        }
    }
}

/// normalize path if needed
pub fn norm_path(path: impl AsRef<str>) -> String {
    let mut path = path.as_ref().replace('\\', "/");
    while path.ends_with('/') {
        path.pop();
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_path_never_empty() {
        assert_eq!("".display_path(), ".");
        assert_eq!("debug/deepin-draw/".display_path(), "debug/deepin-draw");
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!("/tmp/debug".expand_home(), PathBuf::from("/tmp/debug"));
        if let Some(home) = home::home_dir() {
            assert_eq!("~/debug".expand_home(), home.join("debug"));
        }
    }
}
