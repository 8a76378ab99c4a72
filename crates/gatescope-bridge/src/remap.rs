//! Source path translation for remote debugging.
//!
//! The simulator may run on a different machine and report paths from its
//! own filesystem view. Every path crossing the bridge is rewritten by
//! substituting the configured root prefix.

/// Rewrites simulator-reported paths into editor paths and back.
#[derive(Debug, Clone, Default)]
pub struct PathMap {
    src: Option<String>,
    dst: Option<String>,
}

impl PathMap {
    pub fn new(src: Option<String>, dst: Option<String>) -> Self {
        Self { src, dst }
    }

    /// True when both roots are configured and translation is active.
    pub fn is_active(&self) -> bool {
        self.src.is_some() && self.dst.is_some()
    }

    /// Rewrite a simulator-side path for the editor (dst root -> src root).
    pub fn to_editor(&self, path: &str) -> String {
        match (&self.src, &self.dst) {
            (Some(src), Some(dst)) => substitute(path, dst, src),
            _ => path.to_string(),
        }
    }

    /// Rewrite an editor path for the simulator (src root -> dst root).
    pub fn to_simulator(&self, path: &str) -> String {
        match (&self.src, &self.dst) {
            (Some(src), Some(dst)) => substitute(path, src, dst),
            _ => path.to_string(),
        }
    }
}

fn substitute(path: &str, from: &str, to: &str) -> String {
    match path.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_both_directions() {
        let map = PathMap::new(
            Some("/home/user/design".to_string()),
            Some("/mnt/build/design".to_string()),
        );

        assert_eq!(
            map.to_editor("/mnt/build/design/sub/top.py"),
            "/home/user/design/sub/top.py"
        );
        assert_eq!(
            map.to_simulator("/home/user/design/sub/top.py"),
            "/mnt/build/design/sub/top.py"
        );
    }

    #[test]
    fn passes_through_when_unconfigured_or_non_matching() {
        let unconfigured = PathMap::default();
        assert_eq!(unconfigured.to_editor("/a/b.py"), "/a/b.py");

        let map = PathMap::new(Some("/src".to_string()), Some("/dst".to_string()));
        assert_eq!(map.to_editor("/elsewhere/b.py"), "/elsewhere/b.py");
    }
}
