//! Finding the renderer's output video.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

/// Subdirectory holding per-animation fragments, never a final artifact.
const PARTIAL_DIR: &str = "partial_movie_files";

const VIDEO_EXTENSION: &str = "mp4";

/// Search `root` recursively for a rendered video.
///
/// A file named `preferred` wins; otherwise the lexicographically first path.
/// Returns `None` when `root` is missing or holds no video.
#[must_use]
pub fn discover_artifact(root: &Utf8Path, preferred: &str) -> Option<Utf8PathBuf> {
    let mut found = Vec::new();
    collect_videos(root, &mut found);
    found.sort();

    found
        .iter()
        .find(|path| path.file_name() == Some(preferred))
        .or_else(|| found.first())
        .cloned()
}

fn collect_videos(dir: &Utf8Path, out: &mut Vec<Utf8PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if path.file_name() != Some(PARTIAL_DIR) {
                collect_videos(&path, out);
            }
        } else if path.extension() == Some(VIDEO_EXTENSION) {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenesmith_utils::test_support::utf8_temp_path;
    use tempfile::TempDir;

    fn touch(path: &Utf8Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"video").unwrap();
    }

    #[test]
    fn test_missing_root_yields_none() {
        let temp = TempDir::new().unwrap();
        let root = utf8_temp_path(&temp).join("nope");
        assert!(discover_artifact(&root, "output.mp4").is_none());
    }

    #[test]
    fn test_preferred_name_wins() {
        let temp = TempDir::new().unwrap();
        let root = utf8_temp_path(&temp);
        touch(&root.join("a/aaa.mp4"));
        touch(&root.join("z/output.mp4"));

        let found = discover_artifact(&root, "output.mp4").unwrap();
        assert_eq!(found.file_name(), Some("output.mp4"));
    }

    #[test]
    fn test_lexicographic_fallback_and_partials_skipped() {
        let temp = TempDir::new().unwrap();
        let root = utf8_temp_path(&temp);
        touch(&root.join("partial_movie_files/GeneratedScene/000.mp4"));
        touch(&root.join("b.mp4"));
        touch(&root.join("c.mp4"));
        touch(&root.join("notes.txt"));

        let found = discover_artifact(&root, "output.mp4").unwrap();
        assert_eq!(found, root.join("b.mp4"));
    }

    #[test]
    fn test_only_partials_is_none() {
        let temp = TempDir::new().unwrap();
        let root = utf8_temp_path(&temp);
        touch(&root.join("partial_movie_files/GeneratedScene/000.mp4"));
        assert!(discover_artifact(&root, "output.mp4").is_none());
    }
}
