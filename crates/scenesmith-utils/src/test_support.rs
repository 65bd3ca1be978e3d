//! Helpers shared by unit and integration tests.

use camino::Utf8PathBuf;

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Check whether real provider integration tests should run.
///
/// `SCENESMITH_SKIP_LLM_TESTS=1` always disables real provider tests.
/// `SCENESMITH_REAL_LLM_TESTS=1` enables them.
#[must_use]
pub fn llm_tests_enabled() -> bool {
    if env_flag("SCENESMITH_SKIP_LLM_TESTS") {
        return false;
    }
    env_flag("SCENESMITH_REAL_LLM_TESTS")
}

/// UTF-8 path of a temporary directory.
///
/// # Panics
///
/// Panics if the temporary directory path is not valid UTF-8.
#[must_use]
pub fn utf8_temp_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .unwrap_or_else(|p| panic!("temp dir is not UTF-8: {}", p.display()))
}

/// A script that passes every structural check the Coder applies.
#[must_use]
pub fn valid_scene_script() -> String {
    "from manim import *\n\n\
     class GeneratedScene(Scene):\n    \
         def construct(self):\n        \
             circle = Circle()\n        \
             self.play(Create(circle))\n"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_scene_script_markers() {
        let script = valid_scene_script();
        assert!(script.contains("from manim import"));
        assert!(script.contains("class GeneratedScene(Scene)"));
        assert!(script.contains("def construct"));
    }

    #[test]
    fn test_utf8_temp_path() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(utf8_temp_path(&dir).as_std_path(), dir.path());
    }
}
