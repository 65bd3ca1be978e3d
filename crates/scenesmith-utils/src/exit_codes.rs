//! Exit code constants for the scenesmith CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Pipeline completed successfully |
//! | 1 | `PIPELINE_FAILURE` | A stage was exhausted or rendering failed |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 70 | `PROVIDER_FAILURE` | Generation provider unusable (credentials, misconfiguration) |

/// Exit codes matching the table above.
///
/// Use the named constants, or [`as_i32()`](Self::as_i32) to get the numeric
/// value for `std::process::exit()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Pipeline completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// A mandatory stage failed or the render loop gave up
    pub const PIPELINE_FAILURE: ExitCode = ExitCode(1);

    /// Invalid or missing command-line arguments or configuration values
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Generation provider could not be used at all
    pub const PROVIDER_FAILURE: ExitCode = ExitCode(70);

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.0
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
