//! External command execution and host access.

pub mod command;
pub mod host;
pub mod mock;
pub mod platform;

pub use command::{
    execute, CommandResult, CommandRunner, CommandSpec, SystemRunner, NOT_FOUND_EXIT_CODE,
    TIMEOUT_EXIT_CODE,
};
pub use host::Host;
pub use mock::MockRunner;
pub use platform::{is_ci, is_elevated, OsRelease};
