//! Run result reporting: live status lines, the final block, and exit codes.

pub mod exit;
pub mod reporter;

pub use exit::{
    check_exit_code, exit_code, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_OK, EXIT_REFUSED,
};
pub use reporter::Reporter;
