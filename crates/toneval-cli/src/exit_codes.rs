//! Process exit codes. Part of the public contract of the `toneval` binary.

pub const SUCCESS: i32 = 0;
pub const EXAMPLES_FAILED: i32 = 1; // Run completed but some examples were recorded as failed
pub const CONFIG_ERROR: i32 = 2; // Missing credential, bad config or dataset, I/O failure
