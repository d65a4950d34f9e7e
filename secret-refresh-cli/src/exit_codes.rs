/// Exit codes for schedulers and automation.
pub const SUCCESS: i32 = 0;
pub const CONFIG_INVALID: i32 = 2;
pub const REFRESH_FAILED: i32 = 3;
pub const RUNTIME_ERROR: i32 = 4;
