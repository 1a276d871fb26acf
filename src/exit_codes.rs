//! Exit code constants for the latchkey CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, invalid mutex name)
//! - 2: Contention (mutex already exists/locked/unlocked, concurrent transition)
//! - 3: Mutex not found
//! - 4: Engine or table bootstrap failure
//! - 5: Operation cancelled or deadline exceeded

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or invalid mutex name.
pub const USER_ERROR: i32 = 1;

/// Contention: the requested transition is not legal in the current state.
pub const CONTENTION: i32 = 2;

/// The named mutex does not exist.
pub const NOT_FOUND: i32 = 3;

/// Backing engine fault or table provisioning failure.
pub const ENGINE_FAILURE: i32 = 4;

/// The operation was cancelled before it could complete.
pub const CANCELLED: i32 = 5;
