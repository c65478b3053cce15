//! Unique run identifiers.
//!
//! Every chart render writes a page description, engine logs and a final artifact to disk.
//! Concurrent renders share the filesystem namespace, so each invocation is tagged with a
//! [`RunId`]: a UTC timestamp with millisecond precision followed by a canonical UUID.
//!
//! ## Format
//! `YYYYMMDDTHHMMSS.mmmZ-<32 lowercase hex>`
//!
//! Example:
//! `20260111T143522.045Z-550e8400e29b41d4a716446655440000`
//!
//! The format contains no path separators, colons or spaces, so it can be embedded directly in
//! file and directory names on every supported platform.

mod run_id;

pub use run_id::{RunId, RunIdGenerator};
