//! Error path testing
//!
//! Tests how the filesystem reports damaged images, host I/O failures and
//! resource exhaustion, and whether it stays usable after recoverable errors.
//! The error type itself is covered in src/errors.rs.

mod io_tests;
