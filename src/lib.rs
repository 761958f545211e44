//! Host-side release tools for the nucleo_f042k6 firmware.
//!
//! Two independent pieces, one binary each:
//! - `version-stamp` bumps the persisted version counter and regenerates
//!   `lib/mylib/version.hpp` before a build
//! - `upload-to-server` pushes a built `firmware.bin` to the flashing host
//!   over SFTP and runs `st-flash` there

pub mod config;
pub mod deploy;
pub mod flags;
pub mod version;
