// Build-step gates set by the orchestrator (platformio run wrapper).
//
// The accepted spellings are deliberately a closed set; anything else is
// an error rather than silently treated as false.

use anyhow::{bail, Context, Result};
use std::env;

pub fn parse_flag(value: &str) -> Result<bool> {
    let v = value.trim();
    if v == "1" || v.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if v == "0" || v.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        bail!("invalid flag value {v:?}: expected one of 1, 0, true, false");
    }
}

/// Reads a gate variable. `None` means the variable is unset, i.e. the
/// tool was run by hand rather than from the build orchestrator.
pub fn flag_from_env(var: &str) -> Result<Option<bool>> {
    match env::var(var) {
        Ok(value) => parse_flag(&value)
            .map(Some)
            .with_context(|| format!("environment variable {var}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("environment variable {var}")),
    }
}
