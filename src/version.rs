// Version counter handling for the pre-build stamp step.
//
// The counter lives in a flat file as "<major>,<minor>,<patch>" with no
// trailing newline. Each stamp bumps the patch component and rewrites both
// the counter file and the generated C header.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Next patch release. Major and minor are only ever edited by hand.
    pub fn bump_patch(self) -> Self {
        Self {
            patch: self.patch + 1,
            ..self
        }
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.trim().split(',').collect();
        if fields.len() != 3 {
            bail!(
                "expected 3 comma-separated version fields, got {}: {:?}",
                fields.len(),
                s.trim()
            );
        }
        let component = |name: &str, raw: &str| -> Result<u32> {
            raw.trim()
                .parse::<u32>()
                .with_context(|| format!("{name} version component {raw:?} is not a non-negative integer"))
        };
        Ok(Self {
            major: component("major", fields[0])?,
            minor: component("minor", fields[1])?,
            patch: component("patch", fields[2])?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.major, self.minor, self.patch)
    }
}

/// Renders the generated header. The constant names are part of the
/// firmware's source contract, so the layout is fixed.
pub fn header_contents(version: &Version) -> String {
    format!(
        "#ifndef VERSION_HPP\n\
         #define VERSION_HPP\n\
         \n\
         #define MAIN_VERSION {}\n\
         #define SUB_VERSION {}\n\
         #define SUB_SUB_VERSION {}\n\
         \n\
         #endif",
        version.major, version.minor, version.patch
    )
}

/// Reads the persisted triple, bumps the patch component, rewrites the
/// counter file and regenerates the header. Nothing is written if the
/// counter file is missing or malformed. There is no locking and no
/// atomicity across the two writes.
pub fn stamp(version_file: &Path, header_file: &Path) -> Result<Version> {
    let raw = fs::read_to_string(version_file)
        .with_context(|| format!("reading version file {}", version_file.display()))?;
    let next = raw
        .parse::<Version>()
        .with_context(|| format!("parsing version file {}", version_file.display()))?
        .bump_patch();

    fs::write(version_file, next.to_string())
        .with_context(|| format!("writing version file {}", version_file.display()))?;
    fs::write(header_file, header_contents(&next))
        .with_context(|| format!("writing header {}", header_file.display()))?;

    info!(version = %next, "stamped firmware version");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_parse_and_display_round_trip() {
        let v: Version = "1,2,3".parse().unwrap();
        assert_eq!(
            v,
            Version {
                major: 1,
                minor: 2,
                patch: 3
            }
        );
        assert_eq!(v.to_string(), "1,2,3");
    }

    #[test]
    fn test_parse_tolerates_field_whitespace() {
        let v: Version = " 4, 5 ,6 ".parse().unwrap();
        assert_eq!(v.to_string(), "4,5,6");
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert!("1,2".parse::<Version>().is_err());
        assert!("1,2,3,4".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_parse_rejects_non_integer_fields() {
        assert!("a,b,c".parse::<Version>().is_err());
        assert!("1,2,-3".parse::<Version>().is_err());
        assert!("1.0,2,3".parse::<Version>().is_err());
    }

    #[test]
    fn test_bump_patch_leaves_major_minor_untouched() {
        let v = Version {
            major: 7,
            minor: 0,
            patch: 41,
        };
        assert_eq!(v.bump_patch().to_string(), "7,0,42");
    }

    #[test]
    fn test_header_matches_firmware_contract() {
        let v = Version {
            major: 1,
            minor: 2,
            patch: 4,
        };
        let header = header_contents(&v);
        assert_eq!(
            header,
            "#ifndef VERSION_HPP\n#define VERSION_HPP\n\n#define MAIN_VERSION 1\n#define SUB_VERSION 2\n#define SUB_SUB_VERSION 4\n\n#endif"
        );
    }

    #[test]
    fn test_stamp_rewrites_counter_and_header() {
        let dir = tempdir().unwrap();
        let counter = dir.path().join("last_version");
        let header = dir.path().join("version.hpp");
        std::fs::write(&counter, "1,2,3").unwrap();

        let next = stamp(&counter, &header).unwrap();

        assert_eq!(next.to_string(), "1,2,4");
        assert_eq!(std::fs::read_to_string(&counter).unwrap(), "1,2,4");
        let generated = std::fs::read_to_string(&header).unwrap();
        assert!(generated.contains("#define MAIN_VERSION 1"));
        assert!(generated.contains("#define SUB_VERSION 2"));
        assert!(generated.contains("#define SUB_SUB_VERSION 4"));
    }

    #[test]
    fn test_two_stamps_bump_patch_by_two() {
        let dir = tempdir().unwrap();
        let counter = dir.path().join("last_version");
        let header = dir.path().join("version.hpp");
        std::fs::write(&counter, "0,9,0").unwrap();

        stamp(&counter, &header).unwrap();
        stamp(&counter, &header).unwrap();

        assert_eq!(std::fs::read_to_string(&counter).unwrap(), "0,9,2");
    }

    #[test]
    fn test_malformed_counter_writes_nothing() {
        let dir = tempdir().unwrap();
        let counter = dir.path().join("last_version");
        let header = dir.path().join("version.hpp");
        std::fs::write(&counter, "1,2").unwrap();

        assert!(stamp(&counter, &header).is_err());

        // Neither output may change on a parse failure.
        assert_eq!(std::fs::read_to_string(&counter).unwrap(), "1,2");
        assert!(!header.exists());
    }

    #[test]
    fn test_missing_counter_is_an_error() {
        let dir = tempdir().unwrap();
        let counter = dir.path().join("does_not_exist");
        let header = dir.path().join("version.hpp");
        assert!(stamp(&counter, &header).is_err());
        assert!(!header.exists());
    }
}
