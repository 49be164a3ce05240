//! Version comparison for update decisions
//!
//! Versions reported by instances and attached to packages are semantic
//! versions. Precedence follows semver: build metadata is ignored and a
//! prerelease sorts before its release. Anything that fails to parse is never
//! treated as an upgrade, so a malformed value coming back from the store can
//! only ever withhold an update, not grant one.

use std::cmp::Ordering;

use roller_errors::ValidationError;
use semver::Version;

/// Check whether `input` is a valid semantic version.
#[must_use]
pub fn is_valid_version(input: &str) -> bool {
    Version::parse(input).is_ok()
}

/// Parse `input` as a semantic version.
///
/// # Errors
///
/// Returns `ValidationError::InvalidSemver` if `input` is not valid semver.
pub fn parse_version(input: &str) -> Result<Version, ValidationError> {
    Version::parse(input).map_err(|_| ValidationError::InvalidSemver {
        version: input.to_string(),
    })
}

/// Compare two version strings by semver precedence.
///
/// Returns `None` when either side is malformed.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a = Version::parse(a).ok()?;
    let b = Version::parse(b).ok()?;
    Some(precedence(&a, &b))
}

/// Whether moving from `current` to `target` is an upgrade.
#[must_use]
pub fn is_upgrade(current: &str, target: &str) -> bool {
    compare_versions(current, target) == Some(Ordering::Less)
}

/// Semver precedence: build metadata does not participate.
#[must_use]
pub fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_versions() {
        assert!(is_valid_version("1.0.0"));
        assert!(is_valid_version("1010.5.0+2016-05-27-1832"));
        assert!(is_valid_version("12.1.0-rc.1"));
        assert!(!is_valid_version("1.0"));
        assert!(!is_valid_version("aaa1.0.0"));
        assert!(!is_valid_version(""));
    }

    #[test]
    fn test_upgrade_ordering() {
        assert!(is_upgrade("1.0.0", "1.0.1"));
        assert!(is_upgrade("1.0.0-rc.1", "1.0.0"));
        assert!(!is_upgrade("1.0.1", "1.0.0"));
        assert!(!is_upgrade("1.0.0", "1.0.0"));
        assert!(!is_upgrade("1.0.0+build.1", "1.0.0+build.2"));
    }

    #[test]
    fn test_malformed_is_not_an_upgrade() {
        assert_eq!(compare_versions("garbage", "1.0.0"), None);
        assert!(!is_upgrade("garbage", "1.0.0"));
        assert!(!is_upgrade("1.0.0", "2.0"));
    }

    #[test]
    fn test_parse_version_error() {
        let err = parse_version("1.0").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSemver { version } if version == "1.0"));
    }

    proptest! {
        #[test]
        fn upgrade_iff_strictly_lower(
            a in (0u64..50, 0u64..50, 0u64..50),
            b in (0u64..50, 0u64..50, 0u64..50),
        ) {
            let current = format!("{}.{}.{}", a.0, a.1, a.2);
            let target = format!("{}.{}.{}", b.0, b.1, b.2);
            prop_assert_eq!(is_upgrade(&current, &target), a < b);
        }

        #[test]
        fn never_upgrades_to_same_or_older(
            a in (0u64..50, 0u64..50, 0u64..50),
            build in "[a-z0-9]{1,8}",
        ) {
            let current = format!("{}.{}.{}", a.0, a.1, a.2);
            let same_with_build = format!("{current}+{build}");
            prop_assert!(!is_upgrade(&current, &same_with_build));
            prop_assert!(!is_upgrade(&same_with_build, &current));
        }
    }
}
