//! Semantic version helpers for reporting.
//!
//! The version policy only cares whether the `version` value changed. These
//! helpers describe *how* it changed and suggest the next patch version when
//! a bump is missing. Version strings are parsed with the [`semver`] crate;
//! anything that is not valid semver is reported as such rather than
//! rejected.

use serde::Serialize;

/// How a version string moved between the old and new manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
    /// Same `major.minor.patch`, different pre-release or build metadata.
    Prerelease,
    /// The new version sorts below the old one.
    Downgrade,
    /// One of the two values is not valid semver.
    NotSemver,
}

impl std::fmt::Display for BumpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BumpKind::Major => "major",
            BumpKind::Minor => "minor",
            BumpKind::Patch => "patch",
            BumpKind::Prerelease => "pre-release",
            BumpKind::Downgrade => "downgrade",
            BumpKind::NotSemver => "not semver",
        };
        f.write_str(s)
    }
}

/// Classifies the change from `from` to `to`.
///
/// # Examples
///
/// ```
/// # use bumpgate_core::version::{classify_bump, BumpKind};
/// assert_eq!(classify_bump("1.2.3", "2.0.0"), BumpKind::Major);
/// assert_eq!(classify_bump("1.2.3", "1.2.4"), BumpKind::Patch);
/// assert_eq!(classify_bump("1.2.3", "1.0.0"), BumpKind::Downgrade);
/// ```
pub fn classify_bump(from: &str, to: &str) -> BumpKind {
    let (Ok(old), Ok(new)) = (semver::Version::parse(from), semver::Version::parse(to)) else {
        return BumpKind::NotSemver;
    };

    if new < old {
        BumpKind::Downgrade
    } else if new.major != old.major {
        BumpKind::Major
    } else if new.minor != old.minor {
        BumpKind::Minor
    } else if new.patch != old.patch {
        BumpKind::Patch
    } else {
        BumpKind::Prerelease
    }
}

/// Bumps the patch component of a semver version string, dropping any
/// pre-release and build metadata. `None` if `version` is not valid semver.
///
/// # Examples
///
/// ```
/// # use bumpgate_core::version::bump_patch;
/// assert_eq!(bump_patch("1.2.3").as_deref(), Some("1.2.4"));
/// assert_eq!(bump_patch("3.1.4-alpha").as_deref(), Some("3.1.5"));
/// assert_eq!(bump_patch("latest"), None);
/// assert_eq!(bump_patch("1.0.18446744073709551615"), None);
/// ```
pub fn bump_patch(version: &str) -> Option<String> {
    let v = semver::Version::parse(version).ok()?;
    let patch = v.patch.checked_add(1)?;
    Some(semver::Version::new(v.major, v.minor, patch).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_patch_does_not_overflow() {
        let max = format!("2.3.{}", u64::MAX);
        assert_eq!(bump_patch(&max), None);
        assert_eq!(bump_patch(&format!("2.3.{}", u64::MAX - 1)), Some(max));
    }

    #[test]
    fn classify_major() {
        assert_eq!(classify_bump("1.9.9", "2.0.0"), BumpKind::Major);
    }

    #[test]
    fn classify_minor() {
        assert_eq!(classify_bump("0.1.0", "0.2.0"), BumpKind::Minor);
    }

    #[test]
    fn classify_patch() {
        assert_eq!(classify_bump("1.0.0", "1.0.1"), BumpKind::Patch);
    }

    #[test]
    fn classify_prerelease_promotion() {
        assert_eq!(classify_bump("1.0.0-rc.1", "1.0.0"), BumpKind::Prerelease);
    }

    #[test]
    fn classify_downgrade() {
        assert_eq!(classify_bump("2.0.0", "1.9.9"), BumpKind::Downgrade);
    }

    #[test]
    fn classify_not_semver() {
        assert_eq!(classify_bump("1.0", "1.1"), BumpKind::NotSemver);
        assert_eq!(classify_bump("1.0.0", "next"), BumpKind::NotSemver);
    }

    #[test]
    fn bump_patch_standard() {
        assert_eq!(bump_patch("1.2.3").as_deref(), Some("1.2.4"));
    }

    #[test]
    fn bump_patch_strips_build_metadata() {
        assert_eq!(bump_patch("1.0.0-alpha+build.1").as_deref(), Some("1.0.1"));
    }

    #[test]
    fn bump_patch_invalid_version() {
        assert_eq!(bump_patch(""), None);
        assert_eq!(bump_patch("1.2"), None);
    }
}
