//! Mod version parsing and constraint matching
//!
//! Versions follow a relaxed semantic-versioning shape
//! (`MAJOR[.MINOR[.PATCH]][-SUFFIX]`). Constraints are the grammar mod
//! manifests use to pin dependency versions.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// Version parse error
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("version string is empty")]
    Empty,

    #[error("invalid version `{0}`: expected MAJOR[.MINOR[.PATCH]][-SUFFIX]")]
    Invalid(String),
}

/// Constraint parse error
///
/// Always names the accepted forms so manifest authors can fix the
/// constraint without reading the docs.
#[derive(Debug, Error)]
#[error("invalid version constraint `{input}`: {reason}; accepted forms: `*` or `any`, \
         exact `1.2.3`, `~1.2.3`, `^1.2.3`, range `[1.2.3,2.0.0)`, `>=1.2.3`, `<2.0.0`")]
pub struct ConstraintParseError {
    pub input: String,
    pub reason: String,
}

/// Parsed mod version
///
/// `suffix` holds any pre-release/build tag (`-beta`, `+nightly`). Ordering:
/// numeric components first, then a release (no suffix) outranks a
/// pre-release, then suffixes compare lexicographically case-insensitively.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub suffix: Option<String>,
    /// `-` or `+`, whichever introduced the suffix; kept so `Display`
    /// round-trips the original spelling.
    suffix_separator: char,
}

impl Version {
    /// Parse a version string, trimming surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        // Split off the first `-` or `+` as the suffix.
        let (core, suffix, suffix_separator) = match input.find(['-', '+']) {
            Some(pos) if pos > 0 => {
                let tag = &input[pos + 1..];
                if tag.is_empty() {
                    return Err(VersionError::Invalid(input.to_string()));
                }
                (&input[..pos], Some(tag.to_string()), input.as_bytes()[pos] as char)
            }
            _ => (input, None, '-'),
        };

        let mut parts = [0u64; 3];
        let mut count = 0;
        for piece in core.split('.') {
            if count >= 3 {
                return Err(VersionError::Invalid(input.to_string()));
            }
            if piece.is_empty() || !piece.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::Invalid(input.to_string()));
            }
            parts[count] = piece
                .parse()
                .map_err(|_| VersionError::Invalid(input.to_string()))?;
            count += 1;
        }
        if count == 0 {
            return Err(VersionError::Invalid(input.to_string()));
        }

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            suffix,
            suffix_separator,
        })
    }

    fn numeric(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric().cmp(&other.numeric()).then_with(|| {
            match (&self.suffix, &other.suffix) {
                (None, None) => Ordering::Equal,
                // A release outranks any pre-release at the same number.
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(suffix) = &self.suffix {
            write!(f, "{}{}", self.suffix_separator, suffix)?;
        }
        Ok(())
    }
}

/// A predicate over version strings.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionConstraint {
    /// `*` or `any`: matches everything, including unparseable versions.
    Any,
    /// Exact literal, equality only.
    Exact(Version),
    /// `~X.Y.Z`: same major and minor, patch at least Z.
    Tilde(Version),
    /// `^X.Y.Z`: same major, the rest at least Y.Z.
    Caret(Version),
    /// Explicit range with inclusive (`[`/`]`) or exclusive (`(`/`)`) bounds.
    Range {
        lower: Version,
        lower_inclusive: bool,
        upper: Version,
        upper_inclusive: bool,
    },
    /// `>=X`
    AtLeast(Version),
    /// `<X`
    Below(Version),
}

impl VersionConstraint {
    /// Parse a constraint string, trimming surrounding whitespace.
    ///
    /// A blank string is an error, never silently `Any`; only the documented
    /// literals `*` and `any` produce the match-everything constraint.
    pub fn parse(input: &str) -> Result<Self, ConstraintParseError> {
        let trimmed = input.trim();
        let err = |reason: String| ConstraintParseError {
            input: input.to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(err("constraint is blank".to_string()));
        }
        if trimmed == "*" || trimmed.eq_ignore_ascii_case("any") {
            return Ok(Self::Any);
        }

        if let Some(rest) = trimmed.strip_prefix(">=") {
            let version = Version::parse(rest).map_err(|e| err(e.to_string()))?;
            return Ok(Self::AtLeast(version));
        }
        if let Some(rest) = trimmed.strip_prefix('<') {
            let version = Version::parse(rest).map_err(|e| err(e.to_string()))?;
            return Ok(Self::Below(version));
        }
        if let Some(rest) = trimmed.strip_prefix('~') {
            let version = Version::parse(rest).map_err(|e| err(e.to_string()))?;
            return Ok(Self::Tilde(version));
        }
        if let Some(rest) = trimmed.strip_prefix('^') {
            let version = Version::parse(rest).map_err(|e| err(e.to_string()))?;
            return Ok(Self::Caret(version));
        }

        if trimmed.starts_with('[') || trimmed.starts_with('(') {
            let lower_inclusive = trimmed.starts_with('[');
            let upper_inclusive = match trimmed.chars().last() {
                Some(']') => true,
                Some(')') => false,
                _ => return Err(err("range must end with `]` or `)`".to_string())),
            };
            let inner = &trimmed[1..trimmed.len() - 1];
            let (lo, hi) = inner
                .split_once(',')
                .ok_or_else(|| err("range must contain exactly one `,`".to_string()))?;
            if hi.contains(',') {
                return Err(err("range must contain exactly one `,`".to_string()));
            }
            let lower = Version::parse(lo).map_err(|e| err(format!("lower bound: {}", e)))?;
            let upper = Version::parse(hi).map_err(|e| err(format!("upper bound: {}", e)))?;
            return Ok(Self::Range {
                lower,
                lower_inclusive,
                upper,
                upper_inclusive,
            });
        }

        // Anything else must be an exact version literal.
        let version = Version::parse(trimmed).map_err(|e| err(e.to_string()))?;
        Ok(Self::Exact(version))
    }

    /// Check whether a version string satisfies this constraint.
    ///
    /// An unparseable version satisfies only `Any`.
    pub fn matches(&self, version: &str) -> bool {
        if matches!(self, Self::Any) {
            return true;
        }
        let candidate = match Version::parse(version) {
            Ok(v) => v,
            Err(_) => return false,
        };
        match self {
            Self::Any => true,
            Self::Exact(v) => candidate == *v,
            Self::Tilde(v) => {
                candidate.major == v.major
                    && candidate.minor == v.minor
                    && candidate.patch >= v.patch
            }
            Self::Caret(v) => {
                candidate.major == v.major
                    && (candidate.minor, candidate.patch) >= (v.minor, v.patch)
            }
            Self::Range {
                lower,
                lower_inclusive,
                upper,
                upper_inclusive,
            } => {
                let above = if *lower_inclusive {
                    candidate >= *lower
                } else {
                    candidate > *lower
                };
                let below = if *upper_inclusive {
                    candidate <= *upper
                } else {
                    candidate < *upper
                };
                above && below
            }
            Self::AtLeast(v) => candidate >= *v,
            Self::Below(v) => candidate < *v,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Exact(v) => write!(f, "{}", v),
            Self::Tilde(v) => write!(f, "~{}", v),
            Self::Caret(v) => write!(f, "^{}", v),
            Self::Range {
                lower,
                lower_inclusive,
                upper,
                upper_inclusive,
            } => write!(
                f,
                "{}{},{}{}",
                if *lower_inclusive { '[' } else { '(' },
                lower,
                upper,
                if *upper_inclusive { ']' } else { ')' },
            ),
            Self::AtLeast(v) => write!(f, ">={}", v),
            Self::Below(v) => write!(f, "<{}", v),
        }
    }
}

/// Compare two version strings for deduplication.
///
/// Returns `None` when either side fails to parse; the caller keeps the
/// first-seen entry in that case.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a = Version::parse(a).ok()?;
    let b = Version::parse(b).ok()?;
    Some(a.cmp(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_and_partial_versions() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
        assert_eq!(v.suffix, None);

        let v = Version::parse("2.5").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (2, 5, 0));

        let v = Version::parse("3").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (3, 0, 0));

        let v = Version::parse(" 1.0.0-beta.2 ").unwrap();
        assert_eq!(v.suffix.as_deref(), Some("beta.2"));
    }

    #[test]
    fn rejects_malformed_versions() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("abc").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("1.2.3-").is_err());
    }

    #[test]
    fn release_outranks_prerelease() {
        let release = Version::parse("1.0.0").unwrap();
        let beta = Version::parse("1.0.0-beta").unwrap();
        assert!(release > beta);

        let alpha = Version::parse("1.0.0-ALPHA").unwrap();
        let beta2 = Version::parse("1.0.0-beta").unwrap();
        assert!(alpha < beta2);
        assert_eq!(alpha, Version::parse("1.0.0-alpha").unwrap());
    }

    #[test]
    fn display_preserves_the_suffix_separator() {
        assert_eq!(
            Version::parse("1.0.0-beta").unwrap().to_string(),
            "1.0.0-beta"
        );
        assert_eq!(
            Version::parse("1.0.0+nightly").unwrap().to_string(),
            "1.0.0+nightly"
        );
        assert_eq!(Version::parse("2.5").unwrap().to_string(), "2.5.0");
    }

    #[test]
    fn caret_constraint() {
        let c = VersionConstraint::parse("^1.2.3").unwrap();
        assert!(c.matches("1.2.3"));
        assert!(c.matches("1.9.9"));
        assert!(!c.matches("1.2.2"));
        assert!(!c.matches("2.0.0"));
    }

    #[test]
    fn tilde_constraint() {
        let c = VersionConstraint::parse("~1.2.3").unwrap();
        assert!(c.matches("1.2.3"));
        assert!(c.matches("1.2.9"));
        assert!(!c.matches("1.3.0"));
        assert!(!c.matches("1.2.2"));
    }

    #[test]
    fn bracket_range_constraint() {
        let c = VersionConstraint::parse("[1.2.3,2.0.0)").unwrap();
        assert!(c.matches("1.2.3"));
        assert!(c.matches("1.9.0"));
        assert!(!c.matches("2.0.0"));
        assert!(!c.matches("1.2.2"));

        let c = VersionConstraint::parse("(1.0.0,2.0.0]").unwrap();
        assert!(!c.matches("1.0.0"));
        assert!(c.matches("2.0.0"));
    }

    #[test]
    fn comparison_constraints() {
        let c = VersionConstraint::parse(">=1.2.3").unwrap();
        assert!(c.matches("1.2.3"));
        assert!(c.matches("4.0.0"));
        assert!(!c.matches("1.2.2"));

        let c = VersionConstraint::parse("<2.0.0").unwrap();
        assert!(c.matches("1.9.9"));
        assert!(!c.matches("2.0.0"));
    }

    #[test]
    fn exact_and_any_constraints() {
        let c = VersionConstraint::parse("1.2.3").unwrap();
        assert!(c.matches("1.2.3"));
        assert!(!c.matches("1.2.4"));

        assert!(VersionConstraint::parse("*").unwrap().matches("anything"));
        assert!(VersionConstraint::parse("ANY").unwrap().matches("0.0.1"));
    }

    #[test]
    fn blank_or_invalid_constraint_names_accepted_forms() {
        let err = VersionConstraint::parse("   ").unwrap_err();
        assert!(err.to_string().contains("accepted forms"));

        let err = VersionConstraint::parse(">=not-a-version").unwrap_err();
        assert!(err.to_string().contains("accepted forms"));

        let err = VersionConstraint::parse("[1.0.0,2.0.0").unwrap_err();
        assert!(err.to_string().contains("`]` or `)`"));
    }

    #[test]
    fn unparseable_version_fails_non_any_constraints() {
        assert!(!VersionConstraint::parse(">=1.0.0").unwrap().matches("not-a-version"));
        assert!(VersionConstraint::Any.matches("not-a-version"));
    }

    #[test]
    fn dedup_comparison() {
        assert_eq!(compare_versions("2.0.0", "1.0.0"), Some(Ordering::Greater));
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Some(Ordering::Equal));
        assert_eq!(compare_versions("junk", "1.0.0"), None);
    }
}
