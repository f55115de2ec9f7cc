//! Mod manifest reading
//!
//! Parses `catan.mod.json5` into an immutable [`ModMetadata`] record.
//! Required fields are `id`, `version`, and `entrypoint`; dependencies
//! default to required with an `any` version constraint.

pub mod json5;
pub mod version;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::mods::error::MetadataParseError;
use crate::mods::package::ModPackage;
use version::VersionConstraint;

/// Load-order tie-break rank. Never overrides a dependency edge; it only
/// orders mods with no dependency relationship to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LoadPriority {
    Highest,
    High,
    #[default]
    Normal,
    Low,
    Lowest,
}

impl LoadPriority {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "highest" => Some(Self::Highest),
            "high" => Some(Self::High),
            "normal" => Some(Self::Normal),
            "low" => Some(Self::Low),
            "lowest" => Some(Self::Lowest),
            _ => None,
        }
    }

    /// Rank for the resolver's ready-queue ordering; lower sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Highest => 0,
            Self::High => 1,
            Self::Normal => 2,
            Self::Low => 3,
            Self::Lowest => 4,
        }
    }
}

/// One declared dependency edge.
#[derive(Debug, Clone)]
pub struct ModDependency {
    pub mod_id: String,
    pub constraint: VersionConstraint,
    /// `false` = hard/required.
    pub optional: bool,
}

/// Immutable manifest record for one mod package.
#[derive(Debug, Clone)]
pub struct ModMetadata {
    /// Unique stable key (after deduplication).
    pub id: String,
    /// Display name; defaults to the id.
    pub name: String,
    pub version: String,
    /// Identifier of the constructible entry-point, e.g. `base:mod`.
    pub entrypoint: String,
    pub description: String,
    pub dependencies: Vec<ModDependency>,
    pub load_priority: LoadPriority,
}

/// A package paired with its parsed metadata; the unit the resolver and the
/// instantiation stage operate on.
#[derive(Debug, Clone)]
pub struct DiscoveredMod {
    pub package: ModPackage,
    pub metadata: ModMetadata,
}

#[derive(Deserialize)]
struct RawManifest {
    id: Option<String>,
    name: Option<String>,
    version: Option<Value>,
    entrypoint: Option<String>,
    description: Option<String>,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    #[serde(rename = "loadPriority")]
    load_priority: Option<String>,
}

#[derive(Deserialize)]
struct RawDependency {
    id: Option<String>,
    version: Option<Value>,
    #[serde(default)]
    optional: bool,
}

/// Read and validate a package's manifest.
pub fn read_metadata(package: &ModPackage) -> Result<ModMetadata, MetadataParseError> {
    let path = package.path().display().to_string();
    let text = package.read_manifest()?;

    let document = json5::parse(&text).map_err(|source| MetadataParseError::Syntax {
        path: path.clone(),
        source,
    })?;
    let raw: RawManifest =
        serde_json::from_value(document).map_err(|e| MetadataParseError::Shape {
            path: path.clone(),
            message: e.to_string(),
        })?;

    let id = required_string(raw.id, "id", &path)?;
    let entrypoint = required_string(raw.entrypoint, "entrypoint", &path)?;
    let version = match raw.version {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::String(_)) | None => {
            return Err(MetadataParseError::MissingField {
                path,
                field: "version",
            })
        }
        Some(other) => {
            return Err(MetadataParseError::InvalidField {
                path,
                field: "version",
                message: format!("expected a version string, found {}", value_kind(&other)),
            })
        }
    };

    let load_priority = match raw.load_priority {
        None => LoadPriority::default(),
        Some(raw_priority) => LoadPriority::parse(&raw_priority).ok_or_else(|| {
            MetadataParseError::InvalidField {
                path: path.clone(),
                field: "loadPriority",
                message: format!(
                    "unknown priority `{}`; expected highest, high, normal, low, or lowest",
                    raw_priority
                ),
            }
        })?,
    };

    let mut dependencies = Vec::with_capacity(raw.dependencies.len());
    for dep in raw.dependencies {
        let dep_id = match dep.id {
            Some(dep_id) if !dep_id.trim().is_empty() => dep_id.trim().to_string(),
            _ => return Err(MetadataParseError::BlankDependencyId { path }),
        };
        let constraint = match dep.version {
            None => VersionConstraint::Any,
            Some(Value::String(s)) => VersionConstraint::parse(&s).map_err(|e| {
                MetadataParseError::InvalidField {
                    path: path.clone(),
                    field: "dependencies",
                    message: format!("dependency `{}`: {}", dep_id, e),
                }
            })?,
            Some(other) => {
                return Err(MetadataParseError::InvalidField {
                    path,
                    field: "dependencies",
                    message: format!(
                        "dependency `{}`: version constraint must be a string, found {}",
                        dep_id,
                        value_kind(&other)
                    ),
                })
            }
        };
        dependencies.push(ModDependency {
            mod_id: dep_id,
            constraint,
            optional: dep.optional,
        });
    }

    debug!(id = %id, version = %version, deps = dependencies.len(), "parsed mod manifest");

    Ok(ModMetadata {
        name: raw.name.unwrap_or_else(|| id.clone()),
        id,
        version,
        entrypoint,
        description: raw.description.unwrap_or_default(),
        dependencies,
        load_priority,
    })
}

fn required_string(
    field: Option<String>,
    name: &'static str,
    path: &str,
) -> Result<String, MetadataParseError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(MetadataParseError::MissingField {
            path: path.to_string(),
            field: name,
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::package::MANIFEST_NAME;
    use std::fs;
    use tempfile::TempDir;

    fn package_with(manifest: &str) -> (TempDir, ModPackage) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_NAME), manifest).unwrap();
        let package = ModPackage::classify(dir.path()).unwrap();
        (dir, package)
    }

    #[test]
    fn reads_full_manifest() {
        let (_dir, package) = package_with(
            r#"
            {
                // seafarers expansion
                id: 'seafarers',
                name: "Seafarers of Catan",
                version: '2.1.0',
                entrypoint: 'seafarers:mod',
                description: "Ships and islands",
                loadPriority: 'high',
                dependencies: [
                    {id: 'base', version: '^1.0.0'},
                    {id: 'soundtrack', optional: true,},
                ],
            }
            "#,
        );
        let metadata = read_metadata(&package).unwrap();
        assert_eq!(metadata.id, "seafarers");
        assert_eq!(metadata.name, "Seafarers of Catan");
        assert_eq!(metadata.version, "2.1.0");
        assert_eq!(metadata.load_priority, LoadPriority::High);
        assert_eq!(metadata.dependencies.len(), 2);
        assert!(!metadata.dependencies[0].optional);
        assert!(metadata.dependencies[0].constraint.matches("1.4.0"));
        assert!(metadata.dependencies[1].optional);
        assert!(metadata.dependencies[1].constraint.matches("anything"));
    }

    #[test]
    fn name_defaults_to_id() {
        let (_dir, package) =
            package_with(r#"{id: 'base', version: '1.0.0', entrypoint: 'base:mod'}"#);
        let metadata = read_metadata(&package).unwrap();
        assert_eq!(metadata.name, "base");
        assert_eq!(metadata.load_priority, LoadPriority::Normal);
        assert!(metadata.dependencies.is_empty());
    }

    #[test]
    fn missing_required_fields() {
        let (_dir, package) = package_with(r#"{version: '1.0.0', entrypoint: 'x'}"#);
        assert!(matches!(
            read_metadata(&package).unwrap_err(),
            MetadataParseError::MissingField { field: "id", .. }
        ));

        let (_dir, package) = package_with(r#"{id: 'base', entrypoint: 'x'}"#);
        assert!(matches!(
            read_metadata(&package).unwrap_err(),
            MetadataParseError::MissingField { field: "version", .. }
        ));

        let (_dir, package) = package_with(r#"{id: 'base', version: '1.0.0'}"#);
        assert!(matches!(
            read_metadata(&package).unwrap_err(),
            MetadataParseError::MissingField { field: "entrypoint", .. }
        ));
    }

    #[test]
    fn non_string_version_is_invalid() {
        let (_dir, package) = package_with(r#"{id: 'base', version: 1, entrypoint: 'x'}"#);
        let err = read_metadata(&package).unwrap_err();
        assert!(matches!(
            err,
            MetadataParseError::InvalidField { field: "version", .. }
        ));
    }

    #[test]
    fn blank_dependency_id_is_hard_error() {
        let (_dir, package) = package_with(
            r#"{id: 'base', version: '1.0.0', entrypoint: 'x', dependencies: [{id: '  '}]}"#,
        );
        assert!(matches!(
            read_metadata(&package).unwrap_err(),
            MetadataParseError::BlankDependencyId { .. }
        ));
    }

    #[test]
    fn invalid_dependency_constraint_names_accepted_forms() {
        let (_dir, package) = package_with(
            r#"{id: 'base', version: '1.0.0', entrypoint: 'x',
                dependencies: [{id: 'other', version: ''}]}"#,
        );
        let err = read_metadata(&package).unwrap_err().to_string();
        assert!(err.contains("accepted forms"));

        let (_dir, package) = package_with(
            r#"{id: 'base', version: '1.0.0', entrypoint: 'x',
                dependencies: [{id: 'other', version: 2}]}"#,
        );
        let err = read_metadata(&package).unwrap_err().to_string();
        assert!(err.contains("must be a string"));
    }

    #[test]
    fn syntax_errors_carry_position() {
        let (_dir, package) = package_with("{id: 'base' version: '1.0.0'}");
        let err = read_metadata(&package).unwrap_err();
        assert!(matches!(err, MetadataParseError::Syntax { .. }));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn unknown_priority_is_invalid() {
        let (_dir, package) = package_with(
            r#"{id: 'base', version: '1.0.0', entrypoint: 'x', loadPriority: 'urgent'}"#,
        );
        assert!(matches!(
            read_metadata(&package).unwrap_err(),
            MetadataParseError::InvalidField { field: "loadPriority", .. }
        ));
    }
}
