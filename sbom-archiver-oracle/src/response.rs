//! Typed model of the release list response.
//!
//! ```json
//! {
//!   "count": 1,
//!   "value": [
//!     { "id": 7, "artifacts": [
//!         { "alias": "_build", "definitionReference": { "version": { "id": "10", "name": "10" } } }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Only the fields needed for matching are modelled. Every nested level is
//! an `Option`; a level that is absent where a match needs it is a schema
//! error, never an empty list.

use serde::Deserialize;

use crate::error::OracleError;

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseList {
    pub count: u64,
    #[serde(default)]
    pub value: Option<Vec<Release>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub artifacts: Option<Vec<Artifact>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub definition_reference: Option<DefinitionReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionReference {
    #[serde(default)]
    pub version: Option<VersionReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionReference {
    #[serde(default)]
    pub name: Option<String>,
}

impl Artifact {
    /// The declared version name, or a schema error if any level is missing.
    pub fn version_name(&self) -> Result<&str, OracleError> {
        self.definition_reference
            .as_ref()
            .and_then(|d| d.version.as_ref())
            .and_then(|v| v.name.as_deref())
            .ok_or_else(|| {
                OracleError::Schema(format!(
                    "artifact '{}' has no definitionReference.version.name",
                    self.alias.as_deref().unwrap_or("<unnamed>")
                ))
            })
    }
}

impl Release {
    fn missing_artifacts(&self) -> OracleError {
        match self.id {
            Some(id) => OracleError::Schema(format!("release {id} has no artifacts list")),
            None => OracleError::Schema("release has no artifacts list".to_string()),
        }
    }
}

impl ReleaseList {
    /// Whether any artifact of any release declares exactly `build_number`.
    ///
    /// A zero `count` is inactive without inspecting `value`. Otherwise the
    /// search stops at the first match, or at the first release without an
    /// artifacts list or artifact whose version cannot be read.
    pub fn contains_build(&self, build_number: &str) -> Result<bool, OracleError> {
        if self.count == 0 {
            return Ok(false);
        }
        let releases = self.value.as_deref().ok_or_else(|| {
            OracleError::Schema(format!(
                "count is {} but the response has no value list",
                self.count
            ))
        })?;
        let hit = releases
            .iter()
            .flat_map(|release| {
                let (artifacts, missing) = match &release.artifacts {
                    Some(artifacts) => (artifacts.as_slice(), None),
                    None => (&[][..], Some(Err(release.missing_artifacts()))),
                };
                missing
                    .into_iter()
                    .chain(artifacts.iter().map(Artifact::version_name))
            })
            .find(|version| !matches!(version, Ok(name) if *name != build_number));
        match hit {
            Some(Ok(_)) => Ok(true),
            Some(Err(err)) => Err(err),
            None => Ok(false),
        }
    }
}
