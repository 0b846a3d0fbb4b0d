use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One named unit of work in a package graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Construct {
    pub kind: String,

    /// Opaque to the graph; decoded by the element registered for `kind`.
    #[serde(default)]
    pub options: Value,

    /// Ordered, may repeat ids; repeats are collapsed when the graph is built.
    #[serde(default, rename = "dependsOn")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMeta {
    #[serde(default)]
    pub harbor_package_directory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageInfo {
    pub meta: PackageMeta,
    pub repository: String,
    pub version: String,
    pub name: String,
    pub path: String,
    pub homepage: String,
    pub description: String,
    pub issues: String,
    pub license: String,
    pub stability: String,
    pub artifacts_location: String,
}

/// The synthesized graph description of a package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    #[serde(default)]
    pub constructs: BTreeMap<String, Construct>,

    /// User-facing task name → construct id.
    #[serde(default)]
    pub tasks: BTreeMap<String, String>,

    /// Construct ids aggregated under the synthetic setup task.
    #[serde(default)]
    pub setup: Vec<String>,

    #[serde(default, rename = "packageInfo")]
    pub package_info: PackageInfo,

    #[serde(default)]
    pub was_setup_run: bool,
}
