//! ethPM v2 package manifest types (manifest.json)

use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Package manifest (manifest.json)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub manifest_version: String,
    pub package_name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PackageMeta>,
    /// Relative source path -> inlined source text or content URI
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contract_types: BTreeMap<String, Value>,
    /// Chain URI -> deployment name -> deployment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deployments: BTreeMap<String, BTreeMap<String, Deployment>>,
    /// Dependency name -> install URI
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// Build a manifest from an already parsed JSON document
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Documentation link from `meta.links.documentation`, if any
    pub fn documentation_uri(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.links.get("documentation"))
            .map(String::as_str)
    }

    /// Serialize in the compact, sorted-key form ethPM requires on disk
    pub fn to_canonical_string(&self) -> Result<String, serde_json::Error> {
        to_compact_json(serde_json::to_value(self)?)
    }
}

/// Compact, sorted-key JSON with every non-printable-ASCII character written
/// as a `\uXXXX` escape (UTF-16 surrogate pairs above U+FFFF)
///
/// Byte-exact with the published manifests whose CIDs are recorded on chain.
pub fn to_compact_json(value: Value) -> Result<String, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
    sorted(value).serialize(&mut serializer)?;
    String::from_utf8(out).map_err(<serde_json::Error as serde::ser::Error>::custom)
}

/// Compact formatter that escapes everything outside `' '..='~'`
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..index].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                writer.write_all(format!("\\u{:04x}", unit).as_bytes())?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Rebuild every object in `value` with its keys in sorted order
pub fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sorted(v))).collect();
            Value::Object(ordered.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

/// Package metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PackageMeta {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, String>,
}

/// A contract instance deployed on a chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deployment {
    /// Local contract type, or `<dependency>:<contract type>`
    pub contract_type: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_bytecode: Option<Value>,
}

impl Deployment {
    /// Split a namespaced contract type into `(dependency, contract type)`
    pub fn dependency_reference(&self) -> Option<(&str, &str)> {
        self.contract_type.split_once(':')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_json_escapes_non_ascii() {
        let value = json!({"b": "Jos\u{e9}", "a": "\u{1f600}", "c": "tab\tdel\u{7f}"});
        assert_eq!(
            to_compact_json(value).unwrap(),
            r#"{"a":"\ud83d\ude00","b":"Jos\u00e9","c":"tab\tdel\u007f"}"#
        );
    }

    #[test]
    fn test_parse_minimal_manifest() {
        let json = r#"{"manifest_version":"2","package_name":"owned","version":"1.0.0"}"#;

        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.package_name, "owned");
        assert_eq!(manifest.version, "1.0.0");
        assert!(manifest.sources.is_empty());
        assert!(manifest.build_dependencies.is_empty());
    }

    #[test]
    fn test_parse_manifest_with_links_and_deps() {
        let json = r#"{
            "build_dependencies": {"owned": "ipfs://QmbeVyFLSuEUxiXKwSsEjef6icpdTdA4kGG9BcrJXKNKUW"},
            "manifest_version": "2",
            "meta": {"authors": ["Piper"], "links": {"documentation": "ipfs://QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o"}},
            "package_name": "wallet",
            "sources": {"./contracts/Wallet.sol": "contract Wallet {}"},
            "version": "1.0.0"
        }"#;

        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.build_dependencies.len(), 1);
        assert_eq!(
            manifest.documentation_uri(),
            Some("ipfs://QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o")
        );
    }

    #[test]
    fn test_canonical_string_is_sorted_and_compact() {
        let manifest = Manifest {
            manifest_version: "2".to_string(),
            package_name: "owned".to_string(),
            version: "1.0.0".to_string(),
            meta: None,
            sources: BTreeMap::new(),
            contract_types: BTreeMap::new(),
            deployments: BTreeMap::new(),
            build_dependencies: BTreeMap::new(),
        };

        assert_eq!(
            manifest.to_canonical_string().unwrap(),
            r#"{"manifest_version":"2","package_name":"owned","version":"1.0.0"}"#
        );
    }

    #[test]
    fn test_dependency_reference() {
        let deployment = Deployment {
            contract_type: "owned:Owned".to_string(),
            address: "0x0000000000000000000000000000000000000000".to_string(),
            transaction: None,
            block: None,
            runtime_bytecode: None,
        };
        assert_eq!(deployment.dependency_reference(), Some(("owned", "Owned")));
    }
}
