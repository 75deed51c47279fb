//! Package manifest validation
//!
//! Raw bytes go through a short-circuiting pipeline: document format, JSON
//! parse, schema, then deployment semantics. Nothing here touches the
//! filesystem or the network.

use crate::backend::SchemaValidator;
use crate::manifest::{self, Manifest};
use serde_json::Value;
use sha3::{Digest, Keccak256};
use std::collections::HashSet;

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Bytes are not a tightly packed, sorted-key UTF-8 JSON document
    InvalidFormat(String),
    /// Document is not JSON at all
    InvalidJson(String),
    /// Schema violation at a JSON path
    Schema { path: String, reason: String },
    /// Invalid package name format
    InvalidPackageName(String),
    /// Malformed `blockchain://` deployment key
    InvalidChainUri(String),
    /// Deployment address fails the checksum
    InvalidAddress { deployment: String, address: String },
    /// Deployment references a contract type the manifest lacks
    MissingContractType { deployment: String, contract_type: String },
    /// Deployment references a build dependency the manifest lacks
    UnknownDependency { deployment: String, dependency: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidFormat(reason) => {
                write!(f, "Malformed manifest document: {}", reason)
            }
            ValidationError::InvalidJson(reason) => {
                write!(f, "Manifest is not a valid JSON document: {}", reason)
            }
            ValidationError::Schema { path, reason } => {
                write!(f, "Schema violation at '{}': {}", path, reason)
            }
            ValidationError::InvalidPackageName(name) => {
                write!(f, "Invalid package name: {}", name)
            }
            ValidationError::InvalidChainUri(uri) => {
                write!(f, "Invalid chain uri in deployments: {}", uri)
            }
            ValidationError::InvalidAddress {
                deployment,
                address,
            } => {
                write!(
                    f,
                    "Deployment '{}' has an invalid checksum address: {}",
                    deployment, address
                )
            }
            ValidationError::MissingContractType {
                deployment,
                contract_type,
            } => {
                write!(
                    f,
                    "Deployment '{}' references missing contract type '{}'",
                    deployment, contract_type
                )
            }
            ValidationError::UnknownDependency {
                deployment,
                dependency,
            } => {
                write!(
                    f,
                    "Deployment '{}' references unknown build dependency '{}'",
                    deployment, dependency
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Package manifest validator
pub struct Validator;

impl Validator {
    /// Run the full pipeline over raw manifest bytes
    pub fn validate(raw: &[u8], schema: &dyn SchemaValidator) -> crate::Result<Manifest> {
        let document = Self::validate_raw_format(raw).map_err(|e| vec![e])?;
        schema.validate(&document)?;

        let manifest = Manifest::from_value(document).map_err(|e| {
            vec![ValidationError::Schema {
                path: "$".to_string(),
                reason: e.to_string(),
            }]
        })?;

        let errors = Self::validate_deployments(&manifest);
        if errors.is_empty() {
            Ok(manifest)
        } else {
            Err(errors.into())
        }
    }

    /// Check text format and parse: the document must equal its own compact,
    /// sorted-key, ASCII-escaped serialization (one trailing newline tolerated)
    pub fn validate_raw_format(raw: &[u8]) -> Result<Value, ValidationError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| ValidationError::InvalidFormat(format!("not UTF-8: {}", e)))?;
        let text = text.trim_end_matches('\n');

        let document: Value = serde_json::from_str(text)
            .map_err(|e| ValidationError::InvalidJson(e.to_string()))?;

        let compact = manifest::to_compact_json(document.clone())
            .map_err(|e| ValidationError::InvalidJson(e.to_string()))?;
        if compact != text {
            return Err(ValidationError::InvalidFormat(
                "manifests must be tightly packed JSON with sorted keys".to_string(),
            ));
        }

        Ok(document)
    }

    /// Validate package name format (`^[a-z][-a-z0-9]{0,255}$`)
    pub fn validate_package_name(name: &str) -> Result<(), ValidationError> {
        let mut chars = name.chars();
        match chars.next() {
            None => {
                return Err(ValidationError::InvalidPackageName(
                    "Package name cannot be empty".to_string(),
                ))
            }
            Some(first) if !first.is_ascii_lowercase() => {
                return Err(ValidationError::InvalidPackageName(format!(
                    "'{}' must start with a lowercase letter",
                    name
                )))
            }
            Some(_) => {}
        }

        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            return Err(ValidationError::InvalidPackageName(format!(
                "'{}' contains invalid characters (only lowercase, digits and - allowed)",
                name
            )));
        }

        if name.len() > 256 {
            return Err(ValidationError::InvalidPackageName(format!(
                "'{}' exceeds maximum length of 256 characters",
                name
            )));
        }

        Ok(())
    }

    /// Semantic checks over the `deployments` section
    pub fn validate_deployments(manifest: &Manifest) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let contract_types: HashSet<&str> =
            manifest.contract_types.keys().map(String::as_str).collect();

        for (chain_uri, deployments) in &manifest.deployments {
            if !is_blockchain_uri(chain_uri) {
                errors.push(ValidationError::InvalidChainUri(chain_uri.clone()));
            }

            for (name, deployment) in deployments {
                if !is_checksum_address(&deployment.address) {
                    errors.push(ValidationError::InvalidAddress {
                        deployment: name.clone(),
                        address: deployment.address.clone(),
                    });
                }

                match deployment.dependency_reference() {
                    Some((dependency, _)) => {
                        if !manifest.build_dependencies.contains_key(dependency) {
                            errors.push(ValidationError::UnknownDependency {
                                deployment: name.clone(),
                                dependency: dependency.to_string(),
                            });
                        }
                    }
                    None => {
                        if !contract_types.contains(deployment.contract_type.as_str()) {
                            errors.push(ValidationError::MissingContractType {
                                deployment: name.clone(),
                                contract_type: deployment.contract_type.clone(),
                            });
                        }
                    }
                }
            }
        }

        errors
    }
}

/// `blockchain://<64 hex genesis hash>/block/<64 hex block hash>`
pub fn is_blockchain_uri(uri: &str) -> bool {
    let Some(rest) = uri.strip_prefix("blockchain://") else {
        return false;
    };
    let parts: Vec<&str> = rest.split('/').collect();
    match parts.as_slice() {
        [genesis, "block", block] => is_hash(genesis) && is_hash(block),
        _ => false,
    }
}

fn is_hash(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// EIP-55 mixed-case checksum
pub fn is_checksum_address(address: &str) -> bool {
    if !crate::uri::is_hex_address(address) {
        return false;
    }
    to_checksum_address(address).as_deref() == Some(address)
}

/// Apply the EIP-55 checksum casing to a hex address
pub fn to_checksum_address(address: &str) -> Option<String> {
    let hex = address.strip_prefix("0x")?.to_ascii_lowercase();
    if hex.len() != 40 {
        return None;
    }
    let digest = hex::encode(Keccak256::digest(hex.as_bytes()));

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (c, nibble) in hex.chars().zip(digest.chars()) {
        let upper = nibble.to_digit(16).map(|n| n >= 8).unwrap_or(false);
        if c.is_ascii_alphabetic() && upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Structural schema for ethPM v2 manifests
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicSchemaValidator;

impl SchemaValidator for BasicSchemaValidator {
    fn validate(&self, manifest: &Value) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let Some(root) = manifest.as_object() else {
            return Err(vec![schema("$", "manifest must be a JSON object")]);
        };

        match root.get("manifest_version") {
            Some(Value::String(v)) if v == "2" => {}
            Some(_) => errors.push(schema("manifest_version", "must be the string \"2\"")),
            None => errors.push(schema("manifest_version", "required field missing")),
        }

        match root.get("package_name") {
            Some(Value::String(name)) => {
                if let Err(e) = Validator::validate_package_name(name) {
                    errors.push(e);
                }
            }
            Some(_) => errors.push(schema("package_name", "must be a string")),
            None => errors.push(schema("package_name", "required field missing")),
        }

        match root.get("version") {
            Some(Value::String(v)) if !v.is_empty() => {}
            Some(_) => errors.push(schema("version", "must be a non-empty string")),
            None => errors.push(schema("version", "required field missing")),
        }

        if let Some(meta) = root.get("meta") {
            check_meta(meta, &mut errors);
        }

        if let Some(sources) = root.get("sources") {
            check_string_map("sources", sources, &mut errors);
        }

        if let Some(contract_types) = root.get("contract_types") {
            match contract_types.as_object() {
                Some(types) => {
                    for (name, body) in types {
                        if !body.is_object() {
                            errors.push(schema(
                                &format!("contract_types.{}", name),
                                "must be an object",
                            ));
                        }
                    }
                }
                None => errors.push(schema("contract_types", "must be an object")),
            }
        }

        if let Some(deployments) = root.get("deployments") {
            check_deployments(deployments, &mut errors);
        }

        if let Some(deps) = root.get("build_dependencies") {
            check_string_map("build_dependencies", deps, &mut errors);
            if let Some(deps) = deps.as_object() {
                for name in deps.keys() {
                    if let Err(e) = Validator::validate_package_name(name) {
                        errors.push(schema(&format!("build_dependencies.{}", name), &e.to_string()));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn schema(path: &str, reason: &str) -> ValidationError {
    ValidationError::Schema {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn check_string_map(path: &str, value: &Value, errors: &mut Vec<ValidationError>) {
    match value.as_object() {
        Some(map) => {
            for (key, item) in map {
                if !item.is_string() {
                    errors.push(schema(&format!("{}.{}", path, key), "must be a string"));
                }
            }
        }
        None => errors.push(schema(path, "must be an object")),
    }
}

fn check_meta(meta: &Value, errors: &mut Vec<ValidationError>) {
    let Some(meta) = meta.as_object() else {
        errors.push(schema("meta", "must be an object"));
        return;
    };
    for field in ["authors", "keywords"] {
        if let Some(list) = meta.get(field) {
            let ok = list
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false);
            if !ok {
                errors.push(schema(&format!("meta.{}", field), "must be a list of strings"));
            }
        }
    }
    for field in ["license", "description"] {
        if meta.get(field).is_some_and(|v| !v.is_string()) {
            errors.push(schema(&format!("meta.{}", field), "must be a string"));
        }
    }
    if let Some(links) = meta.get("links") {
        check_string_map("meta.links", links, errors);
    }
}

fn check_deployments(deployments: &Value, errors: &mut Vec<ValidationError>) {
    let Some(chains) = deployments.as_object() else {
        errors.push(schema("deployments", "must be an object"));
        return;
    };
    for (chain_uri, instances) in chains {
        let Some(instances) = instances.as_object() else {
            errors.push(schema(&format!("deployments.{}", chain_uri), "must be an object"));
            continue;
        };
        for (name, instance) in instances {
            let path = format!("deployments.{}.{}", chain_uri, name);
            for field in ["contract_type", "address"] {
                if !instance.get(field).is_some_and(Value::is_string) {
                    errors.push(schema(&format!("{}.{}", path, field), "required string missing"));
                }
            }
        }
    }
}
