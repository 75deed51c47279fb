//! HTTP adapters for the IPFS gateway/API and the GitHub blob endpoint

use super::{BlobHost, ContentStore};
use crate::uri::PackageUri;
use crate::{cid, PackageError, Result};
use base64::Engine as _;
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use tracing::debug;

const USER_AGENT: &str = concat!("ethpm-package/", env!("CARGO_PKG_VERSION"));

fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| PackageError::backend("http", e))
}

/// IPFS over a read gateway, with an optional HTTP API for pinning
pub struct IpfsGateway {
    client: Client,
    gateway: String,
    api: Option<String>,
}

impl IpfsGateway {
    pub fn new(gateway: impl Into<String>, api: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            gateway: gateway.into().trim_end_matches('/').to_string(),
            api: api.map(|api| api.trim_end_matches('/').to_string()),
        })
    }
}

#[derive(Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

impl ContentStore for IpfsGateway {
    fn fetch(&self, cid: &str) -> Result<Vec<u8>> {
        let url = format!("{}/ipfs/{}", self.gateway, cid);
        debug!(url = %url, "fetching from ipfs gateway");
        let response = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| PackageError::backend("ipfs", e))?;
        let bytes = response
            .bytes()
            .map_err(|e| PackageError::backend("ipfs", e))?;
        Ok(bytes.to_vec())
    }

    fn pin(&self, bytes: &[u8]) -> Result<String> {
        let api = self.api.as_ref().ok_or_else(|| {
            PackageError::Configuration("pinning requires an IPFS API url".to_string())
        })?;
        let url = format!("{}/api/v0/add?pin=true", api);
        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(bytes.to_vec()).file_name("manifest.json"),
        );
        debug!(url = %url, size = bytes.len(), "pinning to ipfs");
        let added: AddResponse = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| PackageError::backend("ipfs", e))?;

        let expected = cid::content_hash(bytes);
        if added.hash != expected {
            return Err(PackageError::Integrity {
                uri: format!("ipfs://{}", added.hash),
                expected,
                actual: added.hash,
            });
        }
        Ok(added.hash)
    }
}

/// GitHub `git/blobs` API
pub struct GithubBlobHost {
    client: Client,
    token: Option<String>,
}

impl GithubBlobHost {
    pub fn new(token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            token,
        })
    }
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

impl BlobHost for GithubBlobHost {
    fn fetch(&self, uri: &PackageUri) -> Result<Vec<u8>> {
        let url = uri.to_string();
        debug!(url = %url, "fetching github blob");
        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let blob: BlobResponse = request
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| PackageError::backend("github", e))?;
        decode_blob(&blob)
    }
}

fn decode_blob(blob: &BlobResponse) -> Result<Vec<u8>> {
    match blob.encoding.as_str() {
        "base64" => {
            let compact: String = blob.content.split_whitespace().collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| PackageError::backend("github", e))
        }
        "utf-8" => Ok(blob.content.clone().into_bytes()),
        other => Err(PackageError::backend(
            "github",
            format!("unsupported blob encoding '{}'", other),
        )),
    }
}
