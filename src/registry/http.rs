//! HTTP registry client
//!
//! - `GET <base>/api/v1/packages/<name>` returns the package index JSON
//! - `GET <base>/archives/<name>-<version>.tgz` returns the archive

use std::io::Read;
use std::time::Duration;

use super::{PackageIndex, Registry, RegistryEntry, archive_file_name};
use crate::error::{BpmError, Result, resolve};
use crate::manifest::is_valid_package_name;
use crate::version::PackageVersion;

/// Upper bound for a single archive download
const MAX_ARCHIVE_BYTES: u64 = 256 * 1024 * 1024;

pub struct HttpRegistry {
    base: String,
    agent: ureq::Agent,
}

impl HttpRegistry {
    pub fn new(base: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .user_agent(concat!("bpm/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base: base.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn index_url(&self, name: &str) -> String {
        format!("{}/api/v1/packages/{name}", self.base)
    }

    fn archive_url(&self, name: &str, version: &PackageVersion) -> String {
        format!("{}/archives/{}", self.base, archive_file_name(name, version))
    }

    fn get(&self, name: &str, constraint: &str, url: &str) -> Result<ureq::Response> {
        self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, response) => {
                status_error(name, constraint, code, response.status_text())
            }
            ureq::Error::Transport(transport) => resolve::transport(name, transport.to_string()),
        })
    }
}

/// Map an HTTP error status onto the matching error kind
fn status_error(name: &str, constraint: &str, code: u16, text: &str) -> BpmError {
    match code {
        404 | 410 => resolve::package_not_found(name, constraint),
        401 | 403 => resolve::rejected(name, format!("HTTP {code} {text}")),
        _ => resolve::transport(name, format!("HTTP {code} {text}")),
    }
}

impl Registry for HttpRegistry {
    fn versions(&self, name: &str) -> Result<Vec<RegistryEntry>> {
        if !is_valid_package_name(name) {
            return Err(resolve::package_not_found(name, ""));
        }

        let response = self.get(name, "", &self.index_url(name))?;
        let body = response
            .into_string()
            .map_err(|e| resolve::transport(name, e.to_string()))?;
        Ok(PackageIndex::parse(name, &body)?.versions)
    }

    fn fetch_archive(&self, name: &str, version: &PackageVersion) -> Result<Vec<u8>> {
        let constraint = format!("= {version}");
        let response = self.get(name, &constraint, &self.archive_url(name, version))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_ARCHIVE_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| resolve::transport(name, e.to_string()))?;
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.base.clone()
    }
}
