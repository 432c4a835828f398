// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Chart provenance checks against `.prov` files

use crate::error::{HelmdeckError, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SIGNED_HEADER: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
const SIGNATURE_HEADER: &str = "-----BEGIN PGP SIGNATURE-----";

/// Result of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub file_name: String,
    pub sha256: String,
}

/// Verifies a chart archive against its provenance file and a keyring.
pub trait ProvenanceVerifier: Send + Sync {
    fn verify(&self, chart: &Path, keyring: &Path) -> Result<Verification>;
}

/// Checks the archive digest recorded in the clear-signed provenance body.
///
/// The OpenPGP signature itself is not evaluated; the keyring only has to exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestVerifier;

impl ProvenanceVerifier for DigestVerifier {
    fn verify(&self, chart: &Path, keyring: &Path) -> Result<Verification> {
        if !keyring.is_file() {
            return Err(failed(format!("keyring {} not found", keyring.display())));
        }

        let file_name = chart
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| failed(format!("{} is not a chart archive", chart.display())))?;

        let prov_path = provenance_path(chart);
        let prov = fs::read_to_string(&prov_path)
            .map_err(|e| failed(format!("could not load {}: {}", prov_path.display(), e)))?;
        let digests = signed_file_digests(&prov)?;
        let expected = digests
            .get(&file_name)
            .ok_or_else(|| failed(format!("provenance does not list {}", file_name)))?;

        let actual = format!("sha256:{:x}", Sha256::digest(fs::read(chart)?));
        if *expected != actual {
            return Err(failed(format!(
                "sha256 sum does not match for {}: {:?} != {:?}",
                file_name, expected, actual
            )));
        }

        debug!("Verified {} ({})", file_name, actual);
        Ok(Verification {
            file_name,
            sha256: actual.trim_start_matches("sha256:").to_string(),
        })
    }
}

/// Path of the provenance file accompanying a chart archive
pub fn provenance_path(chart: &Path) -> PathBuf {
    let mut path = OsString::from(chart.as_os_str());
    path.push(".prov");
    PathBuf::from(path)
}

/// The `files:` section of a clear-signed provenance body
fn signed_file_digests(prov: &str) -> Result<BTreeMap<String, String>> {
    let Some(signed) = prov.split_once(SIGNED_HEADER).map(|(_, rest)| rest) else {
        return Err(failed("provenance is not a signed message".to_string()));
    };
    let body = signed
        .split_once(SIGNATURE_HEADER)
        .map(|(body, _)| body)
        .ok_or_else(|| failed("provenance has no signature block".to_string()))?;

    let digests: BTreeMap<String, String> = body
        .lines()
        .skip_while(|line| line.trim_end() != "files:")
        .skip(1)
        .take_while(|line| line.starts_with(' ') || line.starts_with('\t'))
        .filter_map(|line| line.trim().split_once(": "))
        .map(|(name, digest)| (name.to_string(), digest.trim().to_string()))
        .collect();

    if digests.is_empty() {
        return Err(failed("provenance lists no files".to_string()));
    }
    Ok(digests)
}

fn failed(reason: String) -> HelmdeckError {
    HelmdeckError::VerificationFailed(reason)
}
