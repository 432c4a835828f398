// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Chart reference resolution, download and provenance verification.

pub mod download;
pub mod locate;
pub mod verify;

pub use download::{ChartDownloader, VerificationStrategy};
pub use locate::ChartLocator;
pub use verify::{DigestVerifier, ProvenanceVerifier, Verification};
