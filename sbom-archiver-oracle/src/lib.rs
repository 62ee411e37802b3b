//! # sbom-archiver-oracle
//!
//! Client for the remote release system that decides whether a build is
//! still active.
//!
//! [`ActivityOracle`] is the seam the reconciler depends on; [`ReleaseClient`]
//! is the HTTP implementation.

pub mod client;
pub mod error;
pub mod response;

pub use client::{ActivityOracle, ReleaseClient};
pub use error::OracleError;
pub use response::ReleaseList;
