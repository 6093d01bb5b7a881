#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics engine for the EV map.
//!
//! The engines ([`aggregate`], [`correlation`], [`comparison`],
//! [`ranking`]) are synchronous pure functions over validated records. The
//! [`pipelines`] module wires them to a [`TerritoryStore`] and is the only
//! place that awaits.
//!
//! [`TerritoryStore`]: ev_map_database::store::TerritoryStore

pub mod aggregate;
pub mod comparison;
pub mod config;
pub mod correlation;
pub mod pipelines;
pub mod ranking;

use ev_map_database::StoreError;
use ev_map_territory_models::TerritoryKind;
use thiserror::Error;

pub use config::{AnalyticsConfig, RankingConfig};

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The requested territory does not exist in the data.
    #[error("{kind} not found: {identifier}")]
    NotFound {
        /// Kind of the missing territory.
        kind: TerritoryKind,
        /// The identifier as given by the caller.
        identifier: String,
    },

    /// The request is malformed.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what went wrong.
        message: String,
    },

    /// Reading from the store failed.
    #[error("Upstream error: {0}")]
    Upstream(#[from] StoreError),
}

impl AnalyticsError {
    /// Shorthand for [`AnalyticsError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`AnalyticsError::NotFound`].
    pub fn not_found(kind: TerritoryKind, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            identifier: identifier.into(),
        }
    }
}
