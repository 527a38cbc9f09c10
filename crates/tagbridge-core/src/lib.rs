// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge-core
//!
//! State reconciliation and name/type adaptation between a relational tag
//! source and a Sparkplug-style metric namespace.
//!
//! - **Types**: `TagRecord`, `Metric`, `MetricValue` and the two type systems
//! - **Naming**: flat dotted tag paths to namespaced metric names and back
//! - **Adapter**: type tables and value normalization
//! - **State**: the durable known-metric snapshot and its persistence
//! - **Detector**: value-change and new-metric detection
//! - **Reconciler**: identity recovery across source id churn
//! - **Engine**: the PULL, RECONCILE, EMIT cycle and the writeback path
//! - **Source**: collaborator traits for the tag store and the publisher
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tagbridge_core::{EngineContext, JsonSnapshotSource, NoOpTagWriter, StartupMode, SyncEngine};
//!
//! let context = EngineContext::new("N1", "knownMetrics.json");
//! let engine = SyncEngine::new(
//!     context,
//!     Arc::new(JsonSnapshotSource::new("tags.json")),
//!     Arc::new(NoOpTagWriter),
//! )?;
//!
//! let boot = engine.bootstrap(StartupMode::Baseline).await?;
//! let batch = engine.run_cycle().await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod types;

// =============================================================================
// Adaptation Modules
// =============================================================================

pub mod adapter;
pub mod naming;

// =============================================================================
// Reconciliation Modules
// =============================================================================

pub mod detector;
pub mod engine;
pub mod reconciler;
pub mod source;
pub mod state;
pub mod trigger;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::*;
pub use types::*;

pub use adapter::{Direction, OutgoingTag, TypeAdapter, TypeCode, TypeMapping};
pub use detector::ChangeDetector;
pub use engine::{
    Bootstrap, CycleBatch, EngineContext, EngineHealth, StartupMode, SyncEngine, WritebackReport,
    DEFAULT_DEGRADED_AFTER, DEFAULT_PULL_TIMEOUT,
};
pub use lifecycle::{is_lifecycle_metric, lifecycle_metrics};
pub use naming::NameTransformer;
pub use reconciler::{same_structure, Continuity, IdentityIndex, IdentityReconciler};
pub use source::{
    JsonSnapshotSource, MetricPublisher, NoOpTagWriter, TagSource, TagWriter, TracingPublisher,
    WriteOutcome,
};
pub use state::{StatePersistence, StateSnapshot, StateStore};
pub use trigger::Trigger;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
