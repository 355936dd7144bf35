#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod atlas;
pub mod config;
pub mod metrics;
pub mod node;
pub mod services;
pub mod storage;

pub use api::{router, ApiServer, AppState};
pub use atlas::{OpenedSnapshot, RootHistory, ShadowAtlas};
pub use config::{AtlasConfig, ApiConfig, RootHistoryConfig};
pub use metrics::{PipelineMetrics, PrometheusExporter};
pub use node::{shutdown_signal, AtlasNode, CheckResult, DiagnosticReport};
pub use services::{Groth16Verifier, ProofVerifier, ProvingClient, SubmissionOutcome, SubmissionPipeline, SubmissionRequest};
pub use storage::{AtlasStorage, StorageConfig};
