//! Model routing and stage execution core for firmaudit.
//!
//! The pipeline runs four dependent stages against large language models.
//! For each stage the [`orchestrator`] resolves the configured model string
//! through the [`resolver`] (backed by the [`registry`]), obtains a cached
//! client from the [`factory`], and hands it to the [`executor`], which
//! renders the prompt, calls the model with timeout and retry, and parses
//! the reply with the stage's [`stages::StageTemplate`].
//!
//! Leaf collaborators live behind traits: credentials ([`credentials`]),
//! client construction ([`factory::ClientBuilder`]), prompt/schema
//! ([`stages`]) and persistence ([`sink`]).

pub mod config_loader;
pub mod credentials;
pub mod executor;
pub mod factory;
pub mod json_repair;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod sink;
pub mod stages;
pub mod summary;

pub use config_loader::{LoadedConfig, load_config};
pub use credentials::{
    CredentialLookup, EnvCredentials, Environment, MapEnvironment, NativeEnvironment,
    StaticCredentials,
};
pub use executor::StageExecutor;
pub use factory::{ClientBuilder, ClientFactory, HttpClientBuilder, ModelClient};
pub use orchestrator::{Orchestrator, PipelineRun, PipelineState};
pub use registry::ProviderRegistry;
pub use resolver::{ModelResolver, ModelSpec};
pub use sink::{JsonFileSink, ReportSink, SinkError};
pub use summary::{BindingPreview, preview_bindings, run_summary};
pub use stages::{Handoff, StageTemplate, TemplateSet};
