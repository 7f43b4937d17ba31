//! Run summary and binding preview for reporting front ends.

use firmaudit_types::{
    AuditError, ModelBinding, PipelineReport, RunSummary, StageBindingSummary, StageId,
    StageModels,
};

use crate::registry::ProviderRegistry;
use crate::resolver::ModelResolver;

/// Providers available plus the binding actually used per stage.
pub fn run_summary(
    registry: &ProviderRegistry,
    stages: &StageModels,
    report: &PipelineReport,
) -> RunSummary {
    let providers_available = registry.enabled_providers();
    RunSummary {
        provider_count: providers_available.len(),
        providers_available,
        stages: stages
            .iter()
            .map(|(stage, configured)| {
                let result = report.get(stage);
                StageBindingSummary {
                    stage,
                    configured: configured.to_string(),
                    binding: result.and_then(|r| r.model_used()).cloned(),
                    status: result.map(|r| r.status()),
                }
            })
            .collect(),
    }
}

/// What a stage would bind to if it ran now.
#[derive(Debug, Clone)]
pub struct BindingPreview {
    pub stage: StageId,
    pub configured: String,
    pub resolved: Result<ModelBinding, AuditError>,
}

/// Resolve every stage without running anything.
pub fn preview_bindings(registry: &ProviderRegistry, stages: &StageModels) -> Vec<BindingPreview> {
    let resolver = ModelResolver::new(registry);
    stages
        .iter()
        .map(|(stage, configured)| BindingPreview {
            stage,
            configured: configured.to_string(),
            resolved: resolver.resolve(stage, configured),
        })
        .collect()
}
