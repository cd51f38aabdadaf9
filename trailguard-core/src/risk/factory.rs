//! Factory - converts `MonitorConfig` into a runtime risk model.

use tracing::debug;

use crate::config::{ConfigError, ModelConfig, MonitorConfig};
use crate::monitor::DrawdownRiskMonitor;

use super::{CompositeRiskModel, NullRiskModel, RiskModel};

/// Create a single risk model from its config entry.
pub fn create_model(config: &ModelConfig) -> Box<dyn RiskModel> {
    match config {
        ModelConfig::TrailingStop {
            maximum_drawdown_fraction,
            on_malformed,
        } => Box::new(DrawdownRiskMonitor::with_policy(
            *maximum_drawdown_fraction,
            *on_malformed,
        )),
        ModelConfig::Null => Box::new(NullRiskModel),
    }
}

/// Build the configured model: the lone model itself, or a composite of all.
pub fn build_risk_model(config: &MonitorConfig) -> Result<Box<dyn RiskModel>, ConfigError> {
    config.validate()?;

    let mut models: Vec<Box<dyn RiskModel>> = config.models.iter().map(create_model).collect();
    if models.len() == 1 {
        if let Some(model) = models.pop() {
            debug!(model = model.name(), "built risk model");
            return Ok(model);
        }
    }

    let composite = CompositeRiskModel::new(models);
    debug!(models = ?composite.model_names(), "built composite risk model");
    Ok(Box::new(composite))
}
