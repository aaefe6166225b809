use std::path::PathBuf;

use thiserror::Error;

/// Why a pipeline run stopped before the monitoring stage finished.
#[derive(Debug, Error)]
pub enum PipelineHalt {
    #[error("failed to load raw data")]
    Ingestion,
    #[error("preprocessing produced no table")]
    Preprocessing,
    #[error("feature engineering produced no table")]
    FeatureEngineering,
    #[error("model training or selection failed")]
    Training,
    #[error("no persisted model could be loaded for monitoring")]
    MonitoringLoad,
    #[error("monitoring produced no report")]
    Monitoring,
    #[error("failed to persist {}: {reason}", .path.display())]
    Persist { path: PathBuf, reason: String },
}

impl PipelineHalt {
    pub fn persist(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        PipelineHalt::Persist {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_message_names_path_and_cause() {
        let err = anyhow::anyhow!("disk full");
        let halt = PipelineHalt::persist("models/x.json", &err);
        assert_eq!(halt.to_string(), "failed to persist models/x.json: disk full");
    }
}
