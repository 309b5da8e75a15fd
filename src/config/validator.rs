use crate::config::Config;
use crate::error::{ProdexError, Result, ValidationError};

/// Configuration validator
///
/// Runs once at startup so per-record code never revalidates schema
/// tables or scoring knobs.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_encoders(config, &mut errors);
        Self::validate_datasets(config, &mut errors);
        Self::validate_pipeline(config, &mut errors);
        Self::validate_index(config, &mut errors);
        Self::validate_query(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProdexError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }
    }

    fn validate_encoders(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.encoders.is_empty() {
            errors.push(ValidationError::new(
                "encoders",
                "At least one encoder must be registered",
            ));
        }

        for (key, model) in &config.encoders {
            if model.is_empty() {
                errors.push(ValidationError::new(
                    format!("encoders.{key}"),
                    "Model name cannot be empty",
                ));
            }
        }
    }

    fn validate_datasets(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.datasets.is_empty() {
            errors.push(ValidationError::new(
                "datasets",
                "At least one dataset schema must be configured",
            ));
        }

        for (key, schema) in &config.datasets {
            if schema.id.is_empty() {
                errors.push(ValidationError::new(
                    format!("datasets.{key}.id"),
                    "Id source key cannot be empty",
                ));
            }

            for encoder in &schema.encoders {
                if !config.encoders.contains_key(encoder) {
                    errors.push(ValidationError::new(
                        format!("datasets.{key}.encoders"),
                        format!("References unregistered encoder '{encoder}'"),
                    ));
                }
            }
        }
    }

    fn validate_pipeline(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.pipeline.batch_size == 0 {
            errors.push(ValidationError::new(
                "pipeline.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.pipeline.encode_batch_size == 0 {
            errors.push(ValidationError::new(
                "pipeline.encode_batch_size",
                "Encode batch size must be greater than 0",
            ));
        }

        if config.pipeline.max_concurrent == 0 {
            errors.push(ValidationError::new(
                "pipeline.max_concurrent",
                "Concurrency must be greater than 0",
            ));
        }
    }

    fn validate_index(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.index.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if config.index.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.index.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }
    }

    fn validate_query(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.query.vector_weight < 0.0 || config.query.text_weight < 0.0 {
            errors.push(ValidationError::new(
                "query",
                "Score weights must not be negative",
            ));
        }

        if config.query.vector_weight + config.query.text_weight <= 0.0 {
            errors.push(ValidationError::new(
                "query",
                "At least one score weight must be positive",
            ));
        }

        if config.query.max_score_cap <= 0.0 {
            errors.push(ValidationError::new(
                "query.max_score_cap",
                "Lexical score cap must be positive",
            ));
        }

        if config.query.search_multiplier == 0 {
            errors.push(ValidationError::new(
                "query.search_multiplier",
                "Search multiplier must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_passes() {
        assert!(ConfigValidator::validate(&Config::default()).is_ok());
    }

    #[test]
    fn bad_values_accumulate_errors() {
        let mut config = Config::default();
        config.pipeline.batch_size = 0;
        config.query.max_score_cap = 0.0;
        config
            .datasets
            .get_mut("wildberries")
            .unwrap()
            .encoders
            .push("ghost".to_string());

        let err = ConfigValidator::validate(&config).unwrap_err();
        match err {
            ProdexError::ConfigValidation { errors } => {
                assert_eq!(errors.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_weights_are_rejected() {
        let mut config = Config::default();
        config.query.vector_weight = -0.1;

        assert!(ConfigValidator::validate(&config).is_err());
    }
}
