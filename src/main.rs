use prodex::backend::EmbeddedBackend;
use prodex::cli::{Cli, Commands, ConfigAction};
use prodex::config::Config;
use prodex::encoder::EncoderRegistry;
use prodex::error::{ProdexError, Result};
use prodex::indexer::{collection_name, IndexingPipeline};
use prodex::query::{HybridQueryEngine, QueryMode, QueryRequest};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Index { dataset, file } => {
            cmd_index(cli.config, &dataset, &file).await?;
        }
        Commands::Search {
            query,
            model,
            dataset,
            limit,
            vector_only,
            json,
        } => {
            cmd_search(cli.config, query, model, dataset, limit, vector_only, json).await?;
        }
        Commands::List {
            dataset,
            model,
            page,
            size,
        } => {
            cmd_list(cli.config, &dataset, &model, page, size)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = if verbose { "prodex=debug" } else { "prodex=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn cmd_index(config_path: Option<PathBuf>, dataset: &str, file: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    let schema = config
        .datasets
        .get(dataset)
        .ok_or_else(|| ProdexError::UnknownDataset {
            key: dataset.to_string(),
        })?;

    // Only load the models this dataset actually indexes through
    let mut needed: Vec<String> = if schema.encoders.is_empty() {
        config.encoders.keys().cloned().collect()
    } else {
        schema.encoders.clone()
    };
    needed.sort();

    let registry = Arc::new(EncoderRegistry::from_config_subset(&config.encoders, &needed)?);
    let backend = Arc::new(EmbeddedBackend::new(
        &expand_path(&config.storage.data_dir)?,
        config.index.clone(),
    )?);
    let pipeline = IndexingPipeline::new(
        registry,
        backend,
        config.datasets.clone(),
        config.pipeline.clone(),
    );

    let records = read_records(file)?;
    println!(
        "Indexing {} records from {} into dataset '{}' ({} model(s))...",
        records.len(),
        file.display(),
        dataset,
        needed.len()
    );

    let report = pipeline.run_dataset(dataset, &records).await?;

    println!(
        "✓ Indexed {} documents, {} records skipped, {} write failures ({}ms)",
        report.indexed,
        report.skipped,
        report.failed_ids.len(),
        report.duration_ms
    );
    if !report.failed_ids.is_empty() {
        println!("  Failed document ids: {:?}", report.failed_ids);
    }

    Ok(())
}

async fn cmd_search(
    config_path: Option<PathBuf>,
    query: String,
    model: String,
    dataset: String,
    limit: usize,
    vector_only: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    // Reject an unknown model before loading any model weights
    if !config.encoders.contains_key(&model) {
        return Err(ProdexError::UnknownModel { key: model });
    }

    let registry = Arc::new(EncoderRegistry::from_config_subset(
        &config.encoders,
        std::slice::from_ref(&model),
    )?);
    let backend = Arc::new(EmbeddedBackend::new(
        &expand_path(&config.storage.data_dir)?,
        config.index.clone(),
    )?);
    let engine = HybridQueryEngine::new(
        registry,
        backend,
        config.datasets.keys().cloned(),
        &config.query,
    )?;

    let mut request = QueryRequest::new(query, model, dataset, limit);
    if vector_only {
        request.mode = QueryMode::Vector;
    }

    let hits = engine.search(&request).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&hits).map_err(|e| ProdexError::Json {
            source: e,
            context: "Failed to serialize hits".to_string(),
        })?;
        println!("{}", rendered);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{:>2}. {:.4}  {}  (id {})",
            rank + 1,
            hit.fused_score,
            hit.document.name,
            hit.document.id
        );
        println!(
            "      lexical {:.3}  vector {:.3}  {}",
            hit.lexical_score_raw, hit.vector_score_raw, hit.document.categories
        );
    }

    Ok(())
}

fn cmd_list(
    config_path: Option<PathBuf>,
    dataset: &str,
    model: &str,
    page: usize,
    size: usize,
) -> Result<()> {
    let config = load_config(config_path)?;
    let backend = EmbeddedBackend::new(
        &expand_path(&config.storage.data_dir)?,
        config.index.clone(),
    )?;

    let collection = collection_name(dataset, model);
    let (products, total) = backend.list(&collection, page, size)?;

    println!(
        "Collection '{}': {} documents total (page {}, size {})",
        collection, total, page, size
    );
    for product in products {
        println!("  {}  {}  [{}]", product.id, product.name, product.brand);
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| ProdexError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Encoders: {}", config.encoders.len());
            println!("  Datasets: {}", config.datasets.len());
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ProdexError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'prodex config init' to create one."
        );
        return Ok(Config::default());
    }

    Config::load(&path)
}

/// Read one JSON record per line; unparseable lines become null records
/// so the pipeline reports them as skipped instead of aborting the run
fn read_records(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| ProdexError::Io {
        source: e,
        context: format!("Failed to read source file: {:?}", path),
    })?;

    let mut records = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(value) => records.push(value),
            Err(e) => {
                tracing::warn!("Unparseable source line: {}", e);
                records.push(Value::Null);
            }
        }
    }

    Ok(records)
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| ProdexError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| ProdexError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
