use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};

use entsql::config::{self, FlattenPolicy, TranslatorConfig};
use entsql::entity_catalog::load_entity_model;
use entsql::query_planner::logical_plan::QueryChain;
use entsql::sql_generator::Dialect;

/// entsql - translate entity query chains into SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entity model definition (YAML)
    #[arg(long)]
    model: PathBuf,

    /// Query chain to translate (JSON, or YAML for .yaml/.yml files)
    #[arg(long)]
    query: PathBuf,

    /// Identifier quoting: sqlite, quoted, postgres, mysql or sqlserver
    #[arg(long)]
    dialect: Option<Dialect>,

    /// Flattening policy: conservative or eager
    #[arg(long)]
    flatten_policy: Option<FlattenPolicy>,

    /// Spaces per subquery nesting level
    #[arg(long)]
    indent_width: Option<usize>,

    /// Translator settings file (YAML); environment variables are used otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the relational plan as JSON instead of SQL
    #[arg(long)]
    plan: bool,
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig::new(cli.dialect, cli.flatten_policy, cli.indent_width)
    }
}

fn load_query(path: &Path) -> anyhow::Result<QueryChain> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read query file {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let chain = if is_yaml {
        QueryChain::from_yaml(&content)?
    } else {
        QueryChain::from_json(&content)?
    };
    Ok(chain)
}

fn main() -> anyhow::Result<()> {
    // Defaults to WARN, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TranslatorConfig::from_yaml_file(path)?,
        None => TranslatorConfig::from_env()?,
    };
    config.merge((&cli).into());
    validator::Validate::validate(&config)?;
    log::info!(
        "Translating with dialect={} flatten_policy={} indent_width={}",
        config.dialect,
        config.flatten_policy,
        config.indent_width
    );

    let model = load_entity_model(&cli.model)
        .with_context(|| format!("failed to load entity model {}", cli.model.display()))?;
    let chain = load_query(&cli.query)?;

    let translation = entsql::translate_to_sql(&chain, &model, &config)?;
    if cli.plan {
        println!("{}", serde_json::to_string_pretty(&translation.plan)?);
    } else {
        println!("{}", translation.sql);
    }
    Ok(())
}
