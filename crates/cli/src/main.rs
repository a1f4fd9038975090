use std::path::PathBuf;

use anyhow::{Context, Result};

use fieldrep_cli::Scenario;
use fieldrep_infra::PolicyConfig;

fn main() -> Result<()> {
    fieldrep_observability::init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: fieldrep <scenario.json>")?;

    let scenario = Scenario::load(&path)?;
    let recommendation = scenario.recommend(|| {
        let config = PolicyConfig::from_env().context("failed to resolve target policy")?;
        tracing::info!(source = ?config.source, "using configured policy");
        Ok(config.policy)
    })?;

    tracing::info!(
        outcome = ?recommendation.outcome,
        suggestions = recommendation.suggestions.len(),
        "recommendation ready"
    );
    println!("{}", serde_json::to_string_pretty(&recommendation)?);
    Ok(())
}
