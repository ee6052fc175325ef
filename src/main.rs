use anyhow::Context;
use clap::Parser;
use meal_resolver::adapters::CsvMealLog;
use meal_resolver::utils::{logger, validation::Validate};
use meal_resolver::{Aggregator, CliConfig, MealLogRow, MealLogStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting meal-resolver");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    cli.validate()?;
    let config = cli
        .load_resolver_config()
        .context("failed to load resolver configuration")?;

    let aggregator = Aggregator::from_config(&config);
    let result = aggregator.aggregate(&cli.message_text()).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.breakdown());
    }

    if let (Some(path), Some(meal)) = (&cli.log_file, cli.meal_type) {
        let rows = MealLogRow::from_aggregate(&result, meal);
        let log = CsvMealLog::new(path);
        log.append(&rows)
            .await
            .with_context(|| format!("failed to write meal log {}", path.display()))?;
        tracing::info!("📁 Logged {} {} item(s) to {}", rows.len(), meal, path.display());
    }

    Ok(())
}
