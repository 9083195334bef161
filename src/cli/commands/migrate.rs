use serde_json::json;

use crate::cli::utils::output_json;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::migration::Migrator;
use crate::schema::default_registry;

pub async fn handle(
    config: &AppConfig,
    dry_run: bool,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let registry = default_registry()?;
    let migrator =
        Migrator::new(&registry).with_statement_timeout(config.database.statement_timeout());

    if dry_run {
        let plan = migrator.plan();
        match output_format {
            OutputFormat::Json => output_json(&json!({ "success": true, "plan": plan }))?,
            OutputFormat::Text => {
                for step in &plan {
                    println!("-- {}\n{}\n", step.table, step.statement);
                }
            }
        }
        return Ok(());
    }

    let report = migrator.run(&config.database).await?;

    match output_format {
        OutputFormat::Json => output_json(&json!({
            "success": report.is_success(),
            "report": report
        }))?,
        OutputFormat::Text => println!("{}", report),
    }

    if !report.is_success() {
        anyhow::bail!("{} table(s) failed to migrate", report.failed.len());
    }
    Ok(())
}
