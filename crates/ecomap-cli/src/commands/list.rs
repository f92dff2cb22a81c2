//! List command - Records matching the filters

use anyhow::{Context, Result};
use clap::Args;
use ecomap_core::{DirectorySource, EntityRecord, EntitySource};

use super::{
    cached_source, load_config_with, loader_config, print_info, print_warnings, resolve_workspace,
    FilterArgs, OutputFormat, NO_MATCHES,
};
use crate::GlobalOptions;

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Output format
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,

    /// Read records through the columnar cache (overrides `cache.use_cache`)
    #[arg(long)]
    cache: bool,

    /// Maximum records to print
    #[arg(long, short = 'n')]
    limit: Option<usize>,
}

/// Execute the list command
pub fn execute(args: ListArgs, global: GlobalOptions) -> Result<()> {
    let workspace = resolve_workspace(&global)?;
    let mut overrides = global.to_config_overrides();
    if args.cache {
        overrides.use_cache = Some(true);
    }
    let config = load_config_with(&global, &workspace, overrides)?;
    let filter = args.filter.to_filter();

    let report = if config.cache.use_cache {
        cached_source(&config, &workspace)
            .query(&filter)
            .context("Failed to query cache")?
    } else {
        let source = DirectorySource::new(config.data_root(&workspace), loader_config(&config));
        let mut report = source.load_entities().context("Failed to load records")?;
        report.records.retain(|record| filter.matches(record));
        report
    };
    print_warnings(&report.warnings);

    let total = report.records.len();
    let shown: Vec<&EntityRecord> = report
        .records
        .iter()
        .take(args.limit.unwrap_or(usize::MAX))
        .collect();

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&shown).context("Failed to serialize records")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            if total == 0 {
                println!("{}", NO_MATCHES);
                return Ok(());
            }

            for record in &shown {
                print_record(record);
            }

            if shown.len() < total {
                print_info(&format!("Showing {} of {} records", shown.len(), total), global.quiet);
            } else {
                print_info(&format!("{} record(s)", total), global.quiet);
            }
        }
    }

    Ok(())
}

fn print_record(record: &EntityRecord) {
    println!("{} ({})", record.label(), record.id);

    let mut facts = vec![format!("Category: {}", record.category)];
    if let Some(ref subtype) = record.subtype {
        facts.push(format!("Subtype: {}", subtype));
    }
    if let Some(ref organisation) = record.organisation {
        facts.push(format!("Organisation: {}", organisation));
    }
    if let Some(ref region) = record.region {
        facts.push(format!("Region: {}", region));
    }
    println!("  {}", facts.join(" | "));

    if !record.tags.is_empty() {
        println!("  Tags: {}", record.joined_tags());
    }
    if !record.projects.is_empty() {
        println!("  Projects: {}", record.joined_projects());
    }
}
