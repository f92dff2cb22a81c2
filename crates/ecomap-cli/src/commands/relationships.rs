//! Relationships command - List relationship documents
//!
//! The shared filter flags select entities; a relationship is listed when
//! either endpoint is one of them. Without filters every relationship is
//! listed, dangling ones included.

use anyhow::{Context, Result};
use clap::Args;
use ecomap_core::RelationshipRecord;

use super::{
    load_config, open_corpus, print_info, print_warnings, resolve_workspace, FilterArgs,
    OutputFormat,
};
use crate::GlobalOptions;

/// Arguments for the relationships command
#[derive(Args, Debug)]
pub struct RelationshipsArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Only relationships with this entity id as an endpoint
    #[arg(long, short = 'i', value_name = "ID")]
    involving: Option<String>,

    /// Only relationships of this type (case-insensitive)
    #[arg(long = "type", short = 'k')]
    relationship_type: Option<String>,

    /// Output format
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Execute the relationships command
pub fn execute(args: RelationshipsArgs, global: GlobalOptions) -> Result<()> {
    let workspace = resolve_workspace(&global)?;
    let config = load_config(&global, &workspace)?;
    let corpus = open_corpus(&config, &workspace)?;
    print_warnings(&corpus.warnings);

    let filter = args.filter.to_filter();
    let selected: Vec<&RelationshipRecord> = corpus
        .relationships_for(&filter)
        .into_iter()
        .filter(|rel| args.involving.as_deref().is_none_or(|id| rel.touches(id)))
        .filter(|rel| {
            args.relationship_type
                .as_deref()
                .is_none_or(|kind| rel.relationship_type.eq_ignore_ascii_case(kind.trim()))
        })
        .collect();

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&selected)
                .context("Failed to serialize relationships")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            if selected.is_empty() {
                println!("No relationships found.");
                return Ok(());
            }
            for rel in &selected {
                println!(
                    "{} -[{}]-> {}  ({})",
                    rel.source_id,
                    rel.relationship_type,
                    rel.target_id,
                    rel.display_name()
                );
                if let Some(ref description) = rel.description {
                    println!("  {}", description);
                }
            }
            print_info(&format!("{} relationship(s)", selected.len()), global.quiet);
        }
    }

    Ok(())
}
