use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::entities::lookup::{MedicineLookup, fallback_queries, validate_name};
use crate::entities::names::{NameMap, NameSubstitution};
use crate::error::MedLookupError;
use crate::render;
use crate::render::markdown::ToggleHint;
use crate::render::toggle::CardView;

pub mod health;
pub mod interactive;

#[derive(Parser, Debug)]
#[command(
    name = "medlookup",
    version,
    about = "Look up medicine labels on openFDA, mapping international brand names to US names"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output JSON instead of Markdown
    #[arg(long, global = true)]
    pub json: bool,

    /// Name-map JSON file layered over the built-in table
    #[arg(long, global = true, value_name = "PATH")]
    pub names: Option<PathBuf>,

    /// Start from an empty name map instead of the built-in table
    #[arg(long, global = true)]
    pub no_builtin_names: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look up a medicine and print its label card
    Search {
        /// Medicine name, brand or generic (e.g. panadol, "advil liqui-gels")
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,

        /// Show every section in full instead of truncating long text
        #[arg(long)]
        expand: bool,
    },
    /// Print the search term a name maps to
    Normalize {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// List the active international-to-US name map
    Names,
    /// Print the fallback queries a search would try, in order
    Queries {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Start an interactive lookup session on stdin/stdout
    Interactive,
    /// Check openFDA reachability and the local configuration
    Health,
    /// Run the MCP server over stdio
    Mcp,
    /// Print version
    Version,
}

#[derive(Debug, Serialize)]
struct NormalizedName<'a> {
    input: &'a str,
    search_term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    substitution: Option<NameSubstitution>,
}

#[derive(Debug, Serialize)]
struct QueryPlanRow {
    strategy: crate::entities::lookup::QueryStrategy,
    query: String,
}

#[derive(Debug, Serialize)]
struct QueryPlan {
    search_term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    substitution: Option<NameSubstitution>,
    queries: Vec<QueryPlanRow>,
}

#[derive(Debug, Serialize)]
struct NameMapEntry<'a> {
    name: &'a str,
    mapped: &'a str,
}

fn join_name(parts: &[String]) -> String {
    parts.join(" ")
}

/// Loads the name map selected by the global flags.
///
/// # Errors
///
/// Returns an error when a configured name-map file cannot be read or parsed.
pub fn resolve_names(cli: &Cli) -> Result<NameMap, MedLookupError> {
    NameMap::resolve(cli.names.as_deref(), !cli.no_builtin_names)
}

/// Builds the openFDA-backed lookup used by every surface.
///
/// # Errors
///
/// Returns an error when the name map or the HTTP client cannot be set up.
pub fn build_lookup(cli: &Cli) -> Result<MedicineLookup, MedLookupError> {
    MedicineLookup::with_openfda(resolve_names(cli)?)
}

/// Runs a lookup and renders it as Markdown, collapsed unless `expand` is set.
pub(crate) async fn lookup_markdown(
    lookup: &MedicineLookup,
    name: &str,
    expand: bool,
    hint: ToggleHint,
) -> Result<String, MedLookupError> {
    let outcome = lookup.lookup(name).await?;
    let view = outcome.card.clone().map(|card| {
        let mut view = CardView::new(card);
        if expand {
            view.expand_all();
        }
        view
    });
    render::markdown::lookup_markdown(&outcome, view.as_ref(), hint)
}

pub(crate) fn normalize_markdown(names: &NameMap, raw: &str) -> Result<String, MedLookupError> {
    let input = validate_name(raw)?;
    let search_term = names.normalize(input);
    Ok(match names.substitute(input) {
        Some(sub) => format!(
            "{search_term}\n\n\"{}\" maps to \"{}\".",
            sub.original, sub.mapped
        ),
        None => search_term,
    })
}

/// Executes a one-shot command and returns its rendered output.
///
/// `interactive` and `mcp` take over stdio and are dispatched by the binary.
///
/// # Errors
///
/// Returns an error when the command fails.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let json = cli.json;
    match &cli.command {
        Commands::Search { name, expand } => {
            let lookup = build_lookup(&cli)?;
            let name = join_name(name);
            if json {
                let outcome = lookup.lookup(&name).await?;
                return Ok(render::json::to_pretty(&outcome)?);
            }
            Ok(lookup_markdown(&lookup, &name, *expand, ToggleHint::Cli).await?)
        }
        Commands::Normalize { name } => {
            let names = resolve_names(&cli)?;
            let raw = join_name(name);
            if json {
                let input = validate_name(&raw)?;
                return Ok(render::json::to_pretty(&NormalizedName {
                    input,
                    search_term: names.normalize(input),
                    substitution: names.substitute(input),
                })?);
            }
            Ok(normalize_markdown(&names, &raw)?)
        }
        Commands::Names => {
            let names = resolve_names(&cli)?;
            if json {
                let entries: Vec<NameMapEntry<'_>> = names
                    .iter()
                    .map(|(name, mapped)| NameMapEntry { name, mapped })
                    .collect();
                return Ok(render::json::to_pretty(&entries)?);
            }
            Ok(render::markdown::names_markdown(&names)?)
        }
        Commands::Queries { name } => {
            let names = resolve_names(&cli)?;
            let raw = join_name(name);
            let input = validate_name(&raw)?;
            let search_term = names.normalize(input);
            let substitution = names.substitute(input);
            let queries = fallback_queries(&search_term);
            if json {
                return Ok(render::json::to_pretty(&QueryPlan {
                    search_term,
                    substitution,
                    queries: queries
                        .into_iter()
                        .map(|(strategy, query)| QueryPlanRow { strategy, query })
                        .collect(),
                })?);
            }
            Ok(render::markdown::queries_markdown(
                &search_term,
                substitution.as_ref(),
                &queries,
            )?)
        }
        Commands::Health => {
            let report = health::check(cli.names.as_deref(), !cli.no_builtin_names).await?;
            if json {
                return Ok(render::json::to_pretty(&report)?);
            }
            Ok(report.to_markdown())
        }
        Commands::Version => Ok(format!("medlookup {}", env!("CARGO_PKG_VERSION"))),
        Commands::Interactive | Commands::Mcp => Err(MedLookupError::InvalidArgument(
            "This command runs on stdio and is started by the medlookup binary.".into(),
        )
        .into()),
    }
}
