//! MCP server entrypoint over stdio.

mod shell;

use crate::entities::lookup::MedicineLookup;

/// Runs the medlookup MCP server over stdio.
///
/// # Errors
///
/// Returns an error when stdio transport setup or MCP server startup fails.
pub async fn run_stdio(lookup: MedicineLookup) -> anyhow::Result<()> {
    shell::run_stdio(lookup).await
}
