use rmcp::model::{Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ServerHandler, ServiceExt, tool};
use tokio_util::sync::CancellationToken;

use crate::cli::{lookup_markdown, normalize_markdown};
use crate::entities::lookup::MedicineLookup;
use crate::render::markdown::ToggleHint;

#[derive(Clone)]
pub struct MedLookupServer {
    lookup: MedicineLookup,
}

impl MedLookupServer {
    pub fn new(lookup: MedicineLookup) -> Self {
        Self { lookup }
    }
}

#[tool(tool_box)]
impl MedLookupServer {
    #[tool(
        description = "Look up a medicine on the openFDA drug label database. Accepts US or \
                       international names (e.g. panadol, brufen) and returns a Markdown card \
                       with purpose, usage, dosage and storage."
    )]
    async fn lookup(&self, #[tool(param)] name: String) -> Result<String, String> {
        lookup_markdown(&self.lookup, &name, true, ToggleHint::Cli)
            .await
            .map_err(|e| format!("Error: {e}"))
    }

    #[tool(description = "Map an international medicine name to the US name that lookup searches for.")]
    async fn normalize(&self, #[tool(param)] name: String) -> Result<String, String> {
        normalize_markdown(self.lookup.names(), &name).map_err(|e| format!("Error: {e}"))
    }
}

#[tool(tool_box)]
impl ServerHandler for MedLookupServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "medlookup".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "medlookup reads FDA drug labels from openFDA. Use `lookup` with a brand or \
                 generic name to get a medicine card; international names such as panadol \
                 are mapped to their US equivalents first. Use `normalize` to see that mapping \
                 without querying openFDA."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio(lookup: MedicineLookup) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let cancel = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let running = MedLookupServer::new(lookup)
        .serve_with_ct(rmcp::transport::stdio(), shutdown)
        .await?;
    let _reason = running.waiting().await?;
    Ok(())
}
