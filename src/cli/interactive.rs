//! Line-oriented lookup session: type a name to search, `:more`/`:less` to
//! expand or collapse long sections.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::entities::lookup::{LookupOutcome, MedicineLookup};
use crate::entities::session::{SearchSession, SearchToken};
use crate::error::MedLookupError;
use crate::render::markdown::{ToggleHint, lookup_markdown};
use crate::render::toggle::{CardView, ToggleState};
use crate::transform::label::SectionId;

const BANNER: &str = "Enter a medicine name, or :help for commands.";
const EMPTY_INPUT: &str = "Please enter a medicine name.";
const LOADING: &str = "Loading medicine info...";
const FETCH_FAILED: &str = "Something went wrong fetching the medicine data.";
const NO_CARD: &str = "No medicine card is shown. Search for a medicine first.";
const HELP: &str = "\
Commands:
  <name>              look up a medicine label
  :more <section>     show the full text of a section
  :less <section>     collapse a section again
  :toggle <section>   switch a section between short and full text
  :help               show this help
  :quit               leave the session

Sections: purpose, use, dosage, storage";

type SearchResult = (SearchToken, Result<LookupOutcome, MedLookupError>);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Empty,
    Search(String),
    Set(SectionId, ToggleState),
    Toggle(SectionId),
    Help,
    Quit,
}

fn parse_section(args: &[String]) -> Result<SectionId, MedLookupError> {
    let Some(raw) = args.first() else {
        return Err(MedLookupError::InvalidArgument(
            "A section name is required: purpose, use, dosage, or storage.".into(),
        ));
    };
    SectionId::parse(raw).ok_or_else(|| {
        MedLookupError::InvalidArgument(format!(
            "Unknown section '{raw}'. Expected purpose, use, dosage, or storage."
        ))
    })
}

fn parse_line(line: &str) -> Result<Command, MedLookupError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Command::Search(line.to_string()));
    };

    let args = shlex::split(rest).ok_or_else(|| {
        MedLookupError::InvalidArgument(format!("Invalid command syntax: {line}"))
    })?;
    let Some((cmd, args)) = args.split_first() else {
        return Ok(Command::Help);
    };

    match cmd.to_ascii_lowercase().as_str() {
        "more" => Ok(Command::Set(parse_section(args)?, ToggleState::Expanded)),
        "less" => Ok(Command::Set(parse_section(args)?, ToggleState::Collapsed)),
        "toggle" => Ok(Command::Toggle(parse_section(args)?)),
        "help" | "h" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(MedLookupError::InvalidArgument(format!(
            "Unknown command ':{other}'. Type :help for commands."
        ))),
    }
}

/// What the output region currently shows.
struct Shown {
    outcome: LookupOutcome,
    view: Option<CardView>,
}

/// Outcome of feeding one input line to the session.
enum LineAction {
    Print(String),
    Spawn(SearchToken, String),
    Quit,
}

struct InteractiveSession {
    lookup: MedicineLookup,
    session: Arc<SearchSession>,
    shown: Option<Shown>,
}

impl InteractiveSession {
    fn new(lookup: MedicineLookup) -> Self {
        Self {
            lookup,
            session: Arc::new(SearchSession::new()),
            shown: None,
        }
    }

    fn handle_line(&mut self, line: &str) -> LineAction {
        let command = match parse_line(line) {
            Ok(command) => command,
            Err(err) => return LineAction::Print(err.to_string()),
        };

        match command {
            Command::Empty => LineAction::Print(EMPTY_INPUT.to_string()),
            Command::Help => LineAction::Print(HELP.to_string()),
            Command::Quit => LineAction::Quit,
            Command::Search(name) => {
                self.shown = None;
                LineAction::Spawn(self.session.begin(), name)
            }
            Command::Set(id, state) => {
                LineAction::Print(self.update_view(|view| view.set(id, state)))
            }
            Command::Toggle(id) => LineAction::Print(self.update_view(|view| view.toggle(id))),
        }
    }

    fn update_view<F>(&mut self, change: F) -> String
    where
        F: FnOnce(&mut CardView) -> Result<ToggleState, MedLookupError>,
    {
        let Some(shown) = self.shown.as_mut() else {
            return NO_CARD.to_string();
        };
        let Some(view) = shown.view.as_mut() else {
            return NO_CARD.to_string();
        };
        if let Err(err) = change(view) {
            return err.to_string();
        }
        self.render_shown()
    }

    fn render_shown(&self) -> String {
        let Some(shown) = self.shown.as_ref() else {
            return NO_CARD.to_string();
        };
        match lookup_markdown(&shown.outcome, shown.view.as_ref(), ToggleHint::Interactive) {
            Ok(body) => body,
            Err(err) => {
                error!("Failed to render medicine card: {err}");
                FETCH_FAILED.to_string()
            }
        }
    }

    /// Applies a finished search, unless a newer search has started since.
    fn handle_result(
        &mut self,
        token: SearchToken,
        result: Result<LookupOutcome, MedLookupError>,
    ) -> Option<String> {
        let Some(result) = self.session.accept(token, result) else {
            debug!(token = token.id(), "Discarding stale search result");
            return None;
        };

        match result {
            Ok(outcome) => {
                let view = outcome.card.clone().map(CardView::new);
                self.shown = Some(Shown { outcome, view });
                Some(self.render_shown())
            }
            Err(MedLookupError::InvalidArgument(message)) => Some(message),
            Err(err) => {
                error!("Medicine lookup failed: {err}");
                Some(FETCH_FAILED.to_string())
            }
        }
    }
}

async fn emit<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> std::io::Result<()> {
    writer.write_all(text.trim_end().as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Drives a session over any line reader and writer.
///
/// Each search runs as its own task; only the most recently started search
/// is allowed to render.
pub(crate) async fn run_session<R, W>(
    lookup: MedicineLookup,
    reader: R,
    writer: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut state = InteractiveSession::new(lookup);
    let (tx, mut rx) = mpsc::unbounded_channel::<SearchResult>();
    let mut lines = reader.lines();
    let mut input_done = false;
    let mut in_flight = 0_usize;

    emit(writer, BANNER).await?;

    loop {
        if input_done && in_flight == 0 {
            break;
        }

        tokio::select! {
            line = lines.next_line(), if !input_done => {
                let Some(line) = line? else {
                    input_done = true;
                    continue;
                };
                match state.handle_line(&line) {
                    LineAction::Print(text) => emit(writer, &text).await?,
                    LineAction::Quit => input_done = true,
                    LineAction::Spawn(token, name) => {
                        emit(writer, LOADING).await?;
                        in_flight += 1;
                        let lookup = state.lookup.clone();
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            let result = lookup.lookup(&name).await;
                            let _ = tx.send((token, result));
                        });
                    }
                }
            }
            Some((token, result)) = rx.recv(), if in_flight > 0 => {
                in_flight -= 1;
                if let Some(text) = state.handle_result(token, result) {
                    emit(writer, &text).await?;
                }
            }
        }
    }

    Ok(())
}

/// Runs the interactive session on stdin/stdout.
pub async fn run_stdio(lookup: MedicineLookup) -> anyhow::Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let mut writer = tokio::io::stdout();
    run_session(lookup, reader, &mut writer).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::entities::lookup::LabelSource;
    use crate::entities::lookup::tests::{ScriptedSource, acetaminophen_label};
    use crate::entities::names::NameMap;
    use crate::sources::openfda::LabelResponse;

    fn lookup_with(source: ScriptedSource) -> MedicineLookup {
        MedicineLookup::new(NameMap::builtin(), Arc::new(source))
    }

    fn long_dosage_label() -> serde_json::Value {
        serde_json::json!({
            "results": [{
                "openfda": {"brand_name": ["Brufen"], "generic_name": ["IBUPROFEN"]},
                "dosage_and_administration": ["x".repeat(350)]
            }]
        })
    }

    async fn run_to_string(lookup: MedicineLookup, input: &str) -> String {
        let mut out: Vec<u8> = Vec::new();
        run_session(lookup, input.as_bytes(), &mut out)
            .await
            .expect("session should finish");
        String::from_utf8(out).expect("utf8 output")
    }

    #[test]
    fn parse_line_recognizes_commands() {
        assert_eq!(parse_line("   ").unwrap(), Command::Empty);
        assert_eq!(
            parse_line(" panadol ").unwrap(),
            Command::Search("panadol".into())
        );
        assert_eq!(
            parse_line(":more purpose").unwrap(),
            Command::Set(SectionId::Purpose, ToggleState::Expanded)
        );
        assert_eq!(
            parse_line(":less \"dosage\"").unwrap(),
            Command::Set(SectionId::Dosage, ToggleState::Collapsed)
        );
        assert_eq!(
            parse_line(":toggle storage").unwrap(),
            Command::Toggle(SectionId::Storage)
        );
        assert_eq!(parse_line(":q").unwrap(), Command::Quit);
        assert!(parse_line(":more").is_err());
        assert!(parse_line(":more warnings").is_err());
        assert!(parse_line(":launch").is_err());
    }

    #[tokio::test]
    async fn end_to_end_panadol_renders_acetaminophen_card() {
        let lookup = lookup_with(
            ScriptedSource::default()
                .respond("openfda.brand_name:\"acetaminophen\"", acetaminophen_label()),
        );
        let out = run_to_string(lookup, "panadol\n").await;

        assert!(out.contains(LOADING));
        assert!(out.contains(
            "Showing results for \"acetaminophen\" (US equivalent of \"panadol\")"
        ));
        assert!(out.contains("# Acetaminophen Extra Strength"));
        assert!(out.contains("**Manufacturer:** Major Pharmaceuticals"));
    }

    #[tokio::test]
    async fn no_match_prints_no_results_message() {
        let out = run_to_string(lookup_with(ScriptedSource::default()), "zzzz\n").await;
        assert!(out.contains("No results found. Try another name or brand."));
        assert!(!out.contains("Manufacturer"));
    }

    #[tokio::test]
    async fn empty_result_lists_print_no_results_message() {
        let source = ScriptedSource::default().empty_for("qwerty");
        let out = run_to_string(lookup_with(source), "qwerty\n").await;
        assert!(out.contains(LOADING));
        assert!(out.contains("No results found. Try another name or brand."));
        assert!(!out.contains("Manufacturer"));
        assert!(!out.contains("Showing results for"));
    }

    #[tokio::test]
    async fn empty_line_prompts_for_a_name() {
        let out = run_to_string(lookup_with(ScriptedSource::default()), "\n:quit\n").await;
        assert!(out.contains(EMPTY_INPUT));
        assert!(!out.contains(LOADING));
    }

    #[tokio::test]
    async fn lookup_failure_prints_generic_alert() {
        let source = ScriptedSource::default().fail_on("openfda.brand_name:\"aspirin\"");
        let out = run_to_string(lookup_with(source), "aspirin\n").await;
        assert!(out.contains(FETCH_FAILED));
    }

    #[tokio::test]
    async fn toggle_commands_expand_and_collapse_the_shown_card() {
        let mut session = InteractiveSession::new(lookup_with(ScriptedSource::default()));

        let LineAction::Spawn(token, name) = session.handle_line("brufen") else {
            panic!("search should spawn");
        };
        assert_eq!(name, "brufen");

        let source = ScriptedSource::default()
            .respond("openfda.brand_name:\"ibuprofen\"", long_dosage_label());
        let outcome = lookup_with(source).lookup(&name).await;
        let card = session.handle_result(token, outcome).expect("current result");
        assert!(card.contains("[Show more] :more dosage"));

        let LineAction::Print(expanded) = session.handle_line(":more dosage") else {
            panic!("toggle should print");
        };
        assert!(expanded.contains(&"x".repeat(350)));
        assert!(expanded.contains("[Show less] :less dosage"));

        let LineAction::Print(collapsed) = session.handle_line(":toggle dosage") else {
            panic!("toggle should print");
        };
        assert!(!collapsed.contains(&"x".repeat(350)));
        assert!(collapsed.contains("[Show more] :more dosage"));

        let LineAction::Print(rejected) = session.handle_line(":more storage") else {
            panic!("toggle should print");
        };
        assert!(rejected.contains("has no toggle"));
    }

    #[tokio::test]
    async fn toggle_without_card_is_explained() {
        let mut session = InteractiveSession::new(lookup_with(ScriptedSource::default()));
        let LineAction::Print(text) = session.handle_line(":more purpose") else {
            panic!("toggle should print");
        };
        assert_eq!(text, NO_CARD);
    }

    #[tokio::test]
    async fn stale_result_is_not_rendered() {
        let mut session = InteractiveSession::new(lookup_with(ScriptedSource::default()));
        let LineAction::Spawn(first, _) = session.handle_line("panadol") else {
            panic!("search should spawn");
        };
        let LineAction::Spawn(second, _) = session.handle_line("brufen") else {
            panic!("search should spawn");
        };

        let stale = lookup_with(
            ScriptedSource::default()
                .respond("openfda.brand_name:\"acetaminophen\"", acetaminophen_label()),
        )
        .lookup("panadol")
        .await;
        assert!(session.handle_result(first, stale).is_none());

        let fresh = lookup_with(ScriptedSource::default()).lookup("brufen").await;
        let text = session.handle_result(second, fresh).expect("current result");
        assert!(text.contains("No results found"));
    }

    /// Delays answers for one query so an older search finishes last.
    struct SlowFor {
        slow_query: &'static str,
        inner: ScriptedSource,
    }

    #[async_trait]
    impl LabelSource for SlowFor {
        async fn search_labels(
            &self,
            query: &str,
        ) -> Result<Option<LabelResponse>, MedLookupError> {
            if query == self.slow_query {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            self.inner.search_labels(query).await
        }
    }

    #[tokio::test]
    async fn superseded_search_never_renders_even_when_it_finishes_last() {
        let source = SlowFor {
            slow_query: "openfda.brand_name:\"acetaminophen\"",
            inner: ScriptedSource::default()
                .respond("openfda.brand_name:\"acetaminophen\"", acetaminophen_label())
                .respond("openfda.brand_name:\"ibuprofen\"", long_dosage_label()),
        };
        let lookup = MedicineLookup::new(NameMap::builtin(), Arc::new(source));

        let out = run_to_string(lookup, "panadol\nbrufen\n").await;
        assert!(out.contains("# Brufen"));
        assert!(!out.contains("Acetaminophen Extra Strength"));
    }
}
