//! Command execution
//!
//! Each command takes the session (or its backend) by reference plus an
//! output writer, so tests can drive commands against a stub backend and
//! inspect exactly what would be printed.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{debug, error, info, warn};

use megago_core::{
    is_go_term, parse_term_list, AnalysisBackend, AnalysisSession, Completion, RemoteAnalysisError,
    SessionEvent, SimilarityScores, TermSlot,
};

/// Column header of batch output
pub const BATCH_HEADER: &str = "ID,BIOLOGICAL_PROCESS,CELLULAR_COMPONENT,MOLECULAR_FUNCTION";

/// One row of a batch input file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchRow {
    /// Row identifier, echoed in the output
    pub id: String,
    /// Term set 1
    pub terms1: Vec<String>,
    /// Term set 2
    pub terms2: Vec<String>,
}

/// Read a term list from inline text or a file
pub async fn read_terms(inline: Option<&str>, file: Option<&Path>) -> Result<Vec<String>> {
    let text = match (inline, file) {
        (Some(text), None) => text.to_string(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read term file {}", path.display()))?,
        (Some(_), Some(_)) => bail!("Give either an inline term list or a file, not both"),
        (None, None) => bail!("No term list given"),
    };

    let terms = parse_term_list(&text);
    for term in terms.iter().filter(|t| !is_go_term(t)) {
        warn!(term = %term, "Not a GO term identifier, the service will report it as invalid");
    }
    Ok(terms)
}

/// Compare two term lists and print the result
pub async fn compare<B, W>(
    session: &AnalysisSession<B>,
    list1: Vec<String>,
    list2: Vec<String>,
    json: bool,
    out: &mut W,
) -> Result<()>
where
    B: AnalysisBackend + 'static,
    W: Write,
{
    session.set_term_set(TermSlot::First, list1);
    session.set_term_set(TermSlot::Second, list2);

    run_analysis(session).await.context("Analysis failed")?;

    if json {
        let snapshot = serde_json::to_string_pretty(&session.snapshot())?;
        writeln!(out, "{snapshot}")?;
    } else {
        write_scores(out, &session.similarity())?;
        let invalid = session.invalid_terms();
        if invalid.is_empty() {
            writeln!(out, "invalid terms: none")?;
        } else {
            let joined = invalid.into_iter().collect::<Vec<_>>().join(", ");
            writeln!(out, "invalid terms: {joined}")?;
        }
    }
    Ok(())
}

/// Run every row of a batch file through the session
///
/// Rows that fail are printed with `nan` scores; the command fails after the
/// last row if any did.
pub async fn batch<B, W>(session: &AnalysisSession<B>, input: &str, out: &mut W) -> Result<()>
where
    B: AnalysisBackend + 'static,
    W: Write,
{
    let rows = parse_batch(input)?;
    info!(rows = rows.len(), "Starting batch");

    writeln!(out, "{BATCH_HEADER}")?;
    let mut failed = 0usize;
    for row in rows {
        session.set_term_set(TermSlot::First, row.terms1);
        session.set_term_set(TermSlot::Second, row.terms2);

        let scores = match run_analysis(session).await {
            Ok(()) => session.similarity(),
            Err(e) => {
                error!(id = %row.id, error = %e, "Batch row failed");
                failed += 1;
                SimilarityScores::undefined()
            }
        };
        writeln!(out, "{}", format_batch_row(&row.id, &scores))?;
    }

    if failed > 0 {
        bail!("{failed} batch row(s) failed");
    }
    Ok(())
}

/// Resolve term identifiers and print the records as JSON
pub async fn resolve<B, W>(backend: &B, terms: &[String], out: &mut W) -> Result<()>
where
    B: AnalysisBackend + ?Sized,
    W: Write,
{
    let ids = parse_term_list(&terms.join(" "));
    if ids.is_empty() {
        bail!("No term identifiers given");
    }

    let records = backend
        .resolve_terms(&ids)
        .await
        .context("Term lookup failed")?;
    debug!(requested = ids.len(), resolved = records.len(), "Resolved terms");

    writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
    Ok(())
}

/// Check that the service answers
pub async fn ping<B, W>(backend: &B, base_url: &str, out: &mut W) -> Result<()>
where
    B: AnalysisBackend + ?Sized,
    W: Write,
{
    if !backend.health_check().await {
        bail!("{} service at {base_url} is not reachable", backend.name());
    }
    writeln!(out, "{} service at {base_url} is reachable", backend.name())?;
    Ok(())
}

/// Run one analysis, logging events as they arrive
async fn run_analysis<B>(session: &AnalysisSession<B>) -> Result<(), RemoteAnalysisError>
where
    B: AnalysisBackend + 'static,
{
    let mut events = session.subscribe();
    let analysis = session.analyse();
    tokio::pin!(analysis);

    let completion = loop {
        tokio::select! {
            result = &mut analysis => break result?,
            Ok(event) = events.recv() => log_event(&event),
        }
    };

    if completion == Completion::Superseded {
        // Only one analysis runs at a time here
        warn!("Analysis was superseded");
    }
    Ok(())
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::JobSubmitted { job, .. } => info!(job = %job, "Job accepted"),
        SessionEvent::ProgressUpdated { job, progress } => {
            info!(job = %job, "Progress {:.0}%", progress * 100.0);
        }
        other => debug!(event = other.label(), "Session event"),
    }
}

fn write_scores<W: Write>(out: &mut W, scores: &SimilarityScores) -> std::io::Result<()> {
    writeln!(out, "biological_process  {}", format_score(scores.biological_process))?;
    writeln!(out, "cellular_component  {}", format_score(scores.cellular_component))?;
    writeln!(out, "molecular_function  {}", format_score(scores.molecular_function))
}

/// Score as printed; whole scores keep a decimal point (`1.0`) and
/// undefined scores print as `nan`
pub fn format_score(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:?}")
    }
}

/// One output line of a batch run
pub fn format_batch_row(id: &str, scores: &SimilarityScores) -> String {
    let [bp, cc, mf] = scores.as_array().map(format_score);
    format!("{id},{bp},{cc},{mf}")
}

/// Parse `ID,TERMS1,TERMS2` lines
///
/// Terms within a field are separated by `;`. Columns after the third are
/// ignored. A first line with no GO term in its two term columns is a header
/// and is skipped. Blank lines are ignored.
pub fn parse_batch(input: &str) -> Result<Vec<BatchRow>> {
    let mut rows = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.splitn(4, ',').take(3).map(str::trim).collect();
        if index == 0 && !fields.iter().skip(1).any(|field| has_go_term(field)) {
            debug!(header = line, "Skipping batch header");
            continue;
        }

        let [id, terms1, terms2] = fields.as_slice() else {
            bail!(
                "line {}: expected 3 comma-separated fields, found {}",
                index + 1,
                fields.len()
            );
        };
        if id.is_empty() {
            bail!("line {}: empty row id", index + 1);
        }

        rows.push(BatchRow {
            id: (*id).to_string(),
            terms1: parse_term_list(terms1),
            terms2: parse_term_list(terms2),
        });
    }

    Ok(rows)
}

fn has_go_term(field: &str) -> bool {
    parse_term_list(field).iter().any(|t| is_go_term(t))
}
