//! Investigation pipeline orchestration.
//!
//! Embeds an incoming complaint, retrieves the nearest knowledge-base
//! chunks, builds a grounding prompt, invokes generation once, and parses
//! the output into a typed [`InvestigationResult`] whose citations always
//! trace back to the retrieved chunks.
//!
//! The result is a draft for human review; callers must not forward it to
//! a client without a separate approval step.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::embedding::Embedder;
use crate::generation::Generator;
use crate::models::{Citation, InvestigationResult, RetrievedChunk};
use crate::store::VectorStore;

/// Section markers the model is instructed to emit, in order.
const SECTIONS: [&str; 3] = ["TIMELINE", "FAILURE POINT", "DRAFT RESPONSE"];

/// Excerpt width for citations, in characters.
const EXCERPT_CHARS: usize = 240;

/// Run the full investigation pipeline for a single complaint.
///
/// Precondition (enforced at the HTTP/CLI boundary, not here): the
/// complaint meets the configured minimum length.
pub async fn run_investigation(
    config: &Config,
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    complaint: &str,
) -> Result<InvestigationResult> {
    let query_vec = embedder.embed_query(complaint).await?;
    let retrieved = store.query(&query_vec, config.retrieval.top_k).await?;

    let prompt = build_prompt(complaint, &retrieved);
    let raw = generator.generate(&prompt).await?;

    let [timeline, failure_point, draft_response] = parse_sections(&raw)?;

    // Citations come from retrieval, not from the generated text, so the
    // answer stays traceable even when the model omits its sources.
    let citations = retrieved
        .iter()
        .map(|chunk| Citation {
            document_name: chunk.source.clone(),
            excerpt: excerpt(&chunk.text),
        })
        .collect();

    Ok(InvestigationResult {
        timeline,
        failure_point,
        draft_response,
        citations,
    })
}

/// Assemble the grounding prompt: task framing, numbered chunks labeled
/// by source, and the verbatim complaint.
fn build_prompt(complaint: &str, retrieved: &[RetrievedChunk]) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are an expert in payment operations investigating a stuck or failed transfer.\n\n",
    );

    prompt.push_str("CONTEXT - process documentation retrieved from the knowledge base:\n\n");
    if retrieved.is_empty() {
        prompt.push_str("(no matching documentation was found)\n\n");
    }
    for (i, chunk) in retrieved.iter().enumerate() {
        prompt.push_str(&format!("[{}] (source: {})\n{}\n\n", i + 1, chunk.source, chunk.text));
    }

    prompt.push_str(
        "TASK: Using only the documentation above and the complaint below:\n\
         1. Reconstruct the transfer timeline.\n\
         2. Identify the most likely failure point, citing the relevant process rules by source.\n\
         3. Draft a professional client-facing response.\n\n\
         Answer with exactly these three sections:\n\
         TIMELINE:\n\
         FAILURE POINT:\n\
         DRAFT RESPONSE:\n\n",
    );

    prompt.push_str("COMPLAINT:\n");
    prompt.push_str(complaint);
    prompt.push('\n');

    prompt
}

/// Parse the raw generation output into the three required sections.
///
/// Tolerates minor formatting variance: case, leading `#`/`*`/`-`
/// decoration, bold markers, and content on the header line itself. A
/// section that cannot be located, or that is empty after trimming, is a
/// malformed-output error — never a silently blank field.
fn parse_sections(raw: &str) -> Result<[String; 3]> {
    let mut bodies: [String; 3] = Default::default();
    let mut found = [false; 3];
    let mut current: Option<usize> = None;

    for line in raw.lines() {
        if let Some((idx, inline)) = match_header(line) {
            found[idx] = true;
            current = Some(idx);
            if !inline.is_empty() {
                bodies[idx].push_str(inline);
                bodies[idx].push('\n');
            }
            continue;
        }

        if let Some(idx) = current {
            bodies[idx].push_str(line);
            bodies[idx].push('\n');
        }
    }

    for (i, name) in SECTIONS.iter().enumerate() {
        if !found[i] || bodies[i].trim().is_empty() {
            bail!("Malformed generation output: missing {} section", name);
        }
    }

    let [a, b, c] = bodies;
    Ok([
        a.trim().to_string(),
        b.trim().to_string(),
        c.trim().to_string(),
    ])
}

/// Match a line against the known section headers, returning the section
/// index and any inline content after the colon.
fn match_header(line: &str) -> Option<(usize, &str)> {
    let stripped = line
        .trim()
        .trim_start_matches(['#', '*', '-'])
        .trim_start();

    for (idx, name) in SECTIONS.iter().enumerate() {
        // Model output is arbitrary text; a prefix that ends inside a
        // multibyte char is simply not a header.
        let Some(head) = stripped.get(..name.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(name) {
            continue;
        }

        let rest = stripped[name.len()..].trim_start_matches(['*', ' ']);
        if rest.is_empty() {
            return Some((idx, ""));
        }
        if let Some(inline) = rest.strip_prefix(':') {
            return Some((idx, inline.trim_start_matches(['*', ' ']).trim_end()));
        }
    }

    None
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}
