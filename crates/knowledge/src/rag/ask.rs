//! Answer one question against the routed index.
//!
//! Route the index to the detected machines, retrieve the top-k chunks,
//! render the selected template with context and conversation history,
//! then call the generation backend.

use crate::rag::context::AppContext;
use crate::rag::types::{map_chunks_to_sources, render_history, RagResponse};
use crate::router::route;
use crate::types::DetectionResult;
use crate::vector_index::ScoredChunk;
use manualqa_core::AppResult;
use manualqa_llm::LlmRequest;
use manualqa_prompt::{build_prompt, PromptInput};

/// Retrieve, prompt and generate.
///
/// `history_key` selects the conversation whose earlier turns fill the
/// `chat_history` slot. Nothing is recorded here.
pub async fn ask_rag(
    ctx: &AppContext,
    query: &str,
    detection: &DetectionResult,
    history_key: &str,
) -> AppResult<RagResponse> {
    tracing::info!("Answering query: {}", query);

    let index = ctx.index().await?;
    let retriever = route(&index, detection, ctx.top_k());
    let hits = retriever.retrieve_text(ctx.embedder(), query).await?;

    let max_score = hits.first().map(|h| h.score).unwrap_or(0.0);
    tracing::debug!(
        "Retrieved {} chunk(s) from {} candidate(s), max score {:.3}",
        hits.len(),
        retriever.candidates(),
        max_score
    );

    let definition = ctx.registry().select(&detection.entities);
    let input = PromptInput::new(build_context(&hits), query)
        .with_history(render_history(&ctx.history(history_key)));
    let built = build_prompt(definition, &input)?;
    tracing::debug!("Using prompt template '{}'", built.metadata.source_prompt_id);

    let mut request = LlmRequest::new(built.user, ctx.llm().model_name());
    if let Some(system) = built.system {
        request = request.with_system(system);
    }
    if let Some(temperature) = ctx.temperature().or(built.metadata.temperature) {
        request = request.with_temperature(temperature);
    }

    let answer = generate(ctx, request).await?;

    Ok(RagResponse {
        answer,
        sources: map_chunks_to_sources(hits.iter().map(|h| &h.chunk)),
        machines: detection.entities.clone(),
        scope: Some(retriever.scope().clone()),
        max_score,
    })
}

/// Retrieved chunk texts joined by blank lines.
pub(crate) fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|h| h.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Complete on the selected backend, failing over to the hosted backend
/// when one is configured.
async fn generate(ctx: &AppContext, request: LlmRequest) -> AppResult<String> {
    let primary = ctx.llm();
    match primary.complete(&request).await {
        Ok(response) => Ok(response.content),
        Err(e) => match ctx.fallback_llm() {
            Some(fallback) => {
                tracing::warn!(
                    "{} backend failed ({}); retrying on {}",
                    primary.provider_name(),
                    e,
                    fallback.provider_name()
                );
                let request = LlmRequest {
                    model: fallback.model_name().to_string(),
                    ..request
                };
                Ok(fallback.complete(&request).await?.content)
            }
            None => Err(e),
        },
    }
}
