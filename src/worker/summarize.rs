use tokio::time::sleep;
use tracing::{info, warn};

use super::retry::{SummaryFailure, generate_with_retry};
use crate::ai::SummaryModel;
use crate::core::config::DigestSettings;
use crate::core::models::CollectedMessages;
use crate::prompt::{
    PromptContext, build_chunk_prompt, build_combine_prompt, build_topic_prompt, format_messages,
};

/// A finished topic summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    pub text: String,
    /// Set when only the most recent N messages could be summarized.
    pub reduced_to: Option<usize>,
}

impl TopicSummary {
    /// Summary text with a note when the reduced-input retry produced it.
    #[must_use]
    pub fn body(&self) -> String {
        match self.reduced_to {
            Some(n) => format!(
                "(Generated on retry from the last {n} messages only)\n\n{}",
                self.text
            ),
            None => self.text.clone(),
        }
    }
}

/// Direct or chunked summarization of one topic, with the reduced-input fallback.
pub struct Summarizer<'a, M: SummaryModel + ?Sized> {
    model: &'a M,
    settings: &'a DigestSettings,
    context: &'a PromptContext,
}

impl<'a, M: SummaryModel + ?Sized> Summarizer<'a, M> {
    #[must_use]
    pub fn new(model: &'a M, settings: &'a DigestSettings, context: &'a PromptContext) -> Self {
        Self {
            model,
            settings,
            context,
        }
    }

    /// Summarize `collected`, chunking when it is above the chunk threshold.
    ///
    /// `key_slot` is the credential slot of the first request; chunk `i` uses
    /// `key_slot + i` and the combining request follows the last chunk.
    ///
    /// # Errors
    ///
    /// Returns the failure of the direct request, the combining request, or,
    /// when no chunk succeeded, of the last chunk.
    pub async fn summarize(
        &self,
        title: &str,
        collected: &CollectedMessages,
        key_slot: usize,
    ) -> Result<String, SummaryFailure> {
        if collected.len() <= self.settings.chunk_threshold {
            let conversation = format_messages(
                &collected.messages,
                collected.truncated,
                &self.context.window_label,
            );
            let prompt = build_topic_prompt(self.context, title, &conversation);
            return generate_with_retry(self.model, &self.settings.retry, key_slot, &prompt).await;
        }

        let chunks: Vec<_> = collected
            .messages
            .chunks(self.settings.chunk_size.max(1))
            .collect();
        let total = chunks.len();
        info!(
            "Topic '{}' has {} messages, summarizing in {} chunks",
            title,
            collected.len(),
            total
        );

        let mut partials = Vec::with_capacity(total);
        let mut last_failure = None;
        for (index, chunk) in chunks.iter().enumerate() {
            if index > 0 {
                sleep(self.settings.chunk_delay).await;
            }
            let conversation = format_messages(chunk, false, &self.context.window_label);
            let prompt = build_chunk_prompt(self.context, title, index + 1, total, &conversation);
            match generate_with_retry(self.model, &self.settings.retry, key_slot + index, &prompt)
                .await
            {
                Ok(text) => partials.push(text),
                Err(failure) => {
                    warn!(
                        "Chunk {}/{} of topic '{}' failed: {}",
                        index + 1,
                        total,
                        title,
                        failure
                    );
                    last_failure = Some(failure);
                }
            }
        }

        if partials.is_empty() {
            return Err(last_failure.unwrap_or(SummaryFailure::EmptyResponse));
        }

        sleep(self.settings.chunk_delay).await;
        let mut combined = partials.join("\n\n");
        if collected.truncated {
            combined = format!(
                "(Only the most recent {} messages were available; older ones were cut for length.)\n\n{combined}",
                collected.len()
            );
        }
        info!(
            "Combining {}/{} partial summaries for topic '{}'",
            partials.len(),
            total,
            title
        );
        let prompt = build_combine_prompt(self.context, title, &combined);
        generate_with_retry(self.model, &self.settings.retry, key_slot + total, &prompt).await
    }

    /// Summarize a topic, retrying once with only the newest messages when the
    /// first pass was blocked or ran out of retries.
    ///
    /// # Errors
    ///
    /// Returns the last failure when no summary could be produced.
    pub async fn summarize_topic(
        &self,
        title: &str,
        collected: &CollectedMessages,
        key_slot: usize,
    ) -> Result<TopicSummary, SummaryFailure> {
        let failure = match self.summarize(title, collected, key_slot).await {
            Ok(text) => {
                return Ok(TopicSummary {
                    text,
                    reduced_to: None,
                });
            }
            Err(failure) => failure,
        };

        let Some(limit) = self.settings.fallback_messages else {
            return Err(failure);
        };
        if !failure.is_fallback_eligible() || collected.len() <= limit {
            return Err(failure);
        }

        warn!(
            "Retrying topic '{}' with the last {} messages after: {}",
            title, limit, failure
        );
        let reduced = collected.most_recent(limit);
        match self.summarize(title, &reduced, key_slot + 1).await {
            Ok(text) => Ok(TopicSummary {
                text,
                reduced_to: Some(limit),
            }),
            Err(retry_failure) => {
                warn!(
                    "Reduced retry for topic '{}' failed too: {}",
                    title, retry_failure
                );
                Err(retry_failure)
            }
        }
    }
}
