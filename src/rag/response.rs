//! RAG answer synthesis.

use super::context::format_context_for_prompt;
use super::{
    Generator, QueryResult, QueryStage, ResponseParser, SectionParser, NO_RELEVANT_INFORMATION,
    UNABLE_TO_GENERATE,
};
use crate::config::Prompts;
use crate::error::{PlotlineError, Result};
use crate::retrieval::{movie_titles, RetrievedChunk};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Produces a [`QueryResult`] from a question and its retrieved chunks.
pub struct AnswerSynthesizer {
    generator: Option<Arc<dyn Generator>>,
    parser: Box<dyn ResponseParser>,
    prompts: Prompts,
    timeout: Duration,
}

impl AnswerSynthesizer {
    /// Create a synthesizer. Without a generator every answer is degraded.
    pub fn new(generator: Option<Arc<dyn Generator>>) -> Self {
        Self {
            generator,
            parser: Box::new(SectionParser::new()),
            prompts: Prompts::default(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Replace the response parser.
    pub fn with_parser(mut self, parser: Box<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Set the upper bound on a single generation call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Render the user prompt for `question` over `retrieved`.
    pub fn build_prompt(&self, question: &str, retrieved: &[RetrievedChunk]) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), format_context_for_prompt(retrieved));
        self.prompts.render_with_custom(&self.prompts.rag.user, &vars)
    }

    /// Answer `question` from `retrieved`. Never fails.
    pub async fn answer(&self, question: &str, retrieved: &[RetrievedChunk]) -> QueryResult {
        self.answer_with_progress(question, retrieved, &mut |_| {}).await
    }

    /// Like [`answer`](Self::answer), reporting each stage to `on_stage`.
    #[instrument(skip(self, retrieved, on_stage), fields(question = %question, chunks = retrieved.len()))]
    pub async fn answer_with_progress(
        &self,
        question: &str,
        retrieved: &[RetrievedChunk],
        on_stage: &mut (dyn FnMut(QueryStage) + Send),
    ) -> QueryResult {
        if retrieved.is_empty() {
            info!("No chunks retrieved, skipping generation");
            on_stage(QueryStage::Done);
            return QueryResult {
                answer: NO_RELEVANT_INFORMATION.to_string(),
                contexts: Vec::new(),
                reasoning: "No movie plot excerpts were relevant to the question.".to_string(),
            };
        }

        on_stage(QueryStage::PromptBuilding);
        let prompt = self.build_prompt(question, retrieved);

        on_stage(QueryStage::Generating);
        match self.generate(&prompt).await {
            Ok(raw) => {
                let parsed = self.parser.parse(&raw);
                debug!("Parsed answer of {} characters", parsed.answer.len());
                let reasoning = parsed
                    .reasoning
                    .unwrap_or_else(|| synthesize_reasoning(question, retrieved));
                on_stage(QueryStage::Done);
                QueryResult {
                    answer: parsed.answer,
                    contexts: contexts(retrieved),
                    reasoning,
                }
            }
            Err(e) => {
                warn!("Answer generation failed: {}", e);
                on_stage(QueryStage::Failed);
                degraded(&e, retrieved)
            }
        }
    }

    /// Run the generator under the timeout, rejecting blank output.
    async fn generate(&self, prompt: &str) -> Result<String> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| PlotlineError::Generation("answer generation is disabled".to_string()))?;

        debug!("Generating with {}", generator.model_id());
        let raw = tokio::time::timeout(self.timeout, generator.generate(prompt))
            .await
            .map_err(|_| {
                PlotlineError::Generation(format!(
                    "timed out after {}s",
                    self.timeout.as_secs_f32()
                ))
            })??;

        if raw.trim().is_empty() {
            return Err(PlotlineError::Generation("model returned an empty response".to_string()));
        }
        Ok(raw)
    }
}

fn contexts(retrieved: &[RetrievedChunk]) -> Vec<String> {
    retrieved.iter().map(|r| r.chunk.text.clone()).collect()
}

/// Reasoning used when the model gave none.
fn synthesize_reasoning(question: &str, retrieved: &[RetrievedChunk]) -> String {
    format!(
        "The question was about '{}'. Found relevant information in {} plot chunks. \
         The most relevant movies were: {}. These plot details were used to form the answer.",
        question,
        retrieved.len(),
        movie_titles(retrieved).join(", ")
    )
}

fn degraded(error: &PlotlineError, retrieved: &[RetrievedChunk]) -> QueryResult {
    QueryResult {
        answer: UNABLE_TO_GENERATE.to_string(),
        contexts: contexts(retrieved),
        reasoning: format!(
            "Answer generation failed ({}). Returning {} retrieved plot chunks from: {}.",
            error,
            retrieved.len(),
            movie_titles(retrieved).join(", ")
        ),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Generator returning a fixed response and remembering prompts.
    pub struct CannedGenerator {
        pub response: String,
        pub prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        pub fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Generator for CannedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }

        fn model_id(&self) -> String {
            "canned".to_string()
        }
    }

    /// Generator that always errors.
    pub struct BrokenGenerator;

    #[async_trait]
    impl Generator for BrokenGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(PlotlineError::OpenAI("connection refused".to_string()))
        }

        fn model_id(&self) -> String {
            "broken".to_string()
        }
    }

    /// Generator that never answers in time.
    pub struct StalledGenerator;

    #[async_trait]
    impl Generator for StalledGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }

        fn model_id(&self) -> String {
            "stalled".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::vector_store::test_support::{chunk, record};

    fn retrieved() -> Vec<RetrievedChunk> {
        vec![
            RetrievedChunk {
                chunk: chunk(0, 0, "Movie: The Matrix. Year: 1999. Plot: Neo learns reality is simulated."),
                record: record(0, "The Matrix"),
                distance: 0.1,
                score: 0.9,
            },
            RetrievedChunk {
                chunk: chunk(1, 0, "Movie: Dark City. Year: 1998. Plot: Strangers rebuild the city."),
                record: record(1, "Dark City"),
                distance: 0.3,
                score: 0.7,
            },
        ]
    }

    #[tokio::test]
    async fn test_well_formed_response() {
        let generator = Arc::new(CannedGenerator::new(
            "Answer: The Matrix and Dark City.\nReasoning: Both plots involve artificial worlds.",
        ));
        let synthesizer = AnswerSynthesizer::new(Some(generator.clone()));

        let result = synthesizer.answer("Which movies feature simulated reality?", &retrieved()).await;
        assert_eq!(result.answer, "The Matrix and Dark City.");
        assert_eq!(result.reasoning, "Both plots involve artificial worlds.");
        assert_eq!(result.contexts, contexts(&retrieved()));

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Which movies feature simulated reality?"));
        assert!(prompts[0].contains("[1] Movie: The Matrix."));
        assert!(prompts[0].contains("[2] Movie: Dark City."));
    }

    #[tokio::test]
    async fn test_missing_reasoning_is_synthesized() {
        let generator = Arc::new(CannedGenerator::new("The Matrix."));
        let synthesizer = AnswerSynthesizer::new(Some(generator));

        let result = synthesizer.answer("simulated reality?", &retrieved()).await;
        assert_eq!(result.answer, "The Matrix.");
        assert!(result.reasoning.contains("2 plot chunks"));
        assert!(result.reasoning.contains("The Matrix, Dark City"));
    }

    #[tokio::test]
    async fn test_generation_failure_degrades() {
        let synthesizer = AnswerSynthesizer::new(Some(Arc::new(BrokenGenerator)));
        let mut stages = Vec::new();

        let result = synthesizer
            .answer_with_progress("q", &retrieved(), &mut |s| stages.push(s))
            .await;
        assert!(result.is_degraded());
        assert_eq!(result.contexts.len(), 2);
        assert!(result.reasoning.contains("connection refused"));
        assert!(result.reasoning.contains("The Matrix"));
        assert_eq!(
            stages,
            vec![QueryStage::PromptBuilding, QueryStage::Generating, QueryStage::Failed]
        );
    }

    #[tokio::test]
    async fn test_timeout_degrades() {
        let synthesizer = AnswerSynthesizer::new(Some(Arc::new(StalledGenerator)))
            .with_timeout(Duration::from_millis(20));

        let result = synthesizer.answer("q", &retrieved()).await;
        assert!(result.is_degraded());
        assert!(result.reasoning.contains("timed out"));
    }

    #[tokio::test]
    async fn test_blank_response_degrades() {
        let synthesizer = AnswerSynthesizer::new(Some(Arc::new(CannedGenerator::new("   \n"))));
        let result = synthesizer.answer("q", &retrieved()).await;
        assert!(result.is_degraded());
        assert_eq!(result.contexts.len(), 2);
    }

    #[tokio::test]
    async fn test_without_generator_degrades() {
        let result = AnswerSynthesizer::new(None).answer("q", &retrieved()).await;
        assert!(result.is_degraded());
        assert!(result.reasoning.contains("disabled"));
    }

    #[tokio::test]
    async fn test_no_chunks_skips_generation() {
        let generator = Arc::new(CannedGenerator::new("Answer: x"));
        let synthesizer = AnswerSynthesizer::new(Some(generator.clone()));

        let result = synthesizer.answer("q", &[]).await;
        assert_eq!(result.answer, NO_RELEVANT_INFORMATION);
        assert!(result.contexts.is_empty());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_prompt_variables() {
        let generator = Arc::new(CannedGenerator::new("Answer: ok"));
        let mut prompts = Prompts::default();
        prompts.rag.user = "{{persona}} asks: {{question}}\n{{context}}".to_string();
        prompts.variables.insert("persona".to_string(), "A critic".to_string());

        let synthesizer = AnswerSynthesizer::new(Some(generator.clone())).with_prompts(prompts);
        synthesizer.answer("why?", &retrieved()).await;

        let sent = generator.prompts.lock().unwrap();
        assert!(sent[0].starts_with("A critic asks: why?"));
    }
}
