//! Document processing pipeline
//!
//! OCR, term extraction, optional knowledge lookup, the language model and
//! the normalizer, wired together over the service ports. Speech synthesis
//! sits on the same struct so handlers only need one dependency.

use crate::domain::models::{AudioClip, DocumentSource, ProcessResult};
use crate::domain::normalize::{normalize_with_mode, NormalizeMode, Normalized};
use crate::domain::terms;
use crate::domain::PromptTemplates;
use crate::error::{AppError, Result};
use crate::ports::{KnowledgePort, LlmConfig, LlmServicePort, OcrServicePort, TtsServicePort};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::sync::Arc;

/// Orchestrates the external services behind one request
pub struct ProcessingPipeline {
    ocr: Arc<dyn OcrServicePort>,
    llm: Arc<dyn LlmServicePort>,
    knowledge: Option<Arc<dyn KnowledgePort>>,
    tts: Arc<dyn TtsServicePort>,
    llm_config: LlmConfig,
    mode: NormalizeMode,
}

impl ProcessingPipeline {
    pub fn new(
        ocr: Arc<dyn OcrServicePort>,
        llm: Arc<dyn LlmServicePort>,
        tts: Arc<dyn TtsServicePort>,
        llm_config: LlmConfig,
    ) -> Self {
        Self {
            ocr,
            llm,
            knowledge: None,
            tts,
            llm_config,
            mode: NormalizeMode::default(),
        }
    }

    /// Ground prompts with reference definitions (builder pattern)
    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgePort>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Set how unrecognized key terms are treated (builder pattern)
    pub fn with_mode(mut self, mode: NormalizeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> NormalizeMode {
        self.mode
    }

    pub fn llm(&self) -> &Arc<dyn LlmServicePort> {
        &self.llm
    }

    pub fn ocr(&self) -> &Arc<dyn OcrServicePort> {
        &self.ocr
    }

    pub fn tts(&self) -> &Arc<dyn TtsServicePort> {
        &self.tts
    }

    pub fn knowledge_source(&self) -> Option<&'static str> {
        self.knowledge.as_ref().map(|k| k.source_name())
    }

    /// OCR a document and explain it in `language`
    pub async fn process_document(&self, source: &DocumentSource, language: &str) -> Result<Normalized> {
        let text = self.ocr.extract_text(source).await?;
        if text.trim().is_empty() {
            log::warn!("OCR found no text in {}", source);
        }
        self.process_text(&text, language).await
    }

    /// Explain already-extracted text in `language`
    pub async fn process_text(&self, text: &str, language: &str) -> Result<Normalized> {
        let candidates = terms::candidate_terms(text);
        let snippets = self.grounding_snippets(&candidates).await;

        let prompt = PromptTemplates::main_prompt(text, &snippets, language);
        let raw = self.llm.generate_json(&prompt, &self.llm_config).await?;

        self.normalize(&raw)
    }

    /// Translate every text value of a result into `target_language`
    pub async fn translate(&self, result: &ProcessResult, target_language: &str) -> Result<Normalized> {
        let prompt = PromptTemplates::translate_prompt(result, target_language)?;
        let raw = self.llm.generate_json(&prompt, &self.llm_config).await?;

        self.normalize(&raw)
    }

    /// Synthesize one clip per non-empty paragraph, in order
    ///
    /// Returns no clips when speech is not configured. A clip's `index` is
    /// the position of its paragraph in `paragraphs`.
    pub async fn synthesize(&self, paragraphs: &[String], voice_id: Option<&str>) -> Result<Vec<AudioClip>> {
        if !self.tts.is_configured() {
            log::info!("Speech synthesis not configured, returning no clips");
            return Ok(Vec::new());
        }

        let mut clips = Vec::new();
        for (index, paragraph) in paragraphs.iter().enumerate() {
            let text = paragraph.trim();
            if text.is_empty() {
                continue;
            }

            let audio = self
                .tts
                .synthesize(text, voice_id.map(str::to_string))
                .await?;
            if audio.is_empty() {
                return Err(AppError::Tts(format!(
                    "{} returned no audio for paragraph {}",
                    self.tts.provider_name(),
                    index
                )));
            }

            clips.push(AudioClip {
                index,
                text: text.to_string(),
                content_type: self.tts.content_type().to_string(),
                audio_base64: BASE64.encode(&audio),
            });
        }

        log::info!("Synthesized {} audio clips", clips.len());
        Ok(clips)
    }

    /// Reference definitions for the prompt; lookup failures are not fatal
    async fn grounding_snippets(&self, candidates: &[String]) -> String {
        let Some(knowledge) = &self.knowledge else {
            return String::new();
        };

        let lookup = terms::lookup_terms(candidates);
        if lookup.is_empty() {
            return String::new();
        }

        match knowledge.lookup_terms(&lookup).await {
            Ok(definitions) => {
                log::debug!(
                    "{} matched {} of {} terms",
                    knowledge.source_name(),
                    definitions.len(),
                    lookup.len()
                );
                terms::render_snippets(&definitions)
            }
            Err(e) => {
                log::warn!("Knowledge lookup via {} failed: {}", knowledge.source_name(), e);
                String::new()
            }
        }
    }

    fn normalize(&self, raw: &serde_json::Value) -> Result<Normalized> {
        normalize_with_mode(raw, self.mode)
    }
}
