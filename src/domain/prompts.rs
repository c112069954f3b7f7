//! Prompt templates for document explanation and translation
//!
//! Both prompts ask the model for strict JSON in the ProcessResult shape;
//! the normalizer copes with whatever actually comes back.

use crate::domain::models::ProcessResult;
use crate::error::Result;

/// Default prompt templates
pub struct PromptTemplates;

impl PromptTemplates {
    /// Rules shared by every explanation request
    pub fn system() -> &'static str {
        r#"You are a patient-education assistant. Your job is to convert medical documents into accurate,
culturally sensitive explanations at a 6th-8th grade reading level.

Rules:
- Do NOT diagnose or prescribe. This is educational information only.
- Explain what the document says in plain language.
- Define medical terms clearly and briefly.
- Provide a short checklist of general next steps a typical patient might consider.
- List urgent warning signs ("red flags") to seek care.
- If information is missing or uncertain, say so explicitly and avoid guessing.
- Keep sentences short. Prefer everyday words over jargon.
- Output ONLY valid JSON that matches the required schema (no markdown or commentary)."#
    }

    /// The keys and value types the client expects
    pub fn schema() -> &'static str {
        r#"{"plain_summary": "string", "key_terms": [{"term": "string", "definition": "string"}], "action_items": ["string"], "red_flags": ["string"], "disclaimers": ["string"]}"#
    }

    /// Template for explaining a document
    pub fn explain_document() -> &'static str {
        r#"{system}

Target output language: {language}

Required JSON schema (keys and value types):
{schema}

Source document text (verbatim OCR):
<<<
{document}
>>>

Contextual facts/snippets (from the medical terms reference; may be empty):
<<<
{snippets}
>>>

Instructions for the JSON content:
- "plain_summary": 2-5 short paragraphs explaining the document in {language}, grade 6-8 reading level. Separate paragraphs with a blank line.
- "key_terms": 3-10 key medical terms with one-sentence, plain-language definitions.
- "action_items": 3-8 general steps a typical patient might consider (no personalized medical advice).
- "red_flags": 3-8 symptoms/signs that usually require urgent attention (simple and clear).
- "disclaimers": Always include at least:
  - "This is educational information, not medical advice."
  - "Contact your clinician for personalized guidance."

Important:
- Use only information supported by the source text and snippets. If uncertain, state uncertainty.
- DO NOT include markdown, backticks, or any text outside the JSON.
- Return ONLY valid JSON (no trailing commas, no comments)."#
    }

    /// Template for translating an existing result
    pub fn translate() -> &'static str {
        r#"Translate the JSON VALUES (not keys) to "{language}" and return ONLY valid JSON.
- Preserve the exact keys and structure.
- Keep arrays and objects as-is.
- Do NOT add commentary, code fences, or markdown.

JSON to translate:
{payload}"#
    }

    /// Builds the explanation prompt for OCR text plus reference snippets
    pub fn main_prompt(document_text: &str, snippets: &str, language: &str) -> String {
        Self::explain_document()
            .replace("{system}", Self::system())
            .replace("{schema}", Self::schema())
            .replace("{language}", language)
            .replace("{snippets}", snippets.trim())
            .replace("{document}", document_text.trim())
    }

    /// Builds the translation prompt for a normalized result
    pub fn translate_prompt(result: &ProcessResult, language: &str) -> Result<String> {
        let payload = serde_json::to_string(result)?;
        Ok(Self::translate()
            .replace("{language}", language)
            .replace("{payload}", &payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::KeyTerm;

    #[test]
    fn test_templates_have_placeholders() {
        let prompt = PromptTemplates::explain_document();
        for placeholder in ["{system}", "{schema}", "{language}", "{document}", "{snippets}"] {
            assert!(prompt.contains(placeholder), "missing {}", placeholder);
        }
        assert!(PromptTemplates::translate().contains("{payload}"));
    }

    #[test]
    fn test_main_prompt_fills_everything() {
        let prompt = PromptTemplates::main_prompt(
            "  Hemoglobin A1c 7.2%  ",
            "a1c: average blood sugar",
            "es",
        );
        assert!(prompt.contains("Target output language: es"));
        assert!(prompt.contains("<<<\nHemoglobin A1c 7.2%\n>>>"));
        assert!(prompt.contains("a1c: average blood sugar"));
        assert!(prompt.contains("\"key_terms\""));
        assert!(!prompt.contains("{document}"));
        assert!(!prompt.contains("{system}"));
    }

    #[test]
    fn test_translate_prompt_embeds_json() {
        let result = ProcessResult {
            plain_summary: "Your blood sugar is high.".to_string(),
            key_terms: vec![KeyTerm::new("A1c", "Average blood sugar")],
            ..ProcessResult::default()
        };
        let prompt = PromptTemplates::translate_prompt(&result, "fr").unwrap();
        assert!(prompt.starts_with("Translate the JSON VALUES (not keys) to \"fr\""));
        assert!(prompt.contains(r#""plain_summary":"Your blood sugar is high.""#));
    }
}
