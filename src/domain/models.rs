/// Domain models for ClariMed
///
/// These models represent core business entities and are transport-agnostic.
use serde::{Deserialize, Serialize};

/// Disclaimer seeded into every result whose source supplies none
pub const DEFAULT_DISCLAIMER: &str =
    "This is not medical advice. Contact your clinician if you have concerns.";

/// A medical term with its plain-language definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyTerm {
    pub term: String,
    pub definition: String,
}

impl KeyTerm {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
        }
    }
}

/// The fixed five-field record the client UI consumes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessResult {
    pub plain_summary: String,
    pub key_terms: Vec<KeyTerm>,
    pub action_items: Vec<String>,
    pub red_flags: Vec<String>,
    pub disclaimers: Vec<String>,
}

impl Default for ProcessResult {
    fn default() -> Self {
        Self {
            plain_summary: String::new(),
            key_terms: Vec::new(),
            action_items: Vec::new(),
            red_flags: Vec::new(),
            disclaimers: vec![DEFAULT_DISCLAIMER.to_string()],
        }
    }
}

impl ProcessResult {
    /// Splits the summary into non-empty paragraphs (blank-line separated)
    pub fn summary_paragraphs(&self) -> Vec<String> {
        self.plain_summary
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Where OCR reads a document from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Object already in cloud storage (`gs://bucket/object`)
    Gcs { uri: String },
    /// Bytes uploaded directly to this service
    Inline { bytes: Vec<u8>, mime_type: String },
}

impl DocumentSource {
    pub fn is_pdf(&self) -> bool {
        match self {
            DocumentSource::Gcs { uri } => uri.to_lowercase().ends_with(".pdf"),
            DocumentSource::Inline { bytes, mime_type } => {
                mime_type.eq_ignore_ascii_case("application/pdf") || bytes.starts_with(b"%PDF")
            }
        }
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentSource::Gcs { uri } => write!(f, "{}", uri),
            DocumentSource::Inline { bytes, mime_type } => {
                write!(f, "inline {} ({} bytes)", mime_type, bytes.len())
            }
        }
    }
}

/// A document received through the upload endpoint
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: Option<String>,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn to_source(&self) -> DocumentSource {
        DocumentSource::Inline {
            bytes: self.bytes.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Per-document state kept in the session cache
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    #[serde(skip)]
    pub document: Option<UploadedDocument>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_translated: Option<ProcessResult>,
    pub dropped_key_terms: usize,
    #[serde(skip)]
    pub owner_uid: Option<String>,
}

impl SessionRecord {
    /// Creates an empty session with a fresh identifier
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now(),
            source_uri: None,
            document: None,
            language: language.into(),
            result: None,
            result_translated: None,
            dropped_key_terms: 0,
            owner_uid: None,
        }
    }

    /// Attaches an uploaded document (builder pattern)
    pub fn with_document(mut self, document: UploadedDocument) -> Self {
        self.document = Some(document);
        self
    }

    /// Records the cloud storage URI (builder pattern)
    pub fn with_source_uri(mut self, uri: Option<String>) -> Self {
        self.source_uri = uri;
        self
    }

    /// The document this session should OCR, if any
    pub fn document_source(&self) -> Option<DocumentSource> {
        if let Some(document) = &self.document {
            return Some(document.to_source());
        }
        self.source_uri
            .as_ref()
            .map(|uri| DocumentSource::Gcs { uri: uri.clone() })
    }

    /// Whether `uid` may read this session
    ///
    /// Anonymous sessions are open to everyone; owned sessions only to their owner.
    pub fn visible_to(&self, uid: Option<&str>) -> bool {
        match self.owner_uid.as_deref() {
            None => true,
            Some(owner) => uid == Some(owner),
        }
    }

    /// The result to read aloud: translated if present, otherwise the original
    pub fn latest_result(&self) -> Option<&ProcessResult> {
        self.result_translated.as_ref().or(self.result.as_ref())
    }
}

/// A result persisted for an authenticated user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredResult {
    pub owner_uid: String,
    pub session_id: String,
    pub language: String,
    pub result: ProcessResult,
    pub result_translated: Option<ProcessResult>,
    pub created_at: i64, // Unix timestamp
    pub updated_at: i64,
}

impl StoredResult {
    /// Creates a new stored result stamped with the current time
    pub fn new(owner_uid: String, session_id: String, language: String, result: ProcessResult) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            owner_uid,
            session_id,
            language,
            result,
            result_translated: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the translated result (builder pattern)
    pub fn with_translation(mut self, translated: Option<ProcessResult>) -> Self {
        self.result_translated = translated;
        self
    }
}

/// A reference definition returned by a knowledge lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TermDefinition {
    pub term: String,
    pub definition: String,
}

impl std::fmt::Display for TermDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.term, self.definition)
    }
}

/// One synthesized paragraph of speech
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioClip {
    pub index: usize,
    pub text: String,
    pub content_type: String,
    pub audio_base64: String,
}
