//! Snowflake SQL API knowledge adapter
//!
//! Implements the KnowledgePort against a `MEDICAL_TERMS(term, simple_definition)`
//! table through the Snowflake SQL API (v2).
//! API flow:
//! 1. Submit the statement with one TEXT binding per term
//! 2. HTTP 202 means still running: poll the statement handle
//! 3. Rows come back as arrays of strings

use crate::config::SnowflakeConfig;
use crate::domain::models::TermDefinition;
use crate::domain::terms::{contains_pattern, LIKE_ESCAPE};
use crate::error::{AppError, Result};
use crate::ports::knowledge::KnowledgePort;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const POLL_INTERVAL_MS: u64 = 1000; // Poll every second
const MAX_POLL_ATTEMPTS: u32 = 30;
const STATEMENT_TIMEOUT_SECS: u32 = 30;

/// Snowflake service implementation
pub struct SnowflakeService {
    client: Client,
    base_url: String,
    config: SnowflakeConfig,
}

#[derive(Debug, Serialize)]
struct Binding {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

#[derive(Debug, Serialize)]
struct StatementRequest {
    statement: String,
    timeout: u32,
    database: String,
    schema: String,
    warehouse: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    bindings: BTreeMap<String, Binding>,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(rename = "statementHandle")]
    statement_handle: Option<String>,
    message: Option<String>,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

impl SnowflakeService {
    /// Create a new Snowflake service for the configured account
    pub fn new(config: SnowflakeConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            base_url: format!(
                "https://{}.snowflakecomputing.com/api/v2/statements",
                config.account
            ),
            config,
        })
    }

    /// `SELECT ... WHERE LOWER(term) LIKE ? ESCAPE '!' OR ...`
    fn build_statement(&self, terms: &[String]) -> StatementRequest {
        let clause = format!("LOWER(term) LIKE ? ESCAPE '{}'", LIKE_ESCAPE);
        let clauses = vec![clause.as_str(); terms.len()].join(" OR ");
        let bindings = terms
            .iter()
            .enumerate()
            .map(|(i, term)| {
                (
                    (i + 1).to_string(),
                    Binding {
                        kind: "TEXT",
                        value: contains_pattern(term),
                    },
                )
            })
            .collect();

        StatementRequest {
            statement: format!(
                "SELECT term, simple_definition FROM MEDICAL_TERMS WHERE {}",
                clauses
            ),
            timeout: STATEMENT_TIMEOUT_SECS,
            database: self.config.database.clone(),
            schema: self.config.schema.clone(),
            warehouse: self.config.warehouse.clone(),
            role: self.config.role.clone(),
            bindings,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.token)
            .header(
                "X-Snowflake-Authorization-Token-Type",
                &self.config.token_type,
            )
            .header("Accept", "application/json")
    }

    /// Returns the response body and whether the statement is still running
    async fn read_response(response: reqwest::Response) -> Result<(StatementResponse, bool)> {
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Knowledge(format!(
                "Statement failed ({}): {}",
                status, error_text
            )));
        }

        let body: StatementResponse = response
            .json()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to parse statement response: {}", e)))?;
        Ok((body, status == StatusCode::ACCEPTED))
    }

    /// Poll a running statement until it completes
    async fn poll_statement(&self, handle: &str) -> Result<StatementResponse> {
        log::info!("Polling Snowflake statement: {}", handle);

        for attempt in 1..=MAX_POLL_ATTEMPTS {
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;

            let response = self
                .authorized(self.client.get(format!("{}/{}", self.base_url, handle)))
                .send()
                .await
                .map_err(|e| AppError::Knowledge(format!("Poll request failed: {}", e)))?;

            let (body, running) = Self::read_response(response).await?;
            if !running {
                return Ok(body);
            }
            log::debug!(
                "Statement still running (attempt {}/{})",
                attempt,
                MAX_POLL_ATTEMPTS
            );
        }

        Err(AppError::Knowledge(
            "Statement timeout: exceeded maximum polling attempts".to_string(),
        ))
    }

    fn parse_rows(rows: Vec<Vec<Option<String>>>) -> Vec<TermDefinition> {
        rows.into_iter()
            .filter_map(|row| {
                let mut cells = row.into_iter();
                let term = cells.next().flatten()?;
                let definition = cells.next().flatten().unwrap_or_default();
                Some(TermDefinition { term, definition })
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgePort for SnowflakeService {
    async fn lookup_terms(&self, terms: &[String]) -> Result<Vec<TermDefinition>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.build_statement(terms);
        let response = self
            .authorized(self.client.post(&self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Knowledge(format!("Statement request failed: {}", e)))?;

        let (mut body, running) = Self::read_response(response).await?;
        if running {
            let handle = body.statement_handle.clone().ok_or_else(|| {
                AppError::Knowledge("Running statement has no handle".to_string())
            })?;
            body = self.poll_statement(&handle).await?;
        }

        if let Some(message) = &body.message {
            log::debug!("Snowflake: {}", message);
        }

        let definitions = Self::parse_rows(body.data);
        log::info!("Snowflake returned {} term definitions", definitions.len());
        Ok(definitions)
    }

    fn source_name(&self) -> &'static str {
        "snowflake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> SnowflakeService {
        SnowflakeService::new(SnowflakeConfig {
            account: "acct-123".to_string(),
            token: "token".to_string(),
            token_type: "OAUTH".to_string(),
            database: "CLARIMED_DB".to_string(),
            schema: "PUBLIC".to_string(),
            warehouse: "COMPUTE_WH".to_string(),
            role: None,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            service().base_url,
            "https://acct-123.snowflakecomputing.com/api/v2/statements"
        );
    }

    #[test]
    fn test_build_statement() {
        let request = service().build_statement(&["ldl".to_string(), "a_1c".to_string()]);
        assert_eq!(
            request.statement,
            "SELECT term, simple_definition FROM MEDICAL_TERMS \
             WHERE LOWER(term) LIKE ? ESCAPE '!' OR LOWER(term) LIKE ? ESCAPE '!'"
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["bindings"]["1"], json!({"type": "TEXT", "value": "%ldl%"}));
        assert_eq!(value["bindings"]["2"], json!({"type": "TEXT", "value": "%a!_1c%"}));
        assert_eq!(value["warehouse"], "COMPUTE_WH");
        assert!(value.get("role").is_none());
    }

    #[test]
    fn test_parse_rows() {
        let body: StatementResponse = serde_json::from_value(json!({
            "statementHandle": "01b2",
            "message": "Statement executed successfully.",
            "data": [["LDL", "Bad cholesterol"], ["HDL", null], [null, "orphan"]]
        }))
        .unwrap();
        let rows = SnowflakeService::parse_rows(body.data);
        assert_eq!(
            rows,
            vec![
                TermDefinition {
                    term: "LDL".to_string(),
                    definition: "Bad cholesterol".to_string()
                },
                TermDefinition {
                    term: "HDL".to_string(),
                    definition: String::new()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_terms_skip_request() {
        assert!(service().lookup_terms(&[]).await.unwrap().is_empty());
    }
}
