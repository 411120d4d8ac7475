//! # debateClaim
//!
//! Takes a user's claim and the topical categories it belongs to, and asks
//! the model for two opposing single-turn arguments: an Advocate making the
//! strongest case for the claim and a Skeptic pushing back with evidence.

use crate::backend::StructuredBackend;
use crate::error::{invalid_field, Error, Result};
use crate::registry::{Flow, FlowDescriptor};
use crate::retry::{self, RetryPolicy};
use crate::schema::{OutputSchema, TextField};
use crate::validate::validate_debate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Registered name of the flow
pub const DEBATE_CLAIM_FLOW: &str = "debateClaim";

// ============================================================================
// Request
// ============================================================================

/// Topical category a claim belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Finance,
    Fitness,
    Career,
    Relationships,
    #[serde(rename = "Famous Personas")]
    FamousPersonas,
    History,
    Medicine,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Finance,
        Category::Fitness,
        Category::Career,
        Category::Relationships,
        Category::FamousPersonas,
        Category::History,
        Category::Medicine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Finance => "Finance",
            Category::Fitness => "Fitness",
            Category::Career => "Career",
            Category::Relationships => "Relationships",
            Category::FamousPersonas => "Famous Personas",
            Category::History => "History",
            Category::Medicine => "Medicine",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Case-insensitive; `-` and `_` stand in for the space in "Famous Personas"
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace(['-', '_'], " ");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| {
                invalid_field("categories", format!("unknown category '{}'", s.trim()))
            })
    }
}

/// Wire shape of a request before its constraints are checked
#[derive(Debug, Clone, Deserialize)]
pub struct DebateRequestInput {
    pub claim: String,
    #[serde(alias = "verticals")]
    pub categories: Vec<Category>,
}

/// A claim plus the non-empty set of categories it is debated in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DebateRequestInput")]
pub struct DebateRequest {
    claim: String,
    categories: Vec<Category>,
}

impl DebateRequest {
    /// Build a request. The claim must contain non-whitespace text and at
    /// least one category is required; repeated categories are dropped.
    pub fn new(claim: impl Into<String>, categories: impl IntoIterator<Item = Category>) -> Result<Self> {
        let claim = claim.into();
        if claim.trim().is_empty() {
            return Err(invalid_field("claim", "claim must not be empty")
                .with_operation("debate::new_request"));
        }

        let mut unique = Vec::new();
        for category in categories {
            if !unique.contains(&category) {
                unique.push(category);
            }
        }
        if unique.is_empty() {
            return Err(invalid_field("categories", "at least one category is required")
                .with_operation("debate::new_request"));
        }

        Ok(Self {
            claim,
            categories: unique,
        })
    }

    pub fn claim(&self) -> &str {
        &self.claim
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn render_prompt(&self) -> Prompt {
        let context = self
            .categories
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let system = "You moderate a debate between an Advocate and a Skeptic about a claim a user \
                      has made. The Advocate argues in favor of the claim. The Skeptic raises \
                      concerns, counter-arguments and evidence-backed pushback. The goal is a \
                      balanced perspective that helps the user evaluate the claim critically."
            .to_string();

        let user = format!(
            "The claim was made in the context of {context}.\n\n\
             Claim: {claim}\n\n\
             Write the Advocate's argument and the Skeptic's argument separately. Each side \
             gets exactly one turn. Do not include the speaker's name (such as \"Advocate:\") \
             in the text itself.",
            context = context,
            claim = self.claim.trim(),
        );

        Prompt { system, user }
    }
}

impl TryFrom<DebateRequestInput> for DebateRequest {
    type Error = Error;

    fn try_from(raw: DebateRequestInput) -> Result<Self> {
        DebateRequest::new(raw.claim, raw.categories)
    }
}

/// Rendered instruction for the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

// ============================================================================
// Response
// ============================================================================

/// Two validated, trimmed, non-empty argument texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateResponse {
    pub advocate_text: String,
    pub skeptic_text: String,
}

/// Backend output before validation; either field may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateCandidate {
    #[serde(default)]
    pub advocate_text: Option<String>,
    #[serde(default)]
    pub skeptic_text: Option<String>,
}

impl DebateCandidate {
    /// Decode the backend's JSON. Wrong types are a parse failure; missing
    /// fields are left for validation to report.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::parse_failed(format!(
                "expected a JSON object from the model, got {}",
                json_type(&value)
            ))
            .with_operation("debate::decode"));
        }
        serde_json::from_value(value).map_err(|e| {
            Error::parse_failed(format!("model output has the wrong shape: {}", e))
                .with_operation("debate::decode")
                .set_source(e)
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Flow
// ============================================================================

fn claim_output_schema() -> OutputSchema {
    OutputSchema::new(
        "debate_claim",
        vec![
            TextField::new(
                "advocateText",
                "The Advocate's arguments, presenting a strong case in favor of the user's claim.",
            ),
            TextField::new(
                "skepticText",
                "The Skeptic's arguments, providing evidence-backed pushback and challenging the user's claim.",
            ),
        ],
    )
}

pub struct DebateClaimFlow<B> {
    backend: B,
    policy: RetryPolicy,
    schema: OutputSchema,
}

impl<B: StructuredBackend> DebateClaimFlow<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            policy: RetryPolicy::default(),
            schema: Self::output_schema(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn output_schema() -> OutputSchema {
        claim_output_schema()
    }

    /// Ask for both sides of the debate, retrying until the reply is complete.
    ///
    /// # Errors
    ///
    /// `RetryExhausted` once every attempt has failed, carrying the last
    /// failure's message and the attempt count.
    pub async fn debate_claim(&self, request: &DebateRequest) -> Result<DebateResponse> {
        self.debate_claim_with_cancel(request, &CancellationToken::new()).await
    }

    /// Like [`debate_claim`](Self::debate_claim), but returns `Cancelled`
    /// as soon as `cancel` fires, even mid-backoff.
    pub async fn debate_claim_with_cancel(
        &self,
        request: &DebateRequest,
        cancel: &CancellationToken,
    ) -> Result<DebateResponse> {
        let prompt = request.render_prompt();
        let prompt = &prompt;

        retry::run(&self.policy, cancel, "debate::debate_claim", |attempt| async move {
            debug!(attempt, flow = DEBATE_CLAIM_FLOW, "invoking backend");
            let raw = self.backend.invoke(prompt, &self.schema).await?;
            let candidate = DebateCandidate::from_value(raw)?;
            validate_debate(&candidate).into_result("debate::validate")
        })
        .await
    }
}

fn input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "claim": {
                "type": "string",
                "description": "The claim made by the user.",
            },
            "categories": {
                "type": "array",
                "description": "The categories to which the claim belongs.",
                "items": {
                    "type": "string",
                    "enum": Category::ALL.iter().map(Category::as_str).collect::<Vec<_>>(),
                },
                "minItems": 1,
            },
        },
        "required": ["claim", "categories"],
    })
}

/// Descriptor of `debateClaim`; needs no backend
pub fn descriptor() -> FlowDescriptor {
    FlowDescriptor {
        name: DEBATE_CLAIM_FLOW,
        description: "Generate an Advocate and a Skeptic argument about a user's claim",
        input_schema: input_schema(),
        output_schema: claim_output_schema().to_json_schema(),
    }
}

#[async_trait]
impl<B: StructuredBackend + 'static> Flow for DebateClaimFlow<B> {
    fn descriptor(&self) -> FlowDescriptor {
        descriptor()
    }

    async fn run(&self, input: Value, cancel: &CancellationToken) -> Result<Value> {
        let raw: DebateRequestInput = serde_json::from_value(input)
            .map_err(|e| crate::error::bad_flow_input(DEBATE_CLAIM_FLOW, e))?;
        let request = DebateRequest::try_from(raw)?;

        let response = self.debate_claim_with_cancel(&request, cancel).await?;
        serde_json::to_value(&response).map_err(|e| {
            Error::serialization_failed(format!("failed to encode debate response: {}", e))
                .with_operation("debate::run")
                .set_source(e)
        })
    }
}
