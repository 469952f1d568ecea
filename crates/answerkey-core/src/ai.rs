//! AI-assisted grading with deterministic fallback.
//!
//! A grading request moves `pending -> ai succeeded | ai failed -> fallback
//! computed -> done`. [`AiGrader::try_grade`] exposes the AI tier as a plain
//! `Result`; [`AiGrader::grade`] consumes it and substitutes the
//! deterministic scorer on any error, so callers always get an outcome.
//! There are no retries within a request.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::instrument;

use crate::error::AiGradingError;
use crate::model::{GradingMethod, GradingOutcome, Question, StudentAnswers, Submission};
use crate::scorer;
use crate::traits::{strip_code_fences, GenerateRequest, LlmProvider};

/// Instructions sent with every grading request.
pub const GRADING_INSTRUCTIONS: &str = r#"You are an exam grader. Grade each student answer against its reference answer.

Rules:
- CHOICE questions: award the full weight if the student answer equals the reference answer, ignoring letter case and surrounding whitespace. Otherwise award 0.
- SHORT_ANSWER, LONG_ANSWER and ESSAY questions: award between 0% and 100% of the weight based on correctness, completeness and conceptual understanding compared with the reference answer.
- An empty student answer earns 0.
- Include every question id in both "scores" and "feedback".

Respond with a single JSON object and nothing else, in exactly this shape:
{"scores": {"<question id>": <number>}, "totalScore": <number>, "feedback": {"<question id>": "<one or two sentences>"}}"#;

/// Allowed gap between a reported total and the sum of its scores.
const TOTAL_TOLERANCE: f64 = 1e-6;

/// Configuration for the AI grading adapter.
#[derive(Debug, Clone)]
pub struct AiGraderConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Max tokens for the grading reply.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 for reproducible grading).
    pub temperature: f64,
    /// Replaces [`GRADING_INSTRUCTIONS`] when set.
    pub system_prompt_override: Option<String>,
}

impl Default for AiGraderConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            max_tokens: 2048,
            temperature: 0.0,
            system_prompt_override: None,
        }
    }
}

/// One question as embedded in the grading prompt.
#[derive(Debug, Serialize)]
struct PromptItem<'a> {
    id: &'a str,
    question: &'a str,
    #[serde(rename = "type")]
    question_type: &'static str,
    reference_answer: &'a str,
    weight: f64,
    student_answer: &'a str,
}

/// Grades answers through a hosted model, falling back to [`scorer::grade`].
pub struct AiGrader {
    provider: Arc<dyn LlmProvider>,
    config: AiGraderConfig,
}

impl AiGrader {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AiGraderConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Build the prompt for one student's answers.
    pub fn build_request(
        &self,
        questions: &[Question],
        answers: &StudentAnswers,
        exam_id: &str,
    ) -> Result<GenerateRequest, AiGradingError> {
        let items: Vec<PromptItem<'_>> = questions
            .iter()
            .map(|q| PromptItem {
                id: &q.id,
                question: &q.text,
                question_type: q.question_type.as_str(),
                reference_answer: &q.reference_answer,
                weight: q.weight,
                student_answer: answers.answer_for(&q.id),
            })
            .collect();
        let payload = serde_json::to_string_pretty(&items)?;

        let prompt = format!(
            "Exam: {exam_id}\n\nQuestions with reference answers and the student's answers:\n{payload}\n"
        );

        Ok(GenerateRequest {
            model: self.config.model.clone(),
            prompt,
            system_prompt: Some(
                self.config
                    .system_prompt_override
                    .clone()
                    .unwrap_or_else(|| GRADING_INSTRUCTIONS.to_string()),
            ),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        })
    }

    /// Attempt AI grading only. Never falls back.
    #[instrument(skip(self, questions, answers), fields(provider = %self.provider.name()))]
    pub async fn try_grade(
        &self,
        questions: &[Question],
        answers: &StudentAnswers,
        student_id: &str,
        exam_id: &str,
    ) -> Result<GradingOutcome, AiGradingError> {
        if !self.provider.is_configured() {
            return Err(AiGradingError::MissingCredential(
                self.provider.name().to_string(),
            ));
        }

        let request = self.build_request(questions, answers, exam_id)?;
        let response = self.provider.generate(&request).await?;
        tracing::debug!(
            model = %response.model,
            latency_ms = response.latency_ms,
            "received grading response"
        );

        parse_response(&response.content, questions, student_id, exam_id)
    }

    /// Grade one student. Always returns an outcome.
    ///
    /// Any AI failure is logged and replaced by the deterministic scorer on
    /// the same inputs.
    pub async fn grade(
        &self,
        questions: &[Question],
        answers: &StudentAnswers,
        student_id: &str,
        exam_id: &str,
    ) -> GradingOutcome {
        match self.try_grade(questions, answers, student_id, exam_id).await {
            Ok(outcome) => {
                tracing::info!(student_id, exam_id, total = outcome.total_score, "AI grading succeeded");
                outcome
            }
            Err(AiGradingError::MissingCredential(provider)) => {
                tracing::info!(provider = %provider, "no credential configured, grading deterministically");
                scorer::grade(questions, answers, student_id, exam_id)
            }
            Err(e) => {
                tracing::warn!(
                    student_id,
                    exam_id,
                    kind = e.kind(),
                    "AI grading failed, falling back to deterministic scoring: {e}"
                );
                scorer::grade(questions, answers, student_id, exam_id)
            }
        }
    }

    /// Grade many students concurrently, preserving submission order.
    pub async fn grade_batch(
        &self,
        questions: &[Question],
        submissions: &[Submission],
        exam_id: &str,
        parallelism: usize,
    ) -> Vec<GradingOutcome> {
        let semaphore = Semaphore::new(parallelism.max(1));
        let mut futures = FuturesUnordered::new();

        for (index, submission) in submissions.iter().enumerate() {
            let semaphore = &semaphore;
            futures.push(async move {
                // The semaphore is owned here and never closed.
                let _permit = semaphore.acquire().await.ok();
                let outcome = self
                    .grade(questions, &submission.answers, &submission.student_id, exam_id)
                    .await;
                (index, outcome)
            });
        }

        let mut graded = Vec::with_capacity(submissions.len());
        while let Some(item) = futures.next().await {
            graded.push(item);
        }
        graded.sort_by_key(|(index, _)| *index);
        graded.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

fn numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Parse a model reply into an outcome for `questions`.
///
/// The reply may be wrapped in code fences. A `scores` object is required
/// and must score at least one question; questions it omits (or scores with
/// a non-number) get 0.0. Scores are clamped to `[0, weight]`. The total is
/// always the sum of the per-question scores; a diverging reported total is
/// logged and corrected.
pub fn parse_response(
    content: &str,
    questions: &[Question],
    student_id: &str,
    exam_id: &str,
) -> Result<GradingOutcome, AiGradingError> {
    let body = strip_code_fences(content);
    let parsed: Value = serde_json::from_str(&body)?;
    let object = parsed
        .as_object()
        .ok_or_else(|| AiGradingError::Schema("response is not a JSON object".into()))?;

    let scores = object
        .get("scores")
        .and_then(Value::as_object)
        .ok_or_else(|| AiGradingError::Schema("missing 'scores' object".into()))?;

    let mut per_question_score = BTreeMap::new();
    let mut missing = Vec::new();
    for question in questions {
        match scores.get(&question.id).and_then(numeric) {
            Some(score) => {
                let clamped = score.clamp(0.0, question.weight.max(0.0));
                if clamped != score {
                    tracing::debug!(question_id = %question.id, score, clamped, "clamped AI score");
                }
                per_question_score.insert(question.id.clone(), clamped);
            }
            None => {
                missing.push(question.id.as_str());
                per_question_score.insert(question.id.clone(), 0.0);
            }
        }
    }

    if !questions.is_empty() && missing.len() == questions.len() {
        return Err(AiGradingError::Schema(
            "no usable score for any question".into(),
        ));
    }
    if !missing.is_empty() {
        tracing::warn!(?missing, "AI response omitted scores, defaulting them to 0.0");
    }

    let feedback: BTreeMap<String, String> = object
        .get("feedback")
        .and_then(Value::as_object)
        .map(|fb| {
            questions
                .iter()
                .filter_map(|q| {
                    let text = match fb.get(&q.id)? {
                        Value::String(s) => s.clone(),
                        Value::Null => return None,
                        other => other.to_string(),
                    };
                    Some((q.id.clone(), text))
                })
                .collect()
        })
        .unwrap_or_default();

    let mut outcome = GradingOutcome {
        student_id: student_id.to_string(),
        exam_id: exam_id.to_string(),
        per_question_score,
        total_score: 0.0,
        feedback,
        method: GradingMethod::Ai,
    };
    outcome.recompute_total();

    let reported = ["totalScore", "total_score", "total"]
        .iter()
        .find_map(|key| object.get(*key).and_then(numeric));
    if let Some(reported) = reported {
        if (reported - outcome.total_score).abs() > TOTAL_TOLERANCE {
            tracing::warn!(
                reported,
                computed = outcome.total_score,
                "AI-reported total diverges from per-question scores, using computed total"
            );
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::error::ProviderError;
    use crate::model::QuestionType;
    use crate::traits::GenerateResponse;

    enum Reply {
        Text(String),
        NetworkFailure,
    }

    struct StubProvider {
        configured: bool,
        reply: Reply,
        calls: AtomicU32,
    }

    impl StubProvider {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                configured: true,
                reply: Reply::Text(text.to_string()),
                calls: AtomicU32::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                configured: true,
                reply: Reply::NetworkFailure,
                calls: AtomicU32::new(0),
            })
        }

        fn unconfigured() -> Arc<Self> {
            Arc::new(Self {
                configured: false,
                reply: Reply::Text("{}".into()),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate(
            &self,
            request: &GenerateRequest,
        ) -> Result<GenerateResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Text(text) => Ok(GenerateResponse {
                    content: text.clone(),
                    model: request.model.clone(),
                    latency_ms: 1,
                }),
                Reply::NetworkFailure => {
                    Err(ProviderError::NetworkError("connection reset".into()))
                }
            }
        }
    }

    fn exam() -> Vec<Question> {
        vec![
            Question {
                id: "q1".into(),
                text: "What is the capital of Indonesia?".into(),
                question_type: QuestionType::Choice,
                options: vec!["Jakarta".into(), "Bandung".into()],
                reference_answer: "Jakarta".into(),
                weight: 10.0,
                explanation: None,
            },
            Question {
                id: "q2".into(),
                text: "Explain photosynthesis.".into(),
                question_type: QuestionType::Essay,
                options: vec![],
                reference_answer: "Plants convert light energy into chemical energy".into(),
                weight: 30.0,
                explanation: None,
            },
        ]
    }

    fn answers() -> StudentAnswers {
        [("q1", "jakarta"), ("q2", "plants turn light into energy")]
            .into_iter()
            .collect()
    }

    fn grader(provider: Arc<StubProvider>) -> AiGrader {
        AiGrader::new(provider, AiGraderConfig::default())
    }

    #[tokio::test]
    async fn missing_credential_matches_deterministic_scorer() {
        let provider = StubProvider::unconfigured();
        let grader = grader(provider.clone());
        let questions = exam();

        let outcome = grader.grade(&questions, &answers(), "s-1", "geo").await;
        let expected = scorer::grade(&questions, &answers(), "s-1", "geo");

        assert_eq!(outcome, expected);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let err = grader
            .try_grade(&questions, &answers(), "s-1", "geo")
            .await
            .unwrap_err();
        assert!(matches!(err, AiGradingError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn transport_failure_falls_back() {
        let provider = StubProvider::failing();
        let grader = grader(provider.clone());
        let questions = exam();

        let outcome = grader.grade(&questions, &answers(), "s-1", "geo").await;
        assert_eq!(outcome, scorer::grade(&questions, &answers(), "s-1", "geo"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_json_falls_back() {
        let grader = grader(StubProvider::replying("Sorry, I cannot grade this."));
        let questions = exam();

        let err = grader
            .try_grade(&questions, &answers(), "s-1", "geo")
            .await
            .unwrap_err();
        assert!(matches!(err, AiGradingError::MalformedJson(_)));

        let outcome = grader.grade(&questions, &answers(), "s-1", "geo").await;
        assert_eq!(outcome.method, GradingMethod::Deterministic);
    }

    #[tokio::test]
    async fn fenced_response_is_accepted() {
        let reply = r#"```json
{"scores": {"q1": 10, "q2": 21.5}, "totalScore": 31.5, "feedback": {"q1": "Correct.", "q2": "Mentions light but not chemical energy."}}
```"#;
        let grader = grader(StubProvider::replying(reply));

        let outcome = grader.grade(&exam(), &answers(), "s-1", "geo").await;
        assert_eq!(outcome.method, GradingMethod::Ai);
        assert_eq!(outcome.score_for("q1"), 10.0);
        assert_eq!(outcome.score_for("q2"), 21.5);
        assert_eq!(outcome.total_score, 31.5);
        assert_eq!(outcome.feedback["q1"], "Correct.");
    }

    #[test]
    fn omitted_question_defaults_to_zero() {
        let reply = r#"{"scores": {"q1": 10}, "totalScore": 10}"#;
        let outcome = parse_response(reply, &exam(), "s-1", "geo").unwrap();
        assert_eq!(outcome.per_question_score.len(), 2);
        assert_eq!(outcome.score_for("q2"), 0.0);
        assert_eq!(outcome.total_score, 10.0);
        assert!(outcome.feedback.is_empty());
    }

    #[test]
    fn missing_scores_object_is_schema_error() {
        let err = parse_response(r#"{"totalScore": 40}"#, &exam(), "s", "e").unwrap_err();
        assert!(matches!(err, AiGradingError::Schema(_)));

        let err = parse_response("[1, 2, 3]", &exam(), "s", "e").unwrap_err();
        assert!(matches!(err, AiGradingError::Schema(_)));
    }

    #[test]
    fn scores_for_unknown_ids_only_is_schema_error() {
        let err =
            parse_response(r#"{"scores": {"x9": 5}}"#, &exam(), "s", "e").unwrap_err();
        assert!(matches!(err, AiGradingError::Schema(_)));
    }

    #[test]
    fn diverging_total_is_corrected() {
        let reply = r#"{"scores": {"q1": 10, "q2": 15}, "totalScore": 99}"#;
        let outcome = parse_response(reply, &exam(), "s", "e").unwrap();
        assert_eq!(outcome.total_score, 25.0);
    }

    #[test]
    fn scores_are_clamped_and_numeric_strings_accepted() {
        let reply = r#"{"scores": {"q1": "10", "q2": 45}, "totalScore": 55}"#;
        let outcome = parse_response(reply, &exam(), "s", "e").unwrap();
        assert_eq!(outcome.score_for("q1"), 10.0);
        assert_eq!(outcome.score_for("q2"), 30.0);

        let reply = r#"{"scores": {"q1": -3, "q2": "lots"}}"#;
        let outcome = parse_response(reply, &exam(), "s", "e").unwrap();
        assert_eq!(outcome.score_for("q1"), 0.0);
        assert_eq!(outcome.score_for("q2"), 0.0);
    }

    #[test]
    fn request_embeds_every_question_and_answer() {
        let grader = grader(StubProvider::unconfigured());
        let only_first: StudentAnswers = [("q1", "Bandung")].into_iter().collect();

        let request = grader.build_request(&exam(), &only_first, "geo").unwrap();
        assert!(request.prompt.contains("\"id\": \"q1\""));
        assert!(request.prompt.contains("\"id\": \"q2\""));
        assert!(request.prompt.contains("\"type\": \"ESSAY\""));
        assert!(request.prompt.contains("\"student_answer\": \"Bandung\""));
        assert!(request.prompt.contains("\"student_answer\": \"\""));
        assert!(request.prompt.contains("\"weight\": 30.0"));
        assert_eq!(request.system_prompt.as_deref(), Some(GRADING_INSTRUCTIONS));
        assert_eq!(request.temperature, 0.0);
    }

    #[tokio::test]
    async fn batch_preserves_submission_order() {
        let provider = StubProvider::failing();
        let grader = grader(provider.clone());
        let questions = exam();
        let submissions: Vec<Submission> = (0..5)
            .map(|i| Submission {
                student_id: format!("s-{i}"),
                answers: answers(),
            })
            .collect();

        let outcomes = grader.grade_batch(&questions, &submissions, "geo", 2).await;
        assert_eq!(outcomes.len(), 5);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.student_id, format!("s-{i}"));
            assert_eq!(outcome.method, GradingMethod::Deterministic);
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
    }
}
