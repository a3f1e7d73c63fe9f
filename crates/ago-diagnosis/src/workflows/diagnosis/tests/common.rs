use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;
use url::Url;

use crate::workflows::diagnosis::{
    DiagnosisService, EvaluationMethod, EvaluationSettings, FetchError, FetchedPage, ItemId,
    ItemEvaluator, JudgmentBackend, JudgmentError, PageFetcher, RubricItem,
};
use crate::workflows::rubric::Rubric;

pub(super) const TARGET: &str = "https://example.com/";

pub(super) const OPTIMIZED_PAGE: &str = r#"<!DOCTYPE html>
<html lang="ja">
  <head>
    <title>Example Co. | Handmade leather goods</title>
    <script type="application/ld+json">{"@context": "https://schema.org", "@type": "Organization"}</script>
  </head>
  <body>
    <main>
      <h1>Handmade leather goods</h1>
      <p>We craft wallets and bags in Kyoto.</p>
    </main>
  </body>
</html>"#;

pub(super) const BARE_PAGE: &str = r#"<html>
  <head><title>Untitled</title></head>
  <body><div>Hello</div></body>
</html>"#;

pub(super) fn settings() -> EvaluationSettings {
    EvaluationSettings {
        judgment_timeout: Duration::from_millis(200),
        judgment_concurrency: 2,
        evidence_char_limit: 1000,
    }
}

pub(super) fn evaluator() -> ItemEvaluator {
    ItemEvaluator::new(settings())
}

pub(super) fn item(id: &str, selector: &str, method: &str) -> RubricItem {
    RubricItem {
        id: ItemId::from(id),
        label: format!("{id} check"),
        selector: selector.to_string(),
        method: EvaluationMethod::from_code(method),
        prompt_template: format!("Assess {id} on {{url}}."),
        recommendation_template: Some(format!(
            "Add {id}.|Fix {id}.|Improve {id}.|Refine {id}.|Polish {id}.|Keep {id}."
        )),
    }
}

pub(super) fn structured_data_item() -> RubricItem {
    item("structured_data", r#"script[type="application/ld+json"]"#, "0")
}

pub(super) fn lang_item() -> RubricItem {
    item("html_lang", "html[lang]", "0")
}

pub(super) fn rubric(items: Vec<RubricItem>) -> Arc<Rubric> {
    Arc::new(Rubric::new(items).expect("unique rubric ids"))
}

pub(super) fn build_service<J: JudgmentBackend + 'static>(
    fetcher: StaticFetcher,
    judge: J,
    items: Vec<RubricItem>,
) -> DiagnosisService<StaticFetcher, J> {
    DiagnosisService::new(rubric(items), Arc::new(fetcher), Arc::new(judge), settings())
}

/// Serves a fixed body (or failure) and counts fetches.
pub(super) struct StaticFetcher {
    outcome: Result<String, FetchError>,
    fetches: AtomicUsize,
}

impl StaticFetcher {
    pub(super) fn html(body: &str) -> Self {
        Self {
            outcome: Ok(body.to_string()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub(super) fn failing(error: FetchError) -> Self {
        Self {
            outcome: Err(error),
            fetches: AtomicUsize::new(0),
        }
    }

    pub(super) fn unreachable() -> Self {
        Self::failing(FetchError::Request {
            url: TARGET.to_string(),
            reason: "connection refused".to_string(),
        })
    }

    pub(super) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map(|body| FetchedPage {
            url: url.to_string(),
            status: 200,
            body,
        })
    }
}

/// Replies by the first rule whose needle appears in the prompt; records every prompt.
#[derive(Default)]
pub(super) struct ScriptedJudge {
    rules: Vec<(String, Result<String, JudgmentError>)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    pub(super) fn reply(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(reply.to_string())));
        self
    }

    pub(super) fn fail(mut self, needle: &str, error: JudgmentError) -> Self {
        self.rules.push((needle.to_string(), Err(error)));
        self
    }

    pub(super) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

impl JudgmentBackend for ScriptedJudge {
    async fn complete(&self, prompt: &str) -> Result<String, JudgmentError> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());

        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| Ok("Score: 2\nNo specific observations.".to_string()))
    }
}

/// Never answers within any test timeout.
pub(super) struct StalledJudge;

impl JudgmentBackend for StalledJudge {
    async fn complete(&self, _prompt: &str) -> Result<String, JudgmentError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("Score: 5".to_string())
    }
}

/// Hangs forever and records when its in-flight call is dropped.
#[derive(Default)]
pub(super) struct HangingJudge {
    started: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

impl HangingJudge {
    pub(super) fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub(super) fn dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl JudgmentBackend for HangingJudge {
    async fn complete(&self, _prompt: &str) -> Result<String, JudgmentError> {
        let _guard = SetOnDrop(self.dropped.clone());
        self.started.store(true, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok("Score: 5".to_string())
    }
}

/// Tracks how many calls are in flight at once.
#[derive(Default)]
pub(super) struct CountingJudge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl CountingJudge {
    pub(super) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl JudgmentBackend for CountingJudge {
    async fn complete(&self, _prompt: &str) -> Result<String, JudgmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("Score: 4".to_string())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
