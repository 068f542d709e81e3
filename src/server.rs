use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, info_span, Instrument};

use crate::evaluation::Evaluator;
use crate::ledger::LedgerRecorder;
use crate::scoring::{build_reasoning, decide_verdict};
use crate::types::{DebateRequest, JudgeResponse, ResultRecord};

pub struct Engine {
    pub evaluator: Arc<dyn Evaluator>,
    pub recorder: Arc<LedgerRecorder>,
}

/// Only schema errors (rejected by the `Json` extractor) fail the request;
/// evaluation and ledger failures degrade inside the response.
pub async fn judge(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<DebateRequest>,
) -> Json<JudgeResponse> {
    // Both sides are independent; the ledger step needs both scores.
    let (a, b) = tokio::join!(
        engine.evaluator.evaluate(&req.side_a, &req.topic).instrument(info_span!("evaluate", side = "A")),
        engine.evaluator.evaluate(&req.side_b, &req.topic).instrument(info_span!("evaluate", side = "B")),
    );

    let verdict = decide_verdict(a.score, b.score);
    let reasoning = build_reasoning(&a, &b, verdict);
    info!(side_a_score = a.score, side_b_score = b.score, verdict = %verdict, "debate judged");

    let record = ResultRecord {
        topic: req.topic.clone(),
        side_a_score: a.score,
        side_b_score: b.score,
        verdict: verdict.to_string(),
    };
    let tx = engine.recorder.record(&record).instrument(info_span!("ledger")).await;

    Json(JudgeResponse {
        topic: req.topic,
        side_a_score: a.score,
        side_b_score: b.score,
        verdict: verdict.to_string(),
        reasoning,
        transaction_hash: tx.map(|t| t.to_string()),
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/judge", post(judge))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

pub async fn run_server(engine: Engine, addr: &str) -> anyhow::Result<()> {
    let app = router(Arc::new(engine));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl-C received, shutting down");
        })
        .await?;
    Ok(())
}
