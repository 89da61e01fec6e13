use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::PoolError;
use crate::pool::PoolEngine;
use crate::results::{ResultsOptions, Scope};
use crate::scoring::ScoreMode;
use crate::tournament::MatchId;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PoolEngine>,
}

/// Build the Axum router for the read-only results dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/results", get(results_handler))
        .route("/api/results/playoff", get(playoff_results_handler))
        .route("/api/results/full", get(full_results_handler))
        .route("/api/matches/upcoming", get(upcoming_handler))
        .route("/api/matches/:id/predictions", get(match_predictions_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Unknown matches are 404, everything else is a server error.
fn api_error(err: anyhow::Error) -> (StatusCode, String) {
    match err.downcast_ref::<PoolError>() {
        Some(PoolError::UnknownMatch(_)) => (StatusCode::NOT_FOUND, err.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err)),
    }
}

/// Serve the dashboard page, tagged with the scoring mode.
async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mode = match state.engine.policy().score_mode {
        ScoreMode::Default => "default",
        ScoreMode::Fsnorm => "fsnorm",
    };
    Html(DASHBOARD_HTML.replace("<body>", &format!(r#"<body data-mode="{}">"#, mode)))
}

fn results_with(
    state: &AppState,
    options: ResultsOptions,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .engine
        .results(Utc::now(), options)
        .map(Json)
        .map_err(api_error)
}

/// GET /api/results
async fn results_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    results_with(&state, ResultsOptions::default())
}

/// GET /api/results/playoff
async fn playoff_results_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    results_with(
        &state,
        ResultsOptions {
            scope: Scope::PlayoffOnly,
            verbose: false,
        },
    )
}

/// GET /api/results/full
async fn full_results_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    results_with(
        &state,
        ResultsOptions {
            scope: Scope::All,
            verbose: true,
        },
    )
}

/// GET /api/matches/upcoming
async fn upcoming_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.upcoming_matches(Utc::now()))
}

/// GET /api/matches/:id/predictions
async fn match_predictions_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let match_id = MatchId::from(id.as_str());
    state
        .engine
        .match_predictions(&match_id, Utc::now())
        .map(Json)
        .map_err(api_error)
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Prediction Pool</title>
<style>
  :root {
    --bg: #0f1117;
    --card: #1a1d27;
    --border: #2a2d3a;
    --accent: #6c63ff;
    --green: #00c896;
    --gold: #ffc857;
    --text: #e0e0e0;
    --muted: #8888aa;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  .badge { padding: .2rem .6rem; border-radius: 4px; font-size: .75rem; font-weight: 700; text-transform: uppercase; background: var(--accent); color: #fff; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: auto; }
  .panel-header { padding: .9rem 1.2rem; border-bottom: 1px solid var(--border); font-weight: 600; display: flex; justify-content: space-between; align-items: center; }
  table { width: 100%; border-collapse: collapse; }
  th { padding: .7rem 1rem; text-align: left; font-size: .75rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); white-space: nowrap; }
  td { padding: .65rem 1rem; font-size: .88rem; border-bottom: 1px solid #1e2130; white-space: nowrap; }
  tr:last-child td { border-bottom: none; }
  td.exact { color: var(--green); font-weight: 700; }
  td.score { font-weight: 700; }
  .queen { color: var(--gold); }
  .empty { color: var(--muted); text-align: center; padding: 2rem; font-size: .9rem; }
  .refresh-btn { background: none; border: 1px solid var(--border); color: var(--muted); padding: .3rem .8rem; border-radius: 6px; cursor: pointer; font-size: .8rem; }
  .refresh-btn:hover { border-color: var(--accent); color: var(--accent); }
</style>
</head>
<body>
<header>
  <h1>⚽ Prediction Pool</h1>
  <span class="badge" id="mode-badge">…</span>
  <span style="margin-left:auto;color:var(--muted);font-size:.8rem;" id="last-updated"></span>
</header>

<main>
  <div class="panel">
    <div class="panel-header">Leaderboard <button class="refresh-btn" onclick="loadAll()">↻ Refresh</button></div>
    <table>
      <thead id="results-thead"></thead>
      <tbody id="results-tbody"><tr><td class="empty">Loading…</td></tr></tbody>
    </table>
  </div>

  <div class="panel">
    <div class="panel-header">Open for Betting</div>
    <table>
      <thead><tr><th>Round</th><th>Match</th><th>Kick-off</th></tr></thead>
      <tbody id="upcoming-tbody"><tr><td colspan="3" class="empty">Loading…</td></tr></tbody>
    </table>
  </div>
</main>

<script>
const esc = v => String(v ?? '').replace(/[&<>"']/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}[c]));
const fmtScore = s => s == null ? '' : (Number.isInteger(s) ? s : s.toFixed(2));

async function loadResults() {
  const r = await fetch('/api/results');
  if (!r.ok) return;
  const table = await r.json();
  const thead = document.getElementById('results-thead');
  const tbody = document.getElementById('results-tbody');
  thead.innerHTML = '<tr><th>#</th><th>Player</th><th>Score</th><th>Exact</th>' +
    table.matches.map(m => `<th title="${esc(m.label)}">${esc(m.round)} ${esc(m.short_label)}<br>${esc(m.result)}</th>`).join('') +
    '</tr>';
  const players = Object.values(table.players);
  if (!players.length) {
    tbody.innerHTML = '<tr><td class="empty">No players yet</td></tr>';
    return;
  }
  tbody.innerHTML = players.map((p, i) => `<tr>
    <td>${i + 1}</td>
    <td class="${p.is_queen ? 'queen' : ''}">${p.is_queen ? '👑 ' : ''}${esc(p.name)}</td>
    <td class="score">${fmtScore(p.score)}</td>
    <td>${esc(p.exact_score)}</td>
    ${p.predictions.map(e => `<td class="${e.is_exact_score ? 'exact' : ''}">${esc(e.result)} <small>${fmtScore(e.score)}</small></td>`).join('')}
  </tr>`).join('');
}

async function loadUpcoming() {
  const r = await fetch('/api/matches/upcoming');
  if (!r.ok) return;
  const matches = await r.json();
  const tbody = document.getElementById('upcoming-tbody');
  if (!matches.length) { tbody.innerHTML = '<tr><td colspan="3" class="empty">Nothing open</td></tr>'; return; }
  tbody.innerHTML = matches.map(m => `<tr>
    <td>${esc(m.round)}</td>
    <td>${esc(m.label)}</td>
    <td>${esc(m.time)}</td>
  </tr>`).join('');
}

async function loadAll() {
  await Promise.all([loadResults(), loadUpcoming()]);
  document.getElementById('last-updated').textContent = 'Updated ' + new Date().toLocaleTimeString();
}

document.getElementById('mode-badge').textContent = document.body.dataset.mode || 'default';
loadAll();
setInterval(loadAll, 60000);
</script>
</body>
</html>"#;
