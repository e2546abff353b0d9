//! Price history handlers
//!
//! GET and POST /price-history.

use axum::extract::{Query, State};
use axum::response::Html;
use axum::Json;
use tracing::info;

use crate::error::ApiError;
use crate::models::price_history::{PriceHistoryEntry, PriceHistoryQuery, PriceLookupRequest};
use crate::AppState;

/// GET /price-history
///
/// # Query Parameters
/// - `from`, `to`: inclusive date bounds (YYYY-MM-DD)
/// - `on`: exact date; overrides `from`/`to`
/// - `limit`: number of rows (default 100), `all` for no cap
/// - `asset`: default `btc`
/// - `currency`: `usd` or `inr` to return only that price
///
/// # Response
/// - 200: rows ordered newest first
/// - 400: invalid parameter
/// - 500: database error
pub async fn get_price_history(
    State(state): State<AppState>,
    Query(query): Query<PriceHistoryQuery>,
) -> Result<Json<Vec<PriceHistoryEntry>>, ApiError> {
    let filter = query.validate()?;

    info!(
        asset = %filter.asset,
        dates = ?filter.dates,
        currency = ?filter.currency,
        limit = ?filter.limit,
        "Fetching price history"
    );

    let entries = state.prices.history(&filter).await?;
    Ok(Json(entries))
}

/// POST /price-history
///
/// Body: `{"dates": [...]}` with epoch milliseconds or date strings.
/// Returns every stored point on those dates, regardless of asset.
pub async fn lookup_price_history(
    State(state): State<AppState>,
    Json(request): Json<PriceLookupRequest>,
) -> Result<Json<Vec<PriceHistoryEntry>>, ApiError> {
    let dates = request.validate()?;

    info!(count = dates.len(), "Looking up prices by date");

    let entries = state.prices.lookup(&dates).await?;
    Ok(Json(entries))
}

/// GET /
pub async fn api_index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Price History API</title>
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body { font-family: sans-serif; padding: 4vw; }
        table { border-collapse: collapse; }
        th, td { border: 1px solid currentColor; padding: 0.5rem; }
        code { background-color: #eee; padding: 0.3rem; border-radius: 0.2rem; }
    </style>
</head>
<body>
    <h1>Price History API</h1>
    <h3>Endpoints</h3>
    <ul>
        <li><code>GET <a href="/price-history">/price-history</a></code></li>
        <li><code>POST /price-history</code> with body <code>{"dates": ["2024-01-01", 1704153600000]}</code></li>
    </ul>
    <h3>Query parameters</h3>
    <table>
        <thead>
            <tr><th>Parameter</th><th>Required</th><th>Default</th><th>format | values</th></tr>
        </thead>
        <tbody>
            <tr><td>from</td><td>No</td><td>None</td><td>YYYY-MM-DD</td></tr>
            <tr><td>to</td><td>No</td><td>None</td><td>YYYY-MM-DD</td></tr>
            <tr><td>on</td><td>No</td><td>None</td><td>YYYY-MM-DD (overrides from/to)</td></tr>
            <tr><td>limit</td><td>No</td><td>100</td><td>all | &lt;number&gt;</td></tr>
            <tr><td>asset</td><td>No</td><td>btc</td><td>btc</td></tr>
            <tr><td>currency</td><td>No</td><td>All</td><td>usd | inr</td></tr>
        </tbody>
    </table>
    <h3>Example</h3>
    <p><code>/price-history?from=2020-01-01&amp;to=2020-01-31</code></p>
</body>
</html>
"#;
