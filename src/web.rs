//! Search page plus previous/next day navigation.
//!
//! Each successful lookup may also feed the rolling history and redraw the
//! panel; which route does what is pinned by the tests below.

use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, Redirect},
    routing::get,
};
use chrono::NaiveDate;
use log::info;
use serde::Deserialize;

use crate::{
    config::AppConfig,
    data::{
        history::{HISTORY_CAPACITY, RollingHistory, SharedHistory},
        quote::Quote,
    },
    display::{self, SharedDisplay},
    ds::QuoteSource,
    error::{QbError, QbResult},
    utils::{
        datetime::{date_from_str, date_to_compact_str, days_after, days_before, today},
        net::path_with_query,
        text::is_blank,
    },
};

pub mod view;

/// Offset of the search and reference dates from today.
pub static SEARCH_DAYS_BACK: u64 = 3;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn QuoteSource>,
    pub history: SharedHistory,
    pub display: SharedDisplay,
    pub uniform_eviction: bool,
    /// Overrides the local calendar date.
    pub fixed_today: Option<NaiveDate>,
}

/// Everything the page shows for one navigation step.
#[derive(Clone, Debug, PartialEq)]
pub struct PageData {
    pub stock_name: String,
    pub date: NaiveDate,
    pub quotes: Vec<Quote>,
    pub secondary_date: NaiveDate,
    pub secondary_quotes: Vec<Quote>,
}

#[derive(Deserialize)]
struct SearchForm {
    stock_name: String,
}

#[derive(Deserialize)]
struct NavigationQuery {
    stock_name: Option<String>,
    stock_date: Option<String>,
}

enum HistoryUpdate {
    Unconditional,
    WithEviction,
}

impl AppState {
    pub fn new(source: Arc<dyn QuoteSource>, display: SharedDisplay, config: &AppConfig) -> Self {
        Self {
            source,
            history: RollingHistory::shared(),
            display,
            uniform_eviction: config.uniform_eviction,
            fixed_today: None,
        }
    }

    fn today(&self) -> NaiveDate {
        self.fixed_today.unwrap_or_else(today)
    }

    fn secondary_date(&self) -> QbResult<NaiveDate> {
        days_before(&self.today(), SEARCH_DAYS_BACK)
    }

    async fn record(&self, quote: &Quote, update: HistoryUpdate, max_lines: usize) -> QbResult<()> {
        let date = date_to_compact_str(&quote.date);

        let mut history = self.history.lock().await;
        match update {
            HistoryUpdate::Unconditional => history.append_unconditional(&date, &quote.close_price),
            HistoryUpdate::WithEviction => history.append_with_eviction(&date, &quote.close_price),
        }
        info!(
            "Recorded {date} : {} ({} in history)",
            quote.close_price,
            history.len()
        );

        // Take the panel before releasing the history so frames land in order.
        let device = self.display.clone().lock_owned().await;
        let frame = history.clone();
        drop(history);

        display::render_lines_blocking(device, frame, max_lines).await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home).post(home_submit))
        .route("/search_results", get(search_results))
        .route("/prev", get(prev_page))
        .route("/next", get(next_page))
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> QbResult<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Looks up today - 3 days and shows the first history slot on the panel.
pub async fn search(state: &AppState, stock_name: &str) -> QbResult<PageData> {
    let date = days_before(&state.today(), SEARCH_DAYS_BACK)?;
    let secondary_date = state.secondary_date()?;

    let quotes = state.source.fetch_quote(stock_name, &date).await;
    let secondary_quotes = state.source.fetch_quote(stock_name, &secondary_date).await;

    if let Some(quote) = quotes.first() {
        let update = if state.uniform_eviction {
            HistoryUpdate::WithEviction
        } else {
            HistoryUpdate::Unconditional
        };
        state.record(quote, update, 1).await?;
    }

    Ok(PageData {
        stock_name: stock_name.to_string(),
        date,
        quotes,
        secondary_date,
        secondary_quotes,
    })
}

/// Steps back one day from `reference_date`; a hit rolls into the history.
pub async fn previous(
    state: &AppState,
    stock_name: &str,
    reference_date: &NaiveDate,
) -> QbResult<PageData> {
    let date = days_before(reference_date, 1)?;
    let secondary_date = state.secondary_date()?;

    let quotes = state.source.fetch_quote(stock_name, &date).await;
    let secondary_quotes = state.source.fetch_quote(stock_name, &secondary_date).await;

    if let Some(quote) = quotes.first() {
        state
            .record(quote, HistoryUpdate::WithEviction, HISTORY_CAPACITY)
            .await?;
    }

    Ok(PageData {
        stock_name: stock_name.to_string(),
        date,
        quotes,
        secondary_date,
        secondary_quotes,
    })
}

/// Steps forward one day. Never touches the history or the panel.
pub async fn next(
    state: &AppState,
    stock_name: &str,
    reference_date: &NaiveDate,
) -> QbResult<PageData> {
    let date = days_after(reference_date, 1)?;
    let secondary_date = state.secondary_date()?;

    let quotes = state.source.fetch_quote(stock_name, &date).await;
    let secondary_quotes = state.source.fetch_quote(stock_name, &secondary_date).await;

    Ok(PageData {
        stock_name: stock_name.to_string(),
        date,
        quotes,
        secondary_date,
        secondary_quotes,
    })
}

async fn home() -> Html<String> {
    Html(view::render_page(None))
}

async fn home_submit(Form(form): Form<SearchForm>) -> Redirect {
    Redirect::to(&path_with_query(
        "/search_results",
        &[("stock_name", &form.stock_name)],
    ))
}

async fn search_results(
    State(state): State<AppState>,
    Query(query): Query<NavigationQuery>,
) -> QbResult<Html<String>> {
    let stock_name = query.stock_name()?;
    let page = search(&state, stock_name).await?;

    Ok(Html(view::render_page(Some(&page))))
}

async fn prev_page(
    State(state): State<AppState>,
    Query(query): Query<NavigationQuery>,
) -> QbResult<Html<String>> {
    let stock_name = query.stock_name()?;
    let reference_date = query.stock_date()?;
    let page = previous(&state, stock_name, &reference_date).await?;

    Ok(Html(view::render_page(Some(&page))))
}

async fn next_page(
    State(state): State<AppState>,
    Query(query): Query<NavigationQuery>,
) -> QbResult<Html<String>> {
    let stock_name = query.stock_name()?;
    let reference_date = query.stock_date()?;
    let page = next(&state, stock_name, &reference_date).await?;

    Ok(Html(view::render_page(Some(&page))))
}

impl NavigationQuery {
    fn stock_name(&self) -> QbResult<&str> {
        match &self.stock_name {
            Some(stock_name) if !is_blank(stock_name) => Ok(stock_name),
            _ => Err(QbError::Invalid {
                code: "MISSING_STOCK_NAME",
                message: "stock_name is required".to_string(),
            }),
        }
    }

    fn stock_date(&self) -> QbResult<NaiveDate> {
        match &self.stock_date {
            Some(stock_date) => date_from_str(stock_date),
            None => Err(QbError::Invalid {
                code: "MISSING_STOCK_DATE",
                message: "stock_date is required".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::display::tests::{DisplayOp, RecordingDisplay};

    /// Serves canned quotes and records every lookup.
    #[derive(Default)]
    struct FakeSource {
        quotes: HashMap<NaiveDate, Quote>,
        calls: Mutex<Vec<(String, NaiveDate)>>,
    }

    impl FakeSource {
        fn with_prices(prices: &[(NaiveDate, &str)]) -> Self {
            Self {
                quotes: prices
                    .iter()
                    .map(|(date, price)| (*date, quote("NAVER", date, price)))
                    .collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(String, NaiveDate)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuoteSource for FakeSource {
        async fn fetch_quote(&self, stock_name: &str, date: &NaiveDate) -> Vec<Quote> {
            self.calls
                .lock()
                .unwrap()
                .push((stock_name.to_string(), *date));

            self.quotes
                .get(date)
                .filter(|quote| quote.stock_name == stock_name)
                .cloned()
                .into_iter()
                .collect()
        }
    }

    fn quote(stock_name: &str, date: &NaiveDate, close_price: &str) -> Quote {
        Quote {
            stock_name: stock_name.to_string(),
            close_price: close_price.to_string(),
            change_amount: "0".to_string(),
            change_rate: "0.00".to_string(),
            high_price: close_price.to_string(),
            low_price: close_price.to_string(),
            date: *date,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Today is fixed so that a search looks up 2024-01-01.
    fn state_with(source: Arc<FakeSource>, display: RecordingDisplay) -> AppState {
        let mut state = AppState::new(
            source,
            display::shared(Box::new(display)),
            &AppConfig::default(),
        );
        state.fixed_today = Some(ymd(2024, 1, 4));
        state
    }

    async fn history_of(state: &AppState) -> Vec<(String, String)> {
        state.history.lock().await.snapshot()
    }

    fn pair(date: &str, price: &str) -> (String, String) {
        (date.to_string(), price.to_string())
    }

    #[tokio::test]
    async fn test_search_records_first_slot() {
        let source = Arc::new(FakeSource::with_prices(&[(ymd(2024, 1, 1), "1000")]));
        let display = RecordingDisplay::default();
        let state = state_with(source.clone(), display.clone());

        let page = search(&state, "NAVER").await.unwrap();

        assert_eq!(page.date, ymd(2024, 1, 1));
        assert_eq!(page.quotes.len(), 1);
        assert_eq!(page.secondary_quotes, page.quotes);
        assert_eq!(history_of(&state).await, vec![pair("20240101", "1000")]);
        assert_eq!(
            display.ops(),
            vec![
                DisplayOp::Clear,
                DisplayOp::Text(0, 0, "20240101 : 1000".to_string()),
                DisplayOp::Present,
            ]
        );
        assert_eq!(
            source.calls(),
            vec![
                ("NAVER".to_string(), ymd(2024, 1, 1)),
                ("NAVER".to_string(), ymd(2024, 1, 1)),
            ]
        );
    }

    #[tokio::test]
    async fn test_search_without_quote_changes_nothing() {
        let source = Arc::new(FakeSource::default());
        let display = RecordingDisplay::default();
        let state = state_with(source, display.clone());

        let page = search(&state, "NAVER").await.unwrap();

        assert!(page.quotes.is_empty());
        assert!(page.secondary_quotes.is_empty());
        assert!(history_of(&state).await.is_empty());
        assert!(display.ops().is_empty());
    }

    #[tokio::test]
    async fn test_search_appends_without_capacity_check() {
        let source = Arc::new(FakeSource::with_prices(&[(ymd(2024, 1, 1), "1000")]));
        let display = RecordingDisplay::default();
        let state = state_with(source, display.clone());

        for _ in 0..HISTORY_CAPACITY + 2 {
            search(&state, "NAVER").await.unwrap();
        }

        assert_eq!(history_of(&state).await.len(), HISTORY_CAPACITY + 2);
        let drawn = display
            .ops()
            .into_iter()
            .filter(|op| matches!(op, DisplayOp::Text(..)))
            .count();
        assert_eq!(drawn, HISTORY_CAPACITY + 2);
    }

    #[tokio::test]
    async fn test_search_with_uniform_eviction_is_capped() {
        let source = Arc::new(FakeSource::with_prices(&[(ymd(2024, 1, 1), "1000")]));
        let mut state = state_with(source, RecordingDisplay::default());
        state.uniform_eviction = true;

        for _ in 0..HISTORY_CAPACITY + 2 {
            search(&state, "NAVER").await.unwrap();
        }

        assert_eq!(history_of(&state).await.len(), HISTORY_CAPACITY);
    }

    #[tokio::test]
    async fn test_previous_rolls_history() {
        let source = Arc::new(FakeSource::with_prices(&[
            (ymd(2024, 1, 1), "1000"),
            (ymd(2023, 12, 31), "990"),
            (ymd(2023, 12, 30), "980"),
            (ymd(2023, 12, 29), "970"),
            (ymd(2023, 12, 28), "960"),
        ]));
        let display = RecordingDisplay::default();
        let state = state_with(source.clone(), display.clone());

        search(&state, "NAVER").await.unwrap();

        let mut date = ymd(2024, 1, 1);
        for _ in 0..3 {
            let page = previous(&state, "NAVER", &date).await.unwrap();
            assert_eq!(page.quotes.len(), 1);
            date = page.date;
        }

        assert_eq!(
            history_of(&state).await,
            vec![
                pair("20240101", "1000"),
                pair("20231231", "990"),
                pair("20231230", "980"),
                pair("20231229", "970"),
            ]
        );

        let page = previous(&state, "NAVER", &date).await.unwrap();
        assert_eq!(page.date, ymd(2023, 12, 28));
        assert_eq!(
            history_of(&state).await,
            vec![
                pair("20240101", "1000"),
                pair("20231230", "980"),
                pair("20231229", "970"),
                pair("20231228", "960"),
            ]
        );

        let ops = display.ops();
        assert_eq!(
            ops[ops.len() - 6..],
            [
                DisplayOp::Clear,
                DisplayOp::Text(0, 0, "20240101 : 1000".to_string()),
                DisplayOp::Text(0, 16, "20231230 : 980".to_string()),
                DisplayOp::Text(0, 32, "20231229 : 970".to_string()),
                DisplayOp::Text(0, 48, "20231228 : 960".to_string()),
                DisplayOp::Present,
            ]
        );

        // Every step also looks up the fixed reference date.
        let calls = source.calls();
        assert_eq!(calls.len(), 10);
        assert_eq!(calls[3], ("NAVER".to_string(), ymd(2024, 1, 1)));
        assert_eq!(calls[9], ("NAVER".to_string(), ymd(2024, 1, 1)));
    }

    #[tokio::test]
    async fn test_next_leaves_history_and_display() {
        let source = Arc::new(FakeSource::with_prices(&[
            (ymd(2024, 1, 1), "1000"),
            (ymd(2024, 1, 2), "1010"),
        ]));
        let display = RecordingDisplay::default();
        let state = state_with(source, display.clone());

        search(&state, "NAVER").await.unwrap();
        let ops_before = display.ops();

        let page = next(&state, "NAVER", &ymd(2024, 1, 1)).await.unwrap();

        assert_eq!(page.date, ymd(2024, 1, 2));
        assert_eq!(page.quotes[0].close_price, "1010");
        assert_eq!(page.secondary_quotes[0].close_price, "1000");
        assert_eq!(history_of(&state).await, vec![pair("20240101", "1000")]);
        assert_eq!(display.ops(), ops_before);
    }

    #[tokio::test]
    async fn test_display_failure_keeps_history() {
        let source = Arc::new(FakeSource::with_prices(&[(ymd(2024, 1, 1), "1000")]));
        let display = RecordingDisplay {
            fail_present: true,
            ..Default::default()
        };
        let state = state_with(source, display);

        let result = search(&state, "NAVER").await;

        assert!(matches!(result, Err(QbError::DisplayError(_))));
        assert_eq!(history_of(&state).await.len(), 1);
    }

    async fn fetch_page(state: AppState, uri: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_route_home() {
        let state = state_with(Arc::new(FakeSource::default()), RecordingDisplay::default());

        let (status, body) = fetch_page(state, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"name="stock_name""#));
    }

    #[tokio::test]
    async fn test_route_home_post_redirects() {
        let state = state_with(Arc::new(FakeSource::default()), RecordingDisplay::default());

        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("stock_name=A%26B"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/search_results?stock_name=A%26B"
        );
    }

    #[tokio::test]
    async fn test_route_search_results() {
        let source = Arc::new(FakeSource::with_prices(&[(ymd(2024, 1, 1), "1000")]));
        let state = state_with(source, RecordingDisplay::default());

        let (status, body) = fetch_page(state.clone(), "/search_results?stock_name=NAVER").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("1000"));
        assert!(body.contains("/prev?stock_name=NAVER&amp;stock_date=2024-01-01"));
        assert_eq!(history_of(&state).await.len(), 1);
    }

    #[tokio::test]
    async fn test_route_prev_and_next() {
        let source = Arc::new(FakeSource::with_prices(&[
            (ymd(2023, 12, 31), "990"),
            (ymd(2024, 1, 2), "1010"),
        ]));
        let state = state_with(source, RecordingDisplay::default());

        let (status, body) = fetch_page(
            state.clone(),
            "/prev?stock_name=NAVER&stock_date=2024-01-01",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("990"));

        let (status, body) = fetch_page(
            state.clone(),
            "/next?stock_name=NAVER&stock_date=20240101",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("1010"));

        assert_eq!(history_of(&state).await, vec![pair("20231231", "990")]);
    }

    #[tokio::test]
    async fn test_route_bad_requests() {
        let state = state_with(Arc::new(FakeSource::default()), RecordingDisplay::default());

        for uri in [
            "/prev?stock_name=NAVER",
            "/prev?stock_name=NAVER&stock_date=yesterday",
            "/next?stock_name=NAVER&stock_date=2024-13-01",
            "/next?stock_date=2024-01-01",
            "/search_results",
            "/search_results?stock_name=",
        ] {
            let (status, _) = fetch_page(state.clone(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_route_display_failure() {
        let source = Arc::new(FakeSource::with_prices(&[(ymd(2024, 1, 1), "1000")]));
        let display = RecordingDisplay {
            fail_present: true,
            ..Default::default()
        };
        let state = state_with(source, display);

        let (status, body) = fetch_page(state, "/search_results?stock_name=NAVER").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("Display"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_previous_last_frame_matches_history() {
        let prices: Vec<(NaiveDate, String)> = (1..=8)
            .map(|day| (ymd(2024, 1, day), format!("{day}000")))
            .collect();
        let source = Arc::new(FakeSource::with_prices(
            &prices
                .iter()
                .map(|(date, price)| (*date, price.as_str()))
                .collect::<Vec<_>>(),
        ));
        let display = RecordingDisplay::default();
        let state = state_with(source, display.clone());

        let tasks: Vec<_> = (2..=9)
            .map(|day| {
                let state = state.clone();
                tokio::spawn(async move { previous(&state, "NAVER", &ymd(2024, 1, day)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let ops = display.ops();
        let last_clear = ops
            .iter()
            .rposition(|op| *op == DisplayOp::Clear)
            .unwrap();
        let last_frame: Vec<String> = ops[last_clear..]
            .iter()
            .filter_map(|op| match op {
                DisplayOp::Text(_, _, text) => Some(text.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(ops.last(), Some(&DisplayOp::Present));
        assert_eq!(last_frame, state.history.lock().await.lines(HISTORY_CAPACITY));
        assert_eq!(history_of(&state).await.len(), HISTORY_CAPACITY);
    }
}
