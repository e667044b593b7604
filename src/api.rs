use std::{path::Path, sync::Arc};

use chrono::NaiveDate;
use log::info;

use crate::{
    config::{AppConfig, DisplayKind},
    data::quote::Quote,
    display::{self, DisplayDevice},
    ds::stock_price::StockPriceClient,
    error::QbResult,
    utils::datetime::{days_before, today},
    web::{self, AppState, SEARCH_DAYS_BACK},
};

pub fn load_config(path: Option<&Path>) -> QbResult<AppConfig> {
    let config = AppConfig::load(path)?;
    config.validate()?;

    Ok(config)
}

/// Default lookup date, matching the search page.
pub fn default_quote_date() -> QbResult<NaiveDate> {
    days_before(&today(), SEARCH_DAYS_BACK)
}

pub async fn fetch_quote(config: &AppConfig, stock_name: &str, date: &NaiveDate) -> Vec<Quote> {
    StockPriceClient::from_config(config)
        .fetch_quote(stock_name, date)
        .await
}

/// Returns (title, error) per component; `None` means healthy.
pub async fn check(config: &AppConfig) -> QbResult<Vec<(String, Option<String>)>> {
    let mut status: Vec<(String, Option<String>)> = vec![];

    let client = StockPriceClient::from_config(config);
    let api_result = client.check(&default_quote_date()?).await;
    status.push((
        "Stock price API".to_string(),
        api_result.err().map(|err| err.to_string()),
    ));

    if config.display != DisplayKind::None {
        let display_result = display::oled::Ssd1306Display::open(
            &config.i2c_bus,
            config.display_address,
        )
        .and_then(|mut display| {
            display.clear()?;
            display.present()
        });
        status.push((
            format!("Display {} {}", config.display, config.i2c_bus),
            display_result.err().map(|err| err.to_string()),
        ));
    }

    Ok(status)
}

pub async fn serve(config: &AppConfig) -> QbResult<()> {
    let source = Arc::new(StockPriceClient::from_config(config));
    let display = display::shared(display::open_display(config));
    let state = AppState::new(source, display, config);

    info!(
        "Serving stock prices from {} (display: {})",
        config.api_url, config.display
    );

    web::serve(state, &config.bind).await
}
