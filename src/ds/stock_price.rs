use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, error};
use percent_encoding::percent_decode_str;
use quick_xml::{Reader, events::Event};
use serde::Deserialize;

use crate::{
    config::AppConfig,
    data::quote::Quote,
    ds::QuoteSource,
    error::{QbError, QbResult},
    utils::{
        datetime::date_to_compact_str,
        net::{http_get, join_url},
    },
};

pub static DEFAULT_API_URL: &str =
    "https://apis.data.go.kr/1160100/service/GetStockSecuritiesInfoService";

static OPERATION: &str = "getStockPriceInfo";

static NUM_OF_ROWS: &str = "100";
static PAGE_NO: &str = "1";
static RESULT_CODE_OK: &str = "00";

/// Client for the public securities daily price service.
#[derive(Clone, Debug)]
pub struct StockPriceClient {
    api_url: String,
    service_key: String,
    timeout_secs: u64,
}

/// Response envelope. Items are read separately by [`scan_items`].
#[derive(Debug, Default, Deserialize)]
struct PriceInfoResponse {
    header: Option<PriceInfoHeader>,
    body: Option<PriceInfoBody>,

    /// Present instead of header/body when the API gateway rejects a call.
    #[serde(rename = "cmmMsgHeader")]
    gateway_header: Option<GatewayHeader>,
}

#[derive(Debug, Default, Deserialize)]
struct PriceInfoHeader {
    #[serde(rename = "resultCode")]
    result_code: Option<String>,
    #[serde(rename = "resultMsg")]
    result_msg: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayHeader {
    #[serde(rename = "errMsg")]
    err_msg: Option<String>,
    #[serde(rename = "returnAuthMsg")]
    return_auth_msg: Option<String>,
    #[serde(rename = "returnReasonCode")]
    return_reason_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PriceInfoBody {
    #[serde(rename = "totalCount")]
    total_count: Option<String>,
}

/// One `<item>`, field text exactly as sent (no whitespace trimming).
#[derive(Debug, Default, PartialEq)]
struct PriceInfoItem {
    name: Option<String>,
    close_price: Option<String>,
    change_amount: Option<String>,
    change_rate: Option<String>,
    high_price: Option<String>,
    low_price: Option<String>,
}

impl StockPriceClient {
    /// `raw_service_key` may be given percent-encoded (as issued) or plain.
    pub fn new(api_url: &str, raw_service_key: &str, timeout_secs: u64) -> Self {
        Self {
            api_url: api_url.to_string(),
            service_key: percent_decode_str(raw_service_key)
                .decode_utf8_lossy()
                .to_string(),
            timeout_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.api_url,
            &config.service_key,
            config.request_timeout_secs,
        )
    }

    /// Looks up `stock_name` on `date`. Errors are logged, never returned.
    pub async fn fetch_quote(&self, stock_name: &str, date: &NaiveDate) -> Vec<Quote> {
        let result = match self.request(stock_name, date).await {
            Ok(bytes) => parse_quotes(&bytes, stock_name, date),
            Err(err) => Err(err),
        };

        match result {
            Ok(quotes) => quotes,
            Err(err) => {
                error!("Fetch quote of '{stock_name}' on {date} error: {err}");
                vec![]
            }
        }
    }

    /// Verifies the endpoint is reachable and accepts the service key.
    pub async fn check(&self, date: &NaiveDate) -> QbResult<()> {
        let bytes = self.request("", date).await?;
        decode_response(&bytes).map(|_| ())
    }

    async fn request(&self, stock_name: &str, date: &NaiveDate) -> QbResult<Vec<u8>> {
        let request_url = join_url(&self.api_url, OPERATION)?;
        let bas_dt = date_to_compact_str(date);
        let query = [
            ("ServiceKey", self.service_key.as_str()),
            ("numOfRows", NUM_OF_ROWS),
            ("pageNo", PAGE_NO),
            ("basDt", bas_dt.as_str()),
            ("stock_name", stock_name),
        ];

        debug!("GET {request_url} basDt={bas_dt} stock_name={stock_name}");

        http_get(&request_url, &query, self.timeout_secs).await
    }
}

#[async_trait]
impl QuoteSource for StockPriceClient {
    async fn fetch_quote(&self, stock_name: &str, date: &NaiveDate) -> Vec<Quote> {
        StockPriceClient::fetch_quote(self, stock_name, date).await
    }
}

/// Picks the first item named exactly `stock_name`, tagged with `date`.
pub fn parse_quotes(bytes: &[u8], stock_name: &str, date: &NaiveDate) -> QbResult<Vec<Quote>> {
    let response = decode_response(bytes)?;
    if let Some(body) = &response.body {
        debug!("Price info totalCount={:?}", body.total_count);
    }

    let text = decode_text(bytes)?;
    let mut quotes: Vec<Quote> = vec![];

    if let Some(item) = scan_items(text)?
        .into_iter()
        .find(|item| item.name.as_deref() == Some(stock_name))
    {
        quotes.push(item.into_quote(date)?);
    }

    Ok(quotes)
}

fn decode_text(bytes: &[u8]) -> QbResult<&str> {
    std::str::from_utf8(bytes).map_err(|err| QbError::Invalid {
        code: "INVALID_ENCODING",
        message: format!("Response is not UTF-8: {err}"),
    })
}

fn decode_response(bytes: &[u8]) -> QbResult<PriceInfoResponse> {
    let response: PriceInfoResponse = quick_xml::de::from_str(decode_text(bytes)?)?;

    if let Some(gateway_header) = &response.gateway_header {
        return Err(QbError::Invalid {
            code: "API_GATEWAY_ERROR",
            message: format!(
                "[{}] {} {}",
                gateway_header.return_reason_code.as_deref().unwrap_or_default(),
                gateway_header.err_msg.as_deref().unwrap_or_default(),
                gateway_header.return_auth_msg.as_deref().unwrap_or_default(),
            ),
        });
    }

    if let Some(header) = &response.header {
        if let Some(result_code) = &header.result_code {
            if result_code != RESULT_CODE_OK {
                return Err(QbError::Invalid {
                    code: "API_RESULT_ERROR",
                    message: format!(
                        "[{result_code}] {}",
                        header.result_msg.as_deref().unwrap_or_default()
                    ),
                });
            }
        }
    }

    Ok(response)
}

/// Collects every `<item>` in document order, keeping text untrimmed so the
/// name comparison is exact.
fn scan_items(text: &str) -> QbResult<Vec<PriceInfoItem>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut items: Vec<PriceInfoItem> = vec![];
    let mut item: Option<PriceInfoItem> = None;
    let mut field: Option<String> = None;
    let mut value = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "item" {
                    item = Some(PriceInfoItem::default());
                } else if item.is_some() {
                    field = Some(name);
                    value.clear();
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "item" {
                    items.push(PriceInfoItem::default());
                } else if let Some(item) = item.as_mut() {
                    item.set_field(&name, String::new());
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    value.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if field.is_some() {
                    value.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"item" {
                    if let Some(item) = item.take() {
                        items.push(item);
                    }
                } else if let (Some(item), Some(name)) = (item.as_mut(), field.take()) {
                    item.set_field(&name, std::mem::take(&mut value));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

impl PriceInfoItem {
    fn set_field(&mut self, name: &str, value: String) {
        let slot = match name {
            "itmsNm" => &mut self.name,
            "clpr" => &mut self.close_price,
            "vs" => &mut self.change_amount,
            "fltRt" => &mut self.change_rate,
            "hipr" => &mut self.high_price,
            "lopr" => &mut self.low_price,
            _ => return,
        };
        *slot = Some(value);
    }

    fn into_quote(self, date: &NaiveDate) -> QbResult<Quote> {
        match (
            self.name,
            self.close_price,
            self.change_amount,
            self.change_rate,
            self.high_price,
            self.low_price,
        ) {
            (
                Some(stock_name),
                Some(close_price),
                Some(change_amount),
                Some(change_rate),
                Some(high_price),
                Some(low_price),
            ) => Ok(Quote {
                stock_name,
                close_price,
                change_amount,
                change_rate,
                high_price,
                low_price,
                date: *date,
            }),
            (name, ..) => Err(QbError::Invalid {
                code: "INCOMPLETE_ITEM",
                message: format!("Item '{}' is missing price fields", name.unwrap_or_default()),
            }),
        }
    }
}
