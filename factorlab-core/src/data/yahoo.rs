//! Yahoo Finance data provider.
//!
//! Daily adjusted closes come from the v8 chart API; fundamentals from the
//! v10 quote summary (`financialData`, `defaultKeyStatistics`, `price`).
//! Handles rate limiting, retries with exponential backoff, response parsing,
//! and the circuit breaker.
//!
//! The quote summary rejects requests without a session: the client keeps a
//! cookie jar, visits `fc.yahoo.com` once for the session cookie, then asks
//! `getcrumb` for a token that is appended to every summary URL. A 401 on a
//! summary request renews the crumb once before giving up.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. The snapshot store is the fallback when Yahoo is unavailable.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, FetchWindow, UniverseDataProvider};
use crate::domain::{FundamentalRecord, PricePoint, PriceSeries};

const CHART_BASE: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SUMMARY_BASE: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "financialData,defaultKeyStatistics,price";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";

// ── Chart API ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

// ── Quote summary API ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryModules>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryModules {
    financial_data: Option<FinancialData>,
    default_key_statistics: Option<KeyStatistics>,
    price: Option<PriceModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    return_on_equity: Option<RawValue>,
    free_cashflow: Option<RawValue>,
    revenue_growth: Option<RawValue>,
    earnings_growth: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    market_cap: Option<RawValue>,
}

/// Yahoo wraps numbers as `{ "raw": 0.15, "fmt": "15.00%" }`; empty objects mean absent.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw).filter(|v| v.is_finite())
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    crumb: Mutex<Option<String>>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .cookie_store(true)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            crumb: Mutex::new(None),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    fn chart_url(symbol: &str, window: FetchWindow) -> String {
        let start_ts = day_start_ts(window.start);
        // Inclusive end: request through the last second of the end date.
        let end_ts = day_start_ts(window.end) + 86_399;
        format!(
            "{CHART_BASE}/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true&events=div%2Csplit"
        )
    }

    fn summary_url(symbol: &str, crumb: &str) -> Result<reqwest::Url, DataError> {
        reqwest::Url::parse_with_params(
            &format!("{SUMMARY_BASE}/{symbol}"),
            &[("modules", SUMMARY_MODULES), ("crumb", crumb)],
        )
        .map_err(|e| DataError::Other(format!("invalid summary URL for {symbol}: {e}")))
    }

    /// Session crumb, performing the cookie handshake on first use.
    fn crumb(&self) -> Result<String, DataError> {
        // Held across the handshake so parallel fetches wait for one session.
        let mut cached = self.crumb.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }
        let crumb = self.handshake()?;
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    fn reset_crumb(&self) {
        *self.crumb.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn handshake(&self) -> Result<String, DataError> {
        if !self.circuit_breaker.allow_request() {
            return Err(DataError::CircuitBreakerTripped);
        }
        let unreachable = |e: reqwest::Error| {
            self.circuit_breaker.on_failure();
            DataError::NetworkUnreachable(e.to_string())
        };
        // fc.yahoo.com answers 404, but sets the session cookie regardless.
        self.client.get(COOKIE_URL).send().map_err(unreachable)?;
        let resp = self.client.get(CRUMB_URL).send().map_err(unreachable)?;
        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.on_failure();
            return Err(DataError::RateLimited {
                retry_after_secs: 60,
            });
        }
        // Any answer other than a rate limit means the service is reachable.
        self.circuit_breaker.on_success();
        if !status.is_success() {
            return Err(DataError::AuthenticationRequired(format!(
                "crumb request returned HTTP {status}"
            )));
        }
        let body = resp
            .text()
            .map_err(|e| DataError::ResponseFormatChanged(format!("crumb body: {e}")))?;
        let crumb = parse_crumb(&body)?;
        debug!("yahoo session established");
        Ok(crumb)
    }

    fn get_summary(&self, symbol: &str, crumb: &str) -> Result<SummaryResponse, DataError> {
        self.get_json(symbol, Self::summary_url(symbol, crumb)?.as_str())
    }

    /// Parse a chart response into adjusted closes; falls back to raw closes
    /// when the adjusted series is absent.
    fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<PriceSeries, DataError> {
        let result = resp
            .chart
            .result
            .ok_or_else(|| api_error(symbol, resp.chart.error))?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::ResponseFormatChanged("no timestamps".into()))?;

        let closes = data
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut points: Vec<PricePoint> = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten())
                .or_else(|| closes.get(i).copied().flatten());

            // Intraday rows for the current session can repeat the last date.
            match points.last_mut() {
                Some(last) if last.date >= date => {
                    if let Some(c) = close {
                        last.close = c;
                    }
                }
                _ => points.push(PricePoint::new(date, close.unwrap_or(f64::NAN))),
            }
        }

        if points.iter().all(|p| p.is_missing()) {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(PriceSeries::new(symbol, points)?)
    }

    fn parse_summary(symbol: &str, resp: SummaryResponse) -> Result<FundamentalRecord, DataError> {
        let modules = resp
            .quote_summary
            .result
            .ok_or_else(|| api_error(symbol, resp.quote_summary.error))?
            .into_iter()
            .next()
            .unwrap_or_default();

        let financial = modules.financial_data.unwrap_or_default();
        let market_cap = raw(modules.price.and_then(|p| p.market_cap))
            .or_else(|| raw(modules.default_key_statistics.and_then(|k| k.market_cap)));

        Ok(FundamentalRecord {
            return_on_equity: raw(financial.return_on_equity),
            free_cashflow: raw(financial.free_cashflow),
            market_cap,
            revenue_growth: raw(financial.revenue_growth),
            earnings_growth: raw(financial.earnings_growth),
        })
    }

    /// Execute a GET with retry and circuit breaker logic, decoding JSON.
    fn get_json<T: DeserializeOwned>(&self, symbol: &str, url: &str) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.allow_request() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.on_ban();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.on_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        warn!(symbol, retry_after, "rate limited");
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        self.circuit_breaker.on_success();
                        return Err(DataError::AuthenticationRequired(format!(
                            "HTTP 401 for {symbol}"
                        )));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        self.circuit_breaker.on_success();
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.on_failure();
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    self.circuit_breaker.on_success();
                    let body: T = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;
                    return Ok(body);
                }
                Err(e) => {
                    self.circuit_breaker.on_failure();
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

fn day_start_ts(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

/// The crumb is a short opaque token; an HTML or empty body means the
/// handshake was refused.
fn parse_crumb(body: &str) -> Result<String, DataError> {
    let crumb = body.trim();
    let malformed = crumb.len() > 64 || crumb.contains(char::is_whitespace) || crumb.contains('<');
    if crumb.is_empty() || malformed {
        return Err(DataError::AuthenticationRequired(
            "no crumb in getcrumb response".into(),
        ));
    }
    Ok(crumb.to_string())
}

fn api_error(symbol: &str, error: Option<ApiError>) -> DataError {
    match error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormatChanged("empty result with no error".into()),
    }
}

impl UniverseDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_series(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        let resp: ChartResponse = self.get_json(symbol, &Self::chart_url(symbol, window))?;
        let series = Self::parse_chart(symbol, resp)?;
        Ok(series.between(window.start, window.end))
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalRecord, DataError> {
        let resp = match self.get_summary(symbol, &self.crumb()?) {
            Err(DataError::AuthenticationRequired(reason)) => {
                debug!(symbol, %reason, "crumb rejected; renewing session");
                self.reset_crumb();
                self.get_summary(symbol, &self.crumb()?)?
            }
            other => other?,
        };
        Self::parse_summary(symbol, resp)
    }
}
