use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use common::{
    CoinCategory, CoinDetail, CoinSummary, Error, GlobalSnapshot, MarketChart, MarketDataSource,
    Result,
};

/// Fixed per-request timeout. Covers connect and body read.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for the CoinGecko market data API.
///
/// Owns request shaping only: no caching, no retries. Retry policy belongs
/// to the caller.
pub struct CoinGeckoClient {
    base_url: String,
    http: Client,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .use_rustls_tls()
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");

        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn global(&self) -> Result<GlobalSnapshot> {
        let resp: GlobalResponse = self.get_json("/global", &[]).await?;
        Ok(resp.data)
    }

    async fn coins_list(
        &self,
        page: u32,
        per_page: u32,
        currency: &str,
        order: &str,
    ) -> Result<Vec<CoinSummary>> {
        let page = page.to_string();
        let per_page = per_page.to_string();
        self.get_json(
            "/coins/markets",
            &[
                ("vs_currency", currency),
                ("order", order),
                ("per_page", &per_page),
                ("page", &page),
                ("sparkline", "false"),
                ("price_change_percentage", "24h"),
            ],
        )
        .await
    }

    async fn coin_detail(&self, id: &str) -> Result<CoinDetail> {
        self.get_json(
            &format!("/coins/{id}"),
            &[
                ("localization", "false"),
                ("tickers", "false"),
                ("market_data", "true"),
                ("community_data", "false"),
                ("developer_data", "false"),
                ("sparkline", "false"),
            ],
        )
        .await
    }

    async fn market_chart(&self, id: &str, days: u32, currency: &str) -> Result<MarketChart> {
        let days = days.to_string();
        self.get_json(
            &format!("/coins/{id}/market_chart"),
            &[("vs_currency", currency), ("days", &days)],
        )
        .await
    }

    async fn categories(&self) -> Result<Vec<CoinCategory>> {
        self.get_json("/coins/categories/list", &[]).await
    }
}

// ─── Response envelopes ───────────────────────────────────────────────────────

/// `/global` wraps the snapshot in a `data` object.
#[derive(Deserialize)]
struct GlobalResponse {
    data: GlobalSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_envelope_unwraps_data() {
        let json = r#"{
            "data": {
                "active_cryptocurrencies": 12000,
                "total_market_cap": {"usd": 2500000000000.0},
                "total_volume": {"usd": 90000000000.0},
                "market_cap_percentage": {"btc": 52.4, "eth": 16.9},
                "market_cap_change_percentage_24h_usd": -1.2
            }
        }"#;
        let resp: GlobalResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.active_cryptocurrencies, Some(12000));
        assert!((resp.data.market_cap_percentage["btc"] - 52.4).abs() < 1e-9);
    }

    #[test]
    fn market_chart_decodes_pair_arrays() {
        let json = r#"{
            "prices": [[1700000000000, 34250.12], [1700003600000, 34310.55]],
            "market_caps": [[1700000000000, 670000000000.0]],
            "total_volumes": [[1700000000000, 18000000000.0]]
        }"#;
        let chart: MarketChart = serde_json::from_str(json).unwrap();
        assert_eq!(chart.prices.len(), 2);
        let series = chart.series();
        assert_eq!(series.points()[0].timestamp, 1_700_000_000_000);
        assert!((series.points()[1].price - 34310.55).abs() < 1e-9);
    }

    #[test]
    fn coin_detail_decodes_nested_blocks() {
        let json = r#"{
            "id": "bitcoin", "symbol": "btc", "name": "Bitcoin",
            "description": {"en": "Digital gold."},
            "links": {"homepage": ["https://bitcoin.org"], "blockchain_site": [], "official_forum_url": []},
            "image": {"large": "https://img/btc.png"},
            "market_data": {
                "current_price": {"usd": 34250.0},
                "market_cap": {"usd": 670000000000.0},
                "total_volume": {"usd": 18000000000.0},
                "market_cap_rank": 1,
                "price_change_percentage_24h": 0.8,
                "circulating_supply": 19500000.0,
                "total_supply": 21000000.0
            }
        }"#;
        let detail: CoinDetail = serde_json::from_str(json).unwrap();
        let market = detail.market_data.unwrap();
        assert_eq!(market.market_cap_rank, Some(1));
        assert_eq!(detail.links.unwrap().homepage.len(), 1);
    }
}
