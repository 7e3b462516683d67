//! Cryptocurrency prices scraped from the CoinMarketCap full listing.
//!
//! Every coin is a table row, its values are found by the class of the cell holding them.

use async_trait::async_trait;
use url::Url;

use super::{
    Coin, CryptoService, html,
    text::{parse_english_number, parse_whole_number},
};
use crate::error::{ServerError, ServerResult};

/// Path of the page listing every coin, relative to the CoinMarketCap base URL.
const LISTING_PATH: &str = "all/views/all/";

/// Classes of the cells holding each value of a row.
#[allow(
    clippy::missing_docs_in_private_items,
    reason = "Named after the value they hold"
)]
mod class {
    pub const NAME: &str = "cmc-table__column-name--name";
    pub const SYMBOL: &str = "cmc-table__cell--sort-by__symbol";
    pub const MARKET_CAP: &str = "cmc-table__cell--sort-by__market-cap";
    pub const PRICE: &str = "cmc-table__cell--sort-by__price";
    pub const SUPPLY: &str = "cmc-table__cell--sort-by__circulating-supply";
    pub const VOLUME: &str = "cmc-table__cell--sort-by__volume-24-h";
    pub const HOURLY_CHANGE: &str = "cmc-table__cell--sort-by__percent-change-1-h";
    pub const DAILY_CHANGE: &str = "cmc-table__cell--sort-by__percent-change-24-h";
    pub const WEEKLY_CHANGE: &str = "cmc-table__cell--sort-by__percent-change-7-d";
}

/// Client for the CoinMarketCap listing.
#[derive(Debug, Clone)]
pub struct CoinMarketCapClient {
    /// Shared HTTP client.
    client: reqwest::Client,
    /// Base URL the listing path is resolved against.
    base_url: Url,
}

impl CoinMarketCapClient {
    /// Create a client resolving requests against `base_url`, normally `https://coinmarketcap.com/`.
    pub const fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl CryptoService for CoinMarketCapClient {
    #[tracing::instrument(skip(self), err(level = "debug"))]
    async fn coins(&self) -> ServerResult<Vec<Coin>> {
        let page = self
            .client
            .get(self.base_url.join(LISTING_PATH)?)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let coins = parse_coins(&page);
        if coins.is_empty() {
            return Err(ServerError::Upstream("no coins found on the listing".to_string()));
        }

        tracing::debug!(count = coins.len(), "Parsed coins");
        Ok(coins)
    }
}

/// Visible text of the first element in `row` with the given class.
fn cell(row: &str, class: &str) -> Option<String> {
    html::first_with_class(row, class).map(html::text)
}

/// Read every coin of the listing. Rows without a name, like the headers, are skipped.
///
/// Peso prices are left unset, the listing only has dollars.
pub fn parse_coins(page: &str) -> Vec<Coin> {
    html::blocks(page, "tr")
        .into_iter()
        .filter_map(|row| {
            let name = cell(row, class::NAME).filter(|name| !name.is_empty())?;
            let number = |class: &str| cell(row, class).as_deref().and_then(parse_english_number);
            let whole = |class: &str| cell(row, class).as_deref().and_then(parse_whole_number);

            Some(Coin {
                name,
                symbol: cell(row, class::SYMBOL).unwrap_or_default(),
                market_cap_usd: whole(class::MARKET_CAP),
                price_usd: number(class::PRICE),
                price_clp: None,
                supply: whole(class::SUPPLY),
                volume_usd: whole(class::VOLUME),
                hourly_change: number(class::HOURLY_CHANGE),
                daily_change: number(class::DAILY_CHANGE),
                weekly_change: number(class::WEEKLY_CHANGE),
            })
        })
        .collect()
}
