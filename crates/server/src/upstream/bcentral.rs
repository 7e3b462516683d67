//! Daily indicators and exchange rates scraped from the Banco Central de Chile statistics site.
//!
//! The daily indicators page shows each indicator in a label with a fixed id. It also links to the
//! currencies page under a fixed element id, whose target changes every day. That page lists one
//! currency per table row: its name, then its rate.

use async_trait::async_trait;
use url::Url;

use super::{
    Currency, CurrencyService, IndicatorService, Indicators, html,
    text::{iso_4217_code, parse_chilean_number},
};
use crate::error::{ServerError, ServerResult};

/// Path of the daily indicators page, relative to the Banco Central base URL.
const DAILY_INDICATORS_PATH: &str = "Indicadoressiete/secure/IndicadoresDiarios.aspx";

/// Id of the link to the currencies page on the daily indicators page.
const CURRENCIES_LINK_ID: &str = "hypLnk1_11";

/// Ids of the labels holding each value on the daily indicators page.
#[allow(
    clippy::missing_docs_in_private_items,
    reason = "Named after the value they hold"
)]
mod label {
    pub const UF: &str = "lblValor1_1";
    pub const IVP: &str = "lblValor1_2";
    pub const DOLLAR: &str = "lblValor1_3";
    pub const EURO: &str = "lblValor1_5";
    pub const ITCNM: &str = "lblValor1_6";
    pub const OZT_GOLD: &str = "lblValor2_3";
    pub const OZT_SILVER: &str = "lblValor2_4";
    pub const LB_COPPER: &str = "lblValor2_5";
}

/// Client for the Banco Central daily indicators.
#[derive(Debug, Clone)]
pub struct BancoCentralClient {
    /// Shared HTTP client.
    client: reqwest::Client,
    /// Base URL the Banco Central paths are resolved against.
    base_url: Url,
}

impl BancoCentralClient {
    /// Create a client resolving requests against `base_url`, normally `https://si3.bcentral.cl/`.
    pub const fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Fetch a page as text, failing on non-success statuses.
    async fn fetch(&self, url: Url) -> ServerResult<String> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    /// Find today's currencies page through the link on the daily indicators page.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    async fn currencies_page_url(&self) -> ServerResult<Url> {
        let indicators_url = self.base_url.join(DAILY_INDICATORS_PATH)?;
        let page = self.fetch(indicators_url.clone()).await?;

        let href = html::after_id(&page, CURRENCIES_LINK_ID)
            .and_then(|(tag, _)| html::attribute(tag, "href"))
            .filter(|href| !href.is_empty())
            .ok_or_else(|| ServerError::Upstream("no currencies page link found".to_string()))?;

        // Links are relative to the indicators page and may carry encoded ampersands.
        Ok(indicators_url.join(&href.replace("&amp;", "&"))?)
    }
}

#[async_trait]
impl CurrencyService for BancoCentralClient {
    #[tracing::instrument(skip(self), err(level = "debug"))]
    async fn currencies(&self) -> ServerResult<Vec<Currency>> {
        let url = self.currencies_page_url().await?;
        let page = self.fetch(url).await?;

        let currencies = parse_currencies(&page);
        if currencies.is_empty() {
            return Err(ServerError::Upstream(
                "no currencies found on the currencies page".to_string(),
            ));
        }

        tracing::debug!(count = currencies.len(), "Parsed currencies");
        Ok(currencies)
    }
}

#[async_trait]
impl IndicatorService for BancoCentralClient {
    #[tracing::instrument(skip(self), err(level = "debug"))]
    async fn indicators(&self) -> ServerResult<Indicators> {
        let page = self.fetch(self.base_url.join(DAILY_INDICATORS_PATH)?).await?;

        let indicators = parse_indicators(&page);
        if indicators == Indicators::default() {
            return Err(ServerError::Upstream(
                "no indicators found on the daily indicators page".to_string(),
            ));
        }

        Ok(indicators)
    }
}

/// Read the value of the label with the given id, `None` when missing or not a number.
fn label_value(page: &str, id: &str) -> Option<f64> {
    let (_, rest) = html::after_id(page, id)?;
    let value = rest.split('<').next()?;
    parse_chilean_number(&html::text(value))
}

/// Read every indicator shown on the daily indicators page.
pub fn parse_indicators(page: &str) -> Indicators {
    Indicators {
        uf: label_value(page, label::UF),
        ivp: label_value(page, label::IVP),
        dollar: label_value(page, label::DOLLAR),
        euro: label_value(page, label::EURO),
        itcnm: label_value(page, label::ITCNM),
        ozt_silver: label_value(page, label::OZT_SILVER),
        ozt_gold: label_value(page, label::OZT_GOLD),
        lb_copper: label_value(page, label::LB_COPPER),
    }
}

/// Read every `name | rate` row of the currencies page.
///
/// Rows without a name or whose rate is not a number (the site shows `ND` when it has no value)
/// are skipped.
pub fn parse_currencies(page: &str) -> Vec<Currency> {
    html::blocks(page, "tr")
        .into_iter()
        .filter_map(|row| {
            let cells = html::blocks(row, "td");
            let name = html::text(cells.first()?);
            if name.is_empty() {
                return None;
            }
            let exchange_rate = parse_chilean_number(&html::text(cells.get(1)?))?;

            Some(Currency {
                iso4217: iso_4217_code(&name).unwrap_or_default().to_string(),
                name,
                exchange_rate,
            })
        })
        .collect()
}
