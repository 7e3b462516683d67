//! Clients for the third party sites the API re-exposes.
//!
//! Each data source is behind a trait, handlers only ever see an `Arc<dyn _>`.

pub mod bcentral;
pub mod coinmarketcap;
pub mod html;
pub mod meteochile;
pub mod sii;
pub mod text;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rut::Rut;
use serde::Serialize;

use crate::error::ServerResult;

/// An economic activity a taxpayer is registered for at the SII.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicActivity {
    /// Description of the activity.
    pub name: String,
    /// The SII activity code.
    pub code: u32,
    /// Taxpayer category, e.g. `Primera`.
    pub category: String,
    /// Whether the activity is subject to VAT.
    pub subject_to_vat: bool,
    /// When the taxpayer registered the activity.
    pub date: Option<NaiveDate>,
}

/// What the SII publishes about a taxpayer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxpayerProfile {
    /// Registered name, empty when the SII has no record of the RUT.
    pub name: String,
    /// Registered economic activities.
    pub activities: Vec<EconomicActivity>,
}

/// A foreign currency and its exchange rate to the Chilean peso.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Currency {
    /// Name as published by the Banco Central.
    pub name: String,
    /// ISO 4217 code, empty when the name is unknown.
    pub iso4217: String,
    /// Pesos per unit of the currency.
    pub exchange_rate: f64,
}

/// The Banco Central daily indicators, in pesos. Values missing from the page are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Indicators {
    /// Unidad de fomento.
    pub uf: Option<f64>,
    /// Índice de valor promedio.
    pub ivp: Option<f64>,
    /// Observed US dollar.
    pub dollar: Option<f64>,
    /// Euro.
    pub euro: Option<f64>,
    /// Índice de tipo de cambio nominal multilateral.
    pub itcnm: Option<f64>,
    /// Troy ounce of silver, in dollars.
    pub ozt_silver: Option<f64>,
    /// Troy ounce of gold, in dollars.
    pub ozt_gold: Option<f64>,
    /// Pound of copper, in dollars.
    pub lb_copper: Option<f64>,
}

/// A cryptocurrency as listed by CoinMarketCap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coin {
    /// Display name, e.g. `Bitcoin`.
    pub name: String,
    /// Ticker, e.g. `BTC`.
    pub symbol: String,
    /// Market capitalization in dollars.
    pub market_cap_usd: Option<u64>,
    /// Price of one unit in dollars.
    pub price_usd: Option<f64>,
    /// Price of one unit in pesos, at the Banco Central dollar rate.
    pub price_clp: Option<f64>,
    /// Circulating supply.
    pub supply: Option<u64>,
    /// Traded volume over the last 24 hours, in dollars.
    pub volume_usd: Option<u64>,
    /// Price change over the last hour, in percent.
    pub hourly_change: Option<f64>,
    /// Price change over the last 24 hours, in percent.
    pub daily_change: Option<f64>,
    /// Price change over the last 7 days, in percent.
    pub weekly_change: Option<f64>,
}

/// A temperature reading and the local time it was taken at.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Measurement {
    pub time: Option<NaiveTime>,
    pub temperature: Option<f64>,
}

/// Rainfall in millimeters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Precipitations {
    /// Total of the day.
    pub sum: f64,
    /// As recorded by the automatic station.
    pub ema: f64,
}

/// Extremes and rainfall of a single day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClimateReport {
    pub maximum: Measurement,
    pub minimum: Measurement,
    pub precipitations: Precipitations,
}

/// An automatic weather station of the MeteoChile network and its latest readings.
///
/// Stations out of service only carry their code and name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateStation {
    /// National station code.
    pub code: u32,
    pub name: String,
    pub operational: bool,
    /// Local time of the latest report, today.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<NaiveTime>,
    /// Temperature in degrees Celsius.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Relative humidity, between 0 and 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Pressure in hectopascals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure_hpa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today: Option<ClimateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yesterday: Option<ClimateReport>,
}

/// Source of taxpayer information.
#[async_trait]
pub trait ActivityService: Send + Sync + std::fmt::Debug {
    /// Look up the registered name and economic activities of a taxpayer.
    async fn profile(&self, rut: &Rut) -> ServerResult<TaxpayerProfile>;
}

/// Source of daily exchange rates.
#[async_trait]
pub trait CurrencyService: Send + Sync + std::fmt::Debug {
    /// Fetch today's exchange rates for every published currency.
    async fn currencies(&self) -> ServerResult<Vec<Currency>>;
}

/// Source of the daily economic indicators.
#[async_trait]
pub trait IndicatorService: Send + Sync + std::fmt::Debug {
    /// Fetch today's indicators.
    async fn indicators(&self) -> ServerResult<Indicators>;
}

/// Source of cryptocurrency prices.
#[async_trait]
pub trait CryptoService: Send + Sync + std::fmt::Debug {
    /// Fetch every listed coin, without peso prices.
    async fn coins(&self) -> ServerResult<Vec<Coin>>;
}

/// Source of weather station readings.
#[async_trait]
pub trait WeatherService: Send + Sync + std::fmt::Debug {
    /// Fetch the latest readings of every station.
    async fn stations(&self) -> ServerResult<Vec<ClimateStation>>;
}

/// Build the HTTP client shared by every upstream.
pub fn http_client(timeout: Duration) -> ServerResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
