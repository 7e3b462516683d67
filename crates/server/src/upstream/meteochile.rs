//! Latest readings of the automatic weather stations, scraped from the MeteoChile climatology site.
//!
//! The page is a single table with one station per row, identified by the position of each cell.
//! Times are local and carry no date, the column says whether they are from today or yesterday.

use async_trait::async_trait;
use url::Url;

use super::{
    ClimateReport, ClimateStation, Measurement, Precipitations, WeatherService, html,
    text::{parse_clock_time, parse_english_number},
};
use crate::error::{ServerError, ServerResult};

/// Path of the daily report of every station, relative to the MeteoChile base URL.
const RECENT_REPORTS_PATH: &str = "application/diario/climatDiarioRecienteEmas/";

/// Position of each value in a station row.
#[allow(
    clippy::missing_docs_in_private_items,
    reason = "Named after the value they hold"
)]
mod column {
    pub const CODE: usize = 1;
    pub const NAME: usize = 2;
    pub const LAST_REPORT: usize = 3;
    pub const TEMPERATURE: usize = 4;
    pub const HUMIDITY: usize = 5;
    pub const PRESSURE: usize = 6;
    pub const TODAY_MAXIMUM: usize = 7;
    pub const TODAY_MINIMUM: usize = 9;
    pub const YESTERDAY_MAXIMUM: usize = 11;
    pub const YESTERDAY_MINIMUM: usize = 13;
    pub const TODAY_PRECIPITATIONS: usize = 15;
    pub const YESTERDAY_PRECIPITATIONS: usize = 17;
}

/// Client for the MeteoChile recent reports.
#[derive(Debug, Clone)]
pub struct MeteoChileClient {
    /// Shared HTTP client.
    client: reqwest::Client,
    /// Base URL the report path is resolved against.
    base_url: Url,
}

impl MeteoChileClient {
    /// Create a client resolving requests against `base_url`, normally
    /// `https://climatologia.meteochile.gob.cl/`.
    pub const fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl WeatherService for MeteoChileClient {
    #[tracing::instrument(skip(self), err(level = "debug"))]
    async fn stations(&self) -> ServerResult<Vec<ClimateStation>> {
        // The page declares its charset, station names are not always UTF-8.
        let page = self
            .client
            .get(self.base_url.join(RECENT_REPORTS_PATH)?)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let stations = parse_stations(&page);
        if stations.is_empty() {
            return Err(ServerError::Upstream(
                "no stations found on the recent reports page".to_string(),
            ));
        }

        tracing::debug!(count = stations.len(), "Parsed weather stations");
        Ok(stations)
    }
}

/// A station row of the recent reports table.
struct Row {
    /// Visible text of each cell.
    cells: Vec<String>,
}

impl Row {
    /// Text of the cell at `column`, empty when the row is shorter.
    fn text(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or_default()
    }

    /// A number at `column`, `None` when the reading is missing.
    fn number(&self, column: usize) -> Option<f64> {
        parse_english_number(self.text(column))
    }

    /// A temperature at `column` followed by the time it was recorded at.
    fn measurement(&self, column: usize) -> Measurement {
        Measurement {
            temperature: self.number(column),
            time: parse_clock_time(self.text(column.saturating_add(1))),
        }
    }

    /// Rainfall at `column` followed by the automatic station's record. `s/p` means none fell.
    fn precipitations(&self, column: usize) -> Precipitations {
        Precipitations {
            sum: self.number(column).unwrap_or_default(),
            ema: self.number(column.saturating_add(1)).unwrap_or_default(),
        }
    }

    /// Extremes and rainfall of a day.
    fn report(&self, maximum: usize, minimum: usize, precipitations: usize) -> ClimateReport {
        ClimateReport {
            maximum: self.measurement(maximum),
            minimum: self.measurement(minimum),
            precipitations: self.precipitations(precipitations),
        }
    }
}

/// Read every station of the recent reports page.
///
/// Rows without a numeric station code, like the headers, are skipped. A station with no last
/// report or whose row is struck through is out of service and only keeps its code and name.
pub fn parse_stations(page: &str) -> Vec<ClimateStation> {
    html::blocks(page, "tr")
        .into_iter()
        .filter_map(|block| {
            let row = Row {
                cells: html::blocks(block, "td").into_iter().map(html::text).collect(),
            };
            let code = row.text(column::CODE).parse().ok()?;
            let name = row.text(column::NAME).to_string();

            let last_report = parse_clock_time(row.text(column::LAST_REPORT));
            if last_report.is_none() || block.to_ascii_lowercase().contains("<strike") {
                return Some(ClimateStation {
                    code,
                    name,
                    operational: false,
                    last_report: None,
                    temperature: None,
                    humidity: None,
                    pressure_hpa: None,
                    today: None,
                    yesterday: None,
                });
            }

            Some(ClimateStation {
                code,
                name,
                operational: true,
                last_report,
                temperature: row.number(column::TEMPERATURE),
                humidity: row.number(column::HUMIDITY).map(|percent| percent / 100.0),
                pressure_hpa: row.number(column::PRESSURE),
                today: Some(row.report(
                    column::TODAY_MAXIMUM,
                    column::TODAY_MINIMUM,
                    column::TODAY_PRECIPITATIONS,
                )),
                yesterday: Some(row.report(
                    column::YESTERDAY_MAXIMUM,
                    column::YESTERDAY_MINIMUM,
                    column::YESTERDAY_PRECIPITATIONS,
                )),
            })
        })
        .collect()
}
