//! Handlers for `/api/v1/economy`.

use axum::extract::{Query, State};

use super::{NameQuery, search_by_name};
use crate::{
    AppState,
    error::ServerResult,
    jsend::Success,
    upstream::{Coin, Currency, Indicators},
};

/// `GET /api/v1/economy/indicators`
#[tracing::instrument(skip(state))]
pub async fn indicators(State(state): State<AppState>) -> ServerResult<Success<Indicators>> {
    Ok(Success(state.indicators.indicators().await?))
}

/// `GET /api/v1/economy/crypto?name=`
///
/// Prices in pesos use the Banco Central dollar rate. When that rate is unavailable the coins are
/// still returned, without peso prices.
#[tracing::instrument(skip(state))]
pub async fn crypto(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> ServerResult<Success<Vec<Coin>>> {
    let (coins, indicators) = tokio::join!(state.crypto.coins(), state.indicators.indicators());
    let mut coins = coins?;

    let dollar = match indicators {
        Ok(indicators) => indicators.dollar,
        Err(e) => {
            tracing::warn!(error = ?e, "No dollar rate, leaving out peso prices");
            None
        }
    };
    for coin in &mut coins {
        coin.price_clp = coin.price_usd.zip(dollar).map(|(usd, rate)| usd * rate);
    }

    let Some(name) = query.name() else {
        return Ok(Success(coins));
    };

    search_by_name(coins, |coin| format!("{} {}", coin.name, coin.symbol), name).map(Success)
}

/// `GET /api/v1/economy/currencies?name=`
///
/// Without a name every published currency is returned. With one, only those whose name or code
/// fuzzy match it, best first.
#[tracing::instrument(skip(state))]
pub async fn currencies(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> ServerResult<Success<Vec<Currency>>> {
    let currencies = state.currencies.currencies().await?;

    let Some(name) = query.name() else {
        return Ok(Success(currencies));
    };

    search_by_name(
        currencies,
        |currency| format!("{} {}", currency.name, currency.iso4217),
        name,
    )
    .map(Success)
}
