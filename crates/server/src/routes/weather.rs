//! Handlers for `/api/v1/weather`.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::search_by_name;
use crate::{
    AppState,
    error::{ServerError, ServerResult},
    jsend::Success,
};

/// Query of the stations endpoint, filtering by name or by code but not both.
#[derive(Debug, Deserialize)]
pub struct StationQuery {
    /// Fuzzy filter over the station name.
    name: Option<String>,
    /// Exact station code.
    code: Option<String>,
}

/// `GET /api/v1/weather/stations?name=|code=`
///
/// A name returns every station that fuzzy matches it, best first. A code returns the single
/// station with that code.
#[tracing::instrument(skip(state))]
pub async fn stations(
    State(state): State<AppState>,
    Query(query): Query<StationQuery>,
) -> ServerResult<Response> {
    let present = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let (name, code) = (present(&query.name), present(&query.code));
    if name.is_some() && code.is_some() {
        return Err(ServerError::InvalidParameter {
            parameter: "code",
            reason: "name and code can't be searched at the same time".to_string(),
        });
    }

    let stations = state.weather.stations().await?;

    if let Some(code) = code {
        let station = stations
            .into_iter()
            .find(|station| station.code.to_string() == code)
            .ok_or(ServerError::NotFound)?;
        return Ok(Success(station).into_response());
    }

    let Some(name) = name else {
        return Ok(Success(stations).into_response());
    };

    let found = search_by_name(stations, |station| station.name.clone(), &name)?;
    Ok(Success(found).into_response())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::routes::testing::{TestApp, get};

    /// The codes of the stations in a success body listing them.
    fn codes(body: &str) -> Vec<u64> {
        let body: serde_json::Value = serde_json::from_str(body).expect("valid json");
        assert_eq!(body["status"], "success");
        body["data"]
            .as_array()
            .expect("a list of stations")
            .iter()
            .map(|station| station["code"].as_u64().expect("a code"))
            .collect()
    }

    #[tokio::test]
    async fn test_all_stations() {
        let app = TestApp::new();
        let (status, body) = get(app.router(), "/api/v1/weather/stations").await;
        assert_eq!(status, 200);
        assert_eq!(codes(&body), vec![180_005, 330_020, 950_001]);
    }

    #[rstest]
    #[case("chacalluta", vec![180_005])]
    #[case("antartica", vec![950_001])]
    #[case("Ant%C3%A1rtica", vec![950_001])]
    #[tokio::test]
    async fn test_search_by_name(#[case] name: &str, #[case] expected: Vec<u64>) {
        let app = TestApp::new();
        let (status, body) = get(app.router(), &format!("/api/v1/weather/stations?name={name}")).await;
        assert_eq!(status, 200);
        assert_eq!(codes(&body), expected);
    }

    #[tokio::test]
    async fn test_search_by_code() {
        let app = TestApp::new();
        let (status, body) = get(app.router(), "/api/v1/weather/stations?code=950001").await;
        assert_eq!(status, 200);
        assert_eq!(
            body,
            r#"{"status":"success","data":{"code":950001,"name":"Base Antártica Arturo Prat","operational":false}}"#
        );

        let (status, body) = get(app.router(), "/api/v1/weather/stations?code=1").await;
        assert_eq!(status, 404);
        assert_eq!(body, r#"{"status":"fail","data":null}"#);
    }

    #[tokio::test]
    async fn test_name_and_code_conflict() {
        let app = TestApp::new();
        let (status, body) =
            get(app.router(), "/api/v1/weather/stations?name=arica&code=180005").await;
        assert_eq!(status, 400);
        assert_eq!(
            body,
            r#"{"status":"fail","data":{"code":"name and code can't be searched at the same time"}}"#
        );
        assert_eq!(app.weather_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_match_and_failures() {
        let app = TestApp::new();
        let (status, _) = get(app.router(), "/api/v1/weather/stations?name=punta%20arenas").await;
        assert_eq!(status, 404);

        let app = TestApp::failing();
        let (status, body) = get(app.router(), "/api/v1/weather/stations").await;
        assert_eq!(status, 502);
        assert_eq!(body, r#"{"status":"error","message":"unable to fetch the data"}"#);
    }

    #[tokio::test]
    async fn test_responses_are_cached_per_query() {
        let app = TestApp::new();
        for _ in 0..3 {
            get(app.router(), "/api/v1/weather/stations?name=santiago").await;
        }
        assert_eq!(app.weather_calls(), 1);

        get(app.router(), "/api/v1/weather/stations?code=180005").await;
        assert_eq!(app.weather_calls(), 2);
    }
}
