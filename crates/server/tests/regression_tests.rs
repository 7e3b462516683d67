#![allow(
    clippy::tests_outside_test_module,
    clippy::unwrap_used,
    clippy::impl_trait_in_params,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    reason = "This is an integration test."
)]

use std::io::Read;

use assert_cmd::cargo::CommandCargoExt;
use base64::Engine;
use httpmock::{Method::GET, Method::POST, Mock, MockExt, MockServer};
use rstest::{fixture, rstest};

const COMMAND_NAME: &str = "server";

const INDICATORS_PAGE: &str = r#"
    <html><body>
    <a id="hypLnk1_10" href="Serie.aspx?param=uf">UF</a>
    <a id="hypLnk1_11" href="Serie.aspx?gcode=MON&amp;param=today">Tipos de cambio</a>
    <label id="lblValor1_1">37.571,86</label>
    <label id="lblValor1_3">940,50</label>
    </body></html>
"#;

const LISTING_PAGE: &str = r#"
    <table>
        <tr><th>Name</th><th>Symbol</th><th>Price</th></tr>
        <tr>
            <td><a class="cmc-table__column-name--name" href="/currencies/bitcoin/">Bitcoin</a></td>
            <td class="cmc-table__cell--sort-by__symbol">BTC</td>
            <td class="cmc-table__cell--sort-by__price"><a>$60,000.00</a></td>
        </tr>
        <tr>
            <td><a class="cmc-table__column-name--name" href="/currencies/ethereum/">Ethereum</a></td>
            <td class="cmc-table__cell--sort-by__symbol">ETH</td>
            <td class="cmc-table__cell--sort-by__price"><a>$3,000.00</a></td>
        </tr>
    </table>
"#;

const REPORTS_PAGE: &str = r#"
    <table class="table table-bordered">
        <tr><th>#</th><th>C&oacute;digo</th><th>Estaci&oacute;n</th><th>Hora</th></tr>
        <tr>
            <td>1</td><td>330020</td><td>Quinta Normal, Santiago</td><td>13:00</td>
            <td>18.0</td><td>45</td><td>1,015.3</td>
            <td>19.2</td><td>12:40</td><td>6.2</td><td>07:00</td>
            <td>19.5</td><td>15:50</td><td>5.1</td><td>06:30</td>
            <td>s/p</td><td>s/p</td><td>1.5</td><td>1.2</td>
        </tr>
        <tr>
            <td>2</td><td>950001</td><td>Base Ant&aacute;rtica Arturo Prat</td><td>.</td>
        </tr>
    </table>
"#;

const CURRENCIES_PAGE: &str = r#"
    <table>
        <tr><th>Moneda</th><th>Valor</th></tr>
        <tr><td>Euro</td><td>1.023,45</td></tr>
        <tr><td>D&oacute;lar estadounidense</td><td>940,50</td></tr>
        <tr><td>D&oacute;lar canadiense</td><td>690,12</td></tr>
        <tr><td>Yen</td><td>6,12</td></tr>
    </table>
"#;

const PROFILE_PAGE: &str = r#"
    <div id="contenedor">
        <div><strong>Nombre o Raz&oacute;n Social&nbsp;:</strong></div>
        <div>COMERCIAL LOS ANDES LIMITADA</div>
        <table class="tabla">
            <tr><td>Actividades</td><td>C&oacute;digo</td><td>Categor&iacute;a</td><td>Afecta IVA</td><td>Fecha</td></tr>
            <tr><td>VENTA AL POR MENOR DE ALIMENTOS</td><td>472101</td><td>Primera</td><td>Si</td><td>14-03-2019</td></tr>
        </table>
    </div>
"#;

struct ServerInstance {
    process: Option<std::process::Child>,
    stderr_drainer: Option<std::thread::JoinHandle<String>>,
    stdout_drainer: Option<std::thread::JoinHandle<String>>,
    armed: bool,
}

impl ServerInstance {
    pub const fn new(
        process: std::process::Child,
        stderr_drainer: std::thread::JoinHandle<String>,
        stdout_drainer: std::thread::JoinHandle<String>,
    ) -> Self {
        Self {
            process: Some(process),
            stderr_drainer: Some(stderr_drainer),
            stdout_drainer: Some(stdout_drainer),
            armed: true,
        }
    }

    pub fn disarm(mut self) {
        self.armed = false;
        drop(self);
    }
}

impl Drop for ServerInstance {
    fn drop(&mut self) {
        let Self {
            process,
            armed,
            stderr_drainer,
            stdout_drainer,
        } = self;
        let mut process = process.take().expect("To always be Some");

        // SAFETY:
        // 1. We are sending a signal to a valid process id.
        // 2. We are sending a signal that the process is expected to handle.
        #[allow(unsafe_code, reason = "This is a test")]
        unsafe {
            libc::kill(process.id() as i32, libc::SIGINT);
        }

        let output = process.wait().unwrap();
        let stdout = stdout_drainer
            .take()
            .expect("To always be Some")
            .join()
            .unwrap();
        let stderr = stderr_drainer
            .take()
            .expect("To always be Some")
            .join()
            .unwrap();

        if !output.success() | *armed || stderr.contains("panic") || stderr.contains("panicked") {
            panic!(
                "Server exited with status: {}\nstdout:\n{}\nstderr:\n{}",
                output, stdout, stderr
            );
        }
    }
}

/// Read a child stream into a String until it closes, keeping at most the last 10MB.
fn drain(stream: impl Read + Send + 'static) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut output = String::new();
        let mut buffer = [0; 1024];
        let mut reader = std::io::BufReader::new(stream);
        while let Ok(n) = reader.read(&mut buffer) {
            if n == 0 {
                break;
            }
            output.push_str(String::from_utf8_lossy(&buffer[..n]).as_ref());
            if output.len() > 10_000_000 {
                // remove the first 1_000_000 characters
                output = output.split_off(1_000_000);
            }
        }
        output
    })
}

#[fixture]
fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// A stand in for every scraped site, along with the id of the daily indicators mock.
#[fixture]
async fn upstream() -> (MockServer, usize) {
    let server = MockServer::start_async().await;

    let indicators = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/Indicadoressiete/secure/IndicadoresDiarios.aspx");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body(INDICATORS_PAGE);
        })
        .await;
    let indicators_id = indicators.id();
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/Indicadoressiete/secure/Serie.aspx")
                .query_param("gcode", "MON");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body(CURRENCIES_PAGE);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/all/views/all/");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body(LISTING_PAGE);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/application/diario/climatDiarioRecienteEmas/");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body(REPORTS_PAGE);
        })
        .await;

    let token = base64::engine::general_purpose::STANDARD
        .encode(format!("{}abcd0123456789", "x".repeat(36)));
    server
        .mock_async(|when, then| {
            when.method(GET).path("/cvc_cgi/stc/CViewCaptcha.cgi");
            then.status(200)
                .body(format!(r#"{{"txtCaptcha":"{token}"}}"#));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/cvc_cgi/stc/getstc")
                .body_contains("txt_code=abcd");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body(PROFILE_PAGE);
        })
        .await;

    (server, indicators_id)
}

#[fixture]
#[awt]
async fn started_server(
    #[future] upstream: (MockServer, usize),
    free_port: u16,
) -> (MockServer, usize, u16, ServerInstance) {
    let (upstream, indicators_id) = upstream;
    let mut cmd = std::process::Command::cargo_bin(COMMAND_NAME).unwrap();
    cmd.env_clear()
        // Rust directives
        .env("RUST_LOG", "DEBUG")
        // Server directives
        .env("SERVER__HOST", "127.0.0.1")
        .env("SERVER__PORT", free_port.to_string())
        .env("RATE_LIMIT__BUCKET_SIZE", "20")
        .env("RATE_LIMIT__REFILL_INTERVAL", "5s")
        .env("CACHE__TIME_TO_LIVE", "1h")
        .env("CACHE__BOOK_KEEPING_INTERVAL", "1m")
        .env("UPSTREAM__SII_URL", upstream.base_url())
        .env("UPSTREAM__BCENTRAL_URL", upstream.base_url())
        .env("UPSTREAM__COINMARKETCAP_URL", upstream.base_url())
        .env("UPSTREAM__METEOCHILE_URL", upstream.base_url())
        .env("UPSTREAM__TIMEOUT", "5s")
        .env("LOG__FORMAT", "json");

    let mut handle = cmd
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .unwrap();

    let stdout_handle = drain(handle.stdout.take().unwrap());
    let stderr_handle = drain(handle.stderr.take().unwrap());

    let server_instance = ServerInstance::new(handle, stderr_handle, stdout_handle);

    // Wait for the server to start up by periodically pinging the /health endpoint.
    const MAX_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
    let start = std::time::Instant::now();
    loop {
        if let Ok(response) =
            reqwest::get(&format!("http://127.0.0.1:{}/api/health", free_port)).await
        {
            if response.status().is_success() {
                break;
            }
        }

        if start.elapsed() > MAX_TIMEOUT {
            panic!("Server did not start up in time.");
        }
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }

    (upstream, indicators_id, free_port, server_instance)
}

/// GET a path on the server, returning the status and body.
async fn get(port: u16, path: &str) -> (reqwest::StatusCode, String) {
    let response = reqwest::get(&format!("http://127.0.0.1:{}{}", port, path))
        .await
        .unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

#[rstest]
#[awt]
#[timeout(std::time::Duration::from_secs(30))]
#[tokio::test]
async fn test_rut_tools(#[future] started_server: (MockServer, usize, u16, ServerInstance)) {
    let (_upstream, _, free_port, started_server) = started_server;

    let (status, body) = get(free_port, "/api/v1/rut/validate?rut=5.126.663-3").await;
    assert_eq!(status, 200);
    insta::assert_snapshot!(body, @r#"{"status":"success","data":{"valid":true,"rut":"5126663-3"}}"#);

    let (status, body) = get(free_port, "/api/v1/rut/digit?rut=10.000.013").await;
    assert_eq!(status, 200);
    insta::assert_snapshot!(body, @r#"{"status":"success","data":{"digit":"K","rut":"10000013-K"}}"#);

    let (status, body) = get(free_port, "/api/v1/rut/validate").await;
    assert_eq!(status, 400);
    insta::assert_snapshot!(body, @r#"{"status":"fail","data":{"rut":"no rut was provided"}}"#);

    let (status, body) = get(free_port, "/api/v1/rut/generate?min=1000000&max=1000001").await;
    assert_eq!(status, 200);
    insta::assert_snapshot!(body, @r#"{"status":"success","data":{"rut":"1000000-9","pretty":"1.000.000-9","digit":"9","digits":"1000000"}}"#);

    let (status, body) = get(free_port, "/api/v1/does-not-exist").await;
    assert_eq!(status, 404);
    insta::assert_snapshot!(body, @r#"{"status":"fail","data":null}"#);

    started_server.disarm();
}

#[rstest]
#[awt]
#[timeout(std::time::Duration::from_secs(30))]
#[tokio::test]
async fn test_currencies_are_scraped_and_cached(
    #[future] started_server: (MockServer, usize, u16, ServerInstance),
) {
    let (upstream, indicators_id, free_port, started_server) = started_server;

    for _ in 0..3 {
        let (status, body) = get(free_port, "/api/v1/economy/currencies?name=euro").await;
        assert_eq!(status, 200);
        insta::allow_duplicates! {
            insta::assert_snapshot!(body, @r#"{"status":"success","data":[{"name":"Euro","iso4217":"EUR","exchange_rate":1023.45}]}"#);
        }
    }

    let (status, body) = get(free_port, "/api/v1/economy/currencies?name=bitcoin").await;
    assert_eq!(status, 404);
    insta::assert_snapshot!(body, @r#"{"status":"fail","data":null}"#);

    // One scrape for the cached euro query, one for the bitcoin query.
    let indicators = Mock::new(indicators_id, &upstream);
    assert_eq!(indicators.hits_async().await, 2);

    started_server.disarm();
}

#[rstest]
#[awt]
#[timeout(std::time::Duration::from_secs(30))]
#[tokio::test]
async fn test_indicators_crypto_and_weather_are_scraped(
    #[future] started_server: (MockServer, usize, u16, ServerInstance),
) {
    let (_upstream, _, free_port, started_server) = started_server;

    let (status, body) = get(free_port, "/api/v1/economy/indicators").await;
    assert_eq!(status, 200);
    insta::assert_snapshot!(body, @r#"{"status":"success","data":{"uf":37571.86,"ivp":null,"dollar":940.5,"euro":null,"itcnm":null,"ozt_silver":null,"ozt_gold":null,"lb_copper":null}}"#);

    let (status, body) = get(free_port, "/api/v1/economy/crypto?name=bitcoin").await;
    assert_eq!(status, 200);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["symbol"], "BTC");
    assert_eq!(body["data"][0]["price_usd"], 60_000.0);
    assert_eq!(body["data"][0]["price_clp"], 56_430_000.0);

    let (status, body) = get(free_port, "/api/v1/weather/stations?name=antartica").await;
    assert_eq!(status, 200);
    insta::assert_snapshot!(body, @r#"{"status":"success","data":[{"code":950001,"name":"Base Antártica Arturo Prat","operational":false}]}"#);

    let (status, body) = get(free_port, "/api/v1/weather/stations?code=330020").await;
    assert_eq!(status, 200);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["data"]["name"], "Quinta Normal, Santiago");
    assert_eq!(body["data"]["last_report"], "13:00:00");
    assert_eq!(body["data"]["humidity"], 0.45);
    assert_eq!(body["data"]["yesterday"]["precipitations"]["sum"], 1.5);

    started_server.disarm();
}

#[rstest]
#[awt]
#[timeout(std::time::Duration::from_secs(30))]
#[tokio::test]
async fn test_activities_are_scraped(
    #[future] started_server: (MockServer, usize, u16, ServerInstance),
) {
    let (_upstream, _, free_port, started_server) = started_server;

    let (status, body) = get(free_port, "/api/v1/rut/activities?rut=5.126.663-3").await;
    assert_eq!(status, 200);
    insta::assert_snapshot!(body, @r#"{"status":"success","data":{"rut":"5126663-3","name":"Comercial Los Andes Limitada","activities":[{"name":"Venta Al Por Menor De Alimentos","code":472101,"category":"Primera","subject_to_vat":true,"date":"2019-03-14"}]}}"#);

    started_server.disarm();
}

#[rstest]
#[awt]
#[timeout(std::time::Duration::from_secs(30))]
#[tokio::test]
async fn test_that_ratelimiting_works(
    #[future] started_server: (MockServer, usize, u16, ServerInstance),
) {
    let (_upstream, _, free_port, started_server) = started_server;

    // The bucket holds 20 requests, some of which were spent waiting for the server to start.
    let mut accepted = 0;
    let mut limited = false;
    for _ in 0..25 {
        let (status, _) = get(free_port, "/api/v1/rut/validate?rut=5126663-3").await;
        if status == 429 {
            limited = true;
            break;
        }
        assert_eq!(status, 200);
        accepted += 1;
    }
    assert!(limited, "Expected a 429 response after {accepted} requests");
    assert!(accepted >= 15, "Only {accepted} requests were accepted");

    // One request is refilled every 5 seconds.
    tokio::time::sleep(std::time::Duration::from_secs(6)).await;
    let (status, _) = get(free_port, "/api/v1/rut/validate?rut=5126663-3").await;
    assert_eq!(status, 200);

    started_server.disarm();
}
