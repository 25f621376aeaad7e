use coinverter::AppCommand;
use coinverter::cli::convert::ConvertArgs;
use coinverter::cli::tokens::TokensCommand;
use coinverter::core::token::FiatCode;
use std::fs;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_price(server: &MockServer, asset_id: &str, body: &str, expected: u64) {
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", asset_id))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected)
            .mount(server)
            .await;
    }

    pub async fn mount_search(server: &MockServer, query: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("query", query))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    /// Writes a config pointing at `server` with data kept in `data_dir`.
    pub fn write_config(
        server: &MockServer,
        data_dir: &std::path::Path,
    ) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let config_content = format!(
            r#"
providers:
  coingecko:
    base_url: "{}"
converter:
  crypto: BTC
  fiat: USD
data_path: "{}"
"#,
            server.uri(),
            data_dir.display()
        );
        std::fs::write(config_file.path(), config_content).expect("Failed to write config file");
        config_file
    }
}

fn convert(amount: &str, crypto: &str, fiat: FiatCode, from_fiat: bool) -> AppCommand {
    AppCommand::Convert(ConvertArgs {
        amount: amount.to_string(),
        crypto: Some(crypto.to_string()),
        fiat: Some(fiat),
        from_fiat,
    })
}

#[test_log::test(tokio::test)]
async fn test_convert_flow_with_mock() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_price(
        &mock_server,
        "bitcoin",
        r#"{"bitcoin": {"usd": 50000.0}}"#,
        2,
    )
    .await;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = test_utils::write_config(&mock_server, data_dir.path());
    let config_path = config_file.path().to_str().unwrap();

    let result = coinverter::run_command(convert("1", "BTC", FiatCode::Usd, false), Some(config_path)).await;
    assert!(result.is_ok(), "Convert failed with: {:?}", result.err());

    let result = coinverter::run_command(convert("25", "btc", FiatCode::Usd, true), Some(config_path)).await;
    assert!(result.is_ok(), "Convert failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_convert_reports_markers_without_failing() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_price(&mock_server, "bitcoin", r#"{"bitcoin": {"usd": 50000.0}}"#, 1).await;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = test_utils::write_config(&mock_server, data_dir.path());
    let config_path = config_file.path().to_str().unwrap();

    // PHP is missing from the response
    let result = coinverter::run_command(convert("1", "BTC", FiatCode::Php, false), Some(config_path)).await;
    assert!(result.is_ok(), "Convert failed with: {:?}", result.err());

    // Unknown symbols never reach the provider
    let result = coinverter::run_command(convert("1", "NOPE", FiatCode::Usd, false), Some(config_path)).await;
    assert!(result.is_ok(), "Convert failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_convert_rejects_invalid_amount() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_price(&mock_server, "bitcoin", "{}", 0).await;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = test_utils::write_config(&mock_server, data_dir.path());

    let result = coinverter::run_command(
        convert("abc", "BTC", FiatCode::Usd, false),
        config_file.path().to_str(),
    )
    .await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("Invalid amount"));
}

#[test_log::test(tokio::test)]
async fn test_custom_token_lifecycle_persists() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_search(
        &mock_server,
        "pepe",
        r#"{"coins": [
            {"id": "pepe", "symbol": "pepe", "name": "Pepe", "thumb": "https://img/pepe.png"},
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"}
        ]}"#,
    )
    .await;
    // Only the conversion made while PEPE is registered reaches the provider
    test_utils::mount_price(&mock_server, "pepe", r#"{"pepe": {"usd": 0.00001}}"#, 1).await;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = test_utils::write_config(&mock_server, data_dir.path());
    let config_path = config_file.path().to_str().unwrap();

    let add = AppCommand::Tokens(TokensCommand::Add {
        query: "pepe".to_string(),
        ids: vec!["pepe".to_string()],
    });
    let result = coinverter::run_command(add, Some(config_path)).await;
    assert!(result.is_ok(), "Add failed with: {:?}", result.err());
    info!("Added PEPE, reopening store");

    let result = coinverter::run_command(AppCommand::Tokens(TokensCommand::List), Some(config_path)).await;
    assert!(result.is_ok(), "List failed with: {:?}", result.err());

    let result = coinverter::run_command(convert("1000000", "PEPE", FiatCode::Usd, false), Some(config_path)).await;
    assert!(result.is_ok(), "Convert failed with: {:?}", result.err());

    let delete = AppCommand::Tokens(TokensCommand::Delete {
        id: "pepe".to_string(),
    });
    let result = coinverter::run_command(delete, Some(config_path)).await;
    assert!(result.is_ok(), "Delete failed with: {:?}", result.err());

    let result = coinverter::run_command(convert("1", "PEPE", FiatCode::Usd, false), Some(config_path)).await;
    assert!(result.is_ok(), "Convert failed with: {:?}", result.err());

    assert!(fs::read_dir(data_dir.path()).unwrap().next().is_some());
}

#[test_log::test(tokio::test)]
async fn test_add_with_unmatched_ids_fails() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_search(&mock_server, "doge", r#"{"coins": []}"#).await;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = test_utils::write_config(&mock_server, data_dir.path());

    let add = AppCommand::Tokens(TokensCommand::Add {
        query: "doge".to_string(),
        ids: vec!["dogecoin".to_string()],
    });
    let result = coinverter::run_command(add, config_file.path().to_str()).await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_feed_flow_with_mock() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_price(
        &mock_server,
        "solana",
        r#"{"solana": {"usd": 150.0, "eur": 138.2, "cad": 205.1}}"#,
        1,
    )
    .await;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = test_utils::write_config(&mock_server, data_dir.path());

    let feed = AppCommand::Feed {
        symbol: Some("SOL".to_string()),
        ticks: Some(1),
    };
    let result = coinverter::run_command(feed, config_file.path().to_str()).await;
    assert!(result.is_ok(), "Feed failed with: {:?}", result.err());
}
