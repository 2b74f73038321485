use clap::Parser;
use ras_oauth2_cli::cli::Args;
use ras_oauth2_cli::config::{CliConfig, ProviderKind};
use ras_oauth2_client::{
    ApplicationCredentials, FileTokenStore, ProviderOptions, TokenSet, TokenStore,
};
use std::path::Path;
use tempfile::tempdir;

fn config_with_token_file(token_file: &Path) -> CliConfig {
    CliConfig {
        credentials: ApplicationCredentials::new("app_id", "app_secret"),
        options: ProviderOptions {
            redirect_uri: Some("http://localhost:3000/callback".to_string()),
            ..ProviderOptions::default()
        },
        token_file: token_file.to_path_buf(),
        ..CliConfig::default()
    }
}

fn stored_tokens() -> TokenSet {
    TokenSet {
        access_token: Some("AT1".to_string()),
        refresh_token: Some("RT1".to_string()),
        access_token_expires_in: None,
        access_token_expires_at: None,
    }
}

async fn run(config: &CliConfig, argv: &[&str]) -> anyhow::Result<String> {
    let args = Args::try_parse_from(std::iter::once("ras-oauth2").chain(argv.iter().copied()))?;
    args.execute(config).await
}

#[test]
fn test_finish_requires_code_or_callback() {
    assert!(Args::try_parse_from(["ras-oauth2", "finish"]).is_err());
    assert!(Args::try_parse_from(["ras-oauth2", "finish", "--code", "abc"]).is_ok());
    assert!(
        Args::try_parse_from([
            "ras-oauth2",
            "finish",
            "--code",
            "abc",
            "--callback-url",
            "http://localhost:3000/callback?code=abc"
        ])
        .is_err()
    );
}

#[tokio::test]
async fn test_authorize_url() {
    let dir = tempdir().unwrap();
    let config = config_with_token_file(&dir.path().join("tokens.json"));

    let output = run(&config, &["authorize-url"]).await.unwrap();

    assert!(output.starts_with("https://accounts.google.com/o/oauth2/auth?"));
    assert!(output.contains("client_id=app_id"));
    assert!(output.contains("access_type=offline"));
    assert!(!output.contains("app_secret"));
}

#[tokio::test]
async fn test_status_without_session() {
    let dir = tempdir().unwrap();
    let config = config_with_token_file(&dir.path().join("tokens.json"));

    let output = run(&config, &["status"]).await.unwrap();

    assert!(output.contains("provider: google"));
    assert!(output.contains("state: Unauthenticated"));
}

#[tokio::test]
async fn test_status_with_stored_session() {
    let dir = tempdir().unwrap();
    let token_file = dir.path().join("tokens.json");
    FileTokenStore::new(&token_file)
        .set("facebook.tokens", &stored_tokens())
        .await
        .unwrap();

    let mut config = config_with_token_file(&token_file);
    config.provider = ProviderKind::Facebook;

    let output = run(&config, &["status"]).await.unwrap();

    assert!(output.contains("provider: facebook"));
    assert!(output.contains("state: Authenticated"));
    assert!(output.contains("refresh token: true"));
}

#[tokio::test]
async fn test_refresh_without_session_is_skipped() {
    let dir = tempdir().unwrap();
    let config = config_with_token_file(&dir.path().join("tokens.json"));

    let output = run(&config, &["refresh"]).await.unwrap();

    assert_eq!(output, "Refresh skipped: NoAccessToken");
}

#[tokio::test]
async fn test_finish_with_provider_error() {
    let dir = tempdir().unwrap();
    let token_file = dir.path().join("tokens.json");
    let config = config_with_token_file(&token_file);

    let result = run(
        &config,
        &[
            "finish",
            "--callback-url",
            "http://localhost:3000/callback?error=access_denied",
        ],
    )
    .await;

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("access_denied"));
    assert!(!token_file.exists());
}

#[tokio::test]
async fn test_logout_removes_only_that_provider() {
    let dir = tempdir().unwrap();
    let token_file = dir.path().join("tokens.json");
    let store = FileTokenStore::new(&token_file);
    store.set("google.tokens", &stored_tokens()).await.unwrap();
    store.set("facebook.tokens", &stored_tokens()).await.unwrap();

    let config = config_with_token_file(&token_file);
    let output = run(&config, &["logout"]).await.unwrap();

    assert_eq!(output, "Logged out of google");
    assert_eq!(store.get("google.tokens").await.unwrap(), None);
    assert_eq!(
        store.get("facebook.tokens").await.unwrap(),
        Some(stored_tokens())
    );
}

#[tokio::test]
async fn test_run_with_config_file() {
    let dir = tempdir().unwrap();
    let token_file = dir.path().join("tokens.json");
    let config_file = dir.path().join("oauth2.toml");
    std::fs::write(
        &config_file,
        format!(
            r#"
provider = "facebook"
token_file = "{}"

[credentials]
application_id = "fb_app"
application_secret = "fb_secret"

[options]
redirect_uri = "http://localhost:3000/callback"
"#,
            token_file.display()
        ),
    )
    .unwrap();

    let args = Args::try_parse_from([
        "ras-oauth2",
        "--config",
        config_file.to_str().unwrap(),
        "authorize-url",
    ])
    .unwrap();
    let output = args.run().await.unwrap();

    assert!(output.starts_with("https://www.facebook.com/dialog/oauth?"));
    assert!(output.contains("client_id=fb_app"));
    assert!(output.contains("display=page"));
}
