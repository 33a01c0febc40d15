use ai_queue_bot::config::Config;

#[test]
#[should_panic(expected = "DISCORD_TOKEN")]
fn test_config_missing_token_panics() {
    Config::from_lookup(|_| None);
}

#[test]
fn test_config_without_gemini_key_disables_ai() {
    let config = Config::from_lookup(|key| match key {
        "DISCORD_TOKEN" => Some("token".to_string()),
        _ => None,
    });
    assert!(config.gemini_api_key.is_none());
    assert_eq!(config.queue_options().default_max_retries, 3);
}
