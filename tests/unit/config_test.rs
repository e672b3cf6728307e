use rag_reader::config::{Config, DEFAULT_TUNNEL_BYPASS_HEADER, DEFAULT_USER_AGENT};
use validator::Validate;

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(config.tunnel_bypass_header, DEFAULT_TUNNEL_BYPASS_HEADER);
    assert_eq!(config.proxy_port, 8081);
    assert_eq!(config.max_concurrent_fetches, 4);
}

#[test]
fn test_config_port_range_validation() {
    for port in [1024u16, 8081, 65535] {
        let config = Config {
            proxy_port: port,
            ..Config::default()
        };
        assert!(config.validate().is_ok(), "port {} should be valid", port);
    }

    for port in [0u16, 80, 443] {
        let config = Config {
            proxy_port: port,
            ..Config::default()
        };
        assert!(config.validate().is_err(), "port {} should be rejected", port);
    }
}

#[test]
fn test_empty_api_url_rejected() {
    let config = Config {
        api_url: String::new(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_api_base_trims_slash() {
    let config = Config {
        api_url: "https://rag.example.com/".to_string(),
        ..Config::default()
    };
    assert_eq!(config.api_base(), "https://rag.example.com");
}
