//! 配置加载测试

use beacon::config::{Config, LogFormat};
use beacon::discovery::RefreshFailurePolicy;
use beacon::error::BeaconError;
use beacon::registry::ServiceRegistration;
use std::time::Duration;

const FULL_CONFIG: &str = r#"
[service]
name = "orders"
id = "orders-1"
address = "0.0.0.0"
advertise_address = "10.1.2.3"
port = 8080
tags = ["http", "v2"]
ttl = "10s"

[registry]
adapter_uri = "consul://consul.local:8500"
heartbeat_interval_ms = 3000

[discovery]
refresh_interval_ms = 1000
failure_policy = "retain_last_known"

[logging]
level = "debug"
format = "json"
"#;

/// 测试：完整配置
#[test]
fn test_full_config() {
    let config = Config::from_toml_str(FULL_CONFIG).expect("Failed to parse config");

    assert_eq!(config.registry.adapter_uri, "consul://consul.local:8500");
    assert_eq!(config.registry.heartbeat_interval(), Duration::from_secs(3));
    assert_eq!(config.discovery.refresh_interval(), Duration::from_secs(1));
    assert_eq!(
        config.discovery.failure_policy,
        RefreshFailurePolicy::RetainLastKnown
    );
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);

    let registration = config.service.registration();
    assert!(registration.valid());
    assert_eq!(registration.id, "orders-1");
    assert_eq!(registration.advertise_address(), "10.1.2.3");
    assert_eq!(registration.tags, vec!["http", "v2"]);
    assert_eq!(registration.ttl_duration(), Ok(Duration::from_secs(10)));
}

/// 测试：只给出服务信息时其余取默认值
#[test]
fn test_defaults() {
    let config = Config::from_toml_str(
        r#"
[service]
name = "orders"
address = "127.0.0.1"
port = 8080
"#,
    )
    .expect("Failed to parse config");

    assert_eq!(config.service.ttl, "5s");
    assert!(!config.service.skip_registration);
    assert_eq!(config.registry.adapter_uri, "consul://127.0.0.1:8500");
    assert_eq!(config.registry.heartbeat_interval(), Duration::from_secs(2));
    assert_eq!(config.discovery.refresh_interval(), Duration::from_secs(5));
    assert_eq!(config.discovery.failure_policy, RefreshFailurePolicy::FailClosed);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Text);

    // 未配置 ID 时生成 "<name>-<uuid>"，公布地址回退到 address
    let registration = config.service.registration();
    assert!(registration.id.starts_with("orders-"));
    assert_eq!(registration.id.len(), "orders-".len() + 36);
    assert_eq!(registration.advertise_address(), "127.0.0.1");
    assert_ne!(registration.id, config.service.registration().id);
}

/// 测试：非法配置被拒绝
#[test]
fn test_invalid_configs() {
    let empty_name = r#"
[service]
name = ""
address = "127.0.0.1"
port = 8080
"#;
    assert!(matches!(
        Config::from_toml_str(empty_name),
        Err(BeaconError::InvalidConfig(_))
    ));

    let bad_ttl = r#"
[service]
name = "orders"
address = "127.0.0.1"
port = 8080
ttl = "0s"
"#;
    assert!(matches!(
        Config::from_toml_str(bad_ttl),
        Err(BeaconError::InvalidTtl { .. })
    ));

    let bad_policy = r#"
[service]
name = "orders"
address = "127.0.0.1"
port = 8080

[discovery]
failure_policy = "sometimes"
"#;
    assert!(Config::from_toml_str(bad_policy).is_err());

    let zero_refresh = r#"
[service]
name = "orders"
address = "127.0.0.1"
port = 8080

[discovery]
refresh_interval_ms = 0
"#;
    assert!(Config::from_toml_str(zero_refresh).is_err());
}

/// 测试：TTL 解析
#[test]
fn test_ttl_parsing() {
    let registration = ServiceRegistration::new("svc", "svc-1", "127.0.0.1", 80);
    assert_eq!(registration.effective_ttl(), "5s");

    for (ttl, expected) in [
        ("15s", Duration::from_secs(15)),
        ("500ms", Duration::from_millis(500)),
        ("1m 30s", Duration::from_secs(90)),
    ] {
        assert_eq!(beacon::registry::parse_ttl(ttl), Ok(expected));
    }
    assert!(beacon::registry::parse_ttl("fast").is_err());
}

/// 测试：刷新失败策略的字符串形式
#[test]
fn test_failure_policy_from_str() {
    assert_eq!(
        "fail-closed".parse::<RefreshFailurePolicy>(),
        Ok(RefreshFailurePolicy::FailClosed)
    );
    assert_eq!(
        "retain_last_known".parse::<RefreshFailurePolicy>(),
        Ok(RefreshFailurePolicy::RetainLastKnown)
    );
    assert!("never".parse::<RefreshFailurePolicy>().is_err());
}

/// 测试：从文件读取配置
#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("beacon-config-{}.toml", std::process::id()));
    std::fs::write(&path, FULL_CONFIG).expect("Failed to write config");

    let config = Config::load_from_file(&path).expect("Failed to load config");
    assert_eq!(config.service.name, "orders");

    std::fs::remove_file(&path).ok();

    assert!(matches!(
        Config::load_from_file("/nonexistent/beacon.toml"),
        Err(BeaconError::InvalidConfig(_))
    ));
}

/// 测试：日志初始化只能成功一次，非法级别直接拒绝
#[test]
fn test_logging_init() {
    use beacon::config::LoggingConfig;

    let bad_level = LoggingConfig {
        level: "loud".to_string(),
        format: LogFormat::Text,
    };
    assert!(beacon::logging::init(&bad_level).is_err());

    let config = LoggingConfig::default();
    assert!(beacon::logging::init(&config).is_ok());
    assert!(beacon::logging::init(&config).is_err());
}
