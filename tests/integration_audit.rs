//! 集成测试：领域事件
//!
//! 测试事件的创建、记录、查询与序列化。

use chrono::{TimeZone, Utc};
use otpauth::audit::{DomainEvent, EventKind, EventSink, InMemoryEventSink, NoOpEventSink};
use std::sync::Arc;
use std::thread;

/// 测试内置事件的名称与数据
#[test]
fn test_builtin_events() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let generated = DomainEvent::otp_generated("a@b.co", now);
    assert_eq!(generated.name, "otp_generated");
    assert_eq!(generated.data["timestamp"], now.timestamp_millis());

    let success = DomainEvent::otp_validation_success("a@b.co", 1, now);
    assert!(success.is(&EventKind::OtpValidationSuccess));

    let failure = DomainEvent::otp_validation_failure("a@b.co", "max_attempts", now);
    assert_eq!(failure.data["reason"], "max_attempts");

    let logout = DomainEvent::user_logout("a@b.co", 3600, now);
    assert_eq!(logout.data["session_duration"], 3600);

    for event in [generated, success, failure, logout] {
        assert_eq!(event.email(), Some("a@b.co"));
        assert_eq!(event.timestamp, now);
    }
}

/// 测试自定义事件
#[test]
fn test_custom_event() {
    let event = DomainEvent::custom("code_resent", Utc::now())
        .with_data("email", "a@b.co")
        .with_data("count", 2);

    assert!(event.is(&EventKind::Custom("code_resent".into())));
    assert_eq!(event.email(), Some("a@b.co"));
    assert_eq!(event.data["count"], 2);
}

/// 测试事件 JSON 序列化
#[test]
fn test_event_json_shape() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let event = DomainEvent::otp_validation_success("a@b.co", 2, now);

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["name"], "otp_validation_success");
    assert_eq!(json["data"]["email"], "a@b.co");
    assert_eq!(json["data"]["attempts"], 2);

    let back: DomainEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}

/// 测试查询与统计
#[test]
fn test_sink_queries() {
    let sink = InMemoryEventSink::new();
    let now = Utc::now();

    sink.log_batch(vec![
        DomainEvent::otp_generated("a@b.co", now),
        DomainEvent::otp_validation_failure("a@b.co", "incorrect", now),
        DomainEvent::otp_validation_success("a@b.co", 2, now),
        DomainEvent::otp_generated("c@d.co", now),
    ]);

    assert_eq!(sink.len(), 4);
    assert_eq!(sink.events_named(&EventKind::OtpGenerated).len(), 2);
    assert_eq!(sink.events_for_email("a@b.co").len(), 3);

    let counts = sink.count_by_name();
    assert_eq!(counts["otp_generated"], 2);
    assert_eq!(counts["otp_validation_failure"], 1);

    sink.clear();
    assert!(sink.is_empty());
}

/// 测试克隆的实例共享存储
#[test]
fn test_sink_clones_share_state() {
    let sink = InMemoryEventSink::new();
    let shared: Arc<dyn EventSink> = Arc::new(sink.clone());

    shared.log(DomainEvent::otp_generated("a@b.co", Utc::now()));
    assert_eq!(sink.len(), 1);
}

/// 测试并发写入
#[test]
fn test_concurrent_logging() {
    let sink = InMemoryEventSink::new();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let sink = sink.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    sink.log(DomainEvent::otp_generated(format!("user{i}@b.co"), Utc::now()));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sink.len(), 200);
    assert_eq!(sink.events_for_email("user3@b.co").len(), 25);
}

/// 测试空操作日志
#[test]
fn test_noop_sink() {
    let sink = NoOpEventSink;
    sink.log(DomainEvent::otp_generated("a@b.co", Utc::now()));
    sink.log_batch(vec![DomainEvent::user_logout("a@b.co", 1, Utc::now())]);
}
