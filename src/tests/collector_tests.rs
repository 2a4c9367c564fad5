use crate::collectors::{Collectors, ConsoleCollector, PerformanceSampler};
use crate::config::{ConsoleCaptureConfig, ReportConfig};
use crate::runtime::PipelineRuntimeState;
use crate::snapshot::{ConsoleLevel, FrameworkSnapshot, Rating};
use crate::tests::fake_page::FakePage;
use serde_json::json;
use std::time::Duration;

fn console_collector() -> ConsoleCollector {
    ConsoleCollector::new(&ConsoleCaptureConfig {
        capture_window_ms: 0,
        ..ConsoleCaptureConfig::default()
    })
    .unwrap()
}

fn quick_config() -> ReportConfig {
    let mut config = ReportConfig::default();
    config.console.capture_window_ms = 0;
    config.sampling_window_ms = 10;
    config
}

#[tokio::test]
async fn test_console_install_twice_wraps_once() {
    let page = FakePage::new("https://example.com", "Example");
    let state = PipelineRuntimeState::new();
    let collector = console_collector();

    assert!(collector.install(&page, &state).await.unwrap());
    assert!(!collector.install(&page, &state).await.unwrap());
    assert_eq!(page.install_runs(), 1);

    page.log(ConsoleLevel::Warn, &[json!("disk almost full")]);
    page.log(ConsoleLevel::Log, &[json!("user"), json!({"id": 7})]);

    let entries = collector.collect(&page).await;
    let messages: Vec<_> = entries.iter().map(|e| e.message()).collect();
    assert_eq!(messages, vec!["disk almost full", r#"user {"id":7}"#]);
}

#[tokio::test]
async fn test_in_page_guard_survives_fresh_runtime_state() {
    let page = FakePage::new("https://example.com", "Example");
    let collector = console_collector();

    assert!(collector.install(&page, &PipelineRuntimeState::new()).await.unwrap());
    assert!(!collector.install(&page, &PipelineRuntimeState::new()).await.unwrap());

    assert_eq!(page.install_runs(), 2);
    assert_eq!(page.hook_depth(), 1);

    page.log(ConsoleLevel::Error, &[json!("boom")]);
    assert_eq!(collector.collect(&page).await.len(), 1);
}

#[tokio::test]
async fn test_console_without_hook_is_empty() {
    let page = FakePage::new("https://example.com", "Example");
    page.log(ConsoleLevel::Error, &[json!("before install")]);
    assert!(console_collector().collect(&page).await.is_empty());
}

#[tokio::test]
async fn test_snapshot_gathers_every_signal() {
    let page = FakePage::new("https://shop.example.com/checkout", "Checkout")
        .with_source(
            r#"<html><body>
                <h1>Checkout</h1>
                <div class="alert alert-danger">Payment declined</div>
                <input name="card" aria-invalid="true">
                <script>console.log("not visible")</script>
            </body></html>"#,
        )
        .with_performance(json!({
            "vitals": {"LCP": 1200.0},
            "networkFailures": [{"name": "https://api.example.com/pay", "status": 502}]
        }))
        .with_script_result("return !!(window.Vue", json!(true))
        .with_script_result("framework: 'Vue'", json!({"framework": "Vue", "version": "3.4.0", "componentCount": 3}));

    let collectors = Collectors::from_config(&quick_config()).unwrap();
    let state = PipelineRuntimeState::new();
    collectors.prepare(&page, &state).await;
    page.log(ConsoleLevel::Error, &[json!("TypeError: cart is undefined")]);

    let snapshot = collectors.snapshot(&page).await.unwrap();

    assert_eq!(snapshot.url, "https://shop.example.com/checkout");
    assert_eq!(snapshot.title, "Checkout");
    assert!(snapshot.content_excerpt.contains("Payment declined"));
    assert!(!snapshot.content_excerpt.contains("not visible"));
    assert!(snapshot.dom_issues.iter().any(|i| i.contains("Payment declined")));
    assert!(snapshot.dom_issues.iter().any(|i| i.contains("card")));
    assert_eq!(snapshot.console_entries.len(), 1);
    assert_eq!(snapshot.console_entries[0].level, ConsoleLevel::Error);

    let perf = snapshot.performance_snapshot.unwrap();
    assert_eq!(perf.core_vitals["LCP"].rating, Rating::Good);
    assert_eq!(perf.network_failures[0].status, Some(502));

    match snapshot.framework_snapshot {
        Some(FrameworkSnapshot::Detected(report)) => {
            assert_eq!(report.framework, "Vue");
            assert_eq!(report.version.as_deref(), Some("3.4.0"));
        }
        other => panic!("expected Vue, got {:?}", other),
    }
}

#[tokio::test]
async fn test_snapshot_degrades_on_partial_failures() {
    let page = FakePage::new("https://example.com", "Example")
        .without_title()
        .with_performance(json!("not a sample"));
    let collectors = Collectors::from_config(&quick_config()).unwrap();

    let snapshot = collectors.snapshot(&page).await.unwrap();
    assert_eq!(snapshot.title, "");
    assert!(snapshot.performance_snapshot.is_none());
    assert_eq!(snapshot.framework_snapshot, Some(FrameworkSnapshot::NotDetected));
    assert!(snapshot.console_entries.is_empty());
}

#[tokio::test]
async fn test_snapshot_fails_without_url() {
    let page = FakePage::new("https://example.com", "Example").without_url();
    let collectors = Collectors::from_config(&quick_config()).unwrap();
    assert!(collectors.snapshot(&page).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_sampler_times_out() {
    let page = FakePage::new("https://example.com", "Example").with_stalled_sampler();
    let sampler = PerformanceSampler::new(Duration::from_millis(3000));

    let started = tokio::time::Instant::now();
    let sample = sampler.collect(&page).await;
    let elapsed = started.elapsed();

    assert!(sample.is_none());
    // Window plus the two-second grace, and not a moment longer
    assert!(elapsed >= Duration::from_millis(5000));
    assert!(elapsed < Duration::from_millis(5100));
}
