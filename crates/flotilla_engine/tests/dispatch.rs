mod common;

use std::sync::Arc;
use std::time::Duration;

use flotilla_engine::{
    dispatch, BuildError, DirectStrategy, DispatchError, DisplayConfig, RequestTemplate,
    RowStatus, TargetFailure, TransportError,
};
use http::StatusCode;
use pretty_assertions::assert_eq;

use common::{targets, RecordingRenderer, RefusingStrategy, Reply, ScriptedTransport};

const REFRESH: Duration = Duration::from_millis(10);

fn template() -> RequestTemplate {
    RequestTemplate::new("get", "http", Some(8080), "/healthz").unwrap()
}

fn display(renderer: RecordingRenderer) -> DisplayConfig {
    DisplayConfig::new(Box::new(renderer)).with_refresh_interval(REFRESH)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_target_succeeds_and_bars_reach_full() {
    flotilla_logging::initialize_for_tests();
    let template = template();
    let transport = Arc::new(ScriptedTransport::new());
    let (renderer, recorded) = RecordingRenderer::new();

    let report = dispatch(
        &targets(3),
        |target| template.build(target),
        Arc::new(DirectStrategy::with_transport(transport.clone())),
        display(renderer),
    )
    .await
    .expect("dispatch runs");

    assert_eq!(report.outcomes.len(), 3);
    assert!(report.outcomes.iter().all(|outcome| outcome.is_success()));
    assert_eq!(report.display.error, None);
    assert!(!report.interrupted());

    let rows = &report.display.final_view.rows;
    let titles: Vec<&str> = rows.iter().map(|row| row.title.as_str()).collect();
    assert_eq!(titles, vec!["pod-0", "pod-1", "pod-2"]);
    assert_eq!(rows[1].subtitle, "GET http://10.0.0.2:8080/healthz");
    for row in rows {
        assert_eq!(row.status, RowStatus::Success);
        assert_eq!(row.text, "200 OK");
        assert_eq!(row.content.as_deref(), Some("ok"));
        assert!((row.percentage - 1.0).abs() < 1e-9);
    }

    let recorded = recorded.lock().unwrap();
    assert!(recorded.started);
    assert!(recorded.stopped);
    assert!(!recorded.frames.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_failing_target_does_not_affect_the_others() {
    let template = template();
    let transport = Arc::new(ScriptedTransport::new().reply(
        "pod-2",
        Reply::Fail(TransportError::Request("connection reset".to_string())),
    ));
    let (renderer, _recorded) = RecordingRenderer::new();

    let report = dispatch(
        &targets(5),
        |target| template.build(target),
        Arc::new(DirectStrategy::with_transport(transport)),
        display(renderer),
    )
    .await
    .unwrap();

    assert_eq!(report.success_count(), 4);
    assert_eq!(
        report.outcomes[2].failure(),
        Some(&TargetFailure::Transport(TransportError::Request(
            "connection reset".to_string()
        )))
    );

    let failed = &report.display.final_view.rows[2];
    assert_eq!(failed.status, RowStatus::Failure);
    assert_eq!(failed.text, "request failed");
    assert_eq!(
        failed.content.as_deref(),
        Some("request failed: connection reset")
    );
    assert_eq!(failed.percentage, 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connection_failure_is_reported_per_target() {
    let template = template();
    let transport = Arc::new(ScriptedTransport::new());
    let (renderer, _recorded) = RecordingRenderer::new();

    let report = dispatch(
        &targets(2),
        |target| template.build(target),
        Arc::new(RefusingStrategy::new(&["pod-0"], transport.clone())),
        display(renderer),
    )
    .await
    .unwrap();

    assert!(matches!(
        report.outcomes[0].failure(),
        Some(TargetFailure::Connection(_))
    ));
    assert!(report.outcomes[1].is_success());

    let rows = &report.display.final_view.rows;
    assert_eq!(rows[0].status, RowStatus::Failure);
    assert_eq!(rows[0].text, "connection failed");
    assert_eq!(rows[1].status, RowStatus::Success);
    assert_eq!(*transport.seen.lock().unwrap(), vec!["pod-1".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refused_connection_leaves_five_healthy_targets_alone() {
    let template = template();
    let transport = Arc::new(ScriptedTransport::new());
    let (renderer, _recorded) = RecordingRenderer::new();

    let report = dispatch(
        &targets(6),
        |target| template.build(target),
        Arc::new(RefusingStrategy::new(&["pod-3"], transport.clone())),
        display(renderer),
    )
    .await
    .unwrap();

    assert_eq!(report.success_count(), 5);
    assert!(matches!(
        report.outcomes[3].failure(),
        Some(TargetFailure::Connection(_))
    ));
    let statuses: Vec<RowStatus> = report
        .display
        .final_view
        .rows
        .iter()
        .map(|row| row.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            RowStatus::Success,
            RowStatus::Success,
            RowStatus::Success,
            RowStatus::Failure,
            RowStatus::Success,
            RowStatus::Success,
        ]
    );
    assert_eq!(transport.seen.lock().unwrap().len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn crashed_worker_row_is_marked_failed() {
    let template = template();
    let transport =
        Arc::new(ScriptedTransport::new().reply("pod-1", Reply::Panic("transport bug")));
    let (renderer, _recorded) = RecordingRenderer::new();

    let report = dispatch(
        &targets(2),
        |target| template.build(target),
        Arc::new(DirectStrategy::with_transport(transport)),
        display(renderer),
    )
    .await
    .unwrap();

    assert!(report.outcomes[0].is_success());
    assert!(matches!(
        report.outcomes[1].failure(),
        Some(TargetFailure::Panicked(_))
    ));

    let crashed = &report.display.final_view.rows[1];
    assert_eq!(crashed.status, RowStatus::Failure);
    assert_eq!(crashed.text, "worker crashed");
    let content = crashed.content.as_deref().unwrap_or_default();
    assert!(content.starts_with("worker panicked: "), "{content}");
    assert!(content.contains("transport bug"), "{content}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn error_status_marks_row_failed_but_keeps_response() {
    let template = template();
    let transport = Arc::new(ScriptedTransport::new().reply(
        "pod-0",
        Reply::Body {
            status: StatusCode::SERVICE_UNAVAILABLE,
            chunks: vec![b"draining"],
            declare_length: true,
        },
    ));
    let (renderer, _recorded) = RecordingRenderer::new();

    let report = dispatch(
        &targets(1),
        |target| template.build(target),
        Arc::new(DirectStrategy::with_transport(transport)),
        display(renderer),
    )
    .await
    .unwrap();

    let response = report.outcomes[0].response().expect("response kept");
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body_text(), "draining");

    let row = &report.display.final_view.rows[0];
    assert_eq!(row.status, RowStatus::Failure);
    assert_eq!(row.text, "503 Service Unavailable");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_length_keeps_bar_empty_but_shows_content() {
    let template = template();
    let transport = Arc::new(ScriptedTransport::new().reply(
        "pod-0",
        Reply::Body {
            status: StatusCode::OK,
            chunks: vec![b"chunk one, ", b"chunk two"],
            declare_length: false,
        },
    ));
    let (renderer, _recorded) = RecordingRenderer::new();

    let report = dispatch(
        &targets(1),
        |target| template.build(target),
        Arc::new(DirectStrategy::with_transport(transport)),
        display(renderer),
    )
    .await
    .unwrap();

    let row = &report.display.final_view.rows[0];
    assert_eq!(row.percentage, 0.0);
    assert_eq!(row.content.as_deref(), Some("chunk one, chunk two"));
    assert_eq!(row.status, RowStatus::Success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_declared_body_ends_full() {
    let template = template();
    let transport = Arc::new(ScriptedTransport::new().reply(
        "pod-0",
        Reply::Body {
            status: StatusCode::NO_CONTENT,
            chunks: Vec::new(),
            declare_length: true,
        },
    ));
    let (renderer, _recorded) = RecordingRenderer::new();

    let report = dispatch(
        &targets(1),
        |target| template.build(target),
        Arc::new(DirectStrategy::with_transport(transport)),
        display(renderer),
    )
    .await
    .unwrap();

    let row = &report.display.final_view.rows[0];
    assert!((row.percentage - 1.0).abs() < 1e-9);
    assert_eq!(row.content, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn outcomes_follow_target_order_not_completion_order() {
    let template = template();
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("pod-0", Reply::ok(b"zero"))
            .reply("pod-3", Reply::ok(b"three")),
    );
    let (renderer, _recorded) = RecordingRenderer::new();
    let targets = targets(4);

    let report = dispatch(
        &targets,
        |target| template.build(target),
        Arc::new(DirectStrategy::with_transport(transport)),
        display(renderer),
    )
    .await
    .unwrap();

    let order: Vec<&str> = report
        .outcomes
        .iter()
        .map(|outcome| outcome.target.name.as_str())
        .collect();
    assert_eq!(order, vec!["pod-0", "pod-1", "pod-2", "pod-3"]);
    assert_eq!(report.outcomes[0].response().unwrap().body_text(), "zero");
    assert_eq!(report.outcomes[3].response().unwrap().body_text(), "three");
}

#[tokio::test]
async fn build_error_aborts_before_any_request() {
    let transport = Arc::new(ScriptedTransport::new());
    let (renderer, recorded) = RecordingRenderer::new();

    let result = dispatch(
        &targets(3),
        |target| {
            if target.name == "pod-1" {
                Err(BuildError::InvalidPath("nope".to_string()))
            } else {
                template().build(target)
            }
        },
        Arc::new(DirectStrategy::with_transport(transport.clone())),
        display(renderer),
    )
    .await;

    assert_eq!(
        result.unwrap_err(),
        DispatchError::Build(BuildError::InvalidPath("nope".to_string()))
    );
    assert!(transport.seen.lock().unwrap().is_empty());
    assert!(!recorded.lock().unwrap().started);
}

#[tokio::test]
async fn renderer_that_cannot_start_fails_the_dispatch() {
    let template = template();
    let transport = Arc::new(ScriptedTransport::new());
    let (renderer, _recorded) = RecordingRenderer::new();

    let result = dispatch(
        &targets(1),
        |target| template.build(target),
        Arc::new(DirectStrategy::with_transport(transport.clone())),
        display(renderer.failing_start()),
    )
    .await;

    assert!(matches!(result, Err(DispatchError::Display(_))));
    assert!(transport.seen.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn render_failure_is_reported_and_requests_still_complete() {
    let template = template();
    let transport = Arc::new(ScriptedTransport::new());
    let (renderer, _recorded) = RecordingRenderer::new();

    let report = dispatch(
        &targets(2),
        |target| template.build(target),
        Arc::new(DirectStrategy::with_transport(transport)),
        display(renderer.failing_draw()),
    )
    .await
    .unwrap();

    assert_eq!(report.success_count(), 2);
    assert!(matches!(
        report.render_error(),
        Some(flotilla_engine::RenderError::Io(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interrupt_cancels_pending_workers() {
    let template = template();
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("pod-0", Reply::Hang)
            .reply("pod-1", Reply::Hang),
    );
    let (renderer, recorded) = RecordingRenderer::new();

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        dispatch(
            &targets(2),
            |target| template.build(target),
            Arc::new(DirectStrategy::with_transport(transport)),
            display(renderer.interrupt_after(1)),
        ),
    )
    .await
    .expect("interrupt ends the dispatch")
    .unwrap();

    assert!(report.interrupted());
    for outcome in &report.outcomes {
        assert_eq!(outcome.failure(), Some(&TargetFailure::Cancelled));
    }
    assert!(recorded.lock().unwrap().stopped);
}
