use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use flotilla_core::{RowStatus, DEFAULT_REFRESH_INTERVAL};
use flotilla_logging::{flotilla_debug, flotilla_info, flotilla_warn};

use crate::connect::ConnectionStrategy;
use crate::progress::{DisplayReport, ProgressEngine, Renderer, RowHandle};
use crate::tap::{progress_fraction, LengthTap};
use crate::{
    BuildError, DispatchError, Outcome, RenderError, RequestDescriptor, Target, TargetFailure,
    TargetResponse, TransportError,
};

/// Where and how often progress is drawn.
pub struct DisplayConfig {
    pub renderer: Box<dyn Renderer>,
    pub refresh_interval: Duration,
}

impl DisplayConfig {
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        Self {
            renderer,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    /// One outcome per target, in the order the targets were given.
    pub outcomes: Vec<Outcome>,
    pub display: DisplayReport,
}

impl DispatchReport {
    pub fn render_error(&self) -> Option<&RenderError> {
        self.display.error.as_ref()
    }

    pub fn interrupted(&self) -> bool {
        self.display.interrupted
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }
}

/// Sends one request to every target concurrently while a progress row per
/// target is drawn.
///
/// Every request is built before anything touches the network, so a bad
/// template fails the whole dispatch up front. Per-target failures end up in
/// the matching [`Outcome`] and never abort the others.
pub async fn dispatch<B>(
    targets: &[Target],
    build_request: B,
    strategy: Arc<dyn ConnectionStrategy>,
    display: DisplayConfig,
) -> Result<DispatchReport, DispatchError>
where
    B: Fn(&Target) -> Result<RequestDescriptor, BuildError>,
{
    let requests = targets
        .iter()
        .map(&build_request)
        .collect::<Result<Vec<_>, _>>()?;

    let mut engine = ProgressEngine::new(display.refresh_interval);
    let rows: Vec<RowHandle> = requests
        .iter()
        .map(|request| engine.add_row(request.target.name.clone(), request.subtitle()))
        .collect();

    let running = engine
        .run(display.renderer)
        .map_err(DispatchError::Display)?;
    let cancel = running.interrupted();

    flotilla_info!("dispatching to {} target(s)", requests.len());

    let workers = requests.into_iter().zip(rows.iter().cloned()).map(|(request, row)| {
        let strategy = strategy.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { run_worker(strategy, request, row, cancel).await })
    });
    let joined = join_all(workers).await;

    let outcomes: Vec<Outcome> = joined
        .into_iter()
        .zip(targets.iter().zip(&rows))
        .map(|(joined, (target, row))| match joined {
            Ok(outcome) => outcome,
            Err(err) => {
                flotilla_warn!("worker for {} did not complete: {}", target.name, err);
                let failure = TargetFailure::Panicked(err.to_string());
                show_failure(row, &failure);
                Outcome {
                    target: target.clone(),
                    result: Err(failure),
                }
            }
        })
        .collect();
    drop(rows);

    running.finish();
    let display = running.wait().await;

    let succeeded = outcomes.iter().filter(|outcome| outcome.is_success()).count();
    flotilla_info!(
        "dispatch done: {} succeeded, {} failed",
        succeeded,
        outcomes.len() - succeeded
    );

    Ok(DispatchReport { outcomes, display })
}

async fn run_worker(
    strategy: Arc<dyn ConnectionStrategy>,
    request: RequestDescriptor,
    row: RowHandle,
    cancel: CancellationToken,
) -> Outcome {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TargetFailure::Cancelled),
        result = execute(strategy.as_ref(), &request, &row) => result,
    };

    if let Err(failure) = &result {
        flotilla_warn!("{}: {}", request.target.name, failure);
        show_failure(&row, failure);
    }

    Outcome {
        target: request.target,
        result,
    }
}

fn show_failure(row: &RowHandle, failure: &TargetFailure) {
    row.set_status(RowStatus::Failure);
    row.set_text(failure.label());
    row.set_content(failure.to_string());
}

async fn execute(
    strategy: &dyn ConnectionStrategy,
    request: &RequestDescriptor,
    row: &RowHandle,
) -> Result<TargetResponse, TargetFailure> {
    let connection = strategy.connect(&request.target).await?;
    let response = connection.transport().send(request).await?;

    row.set_text(response.status_line());
    if response.status.is_success() {
        row.set_status(RowStatus::Success);
    } else if response.status.is_client_error() || response.status.is_server_error() {
        row.set_status(RowStatus::Failure);
    }

    let status = response.status;
    let headers = response.headers;
    let content_length = response.content_length;
    let mut stream = response.body;

    let mut tap = LengthTap::new(Vec::new(), |_, received| {
        if let Some(fraction) = progress_fraction(received, content_length) {
            row.set_percentage(fraction);
        }
    });
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        tap.write_all(&chunk)
            .map_err(|err| TransportError::Body(err.to_string()))?;
    }
    let received = tap.total();
    let body = tap.into_inner();

    if let Some(fraction) = progress_fraction(received, content_length) {
        row.set_percentage(fraction);
    }
    flotilla_debug!(
        "{} answered {} with {} byte(s)",
        request.target.name,
        status,
        received
    );

    let response = TargetResponse {
        status,
        headers,
        body,
    };
    row.set_content(response.body_text());
    drop(connection);
    Ok(response)
}
