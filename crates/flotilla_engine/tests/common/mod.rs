#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use flotilla_engine::{
    ConnectionError, ConnectionStrategy, Connection, DirectStrategy, ProgressView, RenderError,
    Renderer, RequestDescriptor, Target, Transport, TransportError, TransportResponse, UserInput,
};
use http::{HeaderMap, StatusCode};

/// Everything a [`RecordingRenderer`] saw, shared with the test body.
#[derive(Debug, Default)]
pub struct Recorded {
    pub started: bool,
    pub stopped: bool,
    pub frames: Vec<ProgressView>,
}

/// Renderer that keeps every frame and can simulate input or failures.
pub struct RecordingRenderer {
    recorded: Arc<Mutex<Recorded>>,
    interrupt_after_frames: Option<usize>,
    fail_draw: bool,
    fail_start: bool,
}

impl RecordingRenderer {
    pub fn new() -> (Self, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        (
            Self {
                recorded: recorded.clone(),
                interrupt_after_frames: None,
                fail_draw: false,
                fail_start: false,
            },
            recorded,
        )
    }

    pub fn interrupt_after(mut self, frames: usize) -> Self {
        self.interrupt_after_frames = Some(frames);
        self
    }

    pub fn failing_draw(mut self) -> Self {
        self.fail_draw = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }
}

impl Renderer for RecordingRenderer {
    fn start(&mut self) -> Result<(), RenderError> {
        if self.fail_start {
            return Err(RenderError::Start("no terminal".to_string()));
        }
        self.recorded.lock().unwrap().started = true;
        Ok(())
    }

    fn draw(&mut self, view: &ProgressView) -> Result<(), RenderError> {
        if self.fail_draw {
            return Err(RenderError::Io("broken pipe".to_string()));
        }
        self.recorded.lock().unwrap().frames.push(view.clone());
        Ok(())
    }

    fn poll_input(&mut self) -> Option<UserInput> {
        let frames = self.recorded.lock().unwrap().frames.len();
        match self.interrupt_after_frames {
            Some(limit) if frames >= limit => Some(UserInput::Interrupt),
            _ => None,
        }
    }

    fn stop(&mut self) -> Result<(), RenderError> {
        self.recorded.lock().unwrap().stopped = true;
        Ok(())
    }
}

/// How the scripted transport answers one target.
#[derive(Debug, Clone)]
pub enum Reply {
    Body {
        status: StatusCode,
        chunks: Vec<&'static [u8]>,
        declare_length: bool,
    },
    Fail(TransportError),
    Hang,
    Panic(&'static str),
}

impl Reply {
    pub fn ok(body: &'static [u8]) -> Self {
        Reply::Body {
            status: StatusCode::OK,
            chunks: vec![body],
            declare_length: true,
        }
    }
}

/// Transport that answers from a per-target script; unknown targets get `200 ok`.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: HashMap<String, Reply>,
    pub seen: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, target: &str, reply: Reply) -> Self {
        self.replies.insert(target.to_string(), reply);
        self
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, TransportError> {
        self.seen.lock().unwrap().push(request.target.name.clone());
        let reply = self
            .replies
            .get(&request.target.name)
            .cloned()
            .unwrap_or_else(|| Reply::ok(b"ok"));

        match reply {
            Reply::Body {
                status,
                chunks,
                declare_length,
            } => {
                let total: usize = chunks.iter().map(|chunk| chunk.len()).sum();
                let stream = futures_util::stream::iter(
                    chunks
                        .into_iter()
                        .map(|chunk| Ok::<_, TransportError>(Bytes::from_static(chunk))),
                );
                Ok(TransportResponse {
                    status,
                    headers: HeaderMap::new(),
                    content_length: declare_length.then_some(total as u64),
                    body: Box::pin(stream),
                })
            }
            Reply::Fail(err) => Err(err),
            Reply::Panic(message) => panic!("{message}"),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportError::Timeout("hung".to_string()))
            }
        }
    }
}

/// Refuses to connect to the named targets and delegates everything else.
pub struct RefusingStrategy {
    refused: Vec<String>,
    inner: DirectStrategy,
}

impl RefusingStrategy {
    pub fn new(refused: &[&str], transport: Arc<dyn Transport>) -> Self {
        Self {
            refused: refused.iter().map(|name| name.to_string()).collect(),
            inner: DirectStrategy::with_transport(transport),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionStrategy for RefusingStrategy {
    async fn connect(&self, target: &Target) -> Result<Connection, ConnectionError> {
        if self.refused.contains(&target.name) {
            return Err(ConnectionError::Setup(format!("{} refused", target.name)));
        }
        self.inner.connect(target).await
    }
}

pub fn targets(count: usize) -> Vec<Target> {
    (0..count)
        .map(|index| Target::new(format!("pod-{index}"), format!("10.0.0.{}", index + 1)))
        .collect()
}
