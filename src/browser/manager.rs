//! Browser manager and the Playwright-backed render session.
//!
//! `BrowserManager` hands out sessions, limiting how many bridges run at once
//! with a semaphore. Each `PlaywrightSession` owns one bridge process; a
//! background task reads its stdout, completing pending commands and
//! dispatching request/response events to the installed handlers.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::playwright::{
    ensure_node_available, ensure_playwright_available, map_playwright_error,
    map_playwright_message, map_spawn_error, BRIDGE_SCRIPT,
};
use super::protocol::{BridgeEvent, Command as BridgeCommand, Reply};
use super::session::{
    InterceptHandler, Readiness, RenderSession, ResponseHandler, RouteAction, SessionFactory,
};
use crate::{DeviceProfile, PagetrimError, Result};

/// Default timeout for page navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for waiting for network idle state.
pub const DEFAULT_NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for any single bridge command other than navigation.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(45);

/// Extra time granted to a navigation reply on top of the page's own timeouts.
const NAVIGATION_SLACK: Duration = Duration::from_secs(5);

/// Configuration options for browser sessions.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// The Node.js command to use (default: "node").
    pub node_command: String,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Timeout for page navigation.
    pub navigation_timeout: Duration,
    /// Timeout for waiting for network idle state.
    pub network_idle_timeout: Duration,
    /// Timeout for bridge startup and every non-navigation command.
    pub process_timeout: Duration,
    /// Maximum number of concurrent browser sessions.
    pub max_concurrent_sessions: usize,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            headless: true,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle_timeout: DEFAULT_NETWORK_IDLE_TIMEOUT,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
            max_concurrent_sessions: 1,
        }
    }
}

/// Manages concurrent browser sessions with semaphore-based limiting.
#[derive(Debug, Clone)]
pub struct BrowserManager {
    options: BrowserOptions,
    semaphore: Arc<Semaphore>,
}

impl BrowserManager {
    /// Creates a new BrowserManager with the given options.
    pub fn new(options: BrowserOptions) -> Self {
        let permits = options.max_concurrent_sessions.max(1);
        Self {
            options,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }
}

#[async_trait]
impl SessionFactory for BrowserManager {
    type Session = PlaywrightSession;

    async fn new_session(&self, device: DeviceProfile) -> Result<PlaywrightSession> {
        // Fail fast if Node is missing to avoid spawning the bridge unnecessarily.
        ensure_node_available(&self.options.node_command).await?;
        ensure_playwright_available(&self.options.node_command).await?;

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PagetrimError::Config("Browser manager unavailable".to_string()))?;

        PlaywrightSession::spawn(&self.options, device, permit).await
    }
}

type SharedStdin = Arc<tokio::sync::Mutex<ChildStdin>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;

#[derive(Default)]
struct Handlers {
    intercept: Mutex<Option<InterceptHandler>>,
    response: Mutex<Option<ResponseHandler>>,
}

/// One Chromium page behind a Playwright bridge process.
pub struct PlaywrightSession {
    child: tokio::sync::Mutex<Child>,
    stdin: SharedStdin,
    pending: Pending,
    handlers: Arc<Handlers>,
    next_id: AtomicU64,
    options: BrowserOptions,
    reader: JoinHandle<()>,
    _permit: OwnedSemaphorePermit,
}

impl PlaywrightSession {
    async fn spawn(
        options: &BrowserOptions,
        device: DeviceProfile,
        permit: OwnedSemaphorePermit,
    ) -> Result<Self> {
        log::debug!(
            "Launching Playwright bridge ({}, scale {}, headless {})",
            device.viewport,
            device.device_scale_factor,
            options.headless
        );

        let mut cmd = Command::new(&options.node_command);
        cmd.arg("-e")
            .arg(BRIDGE_SCRIPT)
            .arg(serde_json::to_string(&device)?)
            .arg(if options.headless { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &options.node_command))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PagetrimError::session("bridge stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PagetrimError::session("bridge stdout unavailable"))?;
        let stderr_pipe = child.stderr.take();

        let stderr_task = tokio::spawn(async move {
            let mut collected = String::new();
            if let Some(err) = stderr_pipe {
                let mut lines = BufReader::new(err).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    log::debug!("bridge stderr: {}", line);
                    collected.push_str(&line);
                    collected.push('\n');
                }
            }
            collected
        });

        let stdin: SharedStdin = Arc::new(tokio::sync::Mutex::new(stdin));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let handlers = Arc::new(Handlers::default());
        let (ready_tx, ready_rx) = oneshot::channel();

        let reader = tokio::spawn(pump_events(
            stdout,
            stdin.clone(),
            pending.clone(),
            handlers.clone(),
            ready_tx,
        ));

        match timeout(options.process_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(message))) => {
                let _ = child.kill().await;
                return Err(map_playwright_message(message));
            }
            Ok(Err(_)) => {
                let status = child.wait().await?;
                let stderr = stderr_task.await.unwrap_or_default();
                return Err(map_playwright_error(status.to_string(), &stderr));
            }
            Err(_) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                return Err(PagetrimError::Browser(format!(
                    "Playwright bridge did not start within {:?} (timeout)",
                    options.process_timeout
                )));
            }
        }

        Ok(Self {
            child: tokio::sync::Mutex::new(child),
            stdin,
            pending,
            handlers,
            next_id: AtomicU64::new(1),
            options: options.clone(),
            reader,
            _permit: permit,
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, id: u64, command: BridgeCommand<'_>, limit: Duration) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);

        if let Err(err) = write_command(&self.stdin, &command).await {
            self.forget(id);
            return Err(err);
        }

        let reply = match timeout(limit, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                return Err(PagetrimError::session(
                    "Playwright bridge exited before replying",
                ))
            }
            Err(_) => {
                self.forget(id);
                return Err(PagetrimError::Browser(format!(
                    "Playwright command timed out after {:?}",
                    limit
                )));
            }
        };

        if reply.ok {
            Ok(reply.result)
        } else {
            Err(map_playwright_message(
                reply
                    .error
                    .unwrap_or_else(|| "unknown bridge error".to_string()),
            ))
        }
    }

    fn forget(&self, id: u64) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl RenderSession for PlaywrightSession {
    async fn navigate(&self, url: &str, readiness: Readiness) -> Result<()> {
        let id = self.next_id();
        let limit =
            self.options.navigation_timeout + self.options.network_idle_timeout + NAVIGATION_SLACK;
        self.send(
            id,
            BridgeCommand::Navigate {
                id,
                url,
                wait_until: readiness.as_str(),
                timeout_ms: self.options.navigation_timeout.as_millis() as u64,
                idle_timeout_ms: self.options.network_idle_timeout.as_millis() as u64,
            },
            limit,
        )
        .await?;
        Ok(())
    }

    async fn intercept_requests(&self, handler: InterceptHandler) -> Result<()> {
        *self
            .handlers
            .intercept
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
        let id = self.next_id();
        self.send(
            id,
            BridgeCommand::Intercept { id, enabled: true },
            self.options.process_timeout,
        )
        .await?;
        Ok(())
    }

    async fn on_response(&self, handler: ResponseHandler) -> Result<()> {
        *self
            .handlers
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
        let id = self.next_id();
        self.send(
            id,
            BridgeCommand::Observe { id, enabled: true },
            self.options.process_timeout,
        )
        .await?;
        Ok(())
    }

    async fn evaluate(&self, function: &str, args: Vec<Value>) -> Result<Value> {
        let id = self.next_id();
        self.send(
            id,
            BridgeCommand::Evaluate {
                id,
                function,
                args: &args,
            },
            self.options.process_timeout,
        )
        .await
    }

    async fn serialize_document(&self) -> Result<String> {
        let id = self.next_id();
        let value = self
            .send(
                id,
                BridgeCommand::Content { id },
                self.options.process_timeout,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn response_body(&self, response_id: u64) -> Result<Vec<u8>> {
        let id = self.next_id();
        let value = self
            .send(
                id,
                BridgeCommand::Body { id, response_id },
                self.options.process_timeout,
            )
            .await?;
        let encoded: String = serde_json::from_value(value)?;
        BASE64_STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| PagetrimError::session(format!("invalid body encoding: {}", e)))
    }

    async fn close(&self) -> Result<()> {
        let id = self.next_id();
        let closed = self
            .send(id, BridgeCommand::Close { id }, self.options.process_timeout)
            .await;

        let mut child = self.child.lock().await;
        match timeout(self.options.process_timeout, child.wait()).await {
            Ok(Ok(status)) => log::debug!("Playwright bridge exited with {}", status),
            _ => {
                log::warn!("Playwright bridge did not exit cleanly; killing it");
                let _ = child.kill().await;
            }
        }
        closed.map(|_| ())
    }
}

async fn write_command(stdin: &SharedStdin, command: &BridgeCommand<'_>) -> Result<()> {
    let mut line = serde_json::to_vec(command)?;
    line.push(b'\n');
    let mut guard = stdin.lock().await;
    guard.write_all(&line).await?;
    guard.flush().await?;
    Ok(())
}

async fn pump_events(
    stdout: ChildStdout,
    stdin: SharedStdin,
    pending: Pending,
    handlers: Arc<Handlers>,
    ready: oneshot::Sender<std::result::Result<(), String>>,
) {
    let mut ready = Some(ready);
    let mut lines = BufReader::new(stdout).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        log::trace!("bridge -> {}", line);
        let event = match serde_json::from_str::<BridgeEvent>(&line) {
            Ok(event) => event,
            Err(err) => {
                log::debug!("Ignoring bridge output {:?}: {}", line, err);
                continue;
            }
        };

        match event {
            BridgeEvent::Ready => {
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            BridgeEvent::Fatal { message } => match ready.take() {
                Some(tx) => {
                    let _ = tx.send(Err(message));
                }
                None => log::error!("Playwright bridge failed: {}", message),
            },
            BridgeEvent::Reply {
                id,
                ok,
                result,
                error,
            } => {
                let sender = pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
                match sender {
                    Some(tx) => {
                        let _ = tx.send(Reply { ok, result, error });
                    }
                    None => log::debug!("Dropping reply for abandoned command {}", id),
                }
            }
            BridgeEvent::Request { route_id, request } => {
                let handler = handlers
                    .intercept
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                let action = handler
                    .map(|decide| decide(&request))
                    .unwrap_or(RouteAction::Continue);
                let command = BridgeCommand::Route {
                    route_id,
                    action: &action,
                };
                if let Err(err) = write_command(&stdin, &command).await {
                    log::warn!("Failed to route {}: {}", request.url, err);
                }
            }
            BridgeEvent::Response(response) => {
                let handler = handlers
                    .response
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                if let Some(observe) = handler {
                    observe(response);
                }
            }
        }
    }

    // Dropping the senders fails every command still waiting on a reply.
    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
