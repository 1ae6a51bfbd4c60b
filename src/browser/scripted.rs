//! In-memory `RenderSession` used by stage tests.
//!
//! Page functions are answered by identity: a test registers a canned JSON
//! value for each function source it expects the stage to evaluate. Queued
//! answers are consumed in order and the last one repeats. Navigation replays
//! the configured requests through the intercept handler and the configured
//! responses through the response handler.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::session::{
    InterceptHandler, InterceptedRequest, ObservedResponse, Readiness, RenderSession,
    ResponseHandler, RouteAction, SessionFactory,
};
use crate::{DeviceProfile, PagetrimError, Result};

#[derive(Default)]
struct Inner {
    answers: Mutex<HashMap<String, VecDeque<Value>>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    document: Mutex<String>,
    requests: Mutex<Vec<InterceptedRequest>>,
    responses: Mutex<Vec<ObservedResponse>>,
    bodies: Mutex<HashMap<u64, Vec<u8>>>,
    routed: Mutex<Vec<(String, RouteAction)>>,
    navigations: Mutex<Vec<(String, Readiness)>>,
    intercept: Mutex<Option<InterceptHandler>>,
    response: Mutex<Option<ResponseHandler>>,
    closed: AtomicBool,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedSession {
    inner: Arc<Inner>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `value` as the answer to the next evaluation of `function`.
    pub fn answer(self, function: &str, value: Value) -> Self {
        self.inner
            .answers
            .lock()
            .unwrap()
            .entry(function.to_string())
            .or_default()
            .push_back(value);
        self
    }

    pub fn document(self, html: &str) -> Self {
        *self.inner.document.lock().unwrap() = html.to_string();
        self
    }

    pub fn request(self, url: &str, resource_type: &str) -> Self {
        self.inner.requests.lock().unwrap().push(InterceptedRequest {
            url: url.to_string(),
            resource_type: resource_type.to_string(),
        });
        self
    }

    /// Adds a completed response; `body` of `None` makes body fetches fail.
    pub fn response(
        self,
        url: &str,
        resource_type: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Self {
        let mut responses = self.inner.responses.lock().unwrap();
        let response_id = responses.len() as u64;
        responses.push(ObservedResponse {
            response_id,
            request_url: url.to_string(),
            final_url: url.to_string(),
            resource_type: resource_type.to_string(),
            status: 200,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
        });
        drop(responses);
        if let Some(body) = body {
            self.inner
                .bodies
                .lock()
                .unwrap()
                .insert(response_id, body.to_vec());
        }
        self
    }

    /// Arguments of every evaluation of `function`, in call order.
    pub fn calls_to(&self, function: &str) -> Vec<Vec<Value>> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(source, _)| source == function)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn routed(&self) -> Vec<(String, RouteAction)> {
        self.inner.routed.lock().unwrap().clone()
    }

    pub fn navigations(&self) -> Vec<(String, Readiness)> {
        self.inner.navigations.lock().unwrap().clone()
    }

    pub fn was_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderSession for ScriptedSession {
    async fn navigate(&self, url: &str, readiness: Readiness) -> Result<()> {
        self.inner
            .navigations
            .lock()
            .unwrap()
            .push((url.to_string(), readiness));

        let intercept = self.inner.intercept.lock().unwrap().clone();
        if let Some(decide) = intercept {
            let requests = self.inner.requests.lock().unwrap().clone();
            for request in requests {
                let action = decide(&request);
                self.inner.routed.lock().unwrap().push((request.url, action));
            }
        }

        let observe = self.inner.response.lock().unwrap().clone();
        if let Some(observe) = observe {
            let responses = self.inner.responses.lock().unwrap().clone();
            for response in responses {
                observe(response);
            }
        }
        Ok(())
    }

    async fn intercept_requests(&self, handler: InterceptHandler) -> Result<()> {
        *self.inner.intercept.lock().unwrap() = Some(handler);
        Ok(())
    }

    async fn on_response(&self, handler: ResponseHandler) -> Result<()> {
        *self.inner.response.lock().unwrap() = Some(handler);
        Ok(())
    }

    async fn evaluate(&self, function: &str, args: Vec<Value>) -> Result<Value> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .push((function.to_string(), args));

        let mut answers = self.inner.answers.lock().unwrap();
        let value = match answers.get_mut(function) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Value::Null),
            Some(queue) => queue.front().cloned().unwrap_or(Value::Null),
            None => Value::Null,
        };
        Ok(value)
    }

    async fn serialize_document(&self) -> Result<String> {
        Ok(self.inner.document.lock().unwrap().clone())
    }

    async fn response_body(&self, response_id: u64) -> Result<Vec<u8>> {
        self.inner
            .bodies
            .lock()
            .unwrap()
            .get(&response_id)
            .cloned()
            .ok_or_else(|| PagetrimError::session(format!("no body for response {response_id}")))
    }

    async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out pre-built sessions in order, one per render pass.
#[derive(Default)]
pub(crate) struct ScriptedFactory {
    sessions: Mutex<VecDeque<ScriptedSession>>,
    devices: Mutex<Vec<DeviceProfile>>,
}

impl ScriptedFactory {
    pub fn new(sessions: impl IntoIterator<Item = ScriptedSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into_iter().collect()),
            devices: Mutex::new(Vec::new()),
        }
    }

    pub fn devices(&self) -> Vec<DeviceProfile> {
        self.devices.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    type Session = ScriptedSession;

    async fn new_session(&self, device: DeviceProfile) -> Result<ScriptedSession> {
        self.devices.lock().unwrap().push(device);
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PagetrimError::session("no scripted session left"))
    }
}
