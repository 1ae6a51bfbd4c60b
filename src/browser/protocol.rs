//! Line-delimited JSON messages exchanged with the Playwright bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::session::{InterceptedRequest, ObservedResponse, RouteAction};

/// Commands written to the bridge's stdin, one per line.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub(crate) enum Command<'a> {
    #[serde(rename_all = "camelCase")]
    Navigate {
        id: u64,
        url: &'a str,
        wait_until: &'a str,
        timeout_ms: u64,
        idle_timeout_ms: u64,
    },
    Evaluate {
        id: u64,
        function: &'a str,
        args: &'a [Value],
    },
    Content {
        id: u64,
    },
    #[serde(rename_all = "camelCase")]
    Body {
        id: u64,
        response_id: u64,
    },
    Intercept {
        id: u64,
        enabled: bool,
    },
    Observe {
        id: u64,
        enabled: bool,
    },
    Close {
        id: u64,
    },
    /// Answer to a paused request; the bridge sends no reply.
    #[serde(rename_all = "camelCase")]
    Route {
        route_id: u64,
        action: &'a RouteAction,
    },
}

/// Messages read from the bridge's stdout.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub(crate) enum BridgeEvent {
    Ready,
    Reply {
        id: u64,
        ok: bool,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Request {
        route_id: u64,
        #[serde(flatten)]
        request: InterceptedRequest,
    },
    Response(ObservedResponse),
    Fatal {
        message: String,
    },
}

/// Outcome of one command.
#[derive(Debug)]
pub(crate) struct Reply {
    pub ok: bool,
    pub result: Value,
    pub error: Option<String>,
}
