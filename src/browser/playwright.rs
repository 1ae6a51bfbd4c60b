//! Playwright bridge script, error mapping, and availability checks.
//!
//! The bridge is a long-lived Node.js process owning one Chromium page. It
//! reads JSON commands from stdin and writes JSON events to stdout, one per
//! line. Commands run concurrently on the Node side so routing decisions can
//! still be answered while a navigation is waiting on the network.

use crate::{PagetrimError, Result};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Bridge script run with `node -e`. Arguments: device profile JSON, headless flag.
pub(crate) const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const [, profileJson, headlessFlag] = process.argv;

function emit(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

function errorMessage(err) {
  return err && err.message ? err.message : String(err);
}

async function run() {
  let browser;
  try {
    const { chromium } = require('playwright');
    const profile = JSON.parse(profileJson);
    browser = await chromium.launch({ headless: headlessFlag !== '0' });
    const context = await browser.newContext({
      viewport: profile.viewport,
      deviceScaleFactor: profile.deviceScaleFactor,
      isMobile: profile.isMobile,
      hasTouch: profile.hasTouch
    });
    const page = await context.newPage();

    const routes = new Map();
    const responses = new Map();
    let nextRouteId = 0;
    let nextResponseId = 0;
    let intercepting = false;
    let observing = false;

    await page.route('**/*', async (route) => {
      if (!intercepting) {
        return route.continue();
      }
      const request = route.request();
      const routeId = nextRouteId++;
      const action = await new Promise((resolve) => {
        routes.set(routeId, resolve);
        emit({ type: 'request', routeId, url: request.url(), resourceType: request.resourceType() });
      });
      try {
        if (action.kind === 'fulfill') {
          await route.fulfill({ status: action.status, contentType: action.contentType, body: action.body });
        } else if (action.kind === 'retype') {
          const response = await route.fetch();
          const headers = Object.assign({}, response.headers(), { 'content-type': action.contentType });
          await route.fulfill({ response, headers });
        } else {
          await route.continue();
        }
      } catch (err) {
        process.stderr.write(`route ${request.url()} failed: ${errorMessage(err)}\n`);
        try {
          await route.continue();
        } catch (_) {}
      }
    });

    page.on('response', (response) => {
      if (!observing) {
        return;
      }
      const responseId = nextResponseId++;
      responses.set(responseId, response);
      const request = response.request();
      let origin = request;
      while (origin.redirectedFrom()) {
        origin = origin.redirectedFrom();
      }
      emit({
        type: 'response',
        responseId,
        requestUrl: origin.url(),
        finalUrl: response.url(),
        resourceType: request.resourceType(),
        status: response.status(),
        headers: response.headers()
      });
    });

    const handlers = {
      navigate: async (cmd) => {
        await page.goto(cmd.url, { waitUntil: cmd.waitUntil, timeout: cmd.timeoutMs });
        if (cmd.waitUntil === 'networkidle') {
          await page.waitForLoadState('networkidle', { timeout: cmd.idleTimeoutMs });
        }
        return null;
      },
      evaluate: async (cmd) => page.evaluate(`(${cmd.function})(...${JSON.stringify(cmd.args || [])})`),
      content: async () => page.content(),
      body: async (cmd) => {
        const response = responses.get(cmd.responseId);
        if (!response) {
          throw new Error(`unknown response ${cmd.responseId}`);
        }
        return (await response.body()).toString('base64');
      },
      intercept: async (cmd) => {
        intercepting = !!cmd.enabled;
        return null;
      },
      observe: async (cmd) => {
        observing = !!cmd.enabled;
        return null;
      },
      close: async () => {
        await browser.close();
        browser = null;
        return null;
      }
    };

    emit({ type: 'ready' });

    const input = readline.createInterface({ input: process.stdin });
    for await (const line of input) {
      if (!line.trim()) {
        continue;
      }
      let cmd;
      try {
        cmd = JSON.parse(line);
      } catch (err) {
        process.stderr.write(`unparseable command: ${errorMessage(err)}\n`);
        continue;
      }
      if (cmd.op === 'route') {
        const resolve = routes.get(cmd.routeId);
        if (resolve) {
          routes.delete(cmd.routeId);
          resolve(cmd.action);
        }
        continue;
      }
      const handler = handlers[cmd.op];
      Promise.resolve()
        .then(() => (handler ? handler(cmd) : Promise.reject(new Error(`unknown op ${cmd.op}`))))
        .then((result) => emit({ type: 'reply', id: cmd.id, ok: true, result }))
        .catch((err) => emit({ type: 'reply', id: cmd.id, ok: false, error: errorMessage(err) }));
      if (cmd.op === 'close') {
        input.close();
      }
    }
  } catch (err) {
    const message = errorMessage(err);
    emit({ type: 'fatal', message });
    console.error(JSON.stringify({ status: 'error', message }));
    process.exitCode = 1;
  } finally {
    if (browser) {
      await browser.close().catch(() => {});
    }
  }
}

run();
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Script to check if Playwright is installed.
const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Error result the bridge prints to stderr before exiting.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ScriptError {
    pub message: String,
}

/// Maps a spawn error to an appropriate PagetrimError.
pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> PagetrimError {
    if err.kind() == io::ErrorKind::NotFound {
        PagetrimError::Browser(format!(
            "Unable to spawn Playwright bridge; '{}' was not found on PATH",
            command
        ))
    } else {
        PagetrimError::Io(err)
    }
}

/// Maps bridge stderr output to an appropriate PagetrimError.
pub(crate) fn map_playwright_error(status_text: impl Into<String>, stderr: &str) -> PagetrimError {
    if let Some(error) = stderr
        .lines()
        .rev()
        .find_map(|line| serde_json::from_str::<ScriptError>(line).ok())
    {
        return map_playwright_message(error.message);
    }

    let lower = stderr.to_ascii_lowercase();

    if lower.contains("cannot find module 'playwright'") {
        return PagetrimError::Browser(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        );
    }

    if lower.contains("timeout") {
        return PagetrimError::Browser(
            "Playwright timed out; try increasing --nav-timeout/--network-idle-timeout or --process-timeout, and ensure the page finishes loading."
                .to_string(),
        );
    }

    PagetrimError::Browser(format!(
        "Playwright bridge exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

/// Maps a bridge error message to an appropriate PagetrimError.
pub(crate) fn map_playwright_message(message: String) -> PagetrimError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        PagetrimError::Browser(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        )
    } else if lower.contains("timeout") {
        PagetrimError::Browser(format!(
            "Playwright error: {}. Hint: increase --nav-timeout/--network-idle-timeout or --process-timeout, and ensure the page finishes loading.",
            message
        ))
    } else {
        PagetrimError::Browser(format!("Playwright error: {}", message))
    }
}

/// Ensures Node.js is available on the system.
pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            PagetrimError::Browser(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(PagetrimError::Browser(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

/// Ensures the Playwright npm package resolves.
pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            PagetrimError::Browser(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_playwright_error(
            format!("{:?}", output.status),
            &stderr,
        ));
    }

    Ok(())
}
