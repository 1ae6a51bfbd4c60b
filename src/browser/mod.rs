//! Rendering engine access for the snapshot pipeline.
//!
//! Stages talk to a page only through the [`RenderSession`] trait. The
//! shipped implementation drives Chromium via Playwright in a Node.js child
//! process.
//!
//! # Module Structure
//!
//! - [`session`] - The `RenderSession` / `SessionFactory` contract
//! - `manager` - Browser session management with concurrency control
//! - `playwright` - Bridge script, error mapping and availability checks
//! - `protocol` - JSON line messages exchanged with the bridge
//!
//! # Example
//!
//! ```no_run
//! use pagetrim_lib::browser::{Readiness, RenderSession, SessionFactory};
//! use pagetrim_lib::{BrowserManager, BrowserOptions, DeviceProfile};
//!
//! # async fn example() -> pagetrim_lib::Result<()> {
//! let manager = BrowserManager::new(BrowserOptions::default());
//! let session = manager.new_session(DeviceProfile::default()).await?;
//! session.navigate("https://example.com", Readiness::NetworkIdle).await?;
//! let html = session.serialize_document().await?;
//! println!("{} bytes of markup", html.len());
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

mod manager;
mod playwright;
mod protocol;
#[cfg(test)]
pub(crate) mod scripted;
pub mod session;

pub use manager::{
    BrowserManager, BrowserOptions, PlaywrightSession, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_NETWORK_IDLE_TIMEOUT, DEFAULT_PROCESS_TIMEOUT,
};
pub use session::{
    evaluate_as, InterceptHandler, InterceptedRequest, ObservedResponse, Readiness,
    RenderSession, ResponseHandler, RouteAction, SessionFactory,
};
