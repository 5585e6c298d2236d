//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Path of the live reload WebSocket endpoint.
pub const RELOAD_WS_PATH: &str = "/__reload";

/// Path of the live reload client script.
pub const RELOAD_SCRIPT_PATH: &str = "/__reload.js";

/// Messages sent to clients after builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Output changed, reload the page
    Reload,

    /// The last build failed; the page keeps the previous output
    BuildFailed {
        /// Error description
        message: String,
    },

    /// Connection established
    Connected,
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    /// Create a new reload hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert the client script tag before `</body>`, or append it.
pub fn inject_reload_script(markup: &str) -> String {
    let tag = format!(r#"<script src="{RELOAD_SCRIPT_PATH}"></script>"#);

    match markup.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &markup[..pos], tag, &markup[pos..]),
        None => format!("{markup}{tag}"),
    }
}

/// Generate the client-side reload script.
///
/// The socket URL is derived from the page location so the script works on
/// any host and port.
pub fn reload_client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const protocol = location.protocol === 'https:' ? 'wss:' : 'ws:';
  const ws = new WebSocket(protocol + '//' + location.host + '{}');
  let reconnectAttempts = 0;
  const maxReconnectAttempts = 10;

  ws.onopen = function() {{
    console.log('[reload] Connected');
    reconnectAttempts = 0;
  }};

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'build_failed':
        console.error('[reload] Build failed:', msg.message);
        break;

      case 'connected':
        console.log('[reload] Server acknowledged connection');
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[reload] Disconnected');
    if (reconnectAttempts < maxReconnectAttempts) {{
      reconnectAttempts++;
      setTimeout(function() {{
        location.reload();
      }}, 1000 * reconnectAttempts);
    }}
  }};
}})();
"#,
        RELOAD_WS_PATH
    )
}
