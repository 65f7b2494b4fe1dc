use std::time::Duration;

#[derive(Clone, Debug)]
pub struct WsConfig {
    /// Reject inbound frames without a masking key. Clients must mask, servers must not.
    pub require_mask: bool,
    /// Longest wait for inbound bytes before the connection is failed.
    pub timeout: Duration,
    /// Subprotocols accepted during the upgrade, in no particular order.
    pub subprotocols: Vec<String>,
    _private: (),
}

impl WsConfig {
    pub fn server() -> Self {
        Self {
            require_mask: true,
            timeout: Duration::from_secs(60),
            subprotocols: vec!["json".to_string()],
            _private: (),
        }
    }
}
