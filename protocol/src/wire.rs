use serde::{Deserialize, Serialize};

/// State reported to the coordinator once per sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireReport {
    pub current_pct: u8,
    pub target_pct: u8,
}

/// Command returned by the coordinator.
///
/// `target_pct` is kept signed and unclamped here; the motion side clamps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCommand {
    pub target_pct: i32,
}

impl WireReport {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl WireCommand {
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

/// Build the per-device endpoint, percent-escaping everything in the device
/// name except RFC 3986 unreserved characters.
pub fn device_url(base: &str, device_name: &str) -> String {
    let mut url = String::with_capacity(base.len() + device_name.len() * 3 + 1);
    url.push_str(base.trim_end_matches('/'));
    url.push('/');
    for byte in device_name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                url.push(byte as char)
            }
            _ => url.push_str(&format!("%{:02X}", byte)),
        }
    }
    url
}
