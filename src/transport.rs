use network::{HttpTransport, SyncError, Transport};
use protocol::{WireCommand, WireReport};
use std::net::IpAddr;
use wifi::{Credentials, Wifi};

/// Station Wi-Fi plus the coordinator HTTP client, reset together.
pub struct EspTransport<'a> {
    wifi: Wifi<'a>,
    http: HttpTransport,
    credentials: Credentials,
}

impl<'a> EspTransport<'a> {
    pub fn new(wifi: Wifi<'a>, http: HttpTransport, credentials: Credentials) -> Self {
        EspTransport {
            wifi,
            http,
            credentials,
        }
    }
}

impl Transport for EspTransport<'_> {
    fn connect(&mut self) -> Result<IpAddr, SyncError> {
        self.wifi
            .connect(&self.credentials)
            .map_err(|e| SyncError::Connection(format!("{e:#}")))
    }

    fn disconnect(&mut self) -> Result<(), SyncError> {
        self.http.reset();
        self.wifi
            .disconnect()
            .map_err(|e| SyncError::Connection(format!("{e:#}")))
    }

    fn send_receive(&mut self, report: &WireReport) -> Result<WireCommand, SyncError> {
        self.http.post(report)
    }
}
