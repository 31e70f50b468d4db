pub mod wifi {
    use log::*;
    use esp_idf_svc::wifi::{
        AuthMethod,
        BlockingWifi,
        ClientConfiguration,
        Configuration,
        EspWifi,
        PmfConfiguration,
        ScanMethod,
    };
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::{esp, esp_wifi_set_country_code};
    use std::ffi::CString;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    /// Represents Wi-Fi connection states
    #[derive(Debug, PartialEq)]
    pub enum WifiState {
        Disconnected,
        Connecting,
        Connected(std::net::IpAddr),
    }

    /// Station credentials and association limits
    #[derive(Debug, Clone)]
    pub struct Credentials {
        pub ssid: String,
        pub password: String,
        /// ISO 3166 regulatory domain, e.g. "AU"
        pub country: String,
        pub connect_timeout: Duration,
    }

    /// The main Wi-Fi service abstraction
    pub struct Wifi<'a> {
        inner: BlockingWifi<EspWifi<'a>>,
    }

    impl<'a> Wifi<'a> {
        /// Create a new Wi-Fi manager
        pub fn new(
            modem: esp_idf_svc::hal::modem::Modem,
            sysloop: EspSystemEventLoop,
            nvs: EspDefaultNvsPartition,
        ) -> anyhow::Result<Self> {
            let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
            let blocking = BlockingWifi::wrap(esp_wifi, sysloop)?;
            Ok(Wifi { inner: blocking })
        }

        /// Configure, start and associate, waiting at most
        /// `connect_timeout` for an address.
        pub fn connect(&mut self, credentials: &Credentials) -> anyhow::Result<IpAddr> {
            let ssid = heapless::String::<32>::try_from(credentials.ssid.as_str())
                .map_err(|_| anyhow::anyhow!("SSID longer than 32 bytes"))?;
            let password = heapless::String::<64>::try_from(credentials.password.as_str())
                .map_err(|_| anyhow::anyhow!("Wi-Fi password longer than 64 bytes"))?;

            self.inner.set_configuration(&Configuration::Client(
                ClientConfiguration {
                    ssid,
                    password,
                    auth_method: AuthMethod::WPA2Personal,
                    scan_method: ScanMethod::FastScan,
                    pmf_cfg: PmfConfiguration::NotCapable,
                    ..Default::default()
                },
            ))?;

            let country = CString::new(credentials.country.as_str())?;
            esp!(unsafe { esp_wifi_set_country_code(country.as_ptr(), true) })?;

            self.inner.start()?;
            self.inner.connect()?;
            self.inner.wait_netif_up()?;

            self.inner.wifi_wait_while(
                || Ok(!matches!(self.state(), WifiState::Connected(_))),
                Some(credentials.connect_timeout),
            )?;

            match self.state() {
                WifiState::Connected(ip) => {
                    info!("WiFi connected; ip = {}", ip);
                    Ok(ip)
                }
                state => Err(anyhow::anyhow!("WiFi connection timeout ({:?})", state)),
            }
        }

        pub fn state(&self) -> WifiState {
            if let Ok(true) = self.inner.is_connected() {
                if let Ok(ip_info) = self.inner.wifi().sta_netif().get_ip_info() {
                    let v4: Ipv4Addr = ip_info.ip.into();
                    if !v4.is_unspecified() {
                        return WifiState::Connected(IpAddr::V4(v4));
                    }
                }
                WifiState::Connecting
            } else {
                WifiState::Disconnected
            }
        }

        /// Drop the association and power the radio down.
        pub fn disconnect(&mut self) -> anyhow::Result<()> {
            if self.inner.is_connected()? {
                self.inner.disconnect()?;
            }
            self.inner.stop()?;
            info!("WiFi stopped");
            Ok(())
        }
    }
}

pub use wifi::{Credentials, Wifi, WifiState};
