use crate::core::ProxySettings;

/// The provider's endpoint layout: one shared rotating endpoint and a fixed
/// set of sticky endpoints, one per port in the configured range.
#[derive(Debug, Clone)]
pub struct ProxyEndpoints {
    pub rotating: String,
    pub sticky: Vec<String>,
}

impl ProxyEndpoints {
    pub fn from_settings(settings: &ProxySettings) -> Self {
        let rotating = format!("{}:{}", settings.host, settings.rotating_port);
        let (first, last) = settings.sticky_ports;
        let sticky = (first..=last)
            .map(|port| format!("{}:{}", settings.host, port))
            .collect();
        Self { rotating, sticky }
    }
}
