use std::time::Duration;

pub const CBR_BASE_URL: &str = "https://www.cbr.ru/scripts";
pub const CBR_REGISTRY_URL: &str = "https://www.cbr.ru/vfs/mcirabis/BIK";
pub const CBR_SWIFT_URL: &str = "https://www.cbr.ru/analytics/digest/bik_swift-bik.zip";

/// Where and how the HTTP fetcher talks to the Bank of Russia.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base of the XML services (`XML_daily.asp`, `XML_valFull.asp`)
    pub base_url: String,
    /// Directory holding the dated BIC directory archives (`bik_db_DDMMYYYY.zip`)
    pub registry_url: String,
    /// Archive with the BIC to SWIFT table
    pub swift_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            base_url: CBR_BASE_URL.to_string(),
            registry_url: CBR_REGISTRY_URL.to_string(),
            swift_url: CBR_SWIFT_URL.to_string(),
            timeout: Duration::from_secs(10),
            // The site rejects requests without a browser-looking agent
            user_agent: concat!(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) ",
                "Chrome/124.0 Safari/537.36"
            )
            .to_string(),
        }
    }
}

impl FetchConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_swift_url(mut self, url: impl Into<String>) -> Self {
        self.swift_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
