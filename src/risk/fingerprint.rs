//! Client descriptor (user agent) analysis.
//!
//! Classifies the descriptor into a device class, whether it names an
//! interactive browser engine, and whether it matches a scripted client.
//! All matching is case-insensitive substring matching against fixed tables.

use serde::Serialize;

/// Command-line tools, HTTP client libraries and automation frameworks.
const SCRIPTED_SIGNATURES: &[&str] = &[
    "curl",
    "wget",
    "httpie",
    "postmanruntime",
    "insomnia",
    "axios",
    "python",
    "httpclient",
    "okhttp",
    "go-http-client",
    "java/",
    "libwww-perl",
    "node-fetch",
    "undici",
    "scrapy",
    "headlesschrome",
    "phantomjs",
    "selenium",
    "puppeteer",
    "playwright",
];

const BROWSER_ENGINES: &[&str] = &[
    "firefox/",
    "fxios/",
    "chrome/",
    "chromium/",
    "crios/",
    "edg/",
    "edge/",
    "opr/",
    "opera",
    "vivaldi/",
    "samsungbrowser/",
    "yabrowser/",
    "ucbrowser/",
    "safari/",
    "msie ",
    "trident/",
];

const CONSOLE_MARKERS: &[&str] = &["playstation", "xbox", "nintendo"];
const SMART_TV_MARKERS: &[&str] = &[
    "smart-tv", "smarttv", "hbbtv", "appletv", "googletv", "crkey", "roku", "web0s",
];
const WEARABLE_MARKERS: &[&str] = &["watch", "wear os"];
const TABLET_MARKERS: &[&str] = &["ipad", "tablet", "kindle", "silk/", "playbook"];
const MOBILE_MARKERS: &[&str] = &[
    "mobi", "iphone", "ipod", "android", "windows phone", "blackberry", "opera mini",
];

/// Coarse device class. Anything not desktop or mobile is non-standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
    Console,
    SmartTv,
    Wearable,
}

impl DeviceClass {
    pub fn is_standard(&self) -> bool {
        matches!(self, DeviceClass::Desktop | DeviceClass::Mobile)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Console => "console",
            DeviceClass::SmartTv => "smart_tv",
            DeviceClass::Wearable => "wearable",
        }
    }
}

/// Classification of a present descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientFingerprint {
    pub device: DeviceClass,
    pub browser_engine: bool,
    pub scripted: bool,
}

/// Outcome of analyzing an optional descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Descriptor {
    /// Absent, empty or whitespace-only.
    Missing,
    Present(ClientFingerprint),
}

/// Descriptor analyzer with the built-in signature table plus any
/// deployment-specific scripted-client signatures.
#[derive(Debug, Clone, Default)]
pub struct FingerprintAnalyzer {
    extra_signatures: Vec<String>,
}

impl FingerprintAnalyzer {
    pub fn new(extra_signatures: &[String]) -> Self {
        Self {
            extra_signatures: extra_signatures
                .iter()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn analyze(&self, descriptor: Option<&str>) -> Descriptor {
        let raw = match descriptor.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Descriptor::Missing,
        };
        let ua = raw.to_ascii_lowercase();

        let scripted = contains_any(&ua, SCRIPTED_SIGNATURES)
            || self.extra_signatures.iter().any(|sig| ua.contains(sig.as_str()));

        Descriptor::Present(ClientFingerprint {
            device: device_class(&ua),
            browser_engine: contains_any(&ua, BROWSER_ENGINES),
            scripted,
        })
    }
}

/// Analyze a client descriptor against the built-in tables.
pub fn analyze(descriptor: Option<&str>) -> Descriptor {
    FingerprintAnalyzer::default().analyze(descriptor)
}

fn device_class(ua: &str) -> DeviceClass {
    if contains_any(ua, CONSOLE_MARKERS) {
        DeviceClass::Console
    } else if contains_any(ua, SMART_TV_MARKERS) {
        DeviceClass::SmartTv
    } else if contains_any(ua, WEARABLE_MARKERS) {
        DeviceClass::Wearable
    } else if contains_any(ua, TABLET_MARKERS) || (ua.contains("android") && !ua.contains("mobile")) {
        DeviceClass::Tablet
    } else if contains_any(ua, MOBILE_MARKERS) {
        DeviceClass::Mobile
    } else {
        DeviceClass::Desktop
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
