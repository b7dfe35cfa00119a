use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use url::Url;

/// A Tuya cloud data center.
///
/// Each region has a single OpenAPI endpoint. Projects are bound to one
/// data center, which is not discoverable other than by asking each one
/// for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Region {
    /// Central Europe.
    Eu,
    /// Western America.
    Us,
    /// India.
    In,
    /// China.
    Cn,
}

impl Region {
    /// Order in which regions are probed when the selector is `auto`.
    pub const PROBE_ORDER: [Region; 4] = [Region::Eu, Region::Us, Region::In, Region::Cn];

    /// The OpenAPI base URL for this data center.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Eu => "https://openapi.tuyaeu.com",
            Self::Us => "https://openapi.tuyaus.com",
            Self::In => "https://openapi.tuyain.com",
            Self::Cn => "https://openapi.tuyacn.com",
        }
    }

    /// All known region codes, for help text and validation messages.
    pub fn codes() -> Vec<String> {
        Self::iter().map(|r| r.to_string()).collect()
    }
}

/// Base URL per region plus the `auto` probe order.
///
/// Defaults to the public OpenAPI endpoints; overridable so a client can be
/// pointed at a proxy or a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEndpoints {
    bases: HashMap<Region, String>,
    probe_order: Vec<Region>,
}

impl RegionEndpoints {
    /// Override the base URL for one region.
    pub fn with_base(mut self, region: Region, base: impl Into<String>) -> Self {
        let base: String = base.into();
        self.bases
            .insert(region, base.trim_end_matches('/').to_owned());
        self
    }

    /// Override the order regions are probed in for `auto`.
    pub fn with_probe_order(mut self, order: Vec<Region>) -> Self {
        self.probe_order = order;
        self
    }

    /// Base URL for a region.
    pub fn base(&self, region: Region) -> &str {
        self.bases
            .get(&region)
            .map_or_else(|| region.endpoint(), String::as_str)
    }

    /// Base URLs in probe order.
    pub fn probe_bases(&self) -> Vec<String> {
        self.probe_order
            .iter()
            .map(|r| self.base(*r).to_owned())
            .collect()
    }
}

impl Default for RegionEndpoints {
    fn default() -> Self {
        Self {
            bases: Region::iter().map(|r| (r, r.endpoint().to_owned())).collect(),
            probe_order: Region::PROBE_ORDER.to_vec(),
        }
    }
}

/// Where to send requests: a known region, `auto`, or an explicit base URL.
///
/// Parsing never fails; input that is none of the recognised forms is kept
/// as [`Unrecognized`](Self::Unrecognized), which probes every region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RegionSelector {
    Region(Region),
    #[default]
    Auto,
    Url(Url),
    Unrecognized(String),
}

impl RegionSelector {
    /// Candidate base URLs to probe for a token, in order.
    pub fn candidate_bases(&self, endpoints: &RegionEndpoints) -> Vec<String> {
        match self {
            Self::Region(region) => vec![endpoints.base(*region).to_owned()],
            Self::Auto => endpoints.probe_bases(),
            Self::Url(url) => vec![url.as_str().trim_end_matches('/').to_owned()],
            Self::Unrecognized(_) => Region::PROBE_ORDER
                .iter()
                .map(|r| endpoints.base(*r).to_owned())
                .collect(),
        }
    }

    /// `true` unless the input was not a known form.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl FromStr for RegionSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "auto" {
            return Ok(Self::Auto);
        }
        if let Ok(region) = s.parse::<Region>() {
            return Ok(Self::Region(region));
        }
        if s.starts_with("http") {
            if let Ok(url) = Url::parse(&s) {
                return Ok(Self::Url(url));
            }
        }
        Ok(Self::Unrecognized(s))
    }
}

impl fmt::Display for RegionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(region) => write!(f, "{region}"),
            Self::Auto => f.write_str("auto"),
            Self::Url(url) => write!(f, "{url}"),
            Self::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Cloud project credentials.
///
/// The access secret is only ever used as the HMAC key; `Debug` output
/// redacts it.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_id: String,
    pub access_secret: SecretString,
    pub region: RegionSelector,
}

impl Credentials {
    /// Build credentials, trimming surrounding whitespace from the id and
    /// secret (pasted values often carry a trailing newline).
    pub fn new(access_id: &str, access_secret: &str, region: RegionSelector) -> Self {
        Self {
            access_id: access_id.trim().to_owned(),
            access_secret: SecretString::from(access_secret.trim().to_owned()),
            region,
        }
    }
}
