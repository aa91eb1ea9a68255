use embassy_time::{Duration, WithTimeout};
use serde::Deserialize;

use crate::{
    config::{BackendConfig, ConfigError, MAX_URL_LEN, WireUnit},
    interval::IntervalPolicy,
    link::LinkState,
    net::http::{HTTP_OK, HttpStatusCode, HttpTransport, TransportError, read_to_end},
};

/// Largest response body the fetcher accepts.
pub const MAX_BODY_SIZE: usize = 512;

#[derive(Debug, Eq, PartialEq)]
pub enum FetchError {
    NoLink,
    BadStatus(HttpStatusCode),
    MalformedBody,
    Timeout,
    Transport(TransportError),
}

#[cfg(feature = "defmt")]
impl defmt::Format for FetchError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            FetchError::NoLink => defmt::write!(f, "NoLink"),
            FetchError::BadStatus(code) => defmt::write!(f, "BadStatus({})", code),
            FetchError::MalformedBody => defmt::write!(f, "MalformedBody"),
            FetchError::Timeout => defmt::write!(f, "Timeout"),
            FetchError::Transport(e) => defmt::write!(f, "Transport({:?})", e),
        }
    }
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::BodyTooLarge => FetchError::MalformedBody,
            e => FetchError::Transport(e),
        }
    }
}

impl From<embassy_time::TimeoutError> for FetchError {
    fn from(_err: embassy_time::TimeoutError) -> Self {
        FetchError::Timeout
    }
}

/// A remote interval that already passed [`IntervalPolicy::clamp`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CandidateInterval {
    pub millis: u32,
    /// Whether the remote value had to be moved onto a bound.
    pub clamped: bool,
}

/// `delay` accepts any token `f64::from_str` does, so `+5`, `.5` and `5.` pass
/// even though they are not JSON numbers. `null` parses to NaN and is rejected
/// in [`parse_delay`].
#[derive(Deserialize)]
struct DelayBody<'a> {
    delay: f64,
    #[serde(default, borrow)]
    unit: Option<&'a str>,
}

pub struct RemoteIntervalFetcher<T: HttpTransport> {
    transport: T,
    url: heapless::String<MAX_URL_LEN>,
    unit: WireUnit,
    timeout: Duration,
    policy: IntervalPolicy,
    body: [u8; MAX_BODY_SIZE],
}

impl<T: HttpTransport> RemoteIntervalFetcher<T> {
    pub fn new(transport: T, backend: &BackendConfig, policy: IntervalPolicy) -> Result<Self, ConfigError> {
        Ok(Self {
            transport,
            url: backend.url()?,
            unit: backend.unit,
            timeout: backend.timeout,
            policy,
            body: [0; MAX_BODY_SIZE],
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub async fn fetch(&mut self, link: LinkState) -> Result<CandidateInterval, FetchError> {
        if link != LinkState::Connected {
            return Err(FetchError::NoLink);
        }
        let timeout = self.timeout;
        let len = self.exchange().with_timeout(timeout).await??;
        let body = self.body.get(..len).ok_or(FetchError::MalformedBody)?;
        parse_delay(body, self.unit, &self.policy)
    }

    async fn exchange(&mut self) -> Result<usize, FetchError> {
        debug!("HTTP GET -> {}", self.url.as_str());
        let mut response = self.transport.get(self.url.as_str()).await?;
        let status = response.status();
        if status != HTTP_OK {
            return Err(FetchError::BadStatus(status));
        }
        let len = read_to_end(response.body(), &mut self.body).await?;
        Ok(len)
    }
}

/// Extracts `delay` from a JSON body, converts it to milliseconds and clamps it.
pub fn parse_delay(body: &[u8], unit: WireUnit, policy: &IntervalPolicy) -> Result<CandidateInterval, FetchError> {
    let (parsed, _) = serde_json_core::from_slice::<DelayBody<'_>>(body).map_err(|_e| {
        debug!("body is not a delay document");
        FetchError::MalformedBody
    })?;
    let unit = match parsed.unit {
        Some(tag) => WireUnit::parse(tag).map_err(|_| FetchError::MalformedBody)?,
        None => unit,
    };
    if parsed.delay.is_nan() {
        debug!("delay is not a number");
        return Err(FetchError::MalformedBody);
    }
    // `as` truncates toward zero and saturates, so every JSON number maps to some i64
    let raw = parsed.delay as i64;
    let millis = unit.to_millis(raw);
    let clamped = policy.clamp(millis);
    Ok(CandidateInterval {
        millis: clamped,
        clamped: !policy.contains(millis),
    })
}
