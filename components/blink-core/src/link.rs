//! Network link lifecycle with bounded-retry recovery.
//!
//! Connecting is a timed sub-state machine: every tick performs at most one
//! status check, so the caller never waits on the radio for longer than a
//! single `connect` or `is_up` call.

#![allow(async_fn_in_trait)]

use embassy_time::Instant;

use crate::{config::LinkConfig, time::has_elapsed};

#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    JoinFailed(u32),
    Timeout,
}

impl From<embassy_time::TimeoutError> for LinkError {
    fn from(_err: embassy_time::TimeoutError) -> Self {
        LinkError::Timeout
    }
}

/// The radio and IP stack as seen by the supervisor.
pub trait NetworkLink {
    /// Issues a connect (join) request.
    async fn connect(&mut self) -> Result<(), LinkError>;

    /// Whether the link is currently usable for outbound traffic.
    async fn is_up(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Outcome of one supervisor step.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// Link is connected and healthy.
    Up,
    /// A connect request was just issued.
    ConnectStarted,
    /// Still connecting, nothing to report.
    Pending,
    /// The link came up during this step. Emitted once per connection.
    Established,
    /// Bounded retries exhausted; the device has to restart.
    RestartRequired,
}

pub struct LinkSupervisor<L: NetworkLink> {
    link: L,
    config: LinkConfig,
    state: LinkState,
    attempts: u16,
    last_check: Instant,
}

impl<L: NetworkLink> LinkSupervisor<L> {
    pub fn new(link: L, config: LinkConfig) -> Self {
        Self {
            link,
            config,
            state: LinkState::Disconnected,
            attempts: 0,
            last_check: Instant::from_ticks(0),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Failed status checks in the current connect cycle.
    pub fn attempts(&self) -> u16 {
        self.attempts
    }

    pub async fn tick(&mut self, now: Instant) -> LinkEvent {
        match self.state {
            LinkState::Connected => {
                if self.link.is_up().await {
                    return LinkEvent::Up;
                }
                warn!("Link lost => reconnecting");
                self.state = LinkState::Disconnected;
                self.begin_connect(now).await
            }
            LinkState::Disconnected => self.begin_connect(now).await,
            LinkState::Connecting => self.check_connecting(now).await,
        }
    }

    async fn begin_connect(&mut self, now: Instant) -> LinkEvent {
        info!("Connecting to network '{}' ...", self.config.ssid);
        if let Err(e) = self.link.connect().await {
            warn!("Connect request failed: {:?} => keep checking", e);
        }
        self.state = LinkState::Connecting;
        self.attempts = 0;
        self.last_check = now;
        LinkEvent::ConnectStarted
    }

    async fn check_connecting(&mut self, now: Instant) -> LinkEvent {
        if !has_elapsed(now, self.last_check, self.config.check_period) {
            return LinkEvent::Pending;
        }
        self.last_check = now;

        if self.link.is_up().await {
            info!("... connected after {} failed checks", self.attempts);
            self.state = LinkState::Connected;
            self.attempts = 0;
            return LinkEvent::Established;
        }

        self.attempts = self.attempts.saturating_add(1);
        debug!("... link not up yet ({}/{})", self.attempts, self.config.max_attempts);
        if self.attempts >= self.config.max_attempts {
            error!("Failed to connect after {} checks => restart", self.attempts);
            self.state = LinkState::Disconnected;
            self.attempts = 0;
            return LinkEvent::RestartRequired;
        }
        LinkEvent::Pending
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::{cell::Cell, rc::Rc};

    /// Shared view on a [`MockLink`] so a test can flip the link while the
    /// supervisor owns it.
    #[derive(Default)]
    pub struct LinkProbe {
        pub up: Cell<bool>,
        pub connect_brings_up: Cell<bool>,
        pub connect_fails: Cell<bool>,
        pub connects: Cell<usize>,
        pub checks: Cell<usize>,
    }

    pub struct MockLink(pub Rc<LinkProbe>);

    impl MockLink {
        pub fn new() -> (Self, Rc<LinkProbe>) {
            let probe = Rc::new(LinkProbe::default());
            (Self(probe.clone()), probe)
        }
    }

    impl NetworkLink for MockLink {
        async fn connect(&mut self) -> Result<(), LinkError> {
            self.0.connects.set(self.0.connects.get() + 1);
            if self.0.connect_fails.get() {
                return Err(LinkError::JoinFailed(1));
            }
            if self.0.connect_brings_up.get() {
                self.0.up.set(true);
            }
            Ok(())
        }

        async fn is_up(&mut self) -> bool {
            self.0.checks.set(self.0.checks.get() + 1);
            self.0.up.get()
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::mocks::MockLink;
    use super::*;
    use embassy_time::Duration;

    fn config(max_attempts: u16) -> LinkConfig {
        LinkConfig {
            ssid: "test-net",
            password: "secret",
            check_period: Duration::from_millis(500),
            max_attempts,
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[tokio::test]
    async fn connects_on_first_check() {
        let (link, probe) = MockLink::new();
        probe.connect_brings_up.set(true);
        let mut supervisor = LinkSupervisor::new(link, config(60));

        assert_eq!(supervisor.tick(at(0)).await, LinkEvent::ConnectStarted);
        assert_eq!(supervisor.state(), LinkState::Connecting);
        assert_eq!(probe.connects.get(), 1);

        // status is only checked once the check period passed
        assert_eq!(supervisor.tick(at(100)).await, LinkEvent::Pending);
        assert_eq!(probe.checks.get(), 0);

        assert_eq!(supervisor.tick(at(500)).await, LinkEvent::Established);
        assert_eq!(supervisor.state(), LinkState::Connected);
        assert_eq!(supervisor.tick(at(510)).await, LinkEvent::Up);
    }

    #[tokio::test]
    async fn established_is_reported_once_per_connection() {
        let (link, probe) = MockLink::new();
        probe.connect_brings_up.set(true);
        let mut supervisor = LinkSupervisor::new(link, config(60));

        supervisor.tick(at(0)).await;
        let mut established = 0;
        for ms in (500..5_000).step_by(100) {
            if supervisor.tick(at(ms)).await == LinkEvent::Established {
                established += 1;
            }
        }
        assert_eq!(established, 1);
    }

    #[tokio::test]
    async fn link_loss_restarts_connect_cycle() {
        let (link, probe) = MockLink::new();
        probe.connect_brings_up.set(true);
        let mut supervisor = LinkSupervisor::new(link, config(60));
        supervisor.tick(at(0)).await;
        supervisor.tick(at(500)).await;
        assert_eq!(supervisor.state(), LinkState::Connected);

        probe.up.set(false);
        probe.connect_brings_up.set(false);
        assert_eq!(supervisor.tick(at(1_000)).await, LinkEvent::ConnectStarted);
        assert_eq!(supervisor.state(), LinkState::Connecting);
        assert_eq!(probe.connects.get(), 2);
    }

    #[tokio::test]
    async fn restart_exactly_at_attempt_limit() {
        let (link, probe) = MockLink::new();
        let mut supervisor = LinkSupervisor::new(link, config(60));
        assert_eq!(supervisor.tick(at(0)).await, LinkEvent::ConnectStarted);

        for attempt in 1..60u64 {
            assert_eq!(supervisor.tick(at(attempt * 500)).await, LinkEvent::Pending);
            assert_eq!(supervisor.attempts() as u64, attempt);
        }
        assert_eq!(supervisor.tick(at(60 * 500)).await, LinkEvent::RestartRequired);
        assert_eq!(probe.checks.get(), 60);
        assert_eq!(supervisor.state(), LinkState::Disconnected);
        assert_eq!(supervisor.attempts(), 0);
    }

    #[tokio::test]
    async fn failed_connect_request_keeps_checking() {
        let (link, probe) = MockLink::new();
        probe.connect_fails.set(true);
        let mut supervisor = LinkSupervisor::new(link, config(3));

        assert_eq!(supervisor.tick(at(0)).await, LinkEvent::ConnectStarted);
        assert_eq!(supervisor.state(), LinkState::Connecting);

        // the radio may still come up on its own
        probe.up.set(true);
        assert_eq!(supervisor.tick(at(500)).await, LinkEvent::Established);
    }

    #[tokio::test]
    async fn checks_are_spaced_by_check_period() {
        let (link, probe) = MockLink::new();
        let mut supervisor = LinkSupervisor::new(link, config(60));
        supervisor.tick(at(0)).await;
        for ms in (0..=2_000).step_by(50) {
            supervisor.tick(at(ms)).await;
        }
        assert_eq!(probe.checks.get(), 4);
    }
}
