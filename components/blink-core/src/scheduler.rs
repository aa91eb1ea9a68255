//! The cooperative control loop.
//!
//! Each [`Scheduler::tick`] runs, in this order: the link check, the poll
//! check and the toggle check. The two timers are independent; a new interval
//! takes effect at the next toggle boundary without resetting the toggle phase.

use embassy_time::{Instant, Timer};

use crate::{
    config::{BlinkConfig, ConfigError},
    indicator::{BlinkState, Color, IndicatorController, Pixel},
    interval::IntervalPolicy,
    link::{LinkEvent, LinkState, LinkSupervisor, NetworkLink},
    net::{
        fetcher::{FetchError, RemoteIntervalFetcher},
        http::HttpTransport,
    },
    time::has_elapsed,
};

/// Last-resort recovery when the link cannot be re-established.
pub trait SystemReset {
    /// Restarts the device. Real implementations do not return.
    fn restart(&mut self);
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollState {
    pub last_poll_at: Option<Instant>,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    pub link: LinkEvent,
    pub polled: bool,
    pub interval_changed: bool,
    pub toggled: bool,
}

impl TickReport {
    fn link_only(link: LinkEvent) -> Self {
        Self {
            link,
            polled: false,
            interval_changed: false,
            toggled: false,
        }
    }
}

pub struct Scheduler<L: NetworkLink, T: HttpTransport, P: Pixel, R: SystemReset> {
    config: BlinkConfig,
    link: LinkSupervisor<L>,
    fetcher: RemoteIntervalFetcher<T>,
    indicator: IndicatorController<P>,
    reset: R,
    poll: PollState,
    blink: BlinkState,
}

impl<L: NetworkLink, T: HttpTransport, P: Pixel, R: SystemReset> Scheduler<L, T, P, R> {
    pub fn new(config: BlinkConfig, link: L, transport: T, pixel: P, reset: R, now: Instant) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = IntervalPolicy::new(config.interval)?;
        let fetcher = RemoteIntervalFetcher::new(transport, &config.backend, policy)?;
        info!(
            "Blink interval {} ms (range {}..={} ms), polling {} every {} ms",
            config.default_interval_ms,
            policy.min_ms(),
            policy.max_ms(),
            fetcher.url(),
            config.poll_interval.as_millis()
        );
        Ok(Self {
            config,
            link: LinkSupervisor::new(link, config.link),
            fetcher,
            indicator: IndicatorController::new(pixel),
            reset,
            poll: PollState::default(),
            blink: BlinkState::new(config.default_interval_ms, now),
        })
    }

    pub fn blink_state(&self) -> &BlinkState {
        &self.blink
    }

    pub fn poll_state(&self) -> &PollState {
        &self.poll
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    pub fn indicator(&self) -> &IndicatorController<P> {
        &self.indicator
    }

    pub fn reset(&self) -> &R {
        &self.reset
    }

    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let event = self.link.tick(now).await;
        match event {
            LinkEvent::Up => {}
            LinkEvent::ConnectStarted => {
                self.indicator.show_status(Color::CONNECTING).await;
                return TickReport::link_only(event);
            }
            LinkEvent::Pending => return TickReport::link_only(event),
            LinkEvent::Established => {
                self.indicator.play(&self.config.status.connected).await;
                self.indicator.set_on(&mut self.blink, false).await;
                return TickReport::link_only(event);
            }
            LinkEvent::RestartRequired => {
                self.indicator.play(&self.config.status.failure).await;
                self.reset.restart();
                return TickReport::link_only(event);
            }
        }

        let mut report = TickReport::link_only(event);

        if self.poll_due(now) {
            self.poll.last_poll_at = Some(now);
            report.polled = true;
            report.interval_changed = self.poll_once().await;
        }

        if has_elapsed(now, self.blink.last_toggle_at, self.blink.interval()) {
            self.blink.last_toggle_at = now;
            let on = !self.blink.is_on;
            self.indicator.set_on(&mut self.blink, on).await;
            trace!("toggle -> {}", on);
            report.toggled = true;
        }

        report
    }

    fn poll_due(&self, now: Instant) -> bool {
        match self.poll.last_poll_at {
            Some(last) => has_elapsed(now, last, self.config.poll_interval),
            None => true,
        }
    }

    async fn poll_once(&mut self) -> bool {
        match self.fetcher.fetch(self.link.state()).await {
            Ok(candidate) => {
                if candidate.millis == self.blink.current_interval_ms {
                    return false;
                }
                if candidate.clamped {
                    info!("New blink interval: {} ms (clamped)", candidate.millis);
                } else {
                    info!("New blink interval: {} ms", candidate.millis);
                }
                self.blink.current_interval_ms = candidate.millis;
                true
            }
            Err(FetchError::BadStatus(code)) => {
                warn!("HTTP GET failed, code={}", code);
                false
            }
            Err(e) => {
                warn!("Fetching interval failed: {:?}", e);
                false
            }
        }
    }
}

pub struct Runner<L: NetworkLink, T: HttpTransport, P: Pixel, R: SystemReset> {
    scheduler: Scheduler<L, T, P, R>,
}

pub fn new<L: NetworkLink, T: HttpTransport, P: Pixel, R: SystemReset>(
    config: BlinkConfig,
    link: L,
    transport: T,
    pixel: P,
    reset: R,
) -> Result<Runner<L, T, P, R>, ConfigError> {
    let scheduler = Scheduler::new(config, link, transport, pixel, reset, Instant::now())?;
    Ok(Runner { scheduler })
}

impl<L: NetworkLink, T: HttpTransport, P: Pixel, R: SystemReset> Runner<L, T, P, R> {
    pub async fn run(mut self) -> ! {
        let tick_period = self.scheduler.config.tick_period;
        loop {
            self.scheduler.tick(Instant::now()).await;
            Timer::after(tick_period).await;
        }
    }
}
