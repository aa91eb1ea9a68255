#![allow(async_fn_in_trait)]

use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::OutputPin;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const ON: Color = Color::new(0, 0, 255);
    pub const OFF: Color = Color::new(0, 0, 0);
    pub const CONNECTING: Color = Color::new(255, 0, 0);
    pub const CONNECTED: Color = Color::new(0, 255, 0);
    pub const FAILURE: Color = Color::new(255, 0, 0);

    pub fn is_dark(&self) -> bool {
        *self == Color::OFF
    }
}

/// Physical light. Writes are fire-and-forget.
pub trait Pixel {
    async fn show(&mut self, color: Color);
}

/// Single-colour LED on a GPIO, lit for every colour except [`Color::OFF`].
pub struct GpioPixel<P: OutputPin> {
    pin: P,
}

impl<P: OutputPin> GpioPixel<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin> Pixel for GpioPixel<P> {
    async fn show(&mut self, color: Color) {
        let result = if color.is_dark() { self.pin.set_low() } else { self.pin.set_high() };
        if result.is_err() {
            warn!("GPIO write failed");
        }
    }
}

/// Transient flash sequence shown outside the blink cadence.
#[derive(Debug, Clone, Copy)]
pub struct StatusPattern {
    pub color: Color,
    pub flashes: u8,
    pub on: Duration,
    pub off: Duration,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlinkState {
    pub current_interval_ms: u32,
    pub is_on: bool,
    pub last_toggle_at: Instant,
}

impl BlinkState {
    pub fn new(interval_ms: u32, now: Instant) -> Self {
        Self {
            current_interval_ms: interval_ms,
            is_on: false,
            last_toggle_at: now,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.current_interval_ms))
    }
}

pub struct IndicatorController<P: Pixel> {
    pixel: P,
}

impl<P: Pixel> IndicatorController<P> {
    pub fn new(pixel: P) -> Self {
        Self { pixel }
    }

    /// Writes the light and records the new state in `blink`.
    pub async fn set_on(&mut self, blink: &mut BlinkState, on: bool) {
        self.pixel.show(if on { Color::ON } else { Color::OFF }).await;
        blink.is_on = on;
    }

    /// Shows a status colour. Does not touch [`BlinkState`].
    pub async fn show_status(&mut self, color: Color) {
        self.pixel.show(color).await;
    }

    pub async fn play(&mut self, pattern: &StatusPattern) {
        for _ in 0..pattern.flashes {
            self.pixel.show(pattern.color).await;
            Timer::after(pattern.on).await;
            self.pixel.show(Color::OFF).await;
            Timer::after(pattern.off).await;
        }
    }

    pub fn pixel(&self) -> &P {
        &self.pixel
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    pub struct MockPixel {
        pub shown: Vec<Color>,
    }

    impl MockPixel {
        pub fn current(&self) -> Option<Color> {
            self.shown.last().copied()
        }
    }

    impl Pixel for MockPixel {
        async fn show(&mut self, color: Color) {
            self.shown.push(color);
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::mocks::MockPixel;
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    #[derive(Default)]
    struct MockPin {
        high: bool,
        writes: usize,
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn set_on_writes_light_and_state() {
        let mut indicator = IndicatorController::new(MockPixel::default());
        let mut blink = BlinkState::new(1000, Instant::from_millis(0));

        indicator.set_on(&mut blink, true).await;
        assert!(blink.is_on);
        assert_eq!(indicator.pixel().current(), Some(Color::ON));

        indicator.set_on(&mut blink, false).await;
        assert!(!blink.is_on);
        assert_eq!(indicator.pixel().current(), Some(Color::OFF));
    }

    #[tokio::test]
    async fn status_pattern_ends_dark_and_keeps_blink_state() {
        let mut indicator = IndicatorController::new(MockPixel::default());
        let pattern = StatusPattern {
            color: Color::CONNECTED,
            flashes: 2,
            on: Duration::from_ticks(0),
            off: Duration::from_ticks(0),
        };
        indicator.play(&pattern).await;
        assert_eq!(indicator.pixel().shown, [Color::CONNECTED, Color::OFF, Color::CONNECTED, Color::OFF]);
    }

    #[tokio::test]
    async fn gpio_pixel_lights_for_any_colour() {
        let mut pixel = GpioPixel::new(MockPin::default());
        pixel.show(Color::CONNECTING).await;
        assert!(pixel.pin.high);
        pixel.show(Color::OFF).await;
        assert!(!pixel.pin.high);
        pixel.show(Color::ON).await;
        assert!(pixel.pin.high);
        assert_eq!(pixel.pin.writes, 3);
    }
}
