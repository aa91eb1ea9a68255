use blink_core::indicator::{Color, Pixel};
use embassy_rp::peripherals::PIO1;
use embassy_rp::pio_programs::ws2812::PioWs2812;
use smart_leds::RGB8;

/// Single WS2812 on PIO1, state machine 0.
pub struct Ws2812Pixel {
    driver: PioWs2812<'static, PIO1, 0, 1>,
}

impl Ws2812Pixel {
    pub fn new(driver: PioWs2812<'static, PIO1, 0, 1>) -> Self {
        Self { driver }
    }
}

impl Pixel for Ws2812Pixel {
    async fn show(&mut self, color: Color) {
        self.driver.write(&[RGB8::new(color.r, color.g, color.b)]).await;
    }
}
