#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod pixel;
#[cfg(target_os = "none")]
mod transport;
#[cfg(target_os = "none")]
mod wifi;

#[cfg(not(target_os = "none"))]
fn main() {}

#[cfg(target_os = "none")]
mod device {
    use blink_core::config::BlinkConfig;
    use blink_core::indicator::{Color, Pixel};
    use blink_core::scheduler::SystemReset;
    use cyw43_pio::{DEFAULT_CLOCK_DIVIDER, PioSpi};
    use defmt::*;
    use embassy_executor::Spawner;
    use embassy_net::StackResources;
    use embassy_rp::bind_interrupts;
    use embassy_rp::clocks::RoscRng;
    use embassy_rp::gpio::{Level, Output};
    use embassy_rp::peripherals::{DMA_CH0, PIO0, PIO1};
    use embassy_rp::pio::{InterruptHandler, Pio};
    use embassy_rp::pio_programs::ws2812::{PioWs2812, PioWs2812Program};
    use embassy_time::Timer;
    use static_cell::StaticCell;
    use {defmt_rtt as _, panic_probe as _};

    use crate::pixel::Ws2812Pixel;
    use crate::transport::ReqwlessTransport;
    use crate::wifi::Cyw43Link;

    bind_interrupts!(struct Irqs {
        PIO0_IRQ_0 => InterruptHandler<PIO0>;
        PIO1_IRQ_0 => InterruptHandler<PIO1>;
    });

    struct ChipReset;

    impl SystemReset for ChipReset {
        fn restart(&mut self) {
            warn!("Restarting ...");
            cortex_m::peripheral::SCB::sys_reset();
        }
    }

    #[embassy_executor::task]
    async fn wifi_task(runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>) -> ! {
        runner.run().await
    }

    #[embassy_executor::task]
    async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
        runner.run().await
    }

    #[embassy_executor::main]
    async fn main(spawner: Spawner) {
        let p = embassy_rp::init(Default::default());
        let config = BlinkConfig::from_build_env();

        let mut pio1 = Pio::new(p.PIO1, Irqs);
        let program = PioWs2812Program::new(&mut pio1.common);
        let mut pixel = Ws2812Pixel::new(PioWs2812::new(&mut pio1.common, pio1.sm0, p.DMA_CH1, p.PIN_16, &program));
        pixel.show(Color::OFF).await;

        // checked while the pixel is still ours to signal with
        if let Err(e) = config.validate() {
            halt(&mut pixel, "scheduler", e).await;
        }

        let fw = cyw43_firmware::CYW43_43439A0;
        let clm = cyw43_firmware::CYW43_43439A0_CLM;

        let pwr = Output::new(p.PIN_23, Level::Low);
        let cs = Output::new(p.PIN_25, Level::High);
        let mut pio = Pio::new(p.PIO0, Irqs);
        let spi = PioSpi::new(&mut pio.common, pio.sm0, DEFAULT_CLOCK_DIVIDER, pio.irq0, cs, p.PIN_24, p.PIN_29, p.DMA_CH0);

        static STATE: StaticCell<cyw43::State> = StaticCell::new();
        let state = STATE.init(cyw43::State::new());
        let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
        spawner.spawn(unwrap!(wifi_task(runner)));

        control.init(clm).await;
        control.set_power_management(cyw43::PowerManagementMode::PowerSave).await;

        let seed = RoscRng.next_u64();

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, runner) = embassy_net::new(
            net_device,
            embassy_net::Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            seed,
        );
        spawner.spawn(unwrap!(net_task(runner)));

        let link = Cyw43Link::new(control, stack, &config.link);
        let transport = match ReqwlessTransport::new(stack, &config.backend) {
            Ok(transport) => transport,
            Err(e) => halt(&mut pixel, "transport", e).await,
        };

        match blink_core::scheduler::new(config, link, transport, pixel, ChipReset) {
            Ok(runner) => runner.run().await,
            Err(e) => error!("Invalid configuration: {:?}", e),
        }
    }

    async fn halt(pixel: &mut Ws2812Pixel, what: &str, e: impl Format) -> ! {
        error!("Cannot start {}: {:?}", what, e);
        pixel.show(Color::FAILURE).await;
        loop {
            Timer::after_secs(3600).await;
        }
    }
}
