use blink_core::config::LinkConfig;
use blink_core::link::{LinkError, NetworkLink};
use cyw43::JoinOptions;
use embassy_net::Stack;
use embassy_time::{Duration, WithTimeout as _};

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Station-mode link over the Pico W radio.
pub struct Cyw43Link {
    control: cyw43::Control<'static>,
    stack: Stack<'static>,
    ssid: &'static str,
    password: &'static str,
}

impl Cyw43Link {
    pub fn new(control: cyw43::Control<'static>, stack: Stack<'static>, config: &LinkConfig) -> Self {
        Self {
            control,
            stack,
            ssid: config.ssid,
            password: config.password,
        }
    }
}

impl NetworkLink for Cyw43Link {
    async fn connect(&mut self) -> Result<(), LinkError> {
        let options = if self.password.is_empty() {
            JoinOptions::new_open()
        } else {
            JoinOptions::new(self.password.as_bytes())
        };
        self.control
            .join(self.ssid, options)
            .with_timeout(JOIN_TIMEOUT)
            .await?
            .map_err(|e| LinkError::JoinFailed(e.status))
    }

    async fn is_up(&mut self) -> bool {
        self.stack.is_link_up() && self.stack.is_config_up()
    }
}
