use std::{env, path::PathBuf};

struct Setting {
    key: &'static str,
    default: &'static str,
}

const SETTINGS: &[Setting] = &[
    Setting { key: "BLINK_WIFI_SSID", default: "" },
    Setting { key: "BLINK_WIFI_PASSWORD", default: "" },
    Setting { key: "BLINK_BACKEND_HOST", default: "cloudcontrooler-backend.vercel.app" },
    Setting { key: "BLINK_BACKEND_PATH", default: "/api/delay" },
    Setting { key: "BLINK_MIN_INTERVAL_MS", default: "1000" },
    Setting { key: "BLINK_MAX_INTERVAL_MS", default: "20000" },
    Setting { key: "BLINK_DEFAULT_INTERVAL_MS", default: "2000" },
    Setting { key: "BLINK_POLL_INTERVAL_MS", default: "1000" },
    Setting { key: "BLINK_FETCH_TIMEOUT_MS", default: "1000" },
    Setting { key: "BLINK_DELAY_UNIT", default: "s" },
    Setting { key: "BLINK_VERIFY_SERVER_IDENTITY", default: "false" },
];

fn main() {
    for setting in SETTINGS {
        println!("cargo:rerun-if-env-changed={}", setting.key);
    }

    let ssid = env_or_default("BLINK_WIFI_SSID");
    if ssid.is_empty() {
        println!("cargo:warning=BLINK_WIFI_SSID is not set; the device will not be able to join a network");
    }
    let password = env_or_default("BLINK_WIFI_PASSWORD");
    let host = env_or_default("BLINK_BACKEND_HOST");
    let path = env_or_default("BLINK_BACKEND_PATH");

    let min = number("BLINK_MIN_INTERVAL_MS");
    let max = number("BLINK_MAX_INTERVAL_MS");
    let default = number("BLINK_DEFAULT_INTERVAL_MS");
    let poll = number("BLINK_POLL_INTERVAL_MS");
    let timeout = number("BLINK_FETCH_TIMEOUT_MS");

    let unit = match env_or_default("BLINK_DELAY_UNIT").as_str() {
        "s" => "Seconds",
        "ms" => "Milliseconds",
        other => panic!("BLINK_DELAY_UNIT must be `s` or `ms`, got `{other}`"),
    };
    let verify: bool = env_or_default("BLINK_VERIFY_SERVER_IDENTITY")
        .parse()
        .expect("BLINK_VERIFY_SERVER_IDENTITY must be `true` or `false`");

    let out_dir_path = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    let out_file_path = out_dir_path.join("consts.rs");

    std::fs::write(
        out_file_path,
        format!(
            "
            // generated form env vars
            pub const WIFI_SSID: &str = {ssid:?};
            pub const WIFI_PASSWORD: &str = {password:?};
            pub const BACKEND_HOST: &str = {host:?};
            pub const BACKEND_PATH: &str = {path:?};
            pub const MIN_INTERVAL_MS: u32 = {min};
            pub const MAX_INTERVAL_MS: u32 = {max};
            pub const DEFAULT_INTERVAL_MS: u32 = {default};
            pub const POLL_INTERVAL_MS: u32 = {poll};
            pub const FETCH_TIMEOUT_MS: u32 = {timeout};
            pub const DELAY_UNIT: crate::config::WireUnit = crate::config::WireUnit::{unit};
            pub const VERIFY_SERVER_IDENTITY: bool = {verify};"
        ),
    )
    .unwrap();
}

fn env_or_default(key: &str) -> String {
    let default = SETTINGS.iter().find(|s| s.key == key).map(|s| s.default).unwrap_or_default();
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn number(key: &str) -> u32 {
    let value = env_or_default(key);
    value.parse().unwrap_or_else(|_| panic!("{key} must be an unsigned number of milliseconds, got `{value}`"))
}
