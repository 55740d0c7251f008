fn main() {
    // Broker, credentials and topic are baked in at compile time through
    // `option_env!`, so a change must rebuild the firmware.
    for var in [
        "FREEDESK_CONFIG_JSON",
        "FREEDESK_WIFI_SSID",
        "FREEDESK_WIFI_PASSWORD",
        "FREEDESK_BROKER_URL",
        "FREEDESK_BROKER_USER_NAME",
        "FREEDESK_BROKER_USER_PASS",
        "FREEDESK_TOPIC",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
