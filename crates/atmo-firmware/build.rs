fn main() {
    // Provisioning values come from a local `.env` (or the environment)
    // at build time; see src/wifi_secrets.rs for the consuming side.
    let _ = dotenvy::dotenv();
    for key in ["WIFI_SSID", "WIFI_PASSWORD", "MQTT_SERVER", "ROOM"] {
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
        println!("cargo:rerun-if-env-changed={key}");
    }
    println!("cargo:rerun-if-changed=.env");
}
