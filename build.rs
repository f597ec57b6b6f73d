fn main() {
    // Baked into `NodeConfig::default()`.
    for var in ["BROKER_HOST", "BROKER_PORT", "BROKER_USER", "BROKER_PASS", "BACKEND_HOST", "BACKEND_PORT"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    // ESP-IDF toolchain environment is only needed for device builds.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
