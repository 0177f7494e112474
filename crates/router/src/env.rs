#[doc(inline)]
pub use router_env::*;
pub mod logger {
    #[doc(inline)]
    pub use router_env::{log, logger::*};

    ///
    /// Setup logging sub-system.
    ///
    pub fn setup(conf: &config::Log) -> Result<TelemetryGuard, TryInitError> {
        router_env::setup(
            conf,
            router_env::service_name!(),
            [
                "router",
                "actix_server",
                "common_utils",
                "gateway_interfaces",
                "gateways",
                "masking",
                "router_env",
                "scheduler",
                "storage_impl",
                "storage_models",
            ],
        )
    }
}
