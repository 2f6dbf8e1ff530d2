use error_stack::{IntoReport, ResultExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::Error;

/// The options available for configuring logging.
#[derive(clap::Args, Debug)]
pub struct TracingOptions {
    /// Log filter configuration.
    ///
    /// Defaults to `tabkit_=info,warn` which logs `info` from any of the
    /// tabkit crates (`tabkit_compiler`, `tabkit_main`, etc.) and `warn` from
    /// other crates.
    #[arg(long, default_value = "tabkit_=info,warn", env = "TABKIT_LOG_FILTER")]
    pub log_filters: String,
}

/// Setup logging to stderr.
///
/// Standard output is left to the compiled programs.
pub fn setup_tracing(options: &TracingOptions) -> error_stack::Result<(), Error> {
    let filter = EnvFilter::try_new(&options.log_filters)
        .into_report()
        .change_context(Error::TracingSetup)
        .attach_printable_lazy(|| format!("log filters: '{}'", options.log_filters))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_error::ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .into_report()
        .change_context(Error::TracingSetup)
}
