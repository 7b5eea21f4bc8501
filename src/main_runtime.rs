use oddsgate::config::LoggingConfig;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

fn fmt_layer(json: bool, writer: BoxMakeWriter, ansi: bool) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Daily-rolling file writer, or `None` if `log_dir` is not writable
fn file_writer(log_dir: &str) -> Option<BoxMakeWriter> {
    // `rolling::daily` panics if it cannot create the initial file, so probe first
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!(
            "Warning: Could not create log directory {log_dir} ({e}), file logging disabled"
        );
        return None;
    }
    let probe = std::path::Path::new(log_dir).join(".oddsgate_write_test");
    if let Err(e) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&probe)
    {
        eprintln!(
            "Warning: Could not write to log directory {log_dir} ({e}), file logging disabled"
        );
        return None;
    }
    let _ = std::fs::remove_file(&probe);

    let file_appender = tracing_appender::rolling::daily(log_dir, "oddsgate.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // The process is short-lived; keep the guard for its whole lifetime
    Box::leak(Box::new(guard));
    Some(BoxMakeWriter::new(non_blocking))
}

pub fn init_logging(config: &LoggingConfig) {
    let fallback = format!("{},oddsgate=debug", config.level);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(
        config.json,
        BoxMakeWriter::new(std::io::stderr),
        !config.json,
    )];

    let log_dir = config
        .log_dir
        .clone()
        .or_else(|| std::env::var("ODDSGATE_LOG_DIR").ok());
    if let Some(dir) = log_dir.as_deref() {
        if let Some(writer) = file_writer(dir) {
            layers.push(fmt_layer(config.json, writer, false));
            eprintln!("Logging to: {dir}/oddsgate.log");
        }
    }

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
}
