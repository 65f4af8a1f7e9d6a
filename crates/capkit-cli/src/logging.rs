use capkit_core::LoggingConfig;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type FormatLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber. Logs go to stderr so stdout stays
/// parseable in json mode.
pub fn init_logging(config: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(format_layer(&config.format, std::io::stderr))
        .with(filter)
        .init();
}

fn format_layer<W>(format: &str, writer: W) -> FormatLayer
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    match format {
        "json" => fmt::layer().json().with_writer(writer).boxed(),
        "compact" => fmt::layer().compact().with_writer(writer).boxed(),
        "pretty" => fmt::layer().pretty().with_writer(writer).boxed(),
        _ => fmt::layer().with_writer(writer).boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn render(format: &str) -> String {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = Registry::default().with(format_layer(format, move || writer.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(user = "u2", "Skipping user");
        });
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_pretty_format_prints_source_location() {
        let pretty = render("pretty");
        assert!(pretty.contains("Skipping user"));
        assert!(pretty.contains("logging.rs"), "missing location in {:?}", pretty);

        let full = render("full");
        assert!(full.contains("Skipping user"));
        assert!(!full.contains("logging.rs"));
    }

    #[test]
    fn test_json_format_emits_json_lines() {
        let output = render("json");
        let line: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(line["fields"]["message"], "Skipping user");
        assert_eq!(line["fields"]["user"], "u2");
    }
}
