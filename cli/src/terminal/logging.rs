use anyhow::anyhow;
use colored::*;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::registry::LookupSpan;

use super::print::PRINT_TARGET;

pub struct CartoFormatter;

/// Spots events logged through `success!`.
#[derive(Default)]
struct SuccessVisitor {
    success: bool,
}

impl Visit for SuccessVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "status" && value == "success" {
            self.success = true;
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

impl<S, N> FormatEvent<S, N> for CartoFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();

        // Terminal output goes through the logger but carries no status symbol.
        if meta.target() != PRINT_TARGET {
            let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) = match *meta.level() {
                Level::TRACE => ("[ ]", |s| s.dimmed()),
                Level::DEBUG => ("[?]", |s| s.blue()),
                Level::INFO if succeeded(event) => ("[+]", |s| s.green().bold()),
                Level::INFO => ("[+]", |s| s.green()),
                Level::WARN => ("[*]", |s| s.yellow().bold()),
                Level::ERROR => ("[-]", |s| s.red().bold()),
            };
            write!(writer, "{} ", color_func(symbol.into()))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

fn succeeded(event: &Event<'_>) -> bool {
    let mut visitor = SuccessVisitor::default();
    event.record(&mut visitor);
    visitor.success
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. Terminal output is always shown.
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| anyhow!("invalid log level '{level}': {e}"))?,
    };
    let filter = filter.add_directive(
        format!("{PRINT_TARGET}=info")
            .parse()
            .map_err(|e| anyhow!("invalid print directive: {e}"))?,
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(CartoFormatter)
        .try_init()
        .map_err(|e| anyhow!("failed to install logger: {e}"))
}
