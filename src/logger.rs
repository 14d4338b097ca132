use std::{
    collections::HashMap,
    fmt::Write as _,
    fs::OpenOptions,
    path::PathBuf,
};
use nu_ansi_term::{Color, Style};
use serde::Deserialize;
use termcolor::ColorChoice;
use tracing::{field::{Field, Visit}, Level};
use tracing_log::NormalizeEvent;
use tracing_subscriber::{
    filter::{FilterFn, LevelFilter},
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
};


use crate::{prelude::*, args::Args};


#[derive(Debug, confique::Config)]
pub(crate) struct LogConfig {
    /// Specifies what log messages to emit, based on the module path and log level.
    ///
    /// This is a map where the key specifies a module path prefix, and the
    /// value specifies a minimum log level. For each log message, the map
    /// entry with the longest prefix matching the log's module path is chosen.
    /// If no such entry exists, the log is not emitted. Otherwise, that
    /// entry's level is used to check whether the log message should be
    /// emitted.
    ///
    /// Example: the following config allows ≥"info" logs from this
    /// application generally, but ≥"trace" messages from the `db` module.
    /// It also enables ≥"debug" messages from the MongoDB driver.
    ///
    ///    [log]
    ///    filters.social_api = "info"
    ///    filters."social_api::db" = "trace"
    ///    filters.mongodb = "debug"
    #[config(default = { "social_api": "debug" })]
    pub(crate) filters: Filters,

    /// If this is set, log messages are also written to this file. The string
    /// `${cmd}` in this value is replaced by the subcommand name, e.g. `serve`
    /// or `check`. Example: "/var/log/social-api-${cmd}.log".
    pub(crate) file: Option<PathBuf>,

    /// If this is set to `false`, log messages are not written to stdout.
    #[config(default = true)]
    pub(crate) stdout: bool,

    /// If set to `true`, HTTP header of each incoming request are logged
    /// (with 'trace' level).
    #[config(default = false)]
    pub(crate) log_http_headers: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "HashMap<String, String>")]
pub(crate) struct Filters(HashMap<String, LevelFilter>);

impl TryFrom<HashMap<String, String>> for Filters {
    type Error = String;
    fn try_from(value: HashMap<String, String>) -> Result<Self, Self::Error> {
        value.into_iter()
            .map(|(target_prefix, level)| Ok((target_prefix, parse_level_filter(&level)?)))
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

impl Filters {
    /// Returns the level of the longest prefix matching `target`, or `None`
    /// if no prefix matches.
    fn level_for(&self, target: &str) -> Option<LevelFilter> {
        self.0.iter()
            .filter(|(prefix, _)| target.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, level)| *level)
    }

    fn max_level(&self) -> LevelFilter {
        self.0.values().max().copied().unwrap_or(LevelFilter::OFF)
    }
}

fn parse_level_filter(s: &str) -> Result<LevelFilter, String> {
    match s {
        "off" => Ok(LevelFilter::OFF),
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        other => Err(format!("invalid log level '{other}'")),
    }
}

/// Installs our own logger globally. Must only be called once!
pub(crate) fn init(config: &LogConfig, args: &Args, cmd: &str) -> Result<()> {
    let filters = config.filters.clone();
    let max_level = filters.max_level();
    let filter = FilterFn::new(move |metadata| {
        filters.level_for(metadata.target())
            .is_some_and(|level| metadata.level() <= &level)
    }).with_max_level_hint(max_level);

    macro_rules! subscriber {
        ($writer:expr) => {
            tracing_subscriber::fmt::layer()
                .event_format(EventFormatter(args.color))
                .with_writer($writer)
        };
    }

    let stdout_output = config.stdout.then(|| subscriber!(std::io::stdout));

    let file_output = config.file.as_ref()
        .map(|path| -> Result<std::fs::File> {
            use std::io::Write;

            let path = path.to_str()
                .ok_or_else(|| anyhow!("log file path is not valid UTF-8"))?
                .replace("${cmd}", cmd);

            let mut file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .with_context(|| format!("failed to open/create log file '{path}'"))?;

            // Empty line to make process restarts visible.
            file.write_all(b"\n").context("could not write to log file")?;

            Ok(file)
        })
        .transpose()?
        .map(|file| subscriber!(file).with_ansi(args.color == ColorChoice::Always));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_output)
        .with(stdout_output)
        .init();

    Ok(())
}


/// Fields that are never printed: the message is printed separately, `log.*`
/// comes from `tracing-log` and `social_api.*` are flags for the formatter.
fn ignore_field(name: &str) -> bool {
    name == "message" || name.starts_with("log.") || name.starts_with("social_api.")
}

/// Formats events as `<time> <level> <target> >  <message> ~~ <fields>`.
///
/// Setting the field `social_api.multiline = true` prints each field on its own
/// line, aligned with the message.
#[derive(Clone, Copy)]
struct EventFormatter(ColorChoice);

impl<S, N> FormatEvent<S, N> for EventFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let use_ansi = self.0 == ColorChoice::Always
            || (writer.has_ansi_escapes() && self.0 != ColorChoice::Never);
        let painter = Painter { use_ansi };

        let normalized_metadata = event.normalized_metadata();
        let metadata = normalized_metadata.as_ref().unwrap_or(event.metadata());

        let dim_style = Style::new().dimmed();
        let (level_style, body_style) = match *metadata.level() {
            Level::ERROR => (Style::new().fg(Color::Red).bold(), Style::new().fg(Color::Red)),
            Level::WARN => (Style::new().fg(Color::Yellow).bold(), Style::new().fg(Color::Yellow)),
            Level::INFO => (Style::new().fg(Color::Green), Style::new()),
            Level::DEBUG => (Style::new().fg(Color::Blue), Style::new().dimmed()),
            Level::TRACE => (Style::new().fg(Color::Magenta), Style::new().fg(Color::DarkGray)),
        };

        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S.%3f");
        painter.paint(&mut writer, dim_style, format_args!("{now} "))?;
        painter.paint(&mut writer, level_style, format_args!("{:5}", metadata.level()))?;
        painter.paint(&mut writer, dim_style, format_args!(" {} >  ", metadata.target()))?;

        let mut probe = Probe::default();
        event.record(&mut probe);

        // Continuation lines start below the message. This assumes the target
        // is ASCII, which holds for module paths.
        let indent = "2021-05-04 19:40:18.270 DEBUG ".len() + 1 + metadata.target().len();
        let mut prefix = format!("\n{:indent$}", "");
        if use_ansi {
            write!(prefix, "{}>{}  ", dim_style.prefix(), dim_style.suffix())?;
        } else {
            prefix.push_str(">  ");
        }

        if let Some(msg) = &probe.message {
            painter.paint_lines(&mut writer, body_style, &prefix, msg)?;
        }

        if probe.num_fields > 0 {
            if probe.message.is_some() {
                painter.paint(&mut writer, level_style, format_args!(" ~~ "))?;
            }
            let mut printer = FieldPrinter {
                painter,
                body_style,
                prefix: &prefix,
                multiline: probe.multiline,
                needs_separator: probe.multiline && probe.message.is_some(),
                buffer: String::new(),
                out: writer.by_ref(),
                result: Ok(()),
            };
            event.record(&mut printer);
            printer.result?;
        }

        writeln!(writer, "{}", if use_ansi { nu_ansi_term::ansi::RESET } else { "" })
    }
}

/// First pass over the fields: remembers the message and the formatter flags.
#[derive(Debug, Default)]
struct Probe {
    message: Option<String>,
    multiline: bool,
    num_fields: u32,
}

impl Visit for Probe {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else if !ignore_field(field.name()) {
            self.num_fields += 1;
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "social_api.multiline" {
            self.multiline = value;
        } else if !ignore_field(field.name()) {
            self.num_fields += 1;
        }
    }
}

/// Second pass: prints all fields as `key=value`.
struct FieldPrinter<'a, 'w> {
    painter: Painter,
    body_style: Style,
    prefix: &'a str,
    multiline: bool,
    needs_separator: bool,
    buffer: String,
    out: Writer<'w>,
    result: std::fmt::Result,
}

impl FieldPrinter<'_, '_> {
    fn print(&mut self, field: &Field, value: &dyn std::fmt::Debug) -> std::fmt::Result {
        self.buffer.clear();
        write!(self.buffer, "{value:?}")?;

        if self.needs_separator {
            let separator = if self.multiline { self.prefix } else { " " };
            write!(self.out, "{separator}")?;
        }
        self.needs_separator = true;

        let body = self.body_style;
        self.painter.paint(&mut self.out, body.italic(), format_args!("{}", field.name()))?;
        let eq = if self.multiline { " = " } else { "=" };
        self.painter.paint(&mut self.out, body, format_args!("{eq}"))?;
        if self.multiline {
            self.painter.paint_lines(&mut self.out, body, self.prefix, &self.buffer)
        } else {
            self.painter.paint(&mut self.out, body, format_args!("{}", self.buffer))
        }
    }
}

impl Visit for FieldPrinter<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if ignore_field(field.name()) || self.result.is_err() {
            return;
        }
        self.result = self.print(field, value);
    }
}

#[derive(Clone, Copy)]
struct Painter {
    use_ansi: bool,
}

impl Painter {
    fn paint(
        &self,
        out: &mut Writer<'_>,
        style: Style,
        args: std::fmt::Arguments<'_>,
    ) -> std::fmt::Result {
        if self.use_ansi {
            write!(out, "{}{}{}", style.prefix(), args, style.suffix())
        } else {
            out.write_fmt(args)
        }
    }

    /// Paints `s` line by line, starting each line after the first with `prefix`.
    fn paint_lines(
        &self,
        out: &mut Writer<'_>,
        style: Style,
        prefix: &str,
        s: &str,
    ) -> std::fmt::Result {
        let mut lines = s.lines();
        self.paint(out, style, format_args!("{}", lines.next().unwrap_or("")))?;
        for line in lines {
            write!(out, "{prefix}")?;
            self.paint(out, style, format_args!("{line}"))?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn filters(entries: &[(&str, &str)]) -> Filters {
        let map = entries.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        Filters::try_from(map).unwrap()
    }

    #[test]
    fn longest_prefix_wins() {
        let f = filters(&[
            ("social_api", "info"),
            ("social_api::db", "trace"),
            ("social_api::db::mongo", "off"),
        ]);

        assert_eq!(f.level_for("social_api::http"), Some(LevelFilter::INFO));
        assert_eq!(f.level_for("social_api::db::session"), Some(LevelFilter::TRACE));
        assert_eq!(f.level_for("social_api::db::mongo"), Some(LevelFilter::OFF));
        assert_eq!(f.level_for("hyper::proto"), None);
        assert_eq!(f.max_level(), LevelFilter::TRACE);
    }

    #[test]
    fn unknown_levels_are_rejected() {
        let map = HashMap::from([("social_api".to_owned(), "verbose".to_owned())]);
        let err = Filters::try_from(map).unwrap_err();
        assert_eq!(err, "invalid log level 'verbose'");
    }

    #[test]
    fn ignored_fields() {
        assert!(ignore_field("message"));
        assert!(ignore_field("log.target"));
        assert!(ignore_field("social_api.multiline"));
        assert!(!ignore_field("num_ops"));
    }
}
