use clap::{Arg, ArgAction, Command, builder::ValueParser};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Log levels in `-v` order: no flag is ERROR, `-vvvv` is TRACE.
const LEVELS: [Level; 5] = [
    Level::ERROR,
    Level::WARN,
    Level::INFO,
    Level::DEBUG,
    Level::TRACE,
];

/// Tracing level for a verbosity count; counts past the table clamp to TRACE.
#[must_use]
pub fn level(verbosity: u8) -> Level {
    LEVELS
        .get(usize::from(verbosity))
        .copied()
        .unwrap_or(Level::TRACE)
}

/// Accepts a level name (any case) or its verbosity count, as `RPCGATE_LOG_LEVEL` carries one.
fn parse_level(value: &str) -> Result<u8, String> {
    let value = value.trim();
    let position = match value.parse::<usize>() {
        Ok(count) if count < LEVELS.len() => Some(count),
        Ok(_) => None,
        Err(_) => LEVELS
            .iter()
            .position(|level| level.as_str().eq_ignore_ascii_case(value)),
    };

    position
        .and_then(|position| u8::try_from(position).ok())
        .ok_or_else(|| format!("unknown log level `{value}`, expected a level name or 0-4"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Raise log verbosity; repeat up to -vvvv for TRACE")
            .long_help(
                "Each -v raises the log level one step from ERROR: WARN, INFO, DEBUG, TRACE. RPCGATE_LOG_LEVEL takes a level name instead. RUST_LOG overrides both.",
            )
            .env("RPCGATE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(ValueParser::from(parse_level)),
    )
}
