use crate::{
    args::{Args, Command},
    MainError,
};
use log::{warn, Level, LevelFilter};
use simplelog::{
    format_description, Color, ColorChoice, ConfigBuilder, LevelPadding, TermLogger, TerminalMode,
};

const TIMESTAMP_FORMAT_OFFSET: &[simplelog::FormatItem<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour sign:mandatory]:[offset_minute]"
);

const LEVELS: [LevelFilter; 4] = [
    LevelFilter::Warn,
    LevelFilter::Info,
    LevelFilter::Debug,
    LevelFilter::Trace,
];

/// The menu bar app runs `poll` every few seconds and keeps its stderr,
/// those invocations only report warnings unless asked for more.
fn default_level(command: Option<&Command>) -> LevelFilter {
    match command {
        None | Some(Command::Poll(_)) | Some(Command::Status(_)) => LevelFilter::Warn,
        Some(_) => LevelFilter::Info,
    }
}

fn level(args: &Args) -> LevelFilter {
    if args.quiet {
        return LevelFilter::Error;
    }

    let default = default_level(args.command.as_ref());
    let start = LEVELS.iter().position(|level| *level == default).unwrap_or(0);
    LEVELS
        .get(start + usize::from(args.verbose))
        .copied()
        .unwrap_or(LevelFilter::Trace)
}

/// Log to stderr, stdout is reserved for the menu.
pub fn init_logger(args: &Args) -> Result<(), MainError> {
    TermLogger::init(
        level(args),
        ConfigBuilder::new()
            .set_level_color(Level::Debug, Some(Color::Magenta))
            .set_level_color(Level::Trace, None)
            .set_level_padding(LevelPadding::Right)
            .set_target_level(LevelFilter::Off)
            .set_thread_level(LevelFilter::Off)
            .set_time_format_custom(TIMESTAMP_FORMAT_OFFSET)
            .set_time_offset_to_local()
            .map_err(|_| MainError::FailedLoggerTimezones)?
            .build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    if args.verbose > 3 {
        warn!("Okay, it's time to stop. It won't get more verbose than this.")
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gumdrop::Options;

    fn level_of(args: &[&str]) -> LevelFilter {
        level(&Args::parse_args_default(args).unwrap())
    }

    #[test]
    fn it_should_keep_the_menu_quiet_by_default() {
        assert_eq!(LevelFilter::Warn, level_of(&[]));
        assert_eq!(LevelFilter::Warn, level_of(&["status"]));
        assert_eq!(LevelFilter::Info, level_of(&["-v", "poll"]));
    }

    #[test]
    fn it_should_log_info_for_other_commands() {
        assert_eq!(LevelFilter::Info, level_of(&["watch"]));
        assert_eq!(LevelFilter::Info, level_of(&["deploy-worker"]));
        assert_eq!(LevelFilter::Debug, level_of(&["-v", "trigger"]));
    }

    #[test]
    fn it_should_stop_at_trace() {
        assert_eq!(LevelFilter::Trace, level_of(&["-vvvvvv", "reset"]));
        assert_eq!(LevelFilter::Error, level_of(&["-q", "-vv", "watch"]));
    }
}
