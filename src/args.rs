use duration_string::DurationString;
use gumdrop::Options;
use syncbar::poll::DeployStrategy;

/// Watch a directory, deploy it to static hosting on changes and print the
/// status for the menu bar.
#[derive(Debug, Options)]
pub struct Args {
    /// The config file (default: <config dir>/syncbar/config.json).
    #[options(meta = "FILE")]
    pub config: Option<String>,

    /// The directory to watch and deploy.
    #[options(meta = "DIR")]
    pub directory: Option<String>,

    /// The id of the site to deploy to.
    #[options(meta = "ID")]
    pub site: Option<String>,

    /// A glob pattern to leave out of the deploys, you can define multiple times.
    ///
    /// Replaces the patterns of the config file (default: "**/.*" and "**/_src/*").
    #[options(meta = "PATTERN")]
    pub ignore: Vec<String>,

    /// When to deploy the changes: staggered, immediate or detached.
    #[options(no_short, meta = "STRATEGY")]
    pub strategy: Option<DeployStrategy>,

    /// Only print error messages.
    #[options()]
    pub quiet: bool,

    /// Increase verbosity, can be set multiple times (-v debug, -vv tracing)
    #[options(count)]
    pub verbose: u8,

    /// Print the current version.
    #[options(short = "V")]
    pub version: bool,

    /// Print this help.
    #[options()]
    pub help: bool,

    /// The command to run, poll if not given.
    #[options(command)]
    pub command: Option<Command>,
}

#[derive(Debug, Options)]
pub enum Command {
    /// Run one step of the state machine and print the menu.
    Poll(CommandOpts),
    /// Print the menu without changing anything.
    Status(CommandOpts),
    /// Queue a deploy, even if nothing changed.
    Trigger(CommandOpts),
    /// Delete the state and start over.
    Reset(CommandOpts),
    /// Keep running and deploy right away on changes.
    Watch(WatchOpts),
    /// Run a background deploy, started by the detached strategy.
    DeployWorker(CommandOpts),
}

#[derive(Debug, Options)]
pub struct CommandOpts {
    /// Print this help.
    #[options()]
    pub help: bool,
}

#[derive(Debug, Options)]
pub struct WatchOpts {
    /// Polls the directory with this delay.
    ///
    /// Can be a number postfixed with s(econd), m(inutes), h(ours), d(ays)
    #[options(long = "every", default = "10s")]
    pub delay: DurationString,

    /// Poll only once and exit.
    #[options()]
    pub once: bool,

    /// Print this help.
    #[options()]
    pub help: bool,
}

impl Args {
    /// The global options to pass to ourselves, when the menu or a background
    /// deploy runs the program again.
    pub fn forwarded(&self) -> Vec<String> {
        let mut forwarded = vec![];
        if let Some(config) = &self.config {
            forwarded.extend([String::from("--config"), config.clone()]);
        }
        if let Some(directory) = &self.directory {
            forwarded.extend([String::from("--directory"), directory.clone()]);
        }
        if let Some(site) = &self.site {
            forwarded.extend([String::from("--site"), site.clone()]);
        }
        for ignore in &self.ignore {
            forwarded.extend([String::from("--ignore"), ignore.clone()]);
        }

        forwarded
    }
}

pub fn parse_args() -> Args {
    Args::parse_args_default_or_exit()
}
