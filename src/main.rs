use args::{parse_args, Args, Command, WatchOpts};
use log::{debug, error, SetLoggerError};
use logger::init_logger;
use std::{env, io, path::Path, process, time::Duration};
use syncbar::{
    checks::{
        digest::{DigestCheck, IgnoreSet},
        online::TcpProbe,
        CheckError,
    },
    config::{Config, ConfigError, Overrides},
    deploy::{
        detached::{run_worker, DetachedLauncher, JobFiles},
        script::ScriptDeployer,
        DeployError,
    },
    poll::{DeployStrategy, PollError, Poller},
    render::{render, MenuContext, Snapshot},
    start::{start, StartError},
    state::StateStore,
    triggers::{once::OnceTrigger, schedule::ScheduleTrigger, signal::SignalTrigger, Trigger},
};
use thiserror::Error;
use time::OffsetDateTime;

mod args;
mod logger;

#[derive(Debug, Error)]
pub enum MainError {
    #[error("Timezones cannot be set up for the logger.")]
    FailedLoggerTimezones,
    #[error("Logger cannot be set up: {0}.")]
    FailedLogger(#[from] SetLoggerError),
    #[error("Cannot find the current executable: {0}.")]
    MissingExecutable(io::Error),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Check(#[from] CheckError),
    #[error("{0}")]
    Poll(#[from] PollError),
    #[error("{0}")]
    Deploy(#[from] DeployError),
    #[error("{0}")]
    Start(#[from] StartError),
}

/// Everything built from the configuration.
struct Setup {
    config: Config,
    check: DigestCheck,
    deployer: ScriptDeployer,
    store: StateStore,
    files: JobFiles,
}

impl Setup {
    fn new(args: &Args) -> Result<Setup, MainError> {
        let overrides = Overrides {
            directory: args.directory.clone(),
            site_id: args.site.clone(),
            ignore: args.ignore.clone(),
            strategy: args.strategy,
        };
        let config = Config::load(args.config.as_deref().map(Path::new), overrides)?;
        debug!("Using config {config:?}.");

        let ignore = IgnoreSet::new(&config.ignore).map_err(CheckError::from)?;
        let check = DigestCheck::new(config.directory.clone(), ignore);
        let deployer = ScriptDeployer::new(
            config.directory.clone(),
            config.site_id.clone(),
            config.deploy_command.clone(),
            config.read_token()?,
        );
        let store = StateStore::new(&config.state_dir);
        let files = JobFiles::new(&config.state_dir);

        Ok(Setup {
            config,
            check,
            deployer,
            store,
            files,
        })
    }

    fn into_poller(self, args: &Args, strategy: DeployStrategy) -> Result<Poller, MainError> {
        let program = env::current_exe().map_err(MainError::MissingExecutable)?;
        let mut worker_args = args.forwarded();
        worker_args.push(String::from("deploy-worker"));
        let launcher = DetachedLauncher::new(self.files, program, worker_args);
        let connectivity = TcpProbe::new(
            self.config.probe_address.clone(),
            self.config.probe_timeout,
        );

        Ok(Poller::new(
            Box::new(self.check),
            Box::new(connectivity),
            Box::new(self.deployer),
            Box::new(launcher),
            self.store,
        )
        .with_strategy(strategy)
        .with_history_limit(self.config.history_limit))
    }
}

fn menu_context(args: &Args, site_url: Option<String>) -> MenuContext {
    let program = env::current_exe()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| String::from("syncbar"));

    MenuContext {
        program,
        args: args.forwarded(),
        site_url,
        now: OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
    }
}

/// Print the menu of a poll or the status. It never fails, errors are shown in the menu.
fn print_menu(args: &Args, update: bool) {
    let mut site_url = None;
    let snapshot = Setup::new(args).and_then(|setup| {
        site_url = setup.config.site_url.clone();
        let strategy = setup.config.strategy;
        Ok(setup.into_poller(args, strategy)?.menu(update))
    });
    let snapshot = snapshot.unwrap_or_else(|err| {
        error!("{err}");
        Snapshot {
            failure: Some(err.to_string()),
            ..Default::default()
        }
    });

    for line in render(&snapshot, &menu_context(args, site_url)) {
        println!("{line}");
    }
}

fn watch(args: &Args, opts: &WatchOpts) -> Result<(), MainError> {
    let poller = Setup::new(args)?.into_poller(args, DeployStrategy::Immediate)?;

    let mut triggers: Vec<Box<dyn Trigger>> = vec![Box::new(SignalTrigger::new())];
    if opts.once {
        triggers.push(Box::new(OnceTrigger));
    } else {
        let duration: Duration = opts.delay.into();
        triggers.push(Box::new(ScheduleTrigger::new(duration)));
    }

    start(triggers, &poller)?;

    Ok(())
}

fn deploy_worker(args: &Args) -> Result<(), MainError> {
    let setup = Setup::new(args)?;
    run_worker(&setup.check, &setup.deployer, &setup.store, &setup.files)?;

    Ok(())
}

fn run(args: &Args) -> Result<(), MainError> {
    match &args.command {
        None | Some(Command::Poll(_)) => print_menu(args, true),
        Some(Command::Status(_)) => print_menu(args, false),
        Some(Command::Trigger(_)) => {
            let setup = Setup::new(args)?;
            let strategy = setup.config.strategy;
            setup.into_poller(args, strategy)?.trigger()?;
        }
        Some(Command::Reset(_)) => {
            let setup = Setup::new(args)?;
            let strategy = setup.config.strategy;
            setup.into_poller(args, strategy)?.reset()?;
        }
        Some(Command::Watch(opts)) => watch(args, opts)?,
        Some(Command::DeployWorker(_)) => deploy_worker(args)?,
    }

    Ok(())
}

fn main() {
    let args = parse_args();

    if args.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(err) = init_logger(&args) {
        eprintln!("{err}");
    }

    if let Err(err) = run(&args) {
        eprintln!("{err}");
        process::exit(1);
    }
}
