//! Command dispatcher: parses `<command>[:<profile>] [<mapProfile>]` and
//! routes to the store, the pipeline runner, or the launcher.

use std::io::Write;

use anyhow::Context as _;

use crate::invoker::ToolInvoker;
use crate::launcher::{GameSpawner, Launcher};
use crate::listing::{format_builds, format_maps};
use crate::pipeline::PipelineRunner;
use crate::store::ProfileStore;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_USAGE: u8 = 2;

pub const USAGE: &str = "\
Usage:   kccompile <command>:<profile> <map profile>
Example: kccompile build:fast e1m2
\tCommands:
\t\tnewBuild:<profilename>\tScaffold new build profile
\t\tbuildProfiles\t\tShows all build profiles
\t\tnewMap:<mapname>\tScaffold new map profile
\t\tmapProfiles\t\tShows all map profiles
\t\tbuild:<profile> <map>\tExecutes build profile against a map profile
\t\tplay <map>\t\tSkips compilation. Play last compiled map in map profile
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Build { build: String, map: String },
    NewBuild { name: String },
    NewMap { name: String },
    BuildProfiles,
    MapProfiles,
    Play { map: String },
    Help,
}

impl Command {
    /// Whether the command changes the profile file.
    pub fn mutates_profiles(&self) -> bool {
        matches!(self, Command::NewBuild { .. } | Command::NewMap { .. })
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("no command given")]
    NoCommand,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{0}' needs a profile name, e.g. {0}:<name>")]
    MissingProfile(String),
    #[error("'{0}' needs a map profile argument")]
    MissingMap(String),
    #[error("unexpected argument '{0}'")]
    Unexpected(String),
}

/// Parse process arguments, excluding the program name.
pub fn parse_args<I, S>(args: I) -> Result<Command, UsageError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let Some(first) = args.next() else {
        return Err(UsageError::NoCommand);
    };
    let second = args.next();
    if let Some(extra) = args.next() {
        return Err(UsageError::Unexpected(extra));
    }

    let (name, profile) = match first.split_once(':') {
        Some((n, p)) => (n, Some(p.trim()).filter(|p| !p.is_empty())),
        None => (first.as_str(), None),
    };
    let require_profile = || {
        profile
            .map(|p| p.to_string())
            .ok_or_else(|| UsageError::MissingProfile(name.to_string()))
    };
    let no_extra = |cmd: Command| match &second {
        Some(extra) => Err(UsageError::Unexpected(extra.clone())),
        None => Ok(cmd),
    };

    match name {
        "build" => {
            let build = require_profile()?;
            let map = second
                .clone()
                .filter(|m| !m.trim().is_empty())
                .ok_or_else(|| UsageError::MissingMap(name.to_string()))?;
            Ok(Command::Build { build, map })
        }
        "newBuild" => no_extra(Command::NewBuild {
            name: require_profile()?,
        }),
        "newMap" => no_extra(Command::NewMap {
            name: require_profile()?,
        }),
        "buildProfiles" if profile.is_none() => no_extra(Command::BuildProfiles),
        "mapProfiles" if profile.is_none() => no_extra(Command::MapProfiles),
        "play" => match (profile, second.clone()) {
            (Some(p), None) => Ok(Command::Play { map: p.to_string() }),
            (None, Some(m)) if !m.trim().is_empty() => Ok(Command::Play { map: m }),
            (Some(_), Some(extra)) => Err(UsageError::Unexpected(extra)),
            _ => Err(UsageError::MissingMap(name.to_string())),
        },
        "help" | "-h" | "--help" => Ok(Command::Help),
        _ => Err(UsageError::Unknown(first.clone())),
    }
}

/// Owns the loaded store and the engine parts for one command.
pub struct Dispatcher<I: ToolInvoker, S: GameSpawner> {
    store: ProfileStore,
    runner: PipelineRunner<I>,
    launcher: Launcher<S>,
}

impl<I: ToolInvoker, S: GameSpawner> Dispatcher<I, S> {
    pub fn new(store: ProfileStore, runner: PipelineRunner<I>, launcher: Launcher<S>) -> Self {
        Self {
            store,
            runner,
            launcher,
        }
    }

    /// Run one command. User-facing output goes to `out`; failures come back
    /// as errors for the caller to report.
    pub async fn execute(&mut self, cmd: Command, out: &mut dyn Write) -> anyhow::Result<()> {
        tracing::debug!("dispatching {:?}", cmd);
        match &cmd {
            Command::Help => write!(out, "{USAGE}")?,
            Command::BuildProfiles => {
                write!(out, "{}", format_builds(self.store.list_build_profiles()))?
            }
            Command::MapProfiles => {
                write!(out, "{}", format_maps(self.store.list_map_profiles()))?
            }
            Command::NewBuild { name } => {
                self.store
                    .create_build_profile(name)
                    .with_context(|| format!("Build: {name} not created"))?;
                writeln!(out, "Creating new build: {name}")?;
            }
            Command::NewMap { name } => {
                self.store
                    .create_map_profile(name)
                    .with_context(|| format!("Map: {name} not created"))?;
                writeln!(out, "Creating new map profile: {name}")?;
            }
            Command::Build { build, map } => self.build(build, map, out).await?,
            Command::Play { map } => {
                let profile = self.store.get_map_profile(map)?;
                let launched = self.launcher.play(profile)?;
                writeln!(
                    out,
                    "Launched {} {} (pid {})",
                    launched.exec,
                    launched.argv.join(" "),
                    launched.pid
                )?;
            }
        }

        if cmd.mutates_profiles() && self.store.save()? {
            tracing::info!("wrote {}", self.store.path().display());
        }
        Ok(())
    }

    async fn build(&self, build: &str, map: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let build_profile = self.store.get_build_profile(build)?.clone();
        let map_profile = self.store.get_map_profile(map)?.clone();

        let result = self.runner.run(&build_profile, &map_profile).await;
        for stage in &result.stages {
            let status = match stage.exit_code {
                Some(0) => "ok".to_string(),
                Some(c) => format!("exit {c}"),
                None => "killed".to_string(),
            };
            writeln!(
                out,
                "  {:<8} {:<8} {:>7.1}s  {}",
                stage.tool,
                status,
                stage.duration.as_secs_f64(),
                stage.command
            )?;
        }

        if let Some(err) = result.error {
            let at = result
                .failed_at
                .map(|t| format!(" at '{t}'"))
                .unwrap_or_default();
            return Err(anyhow::Error::new(err)
                .context(format!("build '{build}' for map '{map}' failed{at}")));
        }
        if let Some(placed) = &result.artifact {
            writeln!(
                out,
                "Build '{build}' for map '{map}' succeeded; copied to {}",
                placed.display()
            )?;
        }
        Ok(())
    }
}
