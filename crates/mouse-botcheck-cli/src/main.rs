/*!
# mouse-botcheck

Command line front-end: replay stored buffers, evaluate synthetic
trajectories, or run a live observation session fed from standard input or,
with the `window-capture` feature, from cursor movement over a window.
*/

mod cli;
mod stdin;

#[cfg(feature = "window-capture")]
mod capture;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use mouse_botcheck::{
    DetectorConfig, DiagnosticStore, Evaluator, FileStore, HttpRemoteClassifier, Sample,
    SessionController, SessionOutcome, StoreFormat, TrajectoryGenerator,
};
use once_cell::sync::OnceCell;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

static BOTCHECK_RT: OnceCell<Runtime> = OnceCell::new();

/// Shared runtime for the session timer, the sample sources and the remote call.
pub(crate) fn runtime() -> std::io::Result<&'static Runtime> {
    BOTCHECK_RT.get_or_try_init(Runtime::new)
}

pub(crate) type Session = SessionController<Option<HttpRemoteClassifier>>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = DetectorConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Replay { input, format } => {
            run_replay(&input, format.map(Into::into), &config, cli.json)?;
        }
        Commands::Simulate {
            profile,
            seed,
            samples,
            output,
        } => {
            let trajectory: Vec<Sample> =
                TrajectoryGenerator::new(seed).generate(profile.into(), samples);
            if let Some(path) = &output {
                FileStore::write_file(path, StoreFormat::from_path(path), &trajectory)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!("Synthetic trajectory written to {}", path.display());
            }
            evaluate(&trajectory, &config)?.print_report(cli.json)?;
        }
        Commands::Stdin => {
            run_stdin(&config)?.print_report(cli.json)?;
        }
        #[cfg(feature = "window-capture")]
        Commands::Capture => {
            capture::run(build_session(&config)?)?.print_report(cli.json)?;
        }
        Commands::Clear => {
            let store = FileStore::new(&config.diagnostics.dir, config.diagnostics.format);
            store.clear(&config.diagnostics.key)?;
            println!("Cleared {}", store.path_for(&config.diagnostics.key).display());
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn run_replay(
    input: &Path,
    format: Option<StoreFormat>,
    config: &DetectorConfig,
    json: bool,
) -> anyhow::Result<()> {
    let format: StoreFormat = format.unwrap_or_else(|| StoreFormat::from_path(input));
    let samples: Vec<Sample> = FileStore::read_file(input, format)
        .with_context(|| format!("failed to read {}", input.display()))?;
    info!("Replaying {} samples from {}", samples.len(), input.display());
    evaluate(&samples, config)?.print_report(json)
}

fn run_stdin(config: &DetectorConfig) -> anyhow::Result<SessionOutcome> {
    let mut session: Session = build_session(config)?;
    let sink = session.start()?;
    runtime()?.block_on(async move {
        let reader = tokio::spawn(stdin::forward_lines(tokio::io::stdin(), sink));
        let outcome: SessionOutcome = session.run().await?;
        reader.abort();
        Ok::<SessionOutcome, anyhow::Error>(outcome)
    })
}

/// Evaluates an already-collected trajectory without an observation window.
fn evaluate(samples: &[Sample], config: &DetectorConfig) -> anyhow::Result<SessionOutcome> {
    let evaluator = Evaluator::new(config, HttpRemoteClassifier::from_config(&config.remote)?);
    Ok(runtime()?.block_on(evaluator.evaluate(samples)))
}

pub(crate) fn build_session(config: &DetectorConfig) -> anyhow::Result<Session> {
    let remote: Option<HttpRemoteClassifier> = HttpRemoteClassifier::from_config(&config.remote)?;
    if remote.is_none() {
        info!("No remote classifier configured; decisions will be local-only");
    }
    let store: Option<Arc<dyn DiagnosticStore>> = if config.diagnostics.enabled {
        Some(Arc::new(FileStore::new(
            &config.diagnostics.dir,
            config.diagnostics.format,
        )))
    } else {
        None
    };
    Ok(SessionController::new(config, remote, store))
}

trait CommandlineOutput {
    fn print_report(&self, json: bool) -> anyhow::Result<()>;
}

impl CommandlineOutput for SessionOutcome {
    fn print_report(&self, json: bool) -> anyhow::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }
        println!("{}", self.local.metrics);
        println!("Local classification: {}", self.local.classification);
        println!("Remote classification: {}", self.remote);
        println!("Final classification: {}", self.final_classification);
        Ok(())
    }
}
