use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::app::{run_bench, run_echo};
use crate::args::{BenchArgs, Command, EchoArgs};
use crate::config::{apply_config, load_config};
use crate::error::{AppError, AppResult, ValidationError};

enum RunPlan {
    Echo(EchoArgs),
    Bench(Box<BenchArgs>),
}

pub(crate) fn run() -> AppResult<()> {
    let (args, matches) = parse_args()?;

    crate::logger::init_logging(args.verbose);

    let plan = build_plan(args, &matches)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| AppError::validation(ValidationError::RuntimeBuildFailed { source }))?;

    runtime.block_on(execute_plan(plan))
}

fn parse_args() -> AppResult<(BenchArgs, ArgMatches)> {
    let matches = BenchArgs::command().get_matches();
    let args = BenchArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}

fn build_plan(mut args: BenchArgs, matches: &ArgMatches) -> AppResult<RunPlan> {
    if let Some(command) = args.command.take() {
        match command {
            Command::Echo(echo_args) => return Ok(RunPlan::Echo(echo_args)),
        }
    }

    if let Some(config) = load_config(args.config.as_deref())? {
        apply_config(&mut args, matches, &config)?;
    }

    Ok(RunPlan::Bench(Box::new(args)))
}

async fn execute_plan(plan: RunPlan) -> AppResult<()> {
    match plan {
        RunPlan::Echo(echo_args) => run_echo(&echo_args).await,
        RunPlan::Bench(args) => {
            run_bench(&args).await?;
            Ok(())
        }
    }
}
