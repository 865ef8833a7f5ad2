mod echo;
mod runner;

pub(crate) use echo::run_echo;
pub(crate) use runner::run_bench;
