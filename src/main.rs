use clap::Parser;
use pulplua_rust::cli::Cli;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    pulplua_rust::run(&args)
}
