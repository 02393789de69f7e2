mod cli;
mod compile;

#[cfg(test)]
mod cli_tests;

use clap::Parser;

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = compile::run(&cli) {
        eprint!("{}", compile::report(&err, cli.color.should_colorize()));
        std::process::exit(1);
    }
}
