use clap::{CommandFactory, Parser, error::ErrorKind};
use lab_ingest::cli;
use tracing::error;

fn main() {
    let args = match cli::Args::try_parse() {
        Ok(args) => args,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                std::process::exit(1);
            }
        },
    };

    if args.cmd.is_none() && args.folder.is_none() {
        eprintln!("{}", cli::Args::command().render_usage());
        std::process::exit(1);
    }

    if let Err(err) = cli::dispatch(args) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
