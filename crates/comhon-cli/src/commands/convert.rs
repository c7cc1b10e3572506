//! Convert command
//!
//! Usage: comhon convert --model <MODEL> <INPUT> --to <FORMAT> [--output <PATH>]

use super::{CliResult, FormatArg, Session, SourceArgs};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Target format
    #[arg(long)]
    pub to: FormatArg,

    /// Write the result here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Indent the output
    #[arg(long)]
    pub pretty: bool,
}

pub async fn execute(args: ConvertArgs) -> CliResult<()> {
    let mut session = Session::open(&args.source).await?;

    let from = session.format_of(&args.source.input, args.source.from);
    let text = std::fs::read_to_string(&args.source.input)?;
    let handle = session.import(from, &text).await?;
    let converted = session.export(handle, args.to.into(), args.pretty)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, converted)?;
            println!("✓ Wrote {}", path.display());
        }
        None => println!("{}", converted),
    }
    Ok(())
}
