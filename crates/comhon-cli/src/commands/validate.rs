//! Validate command
//!
//! Usage: comhon validate --model <MODEL> <INPUT> [--config <PATH>]

use super::{CliResult, Session, SourceArgs};
use clap::Args;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

/// Import the document with validation and reference checks forced on
pub async fn execute(args: ValidateArgs) -> CliResult<()> {
    let mut session = Session::open(&args.source).await?;
    session.options = session
        .options
        .clone()
        .with_validate(true)
        .with_verify_references(true);

    let format = session.format_of(&args.source.input, args.source.from);
    let text = std::fs::read_to_string(&args.source.input)?;
    let handle = session.import(format, &text).await?;
    session.comhon.validate(handle)?;

    println!(
        "✓ {} is a valid {}",
        args.source.input.display(),
        session.model.name()
    );
    Ok(())
}
