//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() -> eyre::Result<()> {
    chargesite_cli::run()?;
    Ok(())
}
