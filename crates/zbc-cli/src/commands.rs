use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "zbc")]
#[command(
    about = "Bulk compress oversized PDF attachments in a Zotero storage vault",
    long_about = None
)]
pub struct Cli {
    /// Compression level from 0 (highest fidelity) to 4 (most aggressive)
    #[arg(short = 'p', long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=4))]
    pub power: u8,

    /// Don't back up original PDFs before overwriting them
    #[arg(long = "nobackup", alias = "nb")]
    pub nobackup: bool,

    /// Do a dry run: scan and report candidates without any file changes
    #[arg(short = 'd', long = "dryrun")]
    pub dryrun: bool,

    /// Minimum size of a PDF in kilobytes for it to be compressed
    #[arg(short = 'm', long = "max", default_value_t = 5000)]
    pub max: u64,
}
