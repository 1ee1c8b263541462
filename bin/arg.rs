// A module to parse command line arguments

use ::clap::Parser;
use ::std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "filterio",
    version = "0.1.0",
    about = "Runs a named decode filter chain over a file"
)]
pub struct Args {
    #[clap(short, long, help = "Enable verbose output")]
    pub verbose: bool,
    #[clap(help = "The file to decode")]
    pub input: PathBuf,
    #[clap(short, long, help = "Where to write the decoded bytes (defaults to stdout)")]
    pub output: Option<PathBuf>,
    #[clap(
        short = 'f',
        long = "filter",
        help = "A filter to apply, innermost first (repeatable), e.g. -f RC4Decode -f StreamDecode",
        required = true
    )]
    pub chain: Vec<String>,
    #[clap(long, help = "Hex-encoded key for RC4Decode/AESDecode")]
    pub key: Option<String>,
    #[clap(long, help = "Declared /Length for StreamDecode")]
    pub length: Option<i64>,
}
