use clap::Parser;
use std::path::PathBuf;

use chdforge_core::FormatMode;

#[derive(Parser, Debug, Default)]
#[command(name = "chdforge")]
#[command(author, version, about = "Convert disc images, cue/gdi sheets and archives to CHD")]
pub struct Cli {
    /// Files or folders to convert; folders are scanned for supported
    /// files. A single "-" reads more paths from stdin, one per line
    pub paths: Vec<String>,

    /// Path to config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print usage examples, then exit
    #[arg(long)]
    pub list_examples: bool,

    /// List supported file types and extensions, then exit
    #[arg(long)]
    pub list_formats: bool,

    /// List the resolved external programs, then exit
    #[arg(long)]
    pub list_programs: bool,

    /// Command name or path of the 7z program
    #[arg(long = "7z", value_name = "CMD")]
    pub sevenzip: Option<String>,

    /// Command name or path of the chdman program
    #[arg(long, value_name = "CMD")]
    pub chdman: Option<String>,

    /// Existing directory to write CHD files to [default: beside each input]
    #[arg(short = 'd', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Existing directory for job workspaces [default: the output directory]
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Keep the disc's own name for CHD files built from archives
    #[arg(short = 'R', long)]
    pub no_rename: bool,

    /// Replace existing CHD files instead of skipping their jobs
    #[arg(long)]
    pub overwrite: bool,

    /// Scan folders recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Run several jobs at the same time
    #[arg(short, long)]
    pub parallel: bool,

    /// Number of parallel jobs; 0 uses all cores [default: 2]
    #[arg(short, long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Cores chdman may use per job; 0 does not limit [default: 0]
    #[arg(short = 'c', long, value_name = "NUM")]
    pub chd_processors: Option<usize>,

    /// Disc format: cd, dvd, or auto (by size) [default: cd]
    #[arg(short, long, value_name = "DISC")]
    pub mode: Option<FormatMode>,

    /// Size in MB above which auto mode picks dvd [default: 750]
    #[arg(long, value_name = "MB")]
    pub auto_threshold: Option<u64>,

    /// Hide the output of external programs and answer their prompts
    #[arg(short, long)]
    pub quiet: bool,

    /// Show file names instead of full paths in job lines
    #[arg(short, long)]
    pub names: bool,

    /// Print queue size, totals and elapsed time
    #[arg(short, long)]
    pub stats: bool,

    /// Ctrl+C cancels all jobs instead of only the running ones
    #[arg(short = 'E', long, alias = "emergency-break")]
    pub hard_cancel: bool,

    /// List the jobs without extracting or converting anything
    #[arg(short = 'X', long)]
    pub dry_run: bool,
}

impl Cli {
    /// Whether "-" was given to read paths from stdin.
    pub fn reads_stdin(&self) -> bool {
        self.paths.iter().any(|p| p == "-")
    }
}
