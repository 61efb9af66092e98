use clap::{crate_description, ArgAction, Args, Parser, Subcommand, ValueEnum};
use regex::Regex;
use std::io::IsTerminal;
use std::path::PathBuf;
use url::Url;

use coursekit::github::{RateLimitPolicy, Visibility};

// -----------------------------------------------------------------------------
// command-line args
// -----------------------------------------------------------------------------
#[derive(Parser, Debug)]
#[command(
    name("coursekit"),
    bin_name("coursekit"),

    author,   // retrieved from Cargo.toml `authors`
    version,  // retrieved from Cargo.toml `version`
    about,    // retrieved from Cargo.toml `description`

    long_about = concat!(
        crate_description!(),
    ),
)]
#[deny(missing_docs)]
/// Administer per-student GitHub repositories for a course
pub struct CommandLineArgs {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global_args: GlobalArgs,
}

impl CommandLineArgs {
    pub fn parse_args() -> Self {
        let mut args = <Self as Parser>::parse();

        // If `NO_COLOR` is set in the environment, disable colored output
        //
        // https://no-color.org/
        if std::env::var("NO_COLOR").is_ok() {
            args.global_args.color = Mode::Never
        }

        args
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a private repository for each student on a roster
    ///
    /// For each roster row, a repository named after the student is created in the organization
    /// (or reused, if it already exists), the student is invited as a collaborator, and a
    /// `.gitkeep` placeholder is committed for each folder listed in the structure file.
    ///
    /// A GitHub personal access token is required, and is read from the `GITHUB_TOKEN` environment
    /// variable, or `GH_TOKEN` if that is not set.
    #[command(display_order = 1)]
    CreateRepos(CreateReposArgs),

    /// Clone the repositories of an organization
    ///
    /// Repositories are listed through the GitHub API, filtered, and cloned into a destination
    /// directory, one subdirectory per repository.
    /// Existing clones are left alone, or fast-forwarded with `--update`.
    ///
    /// An optional personal access token can be specified using the `GITHUB_TOKEN` or `GH_TOKEN`
    /// environment variable.
    /// Using a token gives higher rate limits and makes private repositories accessible.
    #[command(display_order = 2)]
    Clone(CloneArgs),

    /// Reset each clone in a directory to its last commit before a deadline
    ///
    /// The deadline is 11:59 PM on the given date in the given timezone, plus an optional grace
    /// period.
    /// For each Git repository directly inside the directory, the latest commit on its branch
    /// whose author time is strictly before the deadline is found, and the branch is hard-reset to
    /// it.
    ///
    /// Repositories with uncommitted changes are skipped unless `--force` is given.
    /// Repositories with no commit before the deadline are left unchanged.
    #[command(display_order = 3)]
    Revert(RevertArgs),

    /// Delete everything except one path from each directory in a base directory
    ///
    /// This is useful for keeping only a single assignment folder from each student clone.
    #[command(display_order = 4)]
    Prune(PruneArgs),
}

// -----------------------------------------------------------------------------
// global options
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
#[command(next_help_heading = "Global Options")]
pub struct GlobalArgs {
    /// Enable verbose output
    ///
    /// This can be repeated up to 2 times to enable successively more output.
    #[arg(global=true, long, short, action=ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error feedback messages
    ///
    /// This silences progress messages printed to stderr.
    /// Command reports are still written.
    #[arg(global = true, long, short)]
    pub quiet: bool,

    /// Enable or disable colored output
    ///
    /// When this is "auto", colors are enabled for stdout and stderr when they are terminals.
    ///
    /// If the `NO_COLOR` environment variable is set, it takes precedence and is equivalent to `--color=never`.
    #[arg(global=true, long, default_value_t=Mode::Auto, value_name="MODE")]
    pub color: Mode,
}

impl GlobalArgs {
    pub fn use_color<T: IsTerminal>(&self, out: T) -> bool {
        match self.color {
            Mode::Never => false,
            Mode::Always => true,
            Mode::Auto => out.is_terminal(),
        }
    }
}

/// A generic auto/never/always mode value
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Mode {
    Auto,
    Never,
    Always,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Auto => "auto",
            Mode::Never => "never",
            Mode::Always => "always",
        };
        write!(f, "{s}")
    }
}

// -----------------------------------------------------------------------------
// GitHub API options
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
#[command(next_help_heading = "GitHub API Options")]
pub struct GitHubApiArgs {
    /// Use the specified URL for GitHub API access
    ///
    /// If accessing a GitHub Enterprise Server instance, this value should be the entire base URL
    /// include the `api/v3` portion, e.g., `https://github.example.com/api/v3`.
    #[arg(
        long,
        value_name = "URL",
        env("COURSEKIT_GITHUB_API_URL"),
        default_value = "https://api.github.com"
    )]
    pub api_url: Url,

    /// Send at most N GitHub API requests per second
    ///
    /// GitHub applies secondary rate limits to bursts of requests that create content.
    /// A value of 0 disables pacing.
    #[arg(long, value_name = "N", default_value_t = 3.0, value_parser = parse_calls_per_sec)]
    pub calls_per_sec: f64,
}

/// Accept 0, or a finite rate of at least one call per hour.
fn parse_calls_per_sec(s: &str) -> Result<f64, String> {
    const MIN_RATE: f64 = 1.0 / 3600.0;

    let n: f64 = s.trim().parse().map_err(|e| format!("{e}"))?;
    if n == 0.0 || (n.is_finite() && n >= MIN_RATE) {
        Ok(n)
    } else {
        Err(format!("must be 0 or a rate of at least {MIN_RATE:.6} calls per second"))
    }
}

impl GitHubApiArgs {
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        if self.calls_per_sec > 0.0 {
            RateLimitPolicy::MaxCallsPerSec(self.calls_per_sec)
        } else {
            RateLimitPolicy::Unlimited
        }
    }
}

// -----------------------------------------------------------------------------
// `create-repos` command
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
pub struct CreateReposArgs {
    /// Create repositories in the specified organization
    #[arg(long, value_name = "ORG")]
    pub org: String,

    /// Read the roster from the specified CSV file
    ///
    /// The file must have a header row with `name` and `github_link` columns.
    #[arg(long, value_name = "PATH", default_value = "students.csv")]
    pub csv: PathBuf,

    /// Read the folders to create from the specified file, one path per line
    #[arg(long, value_name = "PATH", default_value = "structure.txt")]
    pub structure: PathBuf,

    /// Name repositories `<PREFIX>-<student_name>`
    ///
    /// Student names are lowercased, with runs of whitespace replaced by underscores.
    #[arg(long, value_name = "PREFIX")]
    pub repo_prefix: Option<String>,

    /// Grant invited students the specified permission
    #[arg(long, value_name = "PERMISSION", default_value_t = Permission::Push)]
    pub permission: Permission,

    /// Show what would be done without contacting GitHub
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub github_args: GitHubApiArgs,

    #[command(flatten)]
    pub output_args: OutputArgs<OutputFormat>,
}

/// A repository permission level that can be granted to a collaborator
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Permission {
    Pull,
    Triage,
    Push,
    Maintain,
    Admin,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Pull => "pull",
            Permission::Triage => "triage",
            Permission::Push => "push",
            Permission::Maintain => "maintain",
            Permission::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// -----------------------------------------------------------------------------
// `clone` command
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Clone repositories of the specified organization
    #[arg(value_name = "ORG")]
    pub org: String,

    /// Clone into subdirectories of the specified directory
    ///
    /// The directory is created if it does not exist.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dest: PathBuf,

    /// Clone using the specified protocol
    #[arg(long, value_name = "PROTOCOL", default_value_t = CloneProtocol::Ssh)]
    pub protocol: CloneProtocol,

    /// Include repositories that are forks
    #[arg(long)]
    pub include_forks: bool,

    /// Include archived repositories
    #[arg(long)]
    pub include_archived: bool,

    /// Select repositories with the specified visibility
    #[arg(long, value_name = "VISIBILITY", default_value_t = VisibilityArg::All)]
    pub visibility: VisibilityArg,

    /// Select only repositories whose name contains the specified text, ignoring case
    #[arg(long = "match", value_name = "TEXT")]
    pub name_contains: Option<String>,

    /// Select only repositories whose name matches the specified regular expression
    #[arg(long = "regex", value_name = "REGEX", value_parser = Regex::new)]
    pub name_regex: Option<Regex>,

    /// Clone only the most recent commit
    #[arg(long)]
    pub shallow: bool,

    /// Fast-forward existing clones instead of skipping them
    #[arg(long)]
    pub update: bool,

    #[command(flatten)]
    pub github_args: GitHubApiArgs,

    #[command(flatten)]
    pub output_args: OutputArgs<OutputFormat>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CloneProtocol {
    /// Clone with `git@github.com:` URLs
    Ssh,

    /// Clone with `https://` URLs
    ///
    /// When a GitHub token is set in the environment, git is given it as a credential.
    Https,
}

impl std::fmt::Display for CloneProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CloneProtocol::Ssh => "ssh",
            CloneProtocol::Https => "https",
        };
        write!(f, "{s}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum VisibilityArg {
    All,
    Public,
    Private,
}

impl std::fmt::Display for VisibilityArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VisibilityArg::All => "all",
            VisibilityArg::Public => "public",
            VisibilityArg::Private => "private",
        };
        write!(f, "{s}")
    }
}

impl From<VisibilityArg> for Visibility {
    fn from(v: VisibilityArg) -> Self {
        match v {
            VisibilityArg::All => Visibility::All,
            VisibilityArg::Public => Visibility::Public,
            VisibilityArg::Private => Visibility::Private,
        }
    }
}

// -----------------------------------------------------------------------------
// `revert` command
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
pub struct RevertArgs {
    /// Operate on the Git repositories directly inside the specified directory
    #[arg(long, value_name = "DIR")]
    pub dir: PathBuf,

    /// The deadline date, as `YYYY-MM-DD` or `MM/DD/YYYY`
    ///
    /// The deadline is 11:59 PM on this date in the deadline timezone.
    #[arg(long, value_name = "DATE")]
    pub date: String,

    /// Extend the deadline by the specified grace period
    ///
    /// This is either a number of seconds or a duration such as `5m` or `1h30m`.
    #[arg(long, value_name = "DURATION", default_value = "0")]
    pub grace: String,

    /// Interpret the deadline date in the specified IANA timezone
    #[arg(long, value_name = "TZ", default_value = "America/Chicago")]
    pub timezone: String,

    /// Report the commit each repository would be reset to, without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Reset repositories even if they have uncommitted changes, discarding those changes
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub output_args: OutputArgs<OutputFormat>,
}

// -----------------------------------------------------------------------------
// `prune` command
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Directory containing the directories to prune
    #[arg(value_name = "BASE_DIR")]
    pub base_dir: PathBuf,

    /// Relative path to keep inside each directory
    #[arg(value_name = "KEEP")]
    pub keep: PathBuf,

    /// Report what would be removed without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub output_args: OutputArgs<OutputFormat>,
}

// -----------------------------------------------------------------------------
// output options
// -----------------------------------------------------------------------------
#[derive(Args, Debug)]
#[command(next_help_heading = "Output Options")]
pub struct OutputArgs<Format: ValueEnum + Send + Sync + 'static> {
    /// Write output to the specified path
    ///
    /// If this argument is not provided, stdout will be used.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write output in the specified format
    #[arg(long, short, value_name = "FORMAT", default_value = "human")]
    pub format: Format,
}

impl<Format: ValueEnum + Send + Sync> OutputArgs<Format> {
    /// Get a writer for the specified output destination.
    pub fn get_writer(&self) -> std::io::Result<Box<dyn std::io::Write>> {
        use std::fs::File;
        use std::io::BufWriter;

        match &self.output {
            None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
            Some(p) => {
                let f = File::create(p)?;
                Ok(Box::new(BufWriter::new(f)))
            }
        }
    }
}

// -----------------------------------------------------------------------------
// output format
// -----------------------------------------------------------------------------
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// A text-based format designed for humans
    Human,

    /// Pretty-printed JSON format
    Json,

    /// JSON Lines format
    ///
    /// This is a sequence of JSON objects, one per line.
    Jsonl,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutputFormat::Human => "human",
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        };
        write!(f, "{s}")
    }
}
