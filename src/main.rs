use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use agnav::output;
use agnav::process::{self, ModeMap, SearchCommand};
use agnav::resolve::FsDocumentStore;

#[derive(Parser)]
#[command(name = "agnav")]
#[command(about = "Incremental decoder and navigator for colorized search-tool output")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a search and stream decoded, re-colorized results
    Search {
        /// Search pattern (passed to the tool verbatim)
        pattern: String,

        /// Directory to search in
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Search tool binary
        #[arg(long, default_value = "ag")]
        tool: String,

        /// Mode identifier expanded through the mode map
        #[arg(long)]
        mode: Option<String>,

        /// Group matches under file headings
        #[arg(long)]
        heading: bool,

        /// After the search, jump to the N-th match and print its location
        #[arg(long, value_name = "N")]
        jump: Option<usize>,

        /// Emit the marker index as JSON instead of rendered output
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Mode-map override file (default: user config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Extra arguments passed to the tool verbatim
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        extra: Vec<String>,
    },
    /// List files matching a pattern (NUL-separated tool mode)
    Files {
        /// File-name pattern
        pattern: String,

        /// Directory to search in
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Search tool binary
        #[arg(long, default_value = "ag")]
        tool: String,
    },
    /// Print the resolved mode table
    Modes {
        /// Mode-map override file (default: user config dir)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Search {
            pattern,
            path,
            tool,
            mode,
            heading,
            jump,
            json,
            no_color,
            config,
            extra,
        } => run_search(SearchArgs {
            pattern,
            path,
            tool,
            mode,
            heading,
            jump,
            json,
            no_color,
            config,
            extra,
        }),
        Commands::Files {
            pattern,
            path,
            tool,
        } => {
            let files = process::list_files(&tool, &pattern, &path)?;
            let mut stdout = output::stdout(true);
            output::print_file_list(&mut stdout, &files)?;
            Ok(())
        }
        Commands::Modes { config } => {
            let map = ModeMap::load(config.as_deref())?;
            let mut stdout = output::stdout(false);
            for (mode, opts) in map.iter() {
                writeln!(stdout, "{:12} {}", mode, opts.join(" "))?;
            }
            Ok(())
        }
    }
}

struct SearchArgs {
    pattern: String,
    path: PathBuf,
    tool: String,
    mode: Option<String>,
    heading: bool,
    jump: Option<usize>,
    json: bool,
    no_color: bool,
    config: Option<PathBuf>,
    extra: Vec<String>,
}

fn run_search(args: SearchArgs) -> Result<()> {
    let modes = ModeMap::load(args.config.as_deref())?;
    let mut cmd = SearchCommand::new(&args.pattern, &args.path)
        .tool(&args.tool)
        .heading(args.heading)
        .mode_map(modes)
        .args(args.extra);
    if let Some(mode) = &args.mode {
        cmd = cmd.mode(mode);
    }

    let mut session = cmd
        .spawn()
        .with_context(|| format!("launching {}", args.tool))?;

    let mut stdout = output::stdout(!args.no_color && !args.json);
    if args.json {
        process::pump(&mut session, |_| Ok(()))?;
        serde_json::to_writer_pretty(&mut stdout, session.index().markers())?;
        writeln!(stdout)?;
    } else {
        process::pump(&mut session, |segments| {
            output::print_segments(&mut stdout, segments)
        })?;
        output::print_summary(&mut stdout, &session.stats())?;
    }

    if let Some(n) = args.jump {
        session.next_match(n).context("no such match to jump to")?;
        let store = FsDocumentStore::new(&args.path);
        let loc = session
            .jump_current(&store)
            .context("resolving match location")?;
        output::print_location(&mut stdout, &loc)?;
    }

    Ok(())
}
