// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
//   gist-render view <ADDRESS> [--file NAME] [--output PATH] [--json] [--all]
//   gist-render render <PATH> [--name NAME] [--output PATH] [--json]
//   gist-render classify <PATH>
//
// Global options: --config <PATH>, -v/--verbose (repeat for more).
//
// Rust concepts:
// - #[command(subcommand)]: one enum variant per subcommand
// - ArgAction::Count: -vv becomes the number 2
// - Option<T> arguments: absent flags are None, not empty strings
// =============================================================================

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

// The whole command line: one subcommand plus the global options
//
// #[derive(Parser)] generates the parsing code, #[command(...)] sets the
// name, version and help texts.
#[derive(Parser, Debug)]
#[command(
    name = "gist-render",
    version,
    about = "Render a gist file (patch, markdown with diff blocks, HTML or text) as an HTML page",
    long_about = "gist-render fetches a gist, classifies the selected file and renders it. \
                  Patches get a side-by-side diff view (a simplified one when they are large), \
                  markdown files have their ```diff blocks pulled out and rendered as a patch."
)]
pub struct Cli {
    // Filled from whichever subcommand the user typed
    #[command(subcommand)]
    pub command: Commands,

    // global = true: accepted before or after the subcommand name

    /// Config file (default: <config dir>/gist-render/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

// One variant per subcommand; the variant's fields become its arguments
//
// The /// doc comments are what clap shows in --help.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a gist and render one of its files
    ///
    /// Example: gist-render view aa5a315d61ae9438b18d/notes.md -o notes.html
    View {
        /// Gist address: <id>, ?<id>/<file> or a gist.github.com URL
        // A positional argument, since it has no #[arg(long)]
        address: String,

        /// File to render; overrides the file part of the address
        #[arg(long)]
        file: Option<String>,

        /// Where to write the HTML page ("-" for stdout)
        // None means "use the output path from the config file"
        #[arg(short, long, value_name = "PATH")]
        output: Option<String>,

        /// Print a JSON report of what was rendered (on stderr when the page goes to stdout)
        #[arg(long)]
        json: bool,

        /// Render every file of the gist, one section each
        #[arg(long, conflicts_with = "file")]
        all: bool,
    },

    /// Render a local file through the same pipeline
    ///
    /// Example: gist-render render fix.patch --name fix.diff
    Render {
        /// File to read
        path: PathBuf,

        /// File name used for classification (default: the file's own name)
        #[arg(long)]
        name: Option<String>,

        /// Where to write the HTML page ("-" for stdout)
        #[arg(short, long, value_name = "PATH")]
        output: Option<String>,

        /// Print a JSON report of what was rendered (on stderr when the page goes to stdout)
        #[arg(long)]
        json: bool,
    },

    /// Print the content kind and size class of a local file
    Classify {
        /// File to read
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_view() {
        let cli = Cli::parse_from(["gist-render", "-vv", "view", "abc123/notes.md", "--json"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::View {
                address, json, all, ..
            } => {
                assert_eq!(address, "abc123/notes.md");
                assert!(json);
                assert!(!all);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_output_falls_back_to_none() {
        let cli = Cli::parse_from(["gist-render", "render", "fix.patch", "--json", "-o", "-"]);
        match cli.command {
            Commands::Render { output, json, name, .. } => {
                assert_eq!(output.as_deref(), Some("-"));
                assert!(json);
                assert_eq!(name, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_all_conflicts_with_file() {
        let result =
            Cli::try_parse_from(["gist-render", "view", "abc123", "--all", "--file", "a.md"]);
        assert!(result.is_err());
    }
}
