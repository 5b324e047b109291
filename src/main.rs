// src/main.rs
// =============================================================================
// Entry point of the gist-render CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and load the config file
// 3. Dispatch to the subcommand handler
// 4. Write the HTML page and (optionally) a JSON report
// 5. Exit with a proper code:
//    0 = rendered, 1 = an error was shown on the page, 2 = unexpected error
//
// Progress lines go to stderr so stdout can carry the page (--output -) or
// the JSON report. When the page is on stdout the JSON report moves to
// stderr, so each stream holds one parseable document.
//
// Rust concepts used:
// - async/await: the gist API calls and the background extraction
// - anyhow::Result + Context: errors that only need to be reported
// - futures::stream: fetch several raw files at once with --all
// =============================================================================

// Module declarations - one per source file or directory
mod cli;      // src/cli.rs - command-line parsing
mod config;   // src/config.rs - config file and defaults
mod content;  // src/content/ - classification and diff block extraction
mod error;    // src/error.rs - ViewerError
mod gist;     // src/gist/ - addresses, GitHub API, file list
mod logger;   // src/logger.rs - env_logger setup
mod pipeline; // src/pipeline.rs - the orchestrator
mod render;   // src/render/ - diff painter and the HTML page
mod worker;   // src/worker/ - background extraction thread

use std::io::Write;
use std::path::Path;

// anyhow::Result carries any error up to main, Context adds a message to it
use anyhow::{Context, Result};
use clap::Parser; // Parser trait enables Cli::parse()
use futures::stream::{self, StreamExt};

use cli::{Cli, Commands};
use config::ViewerConfig;
use content::{classify_kind, classify_size, ContentUnit};
use error::ViewerError;
use gist::{Gist, GistAddress, GistClient};
use pipeline::{Orchestrator, RenderReport};
use render::{HtmlPage, NoticeLevel, RenderTarget};

// Raw file downloads running at the same time with --all
const PREFETCH_CONCURRENCY: usize = 4;
// Output path meaning "write the page to stdout"
const STDOUT: &str = "-";

// #[tokio::main] builds the runtime and runs the async body inside it
#[tokio::main]
async fn main() {
    // Run the application and turn its outcome into an exit code
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole anyhow context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Application logic behind main
// Returns:
//   Ok(0) = everything rendered
//   Ok(1) = at least one error was shown on the page
//   Err = unexpected error (bad config, unreadable input, write failure)
async fn run() -> Result<i32> {
    // Parse arguments; clap handles --help and --version itself
    let cli = Cli::parse();
    // Logging first, so config loading can already log
    logger::init(cli.verbose);
    let config = ViewerConfig::load(cli.config.as_deref())?;

    // One branch per subcommand; --output falls back to the config file
    match cli.command {
        Commands::View {
            address,
            file,
            output,
            json,
            all,
        } => {
            let output = output.unwrap_or_else(|| config.output.clone());
            handle_view(&config, &address, file, &output, json, all).await
        }
        Commands::Render {
            path,
            name,
            output,
            json,
        } => {
            let output = output.unwrap_or_else(|| config.output.clone());
            handle_render(&config, &path, name, &output, json).await
        }
        Commands::Classify { path } => handle_classify(&config, &path),
    }
}

// Handles the 'view' subcommand
// Parameters:
//   address: gist address as typed by the user
//   file: --file, wins over the file part of the address
//   output: output path or "-"
//   json: print a JSON report
//   all: render every file instead of one
//
// Returns:
//   The exit code picked by `finish`
async fn handle_view(
    config: &ViewerConfig,
    address: &str,
    file: Option<String>,
    output: &str,
    json: bool,
    all: bool,
) -> Result<i32> {
    // A malformed address is a usage error, not something to show on a page
    let address: GistAddress = address.parse()?;
    let client = GistClient::new(&config.api_base, config.github_token.as_deref())?;
    let mut page = HtmlPage::new(format!("Gist {}", address.gist_id));

    eprintln!("🔍 Fetching gist {}", address.gist_id);
    let gist = match client.fetch_gist(&address.gist_id).await {
        Ok(gist) => gist,
        Err(e) => {
            // Still write the page so the error is visible there
            page.show_notice(NoticeLevel::Danger, &e.to_string());
            return finish(page, Vec::new(), output, json);
        }
    };

    // Gist details and file list go above the rendered content
    page.set_header(format!(
        "{}{}",
        gist::details_html(&gist),
        gist::file_list_html(&gist)
    ));
    eprintln!("📄 {} file(s) in gist", gist.files.len());

    // One orchestrator for the whole session, so a dropped worker stays dropped
    let mut pipeline = Orchestrator::from_config(config);
    log::debug!("extraction strategy: {:?}", pipeline.strategy());
    let reports = if all {
        render_all(&client, &gist, &mut pipeline, &mut page).await?
    } else {
        // --file wins over the file named in the address
        let requested = file.or(address.file_name);
        render_one(&client, &gist, requested.as_deref(), &mut pipeline, &mut page)
            .await?
            .into_iter()
            .collect()
    };

    finish(page, reports, output, json)
}

// Renders the selected file; None when it could not be loaded
async fn render_one(
    client: &GistClient,
    gist: &Gist,
    requested: Option<&str>,
    pipeline: &mut Orchestrator,
    page: &mut HtmlPage,
) -> Result<Option<RenderReport>> {
    // Pick the file, then fetch the raw body if the API truncated it
    let loaded = match gist.select_file(requested) {
        Ok(file) => {
            eprintln!("🎨 Rendering {}", file.filename);
            client.load_unit(&gist.id, file).await
        }
        Err(e) => Err(e),
    };

    match loaded {
        Ok(unit) => Ok(Some(pipeline.process(&unit, page).await?)),
        // Missing file or failed raw fetch: shown on the page, no report
        Err(e) => {
            page.show_notice(NoticeLevel::Danger, &e.to_string());
            Ok(None)
        }
    }
}

// Renders every file, each in its own section
//
// Truncated files are fetched concurrently first; rendering then goes one
// unit at a time in the gist's file order.
async fn render_all(
    client: &GistClient,
    gist: &Gist,
    pipeline: &mut Orchestrator,
    page: &mut HtmlPage,
) -> Result<Vec<RenderReport>> {
    // buffer_unordered finishes in any order; the index restores file order
    let mut loaded: Vec<(usize, Result<ContentUnit, ViewerError>)> =
        stream::iter(gist.files.iter().enumerate())
            .map(|(index, file)| async move { (index, client.load_unit(&gist.id, file).await) })
            .buffer_unordered(PREFETCH_CONCURRENCY)
            .collect()
            .await;
    loaded.sort_by_key(|(index, _)| *index);

    let mut reports = Vec::with_capacity(loaded.len());
    for (index, unit) in loaded {
        let name = &gist.files[index].filename;
        eprintln!("🎨 Rendering {}", name);
        // Each file gets its own titled section on the page
        page.start_section(name.as_str());
        match unit {
            Ok(unit) => reports.push(pipeline.process(&unit, page).await?),
            Err(e) => page.show_notice(NoticeLevel::Danger, &e.to_string()),
        }
    }
    Ok(reports)
}

// Handles the 'render' subcommand
// Parameters:
//   path: local file to render
//   name: --name, the file name used for classification
//   output: output path or "-"
//   json: print a JSON report
async fn handle_render(
    config: &ViewerConfig,
    path: &Path,
    name: Option<String>,
    output: &str,
    json: bool,
) -> Result<i32> {
    let body = read_input(path)?;
    // Without --name the file's own name decides the content kind
    let name = name.unwrap_or_else(|| file_name_of(path));
    eprintln!("🎨 Rendering {}", path.display());

    // A local file is never truncated, so it goes straight to the pipeline
    let mut page = HtmlPage::new(name.clone());
    let mut pipeline = Orchestrator::from_config(config);
    let report = pipeline.process(&ContentUnit::new(body, name), &mut page).await?;

    finish(page, vec![report], output, json)
}

// Handles the 'classify' subcommand
// Prints e.g. "fix.patch: Patch, Small" and always exits with 0
fn handle_classify(config: &ViewerConfig, path: &Path) -> Result<i32> {
    let body = read_input(path)?;
    let kind = classify_kind(&file_name_of(path), &body);
    let size = classify_size(&body, &config.thresholds);
    println!("{}: {:?}, {:?}", path.display(), kind, size);
    Ok(0)
}

// Writes the page, prints the report and picks the exit code
// Returns:
//   Ok(1) when the page shows an error or a unit failed, Ok(0) otherwise
fn finish(page: HtmlPage, reports: Vec<RenderReport>, output: &str, json: bool) -> Result<i32> {
    // Count before into_document consumes the page
    let error_count = page.errors().len();
    write_page(page.into_document(), output)?;
    print_reports(&reports, json, output)?;

    let failed = reports.iter().any(RenderReport::failed);
    if error_count > 0 || failed {
        eprintln!("❌ {} error(s) shown on the page", error_count);
        Ok(1)
    } else {
        Ok(0)
    }
}

// Writes the document to `output`, or to stdout for "-"
fn write_page(document: String, output: &str) -> Result<()> {
    if output == STDOUT {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(document.as_bytes())
            .context("Failed to write page to stdout")?;
        return Ok(());
    }

    std::fs::write(output, document).with_context(|| format!("Failed to write {}", output))?;
    eprintln!("✅ Wrote {}", output);
    Ok(())
}

// Prints the JSON report, or a one-line summary per unit on stderr
fn print_reports(reports: &[RenderReport], json: bool, output: &str) -> Result<()> {
    if json {
        // stdout already carries the page with "-"
        if json_to_stdout(output) {
            write_json_report(reports, &mut std::io::stdout().lock())?;
        } else {
            write_json_report(reports, &mut std::io::stderr().lock())?;
        }
        return Ok(());
    }

    for report in reports {
        let kind = report
            .kind
            .map(|kind| format!("{:?}", kind))
            .unwrap_or_else(|| "-".to_string());
        let size = report
            .size
            .map(|size| format!(" ({:?})", size))
            .unwrap_or_default();
        eprintln!("   {} → {}{} [{:?}]", report.file, kind, size, report.stage);
    }
    Ok(())
}

// The JSON report goes to stdout unless the page is written there
fn json_to_stdout(output: &str) -> bool {
    output != STDOUT
}

fn write_json_report(reports: &[RenderReport], out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, reports)?;
    writeln!(out).context("Failed to write the JSON report")?;
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_report_leaves_stdout_to_the_page() {
        assert!(!json_to_stdout(STDOUT));
        assert!(json_to_stdout("gist.html"));
    }

    #[tokio::test]
    async fn test_json_report_is_one_document() {
        let mut pipeline = Orchestrator::new(
            pipeline::ExtractionStrategy::Inline,
            render::Renderer::new("InspiredGitHub"),
            content::SizeThresholds::default(),
            None,
        );
        let mut page = HtmlPage::new("t");
        let report = pipeline
            .process(&ContentUnit::new("just text", "notes.txt"), &mut page)
            .await
            .unwrap();

        let mut out = Vec::new();
        write_json_report(&[report], &mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["file"], "notes.txt");
        assert_eq!(parsed[0]["kind"], "plain_text");
        assert_eq!(parsed[0]["stage"], "done");
    }
}
