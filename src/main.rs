//! brd-docx - turn requirement documents into a Word BRD

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use brd_docx::cache::MemoStore;
use brd_docx::config::AppConfig;
use brd_docx::llm::ChatCompletionClient;
use brd_docx::utils::pipeline::BrdPipeline;
use brd_docx::{render_markdown, TableRegistry};

#[derive(Parser)]
#[command(name = "brd-docx")]
#[command(version, about = "Business Requirements Document generator", long_about = None)]
#[command(after_help = "EXAMPLES:
    brd-docx render brd.md -o brd.docx
    BRD_API_KEY=... brd-docx generate requirements.docx notes.txt -o brd.docx --markdown-out brd.md")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render an existing markdown BRD to .docx
    Render {
        /// Markdown file
        #[arg(value_name = "MARKDOWN")]
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Extract inputs, ask the LLM for a BRD and test scenarios, render
    Generate {
        /// Requirement documents (.docx, .pdf, .txt, .md)
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Also write the generated markdown here
        #[arg(long, value_name = "FILE")]
        markdown_out: Option<PathBuf>,

        /// API key (overrides BRD_API_KEY)
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,

        /// Model name (overrides BRD_LLM_MODEL)
        #[arg(long)]
        model: Option<String>,

        /// Chat completions URL (overrides BRD_LLM_ENDPOINT)
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Output .docx file
    #[arg(short, long, value_name = "OUT")]
    output: PathBuf,

    /// PNG placed in the page header
    #[arg(long, value_name = "PNG")]
    logo: Option<PathBuf>,

    /// TOML settings file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Drop trailing table columns with no data
    #[arg(long)]
    prune_empty_columns: bool,

    /// Ask Word to refresh page numbers on open
    #[arg(long)]
    update_fields: bool,
}

impl OutputArgs {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        config.render.prune_empty_columns |= self.prune_empty_columns;
        config.render.update_fields_on_open |= self.update_fields;
        Ok(config)
    }

    fn read_logo(&self) -> Result<Option<Vec<u8>>> {
        self.logo
            .as_deref()
            .map(|p| std::fs::read(p).with_context(|| format!("failed to read logo {}", p.display())))
            .transpose()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let outcome = match cli.command {
        Command::Render { input, output } => render(&input, &output),
        Command::Generate {
            inputs,
            markdown_out,
            api_key,
            model,
            endpoint,
            output,
        } => {
            let overrides = LlmOverrides { api_key, model, endpoint };
            generate(&inputs, markdown_out.as_deref(), overrides, &output)
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn render(input: &Path, args: &OutputArgs) -> Result<()> {
    let config = args.load_config()?;
    let markdown = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let docx = render_markdown(&markdown, &config.render, &TableRegistry::new(), args.read_logo()?)?;
    write_output(&args.output, &docx)
}

struct LlmOverrides {
    api_key: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
}

fn generate(
    inputs: &[PathBuf],
    markdown_out: Option<&Path>,
    overrides: LlmOverrides,
    args: &OutputArgs,
) -> Result<()> {
    let mut config = args.load_config()?;
    if let Some(key) = overrides.api_key {
        config.llm.api_key = Some(key);
    }
    if let Some(model) = overrides.model {
        config.llm.model = model;
    }
    if let Some(endpoint) = overrides.endpoint {
        config.llm.endpoint = endpoint;
    }

    let client = ChatCompletionClient::new(&config.llm)?;
    let mut pipeline = BrdPipeline::new(client, config.render.clone());
    if let Some(png) = args.read_logo()? {
        pipeline = pipeline.with_logo(png);
    }

    let extraction = pipeline.extract(inputs);
    let mut memo = MemoStore::new();
    let markdown = pipeline.generate_markdown(&mut memo, &extraction)?;

    // Saved before packaging so it survives a serialization failure.
    if let Some(md) = markdown_out {
        write_output(md, markdown.as_bytes())?;
    }

    let docx = pipeline.render(&markdown, &extraction)?;
    write_output(&args.output, &docx)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
