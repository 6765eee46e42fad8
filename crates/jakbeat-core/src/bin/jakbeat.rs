use std::{
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use jakbeat_core::{
    AppConfig, Engine, MixMode, RenderOptions, WavEncoding, init_tracing,
    fixtures::write_demo_project,
    report::write_render_report,
};

#[derive(Debug, Parser)]
#[command(name = "jakbeat", version)]
#[command(about = "Render beat documents to WAV")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Overrides `diagnostics.log_dir` from the config file.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render a document; `-` reads it from stdin.
    Render {
        input: PathBuf,

        #[arg(short = 'w', long)]
        output: Option<PathBuf>,

        /// Write one file per track instead of a single mix.
        #[arg(long)]
        split: bool,

        #[arg(long, value_enum)]
        encoding: Option<EncodingArg>,

        /// Render tracks on one thread.
        #[arg(long)]
        serial: bool,
    },
    /// Compile a document and report what it declares.
    Check { input: PathBuf },
    /// Print the document in canonical form.
    Fmt { input: PathBuf },
    /// Print (or write) the render fingerprint as JSON.
    Fingerprint {
        input: PathBuf,

        #[arg(short = 'w', long)]
        output: Option<PathBuf>,
    },
    /// Write the demo document and kit, then render it.
    Demo {
        #[arg(long, default_value = "demo")]
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EncodingArg {
    Float32,
    Int16,
}

impl From<EncodingArg> for WavEncoding {
    fn from(value: EncodingArg) -> Self {
        match value {
            EncodingArg::Float32 => Self::Float32,
            EncodingArg::Int16 => Self::Int16,
        }
    }
}

fn open_engine(input: &Path) -> anyhow::Result<Engine> {
    if input == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read document from stdin")?;
        let base_dir = std::env::current_dir().context("failed to resolve current directory")?;
        return Ok(Engine::from_document(&source, base_dir)?);
    }
    Ok(Engine::open(input)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_or_default()?;
    if let Some(log_dir) = cli.log_dir {
        config.diagnostics.log_dir = log_dir;
    }
    let _telemetry = init_tracing(&config.diagnostics)?;

    match cli.command {
        Commands::Render {
            input,
            output,
            split,
            encoding,
            serial,
        } => {
            let engine = open_engine(&input)?;
            let mut options = config.render.options();
            if let Some(output) = output {
                options.output = output;
            }
            if split {
                options.mode = MixMode::Split;
            }
            if let Some(encoding) = encoding {
                options.encoding = encoding.into();
            }
            if serial {
                options.parallel = false;
            }

            let summary = engine.render(&options)?;
            for file in &summary.files {
                println!("{}", file.display());
            }
        }
        Commands::Check { input } => {
            let engine = open_engine(&input)?;
            let song = engine.song();
            println!(
                "{} samples, {} phrases, {} output steps, {} frames",
                song.samples.len(),
                song.phrases.len(),
                song.output.len(),
                song.total_samples()
            );
            for phrase in song.dangling_references() {
                println!("warning: output references undeclared phrase `{phrase}`");
            }
        }
        Commands::Fmt { input } => {
            print!("{}", open_engine(&input)?.document());
        }
        Commands::Fingerprint { input, output } => {
            let report = open_engine(&input)?.fingerprint()?;
            match output {
                Some(path) => {
                    write_render_report(&path, &report)?;
                    tracing::info!(path = %path.display(), "render report written");
                }
                None => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Commands::Demo { dir } => {
            let document = write_demo_project(&dir)?;
            let engine = Engine::open(&document)?;
            let options = RenderOptions {
                output: dir.join("demo.wav"),
                ..config.render.options()
            };
            let summary = engine.render(&options)?;
            for file in &summary.files {
                println!("{}", file.display());
            }
        }
    }

    Ok(())
}
