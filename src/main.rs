use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context as _};
use clap::Parser;
use wkimage::{Context, ImageGenerator, Input};

/// Render HTML to an image with wkhtmltoimage
#[derive(Parser, Debug)]
#[command(name = "wkimage", version)]
struct Cli {
    /// HTML file or URL; `-` or nothing reads stdin
    input: Option<String>,
    /// Image file to write; nothing writes to stdout
    output: Option<PathBuf>,

    /// Load options saved with ImageGenerator::to_json before applying flags
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,
    /// Path of the wkhtmltoimage executable, skipping discovery
    #[arg(long)]
    binary: Option<PathBuf>,

    #[arg(short, long)]
    format: Option<String>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    quality: Option<u32>,
    #[arg(long)]
    zoom: Option<f64>,
    #[arg(long)]
    transparent: bool,
    #[arg(long)]
    javascript_delay: Option<u32>,
    /// Extra HTTP header, repeatable
    #[arg(long = "header", value_name = "NAME:VALUE")]
    headers: Vec<String>,
    /// Script to run after the page loads, repeatable
    #[arg(long)]
    run_script: Vec<String>,

    /// Give up after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Print the wkhtmltoimage arguments and exit
    #[arg(long)]
    print_args: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("wkimage: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(bin) = &cli.binary {
        wkimage::set_image_path(bin);
    }

    let mut gen = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            ImageGenerator::from_json(&json)?
        }
        None if cli.print_args => ImageGenerator::preparer(),
        None => ImageGenerator::new()?,
    };

    apply_flags(&mut gen, &cli)?;

    match cli.input.as_deref() {
        None | Some("-") => gen.set_input(Input::Reader(Box::new(io::stdin()))),
        Some(name) => gen.set_input(Input::File(name.to_string())),
    }
    if let Some(out) = &cli.output {
        gen.set_output_file(out);
    }

    if cli.print_args {
        println!("{}", gen.arg_string());
        return Ok(());
    }

    let ctx = match cli.timeout_ms {
        Some(ms) => Context::with_timeout(Duration::from_millis(ms)),
        None => Context::background(),
    };
    gen.create_with_context(&ctx)?;

    if cli.output.is_none() {
        let mut stdout = io::stdout().lock();
        stdout.write_all(gen.bytes())?;
        stdout.flush()?;
    }
    Ok(())
}

fn apply_flags(gen: &mut ImageGenerator, cli: &Cli) -> anyhow::Result<()> {
    let o = &mut gen.options;
    if let Some(v) = &cli.format {
        o.format.set(v.clone());
    }
    if let Some(v) = cli.width {
        o.width.set(v);
    }
    if let Some(v) = cli.height {
        o.height.set(v);
    }
    if let Some(v) = cli.quality {
        o.quality.set(v);
    }
    if let Some(v) = cli.zoom {
        o.zoom.set(v);
    }
    if cli.transparent {
        o.transparent.set(true);
    }
    if let Some(v) = cli.javascript_delay {
        o.javascript_delay.set(v);
    }
    for h in &cli.headers {
        let Some((name, value)) = h.split_once(':') else {
            bail!("header {:?} is not NAME:VALUE", h);
        };
        o.custom_header.push((name.trim().to_string(), value.trim().to_string()));
    }
    for s in &cli.run_script {
        o.run_script.push(s.clone());
    }
    Ok(())
}
