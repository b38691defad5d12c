use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fieldlink::classfile::ClassFile;
use fieldlink::code::Instruction;
use fieldlink::{Config, Rewriter};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "fieldlink")]
#[command(about = "Rewrite JVM field instructions into invokedynamic accessor call sites")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Leave getstatic/putstatic untouched
    #[arg(long, global = true)]
    no_static: bool,

    /// Class declaring the accessor bootstrap methods
    #[arg(long, global = true, value_name = "CLASS")]
    bootstrap_owner: Option<String>,

    /// Skip constant pool verification of rewritten classes
    #[arg(long, global = true)]
    no_verify: bool,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite one .class file
    Rewrite {
        /// Input .class file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file, defaults to rewriting in place
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Rewrite every .class file below a directory, mirroring the tree
    RewriteDir {
        /// Input directory
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
    },

    /// Show methods and decoded instructions of a .class file
    Dump {
        /// Input .class file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let config = build_config(&cli)?;
    match &cli.command {
        Commands::Rewrite { input, output } => {
            let rewriter = Rewriter::new(config);
            rewrite_file(&rewriter, input, output.as_deref().unwrap_or(input))?;
        }
        Commands::RewriteDir { input, output } => {
            rewrite_dir(&Rewriter::new(config), input, output)?;
        }
        Commands::Dump { input } => {
            dump_file(input)?;
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env()?;
    if cli.no_static {
        config = config.with_rewrite_static(false);
    }
    if let Some(owner) = &cli.bootstrap_owner {
        config = config.with_bootstrap_owner(owner.as_str());
    }
    if cli.no_verify {
        config = config.with_verify_output(false);
    }
    Ok(config)
}

fn rewrite_file(rewriter: &Rewriter, input: &Path, output: &Path) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let (rewritten, report) = rewriter
        .rewrite_with_report(&bytes)
        .with_context(|| format!("rewriting {}", input.display()))?;
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output, rewritten).with_context(|| format!("writing {}", output.display()))?;
    info!(
        "{}: {} reads, {} writes replaced",
        input.display(),
        report.reads_replaced,
        report.writes_replaced
    );
    Ok(())
}

fn rewrite_dir(rewriter: &Rewriter, input: &Path, output: &Path) -> Result<()> {
    let mut count = 0usize;
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "class") {
            continue;
        }
        let relative = path.strip_prefix(input)?;
        rewrite_file(rewriter, path, &output.join(relative))?;
        count += 1;
    }
    if count == 0 {
        warn!("no .class files found under {}", input.display());
    }
    println!("Rewrote {} class files into {}", count, output.display());
    Ok(())
}

fn dump_file(input: &Path) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let class = ClassFile::decode(&bytes)?;
    println!("class {} (version {}.{})", class.name()?, class.major_version, class.minor_version);
    for method in &class.methods {
        println!();
        println!("{}{}", method.name(&class.constant_pool)?, method.descriptor(&class.constant_pool)?);
        let Some(code) = method.code() else {
            println!("  <no code>");
            continue;
        };
        println!("  max_stack={} max_locals={}", code.max_stack, code.max_locals);
        for (index, insn) in code.instructions.iter().enumerate() {
            let marker = match insn {
                Instruction::FieldRead(_) | Instruction::FieldWrite(_) => "F",
                Instruction::IndirectCall { .. } => "*",
                _ => " ",
            };
            println!("  {} {:>4}: {}", marker, index, insn);
        }
    }
    Ok(())
}
