use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::ast::Program;
use crate::config::{ArgsFidelity, CaptureStrategy, CompilerOpts, Config, NewMethod};

#[derive(Parser)]
#[command(name = "jumper")]
#[command(about = "Jumper - continuation instrumentation for guest programs", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the `[compiler]` section
#[derive(clap::Args, Debug, Default)]
pub struct CompileFlags {
    /// Capture strategy: eager, lazy, retval, fudge
    #[arg(short = 't', long = "transform")]
    pub transform: Option<CaptureStrategy>,

    /// Construction method: direct, wrapper
    #[arg(long = "new")]
    pub new_method: Option<NewMethod>,

    /// Fidelity of `arguments`: simple, faithful, full
    #[arg(long = "js-args")]
    pub js_args: Option<ArgsFidelity>,

    /// Yield to the host every N safe points
    #[arg(long = "yield-interval")]
    pub yield_interval: Option<u32>,
}

impl CompileFlags {
    fn apply(&self, opts: &mut CompilerOpts) {
        if let Some(transform) = self.transform {
            opts.transform = transform;
        }
        if let Some(new_method) = self.new_method {
            opts.new_method = new_method;
        }
        if let Some(js_args) = self.js_args {
            opts.js_args = js_args;
        }
        if let Some(interval) = self.yield_interval {
            opts.yield_interval = Some(interval);
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that a program is in normal form
    Check {
        /// Program JSON file ("-" for stdin)
        input: String,
    },

    /// List the normal-form rules
    Rules,

    /// Instrument a program and print (or write) the result
    Compile {
        /// Program JSON file ("-" for stdin)
        input: String,

        #[command(flatten)]
        flags: CompileFlags,

        /// Output file (default: stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<String>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Run a program, instrumenting it first unless it already is
    Run {
        /// Program JSON file ("-" for stdin)
        input: String,

        #[command(flatten)]
        flags: CompileFlags,

        /// Remaining-depth budget before the stack is captured and restored
        #[arg(long = "stack-size")]
        stack_size: Option<u32>,

        /// Frames re-entered per restore under a depth budget
        #[arg(long = "restore-frames")]
        restore_frames: Option<u32>,

        /// Print capture statistics after the result
        #[arg(long)]
        stats: bool,
    },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn read_program(input: &str) -> Result<Program> {
    let source = if input == "-" {
        use tokio::io::AsyncReadExt;

        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("failed to read program from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("failed to read {}", input))?
    };
    serde_json::from_str(&source).with_context(|| format!("{} is not a valid program", input))
}

/// Internal function that handles CLI commands
async fn run_cli_with_args(cli: Cli) -> Result<()> {
    use crate::normal_form::{self, Validator};
    use crate::runtime::{self, Machine};
    use crate::compiler;
    use std::env;

    if let Some(config_path) = &cli.config {
        env::set_var("JUMPER_CONFIG_PATH", config_path);
    }

    // Config errors are fatal before any command runs
    let config = Config::load()?;

    match cli.command {
        Commands::Check { input } => {
            let program = read_program(&input).await?;
            let errors = normal_form::validate_program(&program);

            if errors.is_empty() {
                println!("✓ {} is in normal form", input);
                return Ok(());
            }
            for error in &errors {
                println!("  {}", error);
            }
            if errors.iter().any(|e| e.is_error()) {
                eprintln!("{} violation(s) found", errors.len());
                std::process::exit(1);
            }
        }

        Commands::Rules => {
            for (id, description) in Validator::new().rules() {
                println!("  {:<18} {}", id, description);
            }
        }

        Commands::Compile {
            input,
            flags,
            output,
            pretty,
        } => {
            let mut opts = config.compiler;
            flags.apply(&mut opts);

            let program = read_program(&input).await?;
            let compiled = compiler::compile(&program, &opts)?;
            let json = if pretty {
                serde_json::to_string_pretty(&compiled)?
            } else {
                serde_json::to_string(&compiled)?
            };

            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("failed to write {}", path))?;
                    println!("✓ Compiled {} ({}) -> {}", input, opts.transform, path);
                }
                None => println!("{}", json),
            }
        }

        Commands::Run {
            input,
            flags,
            stack_size,
            restore_frames,
            stats,
        } => {
            let mut opts = config.compiler;
            flags.apply(&mut opts);

            let mut runtime_opts = config.runtime;
            if let Some(size) = stack_size {
                runtime_opts.stack_size = Some(size);
            }
            if let Some(frames) = restore_frames {
                runtime_opts.restore_frames = frames;
            }
            runtime_opts.validate()?;

            let program = read_program(&input).await?;
            let compiled = match program.instrumented {
                Some(_) => program,
                None => compiler::compile(&program, &opts)?,
            };

            let mut machine = Machine::for_program(&compiled, runtime_opts);
            let result = runtime::run_program_async(&mut machine, &compiled).await;

            for line in machine.output() {
                println!("{}", line);
            }
            let value = result?;
            println!("{}", serde_json::to_string(&value.to_json())?);

            if stats {
                eprintln!("{}", serde_json::to_string_pretty(&machine.stats())?);
            }
        }
    }

    Ok(())
}
