use clap::Parser;

use redraft_core::config::{Config, ConfigError, ServiceConfig, default_metadata_path};
use redraft_core::confirm::TerminalPrompter;
use redraft_core::service::OpenAiGenerator;
use redraft_core::transaction::{Outcome, Transaction};

/// Regenerate a text artifact from input documents and a prompt, with
/// transactional output/metadata updates.
#[derive(Parser, Debug)]
#[command(name = "redraft", version, about)]
struct Cli {
    /// Input file path; repeatable. Use '-' to read one input from stdin.
    #[arg(short = 'i', long = "input", value_name = "PATH", required = true)]
    inputs: Vec<String>,

    /// Output file path
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: std::path::PathBuf,

    /// Metadata file path (defaults to the output path + ".rd")
    #[arg(short = 'd', long = "metadata", value_name = "PATH")]
    metadata: Option<std::path::PathBuf>,

    /// Instruction given to the generation service
    #[arg(short = 'p', long = "prompt", value_name = "TEXT")]
    prompt: String,

    /// Only rewrite the metadata record from the existing output
    #[arg(long = "meta")]
    meta_only: bool,

    /// Regenerate even if the input has not changed
    #[arg(long = "force")]
    force: bool,

    /// Answer yes to all confirmations
    #[arg(short = 'y', long = "yes")]
    auto_confirm: bool,

    /// Service base URL (env: REDRAFT_BASE_URL)
    #[arg(long = "svc-base", value_name = "URL")]
    svc_base: Option<String>,

    /// Service API key (env: REDRAFT_KEY)
    #[arg(long = "svc-key", value_name = "KEY")]
    svc_key: Option<String>,

    /// Service model name (env: REDRAFT_MODEL)
    #[arg(long = "svc-model", value_name = "NAME")]
    svc_model: Option<String>,

    /// Generation seed
    #[arg(long = "gen-seed", value_name = "N")]
    gen_seed: Option<i64>,

    /// Generation temperature
    #[arg(long = "gen-t", value_name = "T")]
    gen_temperature: Option<f64>,

    /// Generation top-p
    #[arg(long = "gen-p", value_name = "P")]
    gen_top_p: Option<f64>,
}

fn build_config(cli: Cli) -> Result<Config, ConfigError> {
    // Env fallbacks first, explicit flags on top. Reading the env also
    // scrubs the credential from the process environment.
    let service = ServiceConfig::from_env().overridden_by(ServiceConfig {
        base_url: cli.svc_base,
        api_key: cli.svc_key,
        model: cli.svc_model,
        seed: cli.gen_seed,
        temperature: cli.gen_temperature,
        top_p: cli.gen_top_p,
    });

    let mut inputs = cli.inputs;
    inputs.sort();

    let metadata = cli
        .metadata
        .unwrap_or_else(|| default_metadata_path(&cli.output));

    let config = Config {
        inputs,
        output: cli.output,
        metadata,
        prompt: cli.prompt,
        force: cli.force,
        meta_only: cli.meta_only,
        auto_confirm: cli.auto_confirm,
        service,
    };

    config.validate()?;

    Ok(config)
}

fn main() {
    let cli = Cli::parse();

    let config = match build_config(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let generator = OpenAiGenerator::new(config.service.clone());
    let mut prompter = TerminalPrompter;

    match Transaction::new(&config).run(&generator, &mut prompter) {
        Ok(Outcome::Skipped) => {
            println!("Previous and current inputs are same. Generation aborted.");
        }
        Ok(Outcome::Rejected) => {
            println!("Generation rejected; nothing was written.");
        }
        Ok(Outcome::Committed) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
