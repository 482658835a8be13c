use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jd_workbench::console::{MAX_TEMPERATURE, MIN_TEMPERATURE};
use jd_workbench::io::{format_comparison, read_prompt_file};
use jd_workbench::llm::{AVAILABLE_MODELS, DEFAULT_MODEL, PromptContext};
use jd_workbench::{
    CompanyContext, CompanyField, Console, GatewayConfig, ModelSettings, OpenAiGateway,
    PromptStage, Workbench, read_job_description, render_default_prompt, write_export,
};

#[derive(Parser)]
#[command(name = "jd-workbench")]
#[command(author, version, about = "Job description enhancement and extraction prompt workbench", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive prompt-testing session
    Session {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        company: CompanyArgs,

        /// OpenAI API key (defaults to OPENAI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Directory for exported results
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run enhancement, extraction and export in one pass
    Run {
        /// Job description text file ('-' for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for the exported JSON
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        company: CompanyArgs,

        #[command(flatten)]
        prompts: PromptFileArgs,

        /// OpenAI API key (defaults to OPENAI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Print the step 1 and step 2 output after exporting
        #[arg(long)]
        show: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the default prompt for a stage without calling the model
    Prompt {
        /// enhance, base-info, skills or responsibilities
        #[arg(value_parser = parse_stage)]
        stage: PromptStage,

        /// Raw job description (enhance) or enhanced text (extraction stages)
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        company: CompanyArgs,
    },

    /// Check that an API key is accepted
    CheckKey {
        /// OpenAI API key (defaults to OPENAI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args, Clone)]
struct ModelArgs {
    /// Model to use
    #[arg(long, default_value = DEFAULT_MODEL, value_parser = clap::builder::PossibleValuesParser::new(AVAILABLE_MODELS))]
    model: String,

    /// Sampling temperature (0.0-1.0)
    #[arg(long, default_value = "0.4", value_parser = parse_temperature)]
    temperature: f64,

    /// Maximum tokens in each response (100-4000)
    #[arg(long, default_value = "2000", value_parser = clap::value_parser!(u32).range(100..=4000))]
    max_tokens: u32,
}

impl ModelArgs {
    fn settings(&self) -> ModelSettings {
        ModelSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Args, Clone, Default)]
struct CompanyArgs {
    /// Company name (e.g., "TechCorp Inc.")
    #[arg(long)]
    company_name: Option<String>,

    /// Company industry (e.g., "Software Development")
    #[arg(long)]
    industry: Option<String>,

    /// Company size (e.g., "100-500 employees")
    #[arg(long)]
    company_size: Option<String>,

    /// Headquarters (e.g., "San Francisco, CA")
    #[arg(long)]
    headquarters: Option<String>,
}

impl CompanyArgs {
    fn fields(&self) -> Vec<(CompanyField, &str)> {
        [
            (CompanyField::Name, &self.company_name),
            (CompanyField::Industry, &self.industry),
            (CompanyField::CompanySize, &self.company_size),
            (CompanyField::Headquarters, &self.headquarters),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }

    fn context(&self) -> CompanyContext {
        let mut ctx = CompanyContext::default();
        for (field, value) in self.fields() {
            ctx.set(field, value.trim());
        }
        ctx
    }
}

/// Prompt files that replace the generated prompts
#[derive(Args, Clone, Default)]
struct PromptFileArgs {
    #[arg(long)]
    enhance_prompt: Option<PathBuf>,

    #[arg(long)]
    base_info_prompt: Option<PathBuf>,

    #[arg(long)]
    skills_prompt: Option<PathBuf>,

    #[arg(long)]
    responsibilities_prompt: Option<PathBuf>,
}

impl PromptFileArgs {
    fn files(&self) -> Vec<(PromptStage, &PathBuf)> {
        [
            (PromptStage::Enhance, &self.enhance_prompt),
            (PromptStage::BaseInfo, &self.base_info_prompt),
            (PromptStage::Skills, &self.skills_prompt),
            (PromptStage::Responsibilities, &self.responsibilities_prompt),
        ]
        .into_iter()
        .filter_map(|(stage, path)| path.as_ref().map(|p| (stage, p)))
        .collect()
    }
}

fn parse_stage(value: &str) -> Result<PromptStage, String> {
    value.parse()
}

fn parse_temperature(value: &str) -> Result<f64, String> {
    let temperature: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(format!("temperature must be between 0.0 and 1.0 (got {})", temperature));
    }
    Ok(temperature)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Session {
            model,
            company,
            api_key,
            output_dir,
            verbose,
        } => {
            setup_logging(verbose);
            run_session(model, company, api_key, output_dir).await
        }
        Commands::Run {
            input,
            output_dir,
            model,
            company,
            prompts,
            api_key,
            show,
            verbose,
        } => {
            setup_logging(verbose);
            run_pipeline(input, output_dir, model, company, prompts, api_key, show).await
        }
        Commands::Prompt {
            stage,
            input,
            company,
        } => {
            setup_logging(false);
            print_prompt(stage, input, company)
        }
        Commands::CheckKey { api_key, verbose } => {
            setup_logging(verbose);
            check_key(api_key).await
        }
    }
}

fn setup_logging(verbose: bool) {
    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    if verbose {
        let subscriber = builder.with_max_level(Level::DEBUG).finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = builder.with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

fn resolve_api_key(api_key: Option<String>) -> Option<String> {
    api_key
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .filter(|key| !key.trim().is_empty())
}

fn new_workbench(settings: ModelSettings) -> Workbench {
    let gateway = OpenAiGateway::new(GatewayConfig::from_env());
    Workbench::new(Arc::new(gateway), settings)
}

async fn run_session(
    model: ModelArgs,
    company: CompanyArgs,
    api_key: Option<String>,
    output_dir: PathBuf,
) -> Result<()> {
    let mut workbench = new_workbench(model.settings());
    for (field, value) in company.fields() {
        workbench.set_company_context(field, value);
    }

    if let Some(key) = resolve_api_key(api_key) {
        match workbench.set_credential(&key).await {
            Ok(()) => info!("API key validated successfully"),
            Err(e) => warn!("{}", e),
        }
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut console = Console::new(workbench, stdin.lock(), stdout.lock(), output_dir);
    console.run().await
}

async fn run_pipeline(
    input: PathBuf,
    output_dir: PathBuf,
    model: ModelArgs,
    company: CompanyArgs,
    prompts: PromptFileArgs,
    api_key: Option<String>,
    show: bool,
) -> Result<()> {
    info!("Loading job description from {:?}", input);
    let raw_text = read_job_description(&input).context("Failed to read input job description")?;

    let key = resolve_api_key(api_key)
        .context("No API key: pass --api-key or set OPENAI_API_KEY")?;

    let mut workbench = new_workbench(model.settings());
    workbench.set_credential(&key).await?;

    for (field, value) in company.fields() {
        workbench.set_company_context(field, value);
    }
    for (stage, path) in prompts.files() {
        let text = read_prompt_file(path)?;
        workbench.set_prompt_override(stage, text);
    }

    // Stage 1: enhancement
    info!("Step 1: Text enhancement...");
    let stage1 = workbench.run_stage1(&raw_text).await?;
    info!("Step 1: {} chars of enhanced text", stage1.enhanced_text.chars().count());

    // Stage 2: extraction
    info!("Step 2: Structured extraction...");
    let stage2 = workbench.run_stage2().await?;
    for (stage, error) in &stage2.failures {
        warn!("Step 2: {} extraction failed: {}", stage, error);
    }
    if !stage2.is_complete() {
        anyhow::bail!(
            "Structured extraction incomplete ({} of 3 calls failed); nothing exported",
            stage2.failures.len()
        );
    }

    // Stage 3: export
    info!("Step 3: Exporting results...");
    let bundle = workbench.request_export()?;
    let path = write_export(&bundle, &output_dir)?;
    info!("Results written to {:?}", path);

    if show {
        print!("{}", format_comparison(workbench.state()));
    }
    println!("{}", path.display());

    Ok(())
}

fn print_prompt(stage: PromptStage, input: Option<PathBuf>, company: CompanyArgs) -> Result<()> {
    let input_text = match input {
        Some(path) => read_job_description(&path)?,
        None => String::new(),
    };
    let ctx = company.context();
    println!(
        "{}",
        render_default_prompt(stage, &PromptContext::new(&ctx, &input_text))
    );
    Ok(())
}

async fn check_key(api_key: Option<String>) -> Result<()> {
    let key = resolve_api_key(api_key)
        .context("No API key: pass --api-key or set OPENAI_API_KEY")?;
    let mut workbench = new_workbench(ModelSettings::default());
    workbench.set_credential(&key).await?;
    println!("API key validated successfully.");
    Ok(())
}
