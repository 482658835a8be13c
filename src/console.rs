//! Line-oriented console over a [`Workbench`].
//!
//! Each line is one command. Commands that take free text (`enhance` and
//! `edit` without a file) read the following lines up to a line containing
//! only `.`.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::io::{format_comparison, read_job_description, read_prompt_file, write_export};
use crate::llm::{AVAILABLE_MODELS, ModelSettings};
use crate::models::{CompanyField, PromptStage, Step};
use crate::stages::{Phase, Workbench};

/// Line that terminates a multi-line text block
pub const END_OF_TEXT: &str = ".";

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 1.0;
pub const MIN_MAX_TOKENS: u32 = 100;
pub const MAX_MAX_TOKENS: u32 = 4000;

const HELP: &str = r#"Commands:
  key <api-key>                 validate and store the OpenAI API key
  company <field> [value]       set name | industry | size | headquarters (no value clears)
  model <name>                  gpt-4o-mini | gpt-4o | gpt-3.5-turbo
  temperature <0.0-1.0>         sampling temperature
  max-tokens <100-4000>         response token limit
  step <1|2|3>                  switch step
  show <stage>                  print the prompt that will be sent
  edit <stage> [file]           save an edited prompt (from file, or typed until '.')
  reset <stage>                 drop a saved prompt edit
  enhance [file]                step 1: enhance a job description (from file, or typed until '.')
  extract                       step 2: base info, skills and responsibilities
  compare                       step 3: show step 1 and step 2 output
  export [dir]                  step 3: write jd_extraction_results_<stamp>.json
  status                        show session state
  help                          show this help
  quit                          end the session

Stages: enhance, base-info, skills, responsibilities"#;

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Key(String),
    Company(CompanyField, String),
    Model(String),
    Temperature(f64),
    MaxTokens(u32),
    Step(Step),
    Show(PromptStage),
    Edit(PromptStage, Option<PathBuf>),
    Reset(PromptStage),
    Enhance(Option<PathBuf>),
    Extract,
    Compare,
    Export(Option<PathBuf>),
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "key" => Command::Key(required(rest, "key <api-key>")?.to_string()),
            "company" => {
                let args = required(rest, "company <field> [value]")?;
                let (field, value) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
                Command::Company(field.parse()?, value.trim().to_string())
            }
            "model" => {
                let model = required(rest, "model <name>")?;
                if !AVAILABLE_MODELS.contains(&model) {
                    return Err(format!(
                        "unknown model '{}' (available: {})",
                        model,
                        AVAILABLE_MODELS.join(", ")
                    ));
                }
                Command::Model(model.to_string())
            }
            "temperature" | "temp" => {
                let value: f64 = required(rest, "temperature <0.0-1.0>")?
                    .parse()
                    .map_err(|_| format!("'{}' is not a number", rest))?;
                if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&value) {
                    return Err(format!("temperature must be between 0.0 and 1.0 (got {})", value));
                }
                Command::Temperature(value)
            }
            "max-tokens" | "max_tokens" => {
                let value: u32 = required(rest, "max-tokens <100-4000>")?
                    .parse()
                    .map_err(|_| format!("'{}' is not a whole number", rest))?;
                if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&value) {
                    return Err(format!("max-tokens must be between 100 and 4000 (got {})", value));
                }
                Command::MaxTokens(value)
            }
            "step" => {
                let number: u8 = required(rest, "step <1|2|3>")?
                    .parse()
                    .map_err(|_| format!("'{}' is not a step number", rest))?;
                Command::Step(Step::try_from(number)?)
            }
            "show" => Command::Show(required(rest, "show <stage>")?.parse()?),
            "edit" => {
                let args = required(rest, "edit <stage> [file]")?;
                let (stage, file) = match args.split_once(char::is_whitespace) {
                    Some((stage, file)) => (stage, Some(PathBuf::from(file.trim()))),
                    None => (args, None),
                };
                Command::Edit(stage.parse()?, file)
            }
            "reset" => Command::Reset(required(rest, "reset <stage>")?.parse()?),
            "enhance" => Command::Enhance(optional_path(rest)),
            "extract" => Command::Extract,
            "compare" => Command::Compare,
            "export" => Command::Export(optional_path(rest)),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command '{}' (try 'help')", other)),
        };

        Ok(command)
    }
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("usage: {}", usage))
    } else {
        Ok(rest)
    }
}

fn optional_path(rest: &str) -> Option<PathBuf> {
    (!rest.is_empty()).then(|| PathBuf::from(rest))
}

/// Interactive session driving a [`Workbench`]
pub struct Console<R, W> {
    workbench: Workbench,
    input: R,
    output: W,
    export_dir: PathBuf,
    /// Last raw job description, used to preview the enhancement prompt
    last_input: Option<String>,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(workbench: Workbench, input: R, output: W, export_dir: PathBuf) -> Self {
        Self {
            workbench,
            input,
            output,
            export_dir,
            last_input: None,
        }
    }

    pub fn workbench(&self) -> &Workbench {
        &self.workbench
    }

    /// Run until `quit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        writeln!(self.output, "JD Extraction Prompt Tester. Type 'help' for commands.")?;
        if self.workbench.phase() == Phase::Idle {
            writeln!(self.output, "Warning: enter your OpenAI API key with 'key <api-key>' to continue.")?;
        }

        loop {
            write!(self.output, "[step {}]> ", self.workbench.state().current_step.number())?;
            self.output.flush()?;

            let Some(line) = self.read_line()? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(message) => {
                    writeln!(self.output, "Error: {}", message)?;
                    continue;
                }
            };
            debug!("Console command: {:?}", command);

            if command == Command::Quit {
                break;
            }
            self.dispatch(command).await?;
        }

        writeln!(self.output, "Session ended.")?;
        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Key(key) => match self.workbench.set_credential(&key).await {
                Ok(()) => writeln!(self.output, "API key validated successfully.")?,
                Err(e) => self.report(&e)?,
            },
            Command::Company(field, value) => {
                self.workbench.set_company_context(field, &value);
                writeln!(self.output, "Company {} set to '{}'.", field.as_str(), value)?;
            }
            Command::Model(model) => {
                self.workbench.set_settings(ModelSettings {
                    model,
                    ..self.workbench.settings().clone()
                });
                self.print_settings()?;
            }
            Command::Temperature(temperature) => {
                self.workbench.set_settings(ModelSettings {
                    temperature,
                    ..self.workbench.settings().clone()
                });
                self.print_settings()?;
            }
            Command::MaxTokens(max_tokens) => {
                self.workbench.set_settings(ModelSettings {
                    max_tokens,
                    ..self.workbench.settings().clone()
                });
                self.print_settings()?;
            }
            Command::Step(step) => {
                let warning = self.workbench.navigate(step);
                writeln!(self.output, "{}", step)?;
                if let Some(warning) = warning {
                    writeln!(self.output, "Warning: {}", warning)?;
                }
            }
            Command::Show(stage) => self.show_prompt(stage)?,
            Command::Edit(stage, file) => {
                let text = match file {
                    Some(path) => match read_prompt_file(&path) {
                        Ok(text) => text,
                        Err(e) => return self.report(&e),
                    },
                    None => {
                        writeln!(self.output, "Enter the {} prompt, end with a line containing only '.':", stage)?;
                        self.read_block()?
                    }
                };
                if text.trim().is_empty() {
                    writeln!(self.output, "Error: prompt is empty, nothing saved.")?;
                } else {
                    self.workbench.set_prompt_override(stage, text);
                    writeln!(self.output, "Prompt saved successfully.")?;
                }
            }
            Command::Reset(stage) => {
                if self.workbench.clear_prompt_override(stage) {
                    writeln!(self.output, "Saved {} prompt dropped.", stage)?;
                } else {
                    writeln!(self.output, "No saved {} prompt.", stage)?;
                }
            }
            Command::Enhance(file) => self.enhance(file).await?,
            Command::Extract => self.extract().await?,
            Command::Compare => {
                if let Some(warning) = self.workbench.step_warning(Step::Three) {
                    writeln!(self.output, "Warning: {}", warning)?;
                } else {
                    write!(self.output, "{}", format_comparison(self.workbench.state()))?;
                }
            }
            Command::Export(dir) => {
                let dir = dir.unwrap_or_else(|| self.export_dir.clone());
                match self.workbench.request_export() {
                    Ok(bundle) => match write_export(&bundle, &dir) {
                        Ok(path) => writeln!(self.output, "Exported to {}", path.display())?,
                        Err(e) => self.report(&e)?,
                    },
                    Err(e) => self.report(&e)?,
                }
            }
            Command::Status => self.print_status()?,
            Command::Help => writeln!(self.output, "{}", HELP)?,
            Command::Quit => {}
        }
        Ok(())
    }

    async fn enhance(&mut self, file: Option<PathBuf>) -> Result<()> {
        self.workbench.navigate(Step::One);
        let raw_text = match file {
            Some(path) => match read_job_description(&path) {
                Ok(text) => text,
                Err(e) => return self.report(&e),
            },
            None => {
                writeln!(self.output, "Paste your job description, end with a line containing only '.':")?;
                self.read_block()?
            }
        };
        self.last_input = Some(raw_text.clone());

        writeln!(self.output, "Enhancing job description...")?;
        match self.workbench.run_stage1(&raw_text).await {
            Ok(result) => {
                writeln!(self.output, "== Enhanced Job Description ==")?;
                writeln!(self.output, "{}", result.enhanced_text)?;
            }
            Err(e) => self.report(&e)?,
        }
        Ok(())
    }

    async fn extract(&mut self) -> Result<()> {
        if let Some(warning) = self.workbench.navigate(Step::Two) {
            writeln!(self.output, "Warning: {}", warning)?;
            return Ok(());
        }

        writeln!(self.output, "Extracting structured data...")?;
        match self.workbench.run_stage2().await {
            Ok(result) => {
                for stage in PromptStage::EXTRACTION {
                    if let Some(text) = result.results.get(stage) {
                        writeln!(self.output, "== Extracted {} ==\n{}", stage, text)?;
                    }
                }
                for (stage, error) in &result.failures {
                    writeln!(self.output, "Error during {} extraction: {}", stage, error)?;
                }
                if result.is_complete() {
                    writeln!(self.output, "Structured extraction completed successfully!")?;
                }
            }
            Err(e) => self.report(&e)?,
        }
        Ok(())
    }

    fn show_prompt(&mut self, stage: PromptStage) -> Result<()> {
        let state = self.workbench.state();
        if stage.needs_enhanced_text()
            && state.enhanced_text.is_none()
            && state.prompt_override(stage).is_none()
        {
            writeln!(self.output, "Warning: Please complete Step 1 first to get enhanced text.")?;
            return Ok(());
        }

        let saved = state.prompt_override(stage).is_some();
        let prompt = self
            .workbench
            .current_prompt(stage, self.last_input.as_deref())
            .unwrap_or_else(|_| self.workbench.default_prompt(stage, None));
        let label = if saved { "saved" } else { "default" };
        writeln!(self.output, "== {} prompt ({}) ==\n{}", stage, label, prompt)?;
        Ok(())
    }

    fn print_settings(&mut self) -> Result<()> {
        let settings = self.workbench.settings();
        writeln!(
            self.output,
            "Model: {}, temperature: {:.1}, max tokens: {}",
            settings.model, settings.temperature, settings.max_tokens
        )?;
        Ok(())
    }

    fn print_status(&mut self) -> Result<()> {
        let state = self.workbench.state();
        let ctx = &state.company_context;
        let mut overrides: Vec<&str> = state.prompt_overrides.keys().map(|s| s.as_str()).collect();
        overrides.sort();

        let status = format!(
            "Session: {}\nPhase: {:?}\nCurrent: {}\nAPI key: {}\nCompany: name='{}' industry='{}' size='{}' headquarters='{}'\nEnhanced text: {}\nExtraction: {}\nSaved prompts: {}",
            state.session_id,
            self.workbench.phase(),
            state.current_step,
            if state.has_credential() { "set" } else { "missing" },
            ctx.name,
            ctx.industry,
            ctx.company_size,
            ctx.headquarters,
            state
                .enhanced_text
                .as_ref()
                .map(|t| format!("{} chars", t.chars().count()))
                .unwrap_or_else(|| "none".to_string()),
            match &state.extraction_results {
                None => "none".to_string(),
                Some(r) if r.is_complete() => "complete".to_string(),
                Some(r) => format!(
                    "partial (missing {})",
                    r.missing().iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                ),
            },
            if overrides.is_empty() { "none".to_string() } else { overrides.join(", ") },
        );
        writeln!(self.output, "{}", status)?;
        self.print_settings()
    }

    fn report(&mut self, error: &dyn std::fmt::Display) -> Result<()> {
        writeln!(self.output, "Error: {}", error)?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Read lines up to the terminator (or end of input)
    fn read_block(&mut self) -> Result<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line == END_OF_TEXT {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}
