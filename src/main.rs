use clap::Parser;

use gemini_cli::cli::Args;
use gemini_cli::config::Config;
use gemini_cli::gemini::{
    self, ArtifactWriter, Dispatcher, GeminiClient, GeminiError, GenerationMode,
    GEMINI_API_KEY_ENV,
};

const MISSING_KEY_HELP: &str = "GEMINI_API_KEY environment variable is not set.\n\n\
    Add your API key to a .env file:\n\
        echo 'GEMINI_API_KEY=your-api-key-here' >> .env\n\n\
    Or set it as an environment variable:\n\
        export GEMINI_API_KEY=\"your-api-key-here\"\n\n\
    Get your API key at: https://ai.google.dev/gemini-api/docs/api-key";

const USAGE_HINT: &str = "Usage: gemini [OPTIONS] <PROMPT>...\n\n\
    For more information, try '--help'.";

/// Generate for one command line and return what should be printed.
fn run(args: Args) -> Result<String, String> {
    let api_key = std::env::var(GEMINI_API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| MISSING_KEY_HELP.to_string())?;

    if args.prompt_text().trim().is_empty() {
        return Err(format!("{}\n\n{}", GeminiError::EmptyPrompt, USAGE_HINT));
    }

    let config = Config::load(args.config.as_deref()).map_err(|e| e.to_string())?;
    let invocation = args.into_invocation(&config)?;

    let client = GeminiClient::with_base_url(api_key, invocation.base_url)
        .map_err(|e| format!("Failed to create Gemini client: {}", e))?;
    let dispatcher = Dispatcher::new(client, ArtifactWriter::new(invocation.output_dir))
        .with_settings(invocation.settings);

    if invocation.request.mode() == GenerationMode::Video {
        eprintln!("Generating video, this can take a few minutes...");
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;
    let artifacts = rt
        .block_on(dispatcher.dispatch(&invocation.request))
        .map_err(|e| e.to_string())?;

    Ok(gemini::render(&artifacts))
}

/// Load environment variables from .env file if present
fn load_env() {
    // Existing env vars win; a missing .env is fine
    let _ = dotenv::dotenv();
}

fn main() {
    load_env();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    match run(args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
