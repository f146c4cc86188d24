use clap::Args;
use serde_json::Value;

use lbo_core::lbo::run_analysis;

use crate::input;

/// Arguments for LBO analysis
#[derive(Args)]
pub struct LboArgs {
    /// Path to JSON input document (reads stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Case key within the input document's `cases` map
    #[arg(long, default_value = "base_case")]
    pub case: String,
}

pub fn run_lbo(args: LboArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let document: Value = if let Some(ref path) = args.input {
        input::file::read_json_value(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json> or stdin required for LBO analysis".into());
    };

    let result = run_analysis(&document, &args.case);
    Ok(serde_json::to_value(result)?)
}
