use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;

/// Pretty-print any serializable value as JSON on stdout
pub fn output_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: OutputFormat, message: &str) {
    match output_format {
        OutputFormat::Json => {
            let body = json!({
                "success": false,
                "error": message
            });
            eprintln!("{}", body);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
}
