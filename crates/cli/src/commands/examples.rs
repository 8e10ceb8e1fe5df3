//! Worked-example commands.
//!
//! # Usage
//!
//! ```bash
//! sales-cli examples validate my_examples.yaml
//! sales-cli examples show > my_examples.yaml
//! ```

use std::path::Path;

use sales_assistant_client::selection::{default_examples, load_examples, validate_examples};

use super::CommandError;

/// Check a worked-examples file and report every problem.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or has problems.
#[allow(clippy::print_stdout)]
pub async fn validate(path: &Path) -> Result<(), CommandError> {
    let config = load_examples(path).await?;
    let problems = validate_examples(&config);

    if problems.is_empty() {
        let count: usize = config.values().map(|tool| tool.examples.len()).sum();
        println!(
            "{}: {count} examples for {} tools, all valid",
            path.display(),
            config.len()
        );
        return Ok(());
    }

    println!("{}:", path.display());
    for problem in &problems {
        println!("  - {problem}");
    }
    Err(CommandError::InvalidExamples(problems.len()))
}

/// Print the built-in worked examples.
///
/// # Errors
///
/// Returns an error if the examples cannot be serialized.
#[allow(clippy::print_stdout)]
pub fn show() -> Result<(), CommandError> {
    let yaml = serde_yaml::to_string(&default_examples())
        .map_err(|e| CommandError::Output(e.to_string()))?;
    print!("{yaml}");
    Ok(())
}
