//! Question commands: `ask`, `chat` and `demo`.

use sales_assistant_client::{ClientConfig, SalesAssistant, build_selector};
use tokio::io::BufReader;

use super::{CommandError, start_server, stop_server};

/// Questions answered by `sales-cli demo`.
pub const DEMO_QUESTIONS: [&str; 4] = [
    "What are the top 3 products in shop 1?",
    "Show me orders for customer 5",
    "List the best selling products in shop 2",
    "What did customer 3 purchase?",
];

/// Answer one question and print the result.
///
/// # Errors
///
/// Returns an error if the selector cannot be built or the server cannot
/// be started.
pub async fn ask(config: &ClientConfig, question: &str) -> Result<(), CommandError> {
    let selector = build_selector(config).await?;
    let transport = start_server(config).await?;
    let assistant = SalesAssistant::new(selector, transport.clone());

    let answer = assistant.answer(question).await;
    print_answer(&answer.to_string());

    drop(assistant);
    stop_server(transport).await;
    Ok(())
}

/// Run the interactive question loop on stdin/stdout.
///
/// # Errors
///
/// Returns an error if setup fails or the terminal cannot be read.
pub async fn chat(config: &ClientConfig) -> Result<(), CommandError> {
    let selector = build_selector(config).await?;
    let transport = start_server(config).await?;
    let assistant = SalesAssistant::new(selector, transport.clone());

    print_answer("Connected. Ask about shops, products or customers; type 'exit' to quit.");
    assistant
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    drop(assistant);
    stop_server(transport).await;
    Ok(())
}

/// Answer each demo question in turn.
///
/// # Errors
///
/// Returns an error if setup fails.
pub async fn demo(config: &ClientConfig) -> Result<(), CommandError> {
    let selector = build_selector(config).await?;
    let transport = start_server(config).await?;
    let assistant = SalesAssistant::new(selector, transport.clone());

    for question in DEMO_QUESTIONS {
        let answer = assistant.answer(question).await;
        print_answer(&format!("\nQuery: {question}\n{answer}"));
    }

    drop(assistant);
    stop_server(transport).await;
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_answer(text: &str) {
    println!("{text}");
}
