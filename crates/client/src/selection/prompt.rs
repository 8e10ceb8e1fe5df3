//! System prompt for model-based tool selection.

use askama::Template;
use serde_json::json;

use sales_assistant_core::ToolDefinition;

use super::ToolExamplesConfig;

/// A catalog entry as shown to the model.
struct PromptTool {
    name: String,
    description: String,
    parameters: String,
}

/// A worked example as shown to the model.
struct PromptExample {
    query: String,
    call: String,
}

#[derive(Template)]
#[template(path = "selection/system_prompt.txt")]
struct SelectionPromptTemplate {
    tools: Vec<PromptTool>,
    examples: Vec<PromptExample>,
}

/// Build the system prompt from the tool catalog and worked examples.
#[must_use]
pub fn render_selection_prompt(catalog: &[ToolDefinition], examples: &ToolExamplesConfig) -> String {
    let tools: Vec<PromptTool> = catalog
        .iter()
        .map(|tool| PromptTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.input_schema.to_string(),
        })
        .collect();

    let examples: Vec<PromptExample> = examples
        .iter()
        .flat_map(|(tool_name, config)| {
            config.examples.iter().map(move |example| PromptExample {
                query: example.query.clone(),
                call: json!({ "tool_name": tool_name, "parameters": example.parameters })
                    .to_string(),
            })
        })
        .collect();

    let template = SelectionPromptTemplate { tools, examples };
    template.render().unwrap_or_else(|_| fallback_prompt(&template))
}

/// Plain rendering used if the template fails.
fn fallback_prompt(template: &SelectionPromptTemplate) -> String {
    let tools: Vec<String> = template
        .tools
        .iter()
        .map(|t| format!("- {}: {} {}", t.name, t.description, t.parameters))
        .collect();
    format!(
        "Pick one tool for the user's question.\n{}\nReply with a single JSON object: \
         {{\"tool_name\": \"...\", \"parameters\": {{...}}}}",
        tools.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use sales_assistant_core::tool_catalog;

    use super::*;
    use crate::selection::default_examples;

    #[test]
    fn test_prompt_lists_every_tool() {
        let prompt = render_selection_prompt(&tool_catalog(), &default_examples());
        for tool in tool_catalog() {
            assert!(prompt.contains(&tool.name), "missing {}", tool.name);
        }
        assert!(prompt.contains("\"required\""));
    }

    #[test]
    fn test_prompt_includes_examples_as_calls() {
        let prompt = render_selection_prompt(&tool_catalog(), &default_examples());
        assert!(prompt.contains("Question: What are the top 3 products in shop 1?"));
        let answer = prompt
            .lines()
            .find(|line| line.starts_with("Answer:") && line.contains("\"limit\":3"))
            .expect("example call rendered");
        assert!(answer.contains(r#""tool_name":"GetTopSellingProducts""#));
        assert!(answer.contains(r#""shop_id":1"#));
    }

    #[test]
    fn test_prompt_without_examples() {
        let prompt = render_selection_prompt(&tool_catalog(), &ToolExamplesConfig::new());
        assert!(prompt.contains("GetShopPerformance"));
        assert!(!prompt.contains("Question:"));
        assert!(prompt.contains("\"tool_name\""));
    }
}
