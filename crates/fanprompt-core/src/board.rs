//! CEO-and-board decision: several "board" models answer a question, then a
//! "CEO" model reads every answer and decides

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::fanout::FanOutOrchestrator;
use crate::files::{ensure_output_dir, prompt_from_file_to_file, read_prompt_file};

pub const DEFAULT_CEO_MODEL: &str = "openai:o3";
pub const CEO_PROMPT_FILE: &str = "ceo_prompt.xml";
pub const CEO_DECISION_FILE: &str = "ceo_decision.md";

/// Template for the CEO prompt. `{original_prompt}` and `{board_responses}`
/// are substituted.
pub const DEFAULT_CEO_DECISION_PROMPT: &str = r#"
<purpose>
    You are a CEO of a company. You are given a list of responses from your board of directors. Your job is to take in the original question prompt, and each of the board members' responses, and choose the best direction for your company.
</purpose>
<instructions>
    <instruction>Each board member has proposed an answer to the question posed in the prompt.</instruction>
    <instruction>Given the original question prompt, and each of the board members' responses, choose the best answer.</instruction>
    <instruction>Tally the votes of the board members, choose the best direction, and explain why you chose it.</instruction>
    <instruction>To preserve anonymity, we will use model names instead of real names of your board members. When responding, use the model names in your response.</instruction>
    <instruction>As a CEO, you breakdown the decision into several categories including: risk, reward, timeline, and resources. In addition to these guiding categories, you also consider the board members' expertise and experience. As a bleeding edge CEO, you also invent new dimensions of decision making to help you make the best decision for your company.</instruction>
    <instruction>Your final CEO response should be in markdown format with a comprehensive explanation of your decision. Start the top of the file with a title that says "CEO Decision", include a table of contents, briefly describe the question/problem at hand then dive into several sections. One of your first sections should be a quick summary of your decision, then breakdown each of the boards decisions into sections with your commentary on each. Where we lead into your decision with the categories of your decision making process, and then we lead into your final decision.</instruction>
</instructions>

<original-question>{original_prompt}</original-question>

<board-decisions>
{board_responses}
</board-decisions>
"#;

/// Options for [`ceo_and_board`]
#[derive(Debug, Clone, Default)]
pub struct BoardRequest {
    pub models: Option<Vec<String>>,
    pub ceo_model: Option<String>,
    pub ceo_decision_prompt: Option<String>,
    pub correction_model: Option<String>,
}

/// Run the board, then the CEO. Returns the path of the decision file.
pub async fn ceo_and_board(
    fan: &FanOutOrchestrator,
    from_file: &Path,
    output_dir: &Path,
    request: BoardRequest,
) -> Result<PathBuf> {
    ensure_output_dir(output_dir).await?;
    let original_prompt = read_prompt_file(from_file).await?;

    let models = fan.models_or_default(request.models);
    let correction = request.correction_model.as_deref();
    let board_files =
        prompt_from_file_to_file(fan, from_file, Some(models.clone()), output_dir, correction)
            .await?;

    let mut board_responses = String::new();
    for (model, file) in models.iter().zip(&board_files) {
        let response = match tokio::fs::read_to_string(file).await {
            Ok(content) => content,
            Err(e) => {
                error!("Error reading board response file {}: {}", file, e);
                format!("Error reading response: {}", e)
            }
        };
        board_responses.push_str(&board_response_block(model, &response));
    }

    let template = request
        .ceo_decision_prompt
        .as_deref()
        .unwrap_or(DEFAULT_CEO_DECISION_PROMPT);
    let ceo_prompt = render_ceo_prompt(template, &original_prompt, &board_responses);

    let prompt_path = output_dir.join(CEO_PROMPT_FILE);
    tokio::fs::write(&prompt_path, &ceo_prompt)
        .await
        .with_context(|| format!("Error writing CEO prompt to {}", prompt_path.display()))?;

    let ceo_model = request
        .ceo_model
        .unwrap_or_else(|| DEFAULT_CEO_MODEL.to_string());
    info!("Asking CEO model {} to decide between {} board answers", ceo_model, models.len());

    let decision = fan
        .fan_out(&ceo_prompt, std::slice::from_ref(&ceo_model), correction)
        .await?
        .into_iter()
        .next()
        .unwrap_or_default();

    let decision_path = output_dir.join(CEO_DECISION_FILE);
    tokio::fs::write(&decision_path, decision)
        .await
        .with_context(|| format!("Error writing CEO decision to {}", decision_path.display()))?;

    Ok(decision_path)
}

fn board_response_block(model: &str, response: &str) -> String {
    format!(
        "\n<board-response>\n    <model-name>{}</model-name>\n    <response>{}</response>\n</board-response>\n",
        model, response
    )
}

/// Fills `{original_prompt}` and `{board_responses}` in one pass.
///
/// Substituted text is never rescanned, so placeholders that appear inside
/// the user's prompt stay literal. `{{` and `}}` render as single braces;
/// any other brace is copied through.
fn render_ceo_prompt(template: &str, original_prompt: &str, board_responses: &str) -> String {
    let mut out = String::with_capacity(
        template.len() + original_prompt.len() + board_responses.len(),
    );
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{{").or_else(|| tail.strip_prefix("}}")) {
            out.push_str(&tail[..1]);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{original_prompt}") {
            out.push_str(original_prompt);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{board_responses}") {
            out.push_str(board_responses);
            rest = after;
        } else {
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backends::ProviderRegistry;
    use crate::backends::mock::MockBackend;
    use crate::fanout::FanOutConfig;
    use crate::provider::Provider;
    use crate::router::ModelRouter;

    #[test]
    fn test_render_ceo_prompt() {
        let rendered = render_ceo_prompt(
            DEFAULT_CEO_DECISION_PROMPT,
            "Should we expand?",
            &board_response_block("openai:gpt-4o", "Yes"),
        );
        assert!(rendered.contains("<original-question>Should we expand?</original-question>"));
        assert!(rendered.contains("<model-name>openai:gpt-4o</model-name>"));
        assert!(rendered.contains("<response>Yes</response>"));
        assert!(!rendered.contains("{board_responses}"));
    }

    #[test]
    fn test_render_ceo_prompt_does_not_rescan_substitutions() {
        let rendered = render_ceo_prompt(
            "Q:{original_prompt} B:{board_responses}",
            "literal {board_responses} here",
            "BOARD",
        );
        assert_eq!(rendered, "Q:literal {board_responses} here B:BOARD");
    }

    #[test]
    fn test_render_ceo_prompt_brace_escapes() {
        let rendered = render_ceo_prompt("{{x}} {original_prompt} {other} }", "q", "b");
        assert_eq!(rendered, "{x} q {other} }");
    }

    #[tokio::test]
    async fn test_ceo_and_board() {
        let dir = tempfile::tempdir().unwrap();
        let question = dir.path().join("question.txt");
        std::fs::write(&question, "Should we expand to Europe?").unwrap();
        let out = dir.path().join("out");

        let board = Arc::new(MockBackend::new(&["gpt-4o", "o3"], "Board says yes"));
        let ceo = Arc::new(MockBackend::new(&["claude-3-5-haiku"], "# CEO Decision\nExpand."));
        let fan = FanOutOrchestrator::new(
            ModelRouter::new(
                ProviderRegistry::new()
                    .with_backend(Provider::OpenAi, board.clone())
                    .with_backend(Provider::Anthropic, ceo.clone()),
            ),
            FanOutConfig::default(),
        );

        let decision = ceo_and_board(
            &fan,
            &question,
            &out,
            BoardRequest {
                models: Some(vec!["o:gpt-4o".to_string(), "o:o3".to_string()]),
                ceo_model: Some("a:claude-3-5-haiku".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(decision, out.join(CEO_DECISION_FILE));
        assert_eq!(
            std::fs::read_to_string(&decision).unwrap(),
            "# CEO Decision\nExpand."
        );

        let ceo_prompt = std::fs::read_to_string(out.join(CEO_PROMPT_FILE)).unwrap();
        assert!(ceo_prompt.contains("Should we expand to Europe?"));
        assert!(ceo_prompt.contains("<model-name>o:gpt-4o</model-name>"));
        assert!(ceo_prompt.contains("<model-name>o:o3</model-name>"));
        assert!(ceo_prompt.contains("<response>Board says yes</response>"));

        assert!(out.join("question_o_gpt-4o.txt").exists());
        assert!(out.join("question_o_o3.txt").exists());
        assert_eq!(board.prompt_count(), 2);
        assert_eq!(ceo.prompt_count(), 1);
    }
}
