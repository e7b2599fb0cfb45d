use crate::service::GenerateRequest;

/// Picks the create or update form depending on whether a prior generation
/// exists, and interpolates the request into it. The service only ever sees
/// one user message built here.
pub fn render_message(req: &GenerateRequest) -> String {
    match (&req.previous_input, &req.previous_output) {
        (Some(previous_input), Some(previous_output)) => format!(
            "{}\n<instruction>{}</instruction>\n<targetPath>{}</targetPath>\n<previousInput>{}</previousInput>\n<previousOutput>{}</previousOutput>\n<input>{}</input>",
            UPDATE_PREAMBLE,
            req.prompt,
            req.output_path.display(),
            previous_input,
            previous_output,
            req.current_input,
        ),
        _ => format!(
            "{}\n<instruction>{}</instruction>\n<targetPath>{}</targetPath>\n<input>{}</input>",
            CREATE_PREAMBLE,
            req.prompt,
            req.output_path.display(),
            req.current_input,
        ),
    }
}

const CREATE_PREAMBLE: &str = r#"You produce a single text document from source material.

Follow <instruction> against the content of <input> and write the document that should live at <targetPath>.

Rules:
- Respond with the raw document content only: no preamble, no commentary, no code fences.
- Preserve facts from <input>; do not invent material the input does not support.
- The full response is written to disk verbatim, so formatting is part of the answer."#;

const UPDATE_PREAMBLE: &str = r#"You revise an existing generated document after its source material changed.

<previousInput> produced <previousOutput>. The source has since changed to <input>. Apply <instruction> to the new source and produce the updated document for <targetPath>.

Rules:
- Respond with the complete updated document, not a delta.
- Keep structure and phrasing from <previousOutput> wherever the source still supports it; change only what the input change requires.
- Respond with the raw document content only: no preamble, no commentary, no code fences."#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(previous: bool) -> GenerateRequest {
        GenerateRequest {
            current_input: "current body".to_string(),
            prompt: "summarize".to_string(),
            previous_input: previous.then(|| "old body".to_string()),
            previous_output: previous.then(|| "old summary".to_string()),
            output_path: PathBuf::from("doc.md"),
        }
    }

    #[test]
    fn fresh_generation_uses_create_form() {
        let message = render_message(&request(false));

        assert!(message.contains("produce a single text document"));
        assert!(message.contains("<instruction>summarize</instruction>"));
        assert!(message.contains("<input>current body</input>"));
        assert!(!message.contains("<previousOutput>"));
    }

    #[test]
    fn prior_generation_uses_update_form() {
        let message = render_message(&request(true));

        assert!(message.contains("revise an existing generated document"));
        assert!(message.contains("<previousInput>old body</previousInput>"));
        assert!(message.contains("<previousOutput>old summary</previousOutput>"));
        assert!(message.contains("<targetPath>doc.md</targetPath>"));
    }

    #[test]
    fn partial_history_falls_back_to_create_form() {
        // Output existed but metadata was missing (or vice versa): without
        // both halves of the prior state the update form has nothing to diff.
        let mut req = request(true);
        req.previous_input = None;

        assert!(render_message(&req).contains("produce a single text document"));
    }
}
