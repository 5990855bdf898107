//! Prompt assembly for the external answer generator.

use crate::retriever::RetrievedContexts;

/// Maximum chunks per collection inserted into the prompt.
pub const MAX_CONTEXT_CHUNKS: usize = 4;

/// Separator placed between context chunks so the model can tell them apart.
pub const CHUNK_SEPARATOR: &str = "\n\n---\n";

/// Joins up to [`MAX_CONTEXT_CHUNKS`] chunks with the visible separator,
/// falling back to `placeholder` when the list is empty.
pub fn render_context(chunks: &[String], placeholder: &str) -> String {
    if chunks.is_empty() {
        return placeholder.to_string();
    }
    chunks
        .iter()
        .take(MAX_CONTEXT_CHUNKS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

/// Composes the single prompt string sent to the answer generator: system
/// guidance, both context blocks, then the user's question.
pub fn build_prompt(question: &str, contexts: &RetrievedContexts) -> String {
    let best_practices = render_context(
        &contexts.best_practices,
        "(no best-practices context available)",
    );
    let code = render_context(&contexts.code, "(no code context available)");

    let mut prompt = String::new();
    prompt.push_str(
        "You are an engineering copilot grounded by retrieved context.\n\
         Answer STRICTLY from the context below; say so plainly when the answer is not there.\n\
         When citing code, reference it by its [FILE]: header.\n\
         Align recommendations with the best practices whenever they apply.\n",
    );
    prompt.push_str("\n# CONTEXT — BEST PRACTICES\n");
    prompt.push_str(&best_practices);
    prompt.push_str("\n\n# CONTEXT — CODE\n");
    prompt.push_str(&code);
    prompt.push_str("\n\n# QUESTION\n");
    prompt.push_str(question);
    prompt.push_str("\n\nAnswer concisely; list actionable steps when useful.");
    prompt
}
