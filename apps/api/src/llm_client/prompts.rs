// Shared prompt fragments. Task-specific prompts live in analysis/prompts.rs.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps model output renderable: the renderer escapes text, it does not accept markup.
pub const PLAIN_TEXT_ONLY: &str = "Respond with plain text only. \
    Do NOT use LaTeX, HTML or Markdown markup. \
    Start bullet points with the • character.";

/// Guards against invented facts when rewriting user material.
pub const NO_FABRICATION: &str = "Do NOT invent employers, dates, degrees, \
    metrics or skills that are not present in the source material.";
