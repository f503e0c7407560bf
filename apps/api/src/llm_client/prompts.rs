// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// Instruction fragment that enforces JSON-only output.
pub const JSON_ONLY_INSTRUCTION: &str = "Return ONLY valid JSON \
    (no code fences, no markdown, no explanation).";
