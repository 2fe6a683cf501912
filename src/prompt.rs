use anyhow::{anyhow, Result};
use serde_json::Value;

pub const CONNECTIVITY_PROMPT: &str = "Test API connectivity. Respond with a single word: 'OK'.";

const CORRECTED_PLACEHOLDER: &str = "The corrected and improved version of the input.";

/// Prompt dialect a provider responds best to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFormat {
    /// Verbose instructions with an explicit mode block and schema skeleton.
    StructuredJson,
    /// Terse system-style instructions, for chat-completion providers.
    PlainInstruction,
}

/// One translation request, built fresh per user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    user_input: String,
    source_language: String,
    target_languages: Vec<String>,
    tutor_mode: bool,
    provider_format: ProviderFormat,
}

impl TranslationRequest {
    /// Target languages are trimmed and de-duplicated in first-seen order.
    /// A target equal to the source language is dropped.
    pub fn new<I, S>(
        user_input: impl Into<String>,
        source_language: impl Into<String>,
        target_languages: I,
        tutor_mode: bool,
        provider_format: ProviderFormat,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let source_language = source_language.into().trim().to_string();
        let mut targets: Vec<String> = Vec::new();
        for lang in target_languages {
            let lang = lang.as_ref().trim();
            if lang.is_empty() || lang.eq_ignore_ascii_case(&source_language) {
                continue;
            }
            if targets.iter().any(|seen| seen.eq_ignore_ascii_case(lang)) {
                continue;
            }
            targets.push(lang.to_string());
        }

        Self {
            user_input: user_input.into(),
            source_language,
            target_languages: targets,
            tutor_mode,
            provider_format,
        }
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_languages(&self) -> &[String] {
        &self.target_languages
    }

    pub fn tutor_mode(&self) -> bool {
        self.tutor_mode
    }

    pub fn provider_format(&self) -> ProviderFormat {
        self.provider_format
    }

    /// Checks done by the caller before a prompt is sent out.
    pub fn validate(&self) -> Result<()> {
        if self.user_input.trim().is_empty() {
            return Err(anyhow!("Input text is empty."));
        }
        if self.target_languages.is_empty() {
            return Err(anyhow!("Please select at least one target language."));
        }
        Ok(())
    }
}

/// Encodes text as a JSON string literal so quotes and newlines cannot
/// break out of the surrounding instructions.
fn quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

fn mode_name(tutor_mode: bool) -> &'static str {
    if tutor_mode {
        "tutor"
    } else {
        "translator"
    }
}

fn json_skeleton(request: &TranslationRequest, indent: &str) -> String {
    let entries = request
        .target_languages
        .iter()
        .map(|lang| format!("{indent}    {}: {}", quote(lang), quote(&format!("{lang} Translation."))))
        .collect::<Vec<_>>()
        .join(",\n");

    let mut out = format!("{indent}{{\n{indent}  \"mode\": \"{}\",\n", mode_name(request.tutor_mode));
    if request.tutor_mode {
        out.push_str(&format!(
            "{indent}  \"corrected_text\": {},\n",
            quote(CORRECTED_PLACEHOLDER)
        ));
    }
    out.push_str(&format!("{indent}  \"translations\": {{\n"));
    if !entries.is_empty() {
        out.push_str(&entries);
        out.push('\n');
    }
    out.push_str(&format!("{indent}  }}\n{indent}}}"));
    out
}

pub fn build_translation_prompt(request: &TranslationRequest) -> String {
    match request.provider_format {
        ProviderFormat::StructuredJson => structured_prompt(request),
        ProviderFormat::PlainInstruction => plain_prompt(request),
    }
}

fn structured_prompt(request: &TranslationRequest) -> String {
    let source = &request.source_language;
    let targets = request.target_languages.join(", ");

    let mut prompt = format!(
        "Translate the following text based on the given instructions.\n\nSource Language: {source}\nTarget Languages: {targets}\nUser Input: {input}\n\nProvide your output ONLY in a valid JSON format.",
        input = quote(&request.user_input),
    );

    if request.tutor_mode {
        prompt.push_str(&format!(
            "\n\n**MODE: AI TUTOR**\nYour task is to correct the user's input for natural phrasing in {source}, then translate the corrected version.\n\nThe JSON output must have a \"mode\" field (\"tutor\"), a \"corrected_text\" field, and a \"translations\" object whose keys are exactly: {targets}.\n"
        ));
    } else {
        prompt.push_str(&format!(
            "\n\n**MODE: TRANSLATOR**\nYour task is to provide natural, idiomatic translations of the user's input.\n\nThe JSON output must have a \"mode\" field (\"translator\") and a \"translations\" object whose keys are exactly: {targets}.\n"
        ));
    }
    prompt.push_str(&json_skeleton(request, ""));
    prompt
}

fn plain_prompt(request: &TranslationRequest) -> String {
    let source = &request.source_language;
    let targets = request.target_languages.join(", ");

    let instructions = if request.tutor_mode {
        format!(
            "MODE: AI TUTOR. Correct the user's input for natural phrasing in {source}, then translate the corrected version into all target languages. The JSON must contain \"mode\": \"tutor\", \"corrected_text\", and a \"translations\" object keyed by exactly these language names: {targets}."
        )
    } else {
        format!(
            "Translate the user's input into all target languages. The JSON must contain \"mode\": \"translator\" and a \"translations\" object keyed by exactly these language names: {targets}."
        )
    };

    format!(
        "You are an expert translator.\nThe response must be a single, valid JSON object, and nothing else.\nSource Language: {source}\nTarget Languages: {targets}\nUser Input: {input}\n\nInstructions: {instructions}\n\nThe JSON should look like this:\n{skeleton}",
        input = quote(&request.user_input),
        skeleton = json_skeleton(request, ""),
    )
}

pub fn build_reverse_check_prompt(text: &str) -> String {
    format!(
        "Translate the following text into conversational English, and provide ONLY the translation without any extra text.\nText: {}",
        quote(text)
    )
}
