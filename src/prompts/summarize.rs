//! Prompt for summarizing a (translated) abstract.

/// Prompt template
/// Placeholders: {language}, {text}
pub const SUMMARY_TEMPLATE: &str = r#"Summarize the following paper text in {language} in roughly 100-200 characters.
Keep it concise and easy to follow, and include the paper's main contribution or conclusion.

Paper text:
{text}"#;

/// Human-readable language name for a DeepL-style target code
fn language_name(target_lang: &str) -> &str {
    match target_lang.to_ascii_uppercase().as_str() {
        "JA" => "Japanese",
        "EN" | "EN-US" | "EN-GB" => "English",
        "DE" => "German",
        "FR" => "French",
        "ES" => "Spanish",
        "IT" => "Italian",
        "KO" => "Korean",
        "ZH" | "ZH-HANS" | "ZH-HANT" => "Chinese",
        "PT" | "PT-BR" | "PT-PT" => "Portuguese",
        "RU" => "Russian",
        _ => target_lang,
    }
}

/// Build the summarization prompt
pub fn build_summary_prompt(target_lang: &str, text: &str) -> String {
    SUMMARY_TEMPLATE
        .replace("{language}", language_name(target_lang))
        .replace("{text}", text)
}
