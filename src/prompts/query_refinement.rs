//! Prompt for turning a free-text request into structured search terms.

/// Prompt template
/// Placeholders: {query}
pub const QUERY_REFINEMENT_TEMPLATE: &str = r#"Extract search terms for finding academic papers on arXiv from the request below.
Suggest a few closely related keywords as well.

Request: {query}

Answer with a single JSON object in exactly this shape:
{
  "main_keywords": "primary search keyword",
  "additional_keywords": ["related keyword 1", "related keyword 2"],
  "category": "arXiv category code such as cs.AI or cs.CL (omit if unsure)",
  "year_range": [start_year, end_year] (omit if the request names no period)
}

Respond in JSON format."#;

/// Build the refinement prompt for a free-text request
pub fn build_refinement_prompt(query: &str) -> String {
    QUERY_REFINEMENT_TEMPLATE.replace("{query}", query)
}
