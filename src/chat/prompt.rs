//! Prompt construction. Pure functions of their inputs; the structured
//! prompt pins the model to a four-key JSON object so the parser can
//! validate the shape mechanically.

/// Marker the model must emit at the start of `content` when the reply
/// should materialize as a document draft.
pub const CREATE_DOCUMENT_MARKER: &str = "CREATE_DOCUMENT";

/// Instruction prompt demanding a JSON object with exactly `content`,
/// `judgment`, `sources` and `createDocument` at the top level.
pub fn structured_reply_prompt(query: &str) -> String {
    format!(
        r#"Provide a comprehensive response to the user query while adhering strictly to the following JSON format. Make sure to populate ALL fields, even if some values are minimal. Pay attention to the following important points:

{query}

1. "content": This should be a detailed and well-structured response addressing the user query.
   - If a document should be created, start the content with "{CREATE_DOCUMENT_MARKER}:" followed by the document content (e.g., a letter or request).
   - Use proper formatting for any document content that follows the "{CREATE_DOCUMENT_MARKER}:" directive (clear headings, placeholders for variables like [Debtor's Name], etc.).

2. "judgment": Provide a brief assessment of the response quality, such as:
   - "Comprehensive explanation with clear steps."
   - "General answer with few details."
   - "Incomplete answer with missing key information."

3. "sources": Include relevant sources (if any) to back up the content provided. If sources are not available, leave the array empty. Each source should have:
   - A "title": The title of the source (if available).
   - A "url": The URL of the source (if available; if not, leave as an empty string).
   - Limit sources to 2-3 relevant references.

4. "createDocument": This should be a boolean ("true" or "false"). Set to "true" if a document should be created as part of the response, otherwise set it to "false".

Here is the structure you should follow for the response:

{{
  "content": "Provide a detailed response addressing the query. If a document should be created, include the text following '{CREATE_DOCUMENT_MARKER}:'",
  "judgment": {{
    "text": "A concise assessment of the response quality"
  }},
  "sources": [
    {{
      "title": "Specific Source Name",
      "url": "Optional source URL (can be empty string if no URL)"
    }}
  ],
  "createDocument": true or false
}}

Important Response Guidelines:
- Ensure valid JSON syntax.
- Return ONLY the JSON object, with no surrounding prose.
- Include placeholders in the document content where appropriate (e.g., [Debtor's Name], [Loan Account Number], etc.).
- Be consistent with how you structure each field.
- If no document is required, omit the "{CREATE_DOCUMENT_MARKER}:" section."#
    )
}

/// Short-title derivation prompt used when a conversation or document needs
/// a name.
pub fn title_prompt(text: &str) -> String {
    format!(
        "Summarize the following message as a short title of at most eight words. \
Return only the title text, with no quotes and no trailing punctuation.\n\n{text}"
    )
}

/// Revision prompt: the user's instruction plus the current draft body.
pub fn revision_prompt(instruction: &str, previous_content: &str) -> String {
    format!(
        "{instruction}\n\nThis is the previous content of the document. Produce the full revised document text:\n\n{previous_content}"
    )
}
