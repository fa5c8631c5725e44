//! Wraps a context blob and a source description into the final prompt.

/// Appended when a context blob exceeds the configured content limit.
pub const TRUNCATION_MARKER: &str = "\n\n... (content truncated) ...";

/// Builds the natural-language prompt handed to the model.
///
/// If the blob is longer than `max_len` bytes, only the first `max_len`
/// bytes (backed off to a char boundary) are kept and the truncation marker
/// is appended. Callers are expected to short-circuit on empty blobs and
/// never reach this function with nothing to say.
pub fn build_prompt(description: &str, blob: &str, max_len: usize) -> String {
    let truncated = if blob.len() > max_len {
        let mut cut = max_len;
        while !blob.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}{}", &blob[..cut], TRUNCATION_MARKER)
    } else {
        blob.to_string()
    };

    format!(
        "As an AI assistant you have access to the following code from {description}.\n\n\
         {truncated}\n\n\
         Please answer with this code as context. If a question falls outside \
         the context, tell the user so.\n\n\
         What can you help with regarding this code?"
    )
}
