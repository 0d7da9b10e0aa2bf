/// The one prompt every provider receives, so outputs stay comparable
/// across providers (and across votes).
pub fn build_prompt(question: &str, schema: &str) -> String {
    format!(
        "Given the following database schema:\n{}\n\nPlease generate the SQL query for the following question:\n\"{}\"\n",
        schema, question
    )
}
