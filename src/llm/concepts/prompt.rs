pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are an expert at extracting key concepts from text.
Extract the important concepts (noun phrases, core keywords) from the given paragraph and return them as a JSON object.
Response format: {"concepts": ["concept 1", "concept 2", ...]}
Each concept must be a noun phrase of 2-5 words, written in the same language as the paragraph."#;

pub const VERIFICATION_SYSTEM_PROMPT: &str = r#"You are an expert at analysing relations between concepts.
Decide whether two concepts are semantically related and answer in JSON.
Response format: {"related": true/false, "reason": "short explanation"}"#;

pub fn build_extraction_prompt(text: &str) -> String {
    format!(
        "Extract the key concepts from the following paragraph and return them as JSON. \
         Express each concept as a noun phrase of 2-5 words. \
         The response must be exactly of the form {{\"concepts\": [...]}}:\n\n{text}"
    )
}

pub fn build_verification_prompt(concept_a: &str, concept_b: &str) -> String {
    format!(
        "Decide whether the following two concepts are semantically related:\n\n\
         Concept 1: {concept_a}\nConcept 2: {concept_b}\n\n\
         The response must be exactly of the form {{\"related\": true/false, \"reason\": \"...\"}}."
    )
}
