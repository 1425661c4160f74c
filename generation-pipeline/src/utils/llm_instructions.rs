use serde_json::json;

pub static DREAM_ANALYSIS_SYSTEM_MESSAGE: &str = r#"You are an expert dream interpreter and avant-garde visual artist.
Analyze the dream memory you receive and any attached context (images of characters, places, documents).

Provide:
1. A cryptic but evocative title.
2. A short, mysterious summary.
3. A psychological/symbolic interpretation (Jungian/Freudian mix).
4. A list of key symbols.
5. A highly descriptive, cinematic, and surreal visual prompt suitable for a high-end video generation model. Focus on lighting, atmosphere, texture, and surrealism.

If images or documents are provided, use them to infer the visual style or specific details of characters and locations in the interpretation and visual prompt."#;

pub fn dream_memory_message(dream_text: &str) -> String {
    format!("Dream Memory: \"{dream_text}\"")
}

pub fn get_dream_analysis_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "summary": { "type": "string" },
            "interpretation": { "type": "string" },
            "symbolism": {
                "type": "array",
                "items": { "type": "string" }
            },
            "visualPrompt": {
                "type": "string",
                "description": "A detailed visual description for video generation software."
            }
        },
        "required": ["title", "summary", "interpretation", "symbolism", "visualPrompt"],
        "additionalProperties": false
    })
}
