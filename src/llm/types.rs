#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model_id: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}
