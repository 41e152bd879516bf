pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    groq_api_key, load_config, AppConfig, GenerationConfig, RerankConfig, SearchConfig,
    ServerConfig,
};
