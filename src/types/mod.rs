mod generate_content;
mod model;

pub use generate_content::{
    Candidate, Content, ContentRole, ErrorDetail, ErrorResponse, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, Part, PromptFeedback, UsageMetadata,
};
pub use model::{KnownModel, Model};
