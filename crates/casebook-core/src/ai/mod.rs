//! Generative-AI access: backend seam, throttled queue, structured replies.

pub mod backend;
pub mod gateway;
pub mod queue;
pub mod structured;

pub use backend::{
    Contents, GeminiBackend, GenerationRequest, GenerativeBackend, MockBackend, Part, SamplingSettings,
};
pub use gateway::{AiCall, AiGateway};
pub use queue::{QueuedCall, ThrottlePolicy, ThrottledQueue};
pub use structured::{strip_code_fences, StructuredReply};
