//! Provider routing: registry, allow-list, resolution, dispatch and normalization.

pub mod dispatcher;
pub mod gateway;
pub mod guard;
pub mod http;
pub mod logging;
pub mod normalize;
pub mod provider;
pub mod research;
pub mod resolver;

pub use dispatcher::{AttemptOutcome, AttemptRecord, DispatchOutcome, DispatchSuccess, Dispatcher};
pub use gateway::{Gateway, GeminiCallRequest, GeminiCallResponse, ProxyResearchRequest};
pub use guard::EndpointGuard;
pub use normalize::{InlineImage, extract_inline_image, extract_text};
pub use provider::{Provider, ProviderConfig, ProviderRegistry, Secrets};
pub use research::{ResearchItem, ResearchRotation};
pub use resolver::{Attempt, Operation, ResolveRequest, Resolver};
