//! Value Objects - Immutable, identity-less domain primitives

mod candidate_url;
mod credentials;
mod session_tokens;
mod target_date;

pub use candidate_url::CandidateUrl;
pub use credentials::Credentials;
pub use session_tokens::SessionTokens;
pub use target_date::TargetDate;
