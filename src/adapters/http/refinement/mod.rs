//! HTTP adapter for refinement endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    AcceptSuggestionsRequest, AcceptSuggestionsResponse, FinalizeRequest, FinalizeResponse,
    MessageResponse, SessionResponse, SubmitAnswersRequest,
};
pub use handlers::{ping, RefinementHandlers};
pub use routes::refinement_routes;
