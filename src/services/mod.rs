pub mod answers;
pub mod api_client;
pub mod attempt_session;
pub mod countdown;
pub mod errors;
pub mod exam_backend;
pub mod observer;
