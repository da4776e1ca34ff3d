/// Middleware module
///
/// Access-token authentication and per-request logging.

mod jwt_middleware;
mod request_logger;

pub use jwt_middleware::JwtMiddleware;
pub use request_logger::RequestLogger;
