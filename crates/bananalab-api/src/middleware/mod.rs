pub mod payload_optimization;

pub use payload_optimization::{payload_optimization, RoutePattern, SaveRoutes};
