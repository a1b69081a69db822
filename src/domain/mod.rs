mod ids;

pub use ids::SessionId;
