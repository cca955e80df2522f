pub mod judge0;
pub mod sphere;
pub mod stubs;
pub mod traits;
