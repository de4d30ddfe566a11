pub mod feedback;
pub mod health;
