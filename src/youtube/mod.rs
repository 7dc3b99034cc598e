pub mod extract;
pub mod youtube;
