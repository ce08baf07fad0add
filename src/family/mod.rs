mod family;
mod link;

pub use family::Family;
pub use link::Link;
