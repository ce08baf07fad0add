mod proximal;

pub use proximal::Proximal;
