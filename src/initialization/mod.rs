mod restored;
mod state_gen;
mod zeros;

pub use restored::RestoredStateGen;
pub use state_gen::StateGen;
pub use zeros::ZeroStateGen;
