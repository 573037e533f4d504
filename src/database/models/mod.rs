pub mod drink;

pub use drink::Drink;
