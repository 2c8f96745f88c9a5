pub mod positions;

pub use positions::Entity as Positions;
