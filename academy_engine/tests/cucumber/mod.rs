mod steps;

pub use checkout_world::CheckoutWorld;
