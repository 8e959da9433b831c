mod amount;
mod date;

pub use amount::ofx_amount;
pub use date::ofx_datetime;
