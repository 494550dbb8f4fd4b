pub mod csv;
pub mod plot;
