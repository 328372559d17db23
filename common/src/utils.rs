pub mod envsubst;
pub mod numeric;
