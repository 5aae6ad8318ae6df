pub mod check;
pub mod codecs;
pub mod devices;
pub mod record;
