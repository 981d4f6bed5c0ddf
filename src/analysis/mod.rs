pub mod blockiness;
pub mod dct;
pub mod distribution;
