pub mod check;
pub mod refresh;
pub mod serve;
