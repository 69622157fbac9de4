pub mod evaluate;
pub mod predict;
