// Converge an inventory
pub mod apply;
